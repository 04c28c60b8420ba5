//! Core library for invoice field extraction and reconciliation.
//!
//! This crate provides:
//! - A two-strategy extraction pipeline (remote structured document
//!   analysis plus a local heuristic text parser)
//! - Locale-aware number and date normalization
//! - Plausibility correction of implausible totals
//! - Async analysis-job lifecycle with backoff and guaranteed
//!   temporary-storage cleanup
//! - A human-reviewable reconciliation workflow producing the final
//!   invoice draft record

pub mod confidence;
pub mod correct;
pub mod error;
pub mod heuristics;
pub mod job;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod reconcile;
pub mod structured;

pub use error::{PipelineError, Result};
pub use heuristics::{HeuristicFields, HeuristicParser};
pub use job::{
    AnalysisJobRunner, AnalyzedDocument, BackoffPolicy, DocumentAnalysisService, JobId, JobPoll,
    JobStatus, ObjectLocation, ObjectStore, TypedLabelledField,
};
pub use models::{
    ExtractionResult, ExtractionTrace, FieldKey, FieldSource, FieldState, FieldValue,
    InvoiceDraftRecord, PipelineConfig,
};
pub use pipeline::ExtractionPipeline;
pub use reconcile::{ReconciliationDraft, ValidationIssue};
pub use structured::{StructuredFields, map_fields};
