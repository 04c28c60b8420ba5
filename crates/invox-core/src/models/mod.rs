//! Data models for the extraction pipeline.

pub mod config;
pub mod fields;
pub mod record;

pub use config::{ExtractionConfig, JobConfig, PipelineConfig, ReconcileConfig, StorageConfig};
pub use fields::{
    ExtractionResult, ExtractionTrace, FieldKey, FieldSource, FieldState, FieldValue, TraceEvent,
    TraceOutcome,
};
pub use record::InvoiceDraftRecord;
