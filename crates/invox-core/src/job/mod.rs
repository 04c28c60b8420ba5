//! Asynchronous analysis job lifecycle management.

pub mod backoff;
pub mod runner;
pub mod service;

pub use backoff::{BackoffPolicy, PollError, PollOutcome, poll_until_terminal};
pub use runner::{AnalysisJobRunner, AnalyzedDocument};
pub use service::{
    DocumentAnalysisService, JobId, JobPoll, JobStatus, ObjectLocation, ObjectStore,
    TypedLabelledField,
};
