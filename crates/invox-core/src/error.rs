//! Error types for the invox-core library.

use thiserror::Error;

/// Main error type for the extraction pipeline.
///
/// Heuristic parsing and normalization never produce errors: a field
/// that cannot be extracted stays `Missing`. Only the remote job
/// lifecycle is exceptional, and every variant here is surfaced after
/// the temporary storage object has been cleaned up.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Writing the document to temporary object storage failed.
    /// No analysis job was submitted.
    #[error("upload to temporary storage failed: {0}")]
    Upload(String),

    /// The remote analysis service did not return a job identifier.
    #[error("job submission failed: {0}")]
    Submission(String),

    /// The polling ceiling elapsed before the job reached a terminal
    /// state. The pipeline instance is terminal; a retry must restart
    /// from upload.
    #[error("analysis job timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    /// The remote service reported terminal failure.
    #[error("analysis job failed: {reason}")]
    JobFailed { reason: String },
}

/// Result type for the invox library.
pub type Result<T> = std::result::Result<T, PipelineError>;
