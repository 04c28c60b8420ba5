//! Collaborator interfaces for the remote analysis path.
//!
//! The pipeline owns no wire protocol; hosts implement these traits
//! over whatever document-analysis service and object storage they
//! run. Trait methods return plain message strings as errors; the
//! runner folds them into the pipeline error taxonomy.

use serde::{Deserialize, Serialize};

/// Identifier of a submitted analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a temporary object in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn locator(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }
}

/// One typed, labelled field as reported by the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedLabelledField {
    /// Service-assigned field type (e.g. "InvoiceTotal").
    pub field_type: String,
    /// Label text near the field on the document, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Extracted value as text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Service-reported confidence, 0.0..=1.0.
    pub confidence: f32,
}

/// Terminal or non-terminal status of an analysis job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed { reason: String },
}

/// One poll response from the analysis service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPoll {
    #[serde(flatten)]
    pub status: JobStatus,
    /// Field page carried by this response.
    #[serde(default)]
    pub fields: Vec<TypedLabelledField>,
    /// Full raw text of the document, present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Set when more field pages remain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<String>,
}

impl JobPoll {
    pub fn running() -> Self {
        Self {
            status: JobStatus::Running,
            fields: Vec::new(),
            content: None,
            continuation_token: None,
        }
    }

    pub fn succeeded(fields: Vec<TypedLabelledField>, content: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Succeeded,
            fields,
            content: Some(content.into()),
            continuation_token: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Failed {
                reason: reason.into(),
            },
            fields: Vec::new(),
            content: None,
            continuation_token: None,
        }
    }

    /// Attach a continuation token announcing further field pages.
    pub fn with_continuation(mut self, token: impl Into<String>) -> Self {
        self.continuation_token = Some(token.into());
        self
    }
}

/// Remote structured document-analysis capability.
pub trait DocumentAnalysisService: Send + Sync {
    /// Request analysis of an uploaded document; returns the job id.
    fn submit_job(
        &self,
        location: &ObjectLocation,
    ) -> impl Future<Output = Result<JobId, String>> + Send;

    /// Query job status. `continuation` drains additional field pages
    /// after the job has succeeded.
    fn poll_job(
        &self,
        job: &JobId,
        continuation: Option<&str>,
    ) -> impl Future<Output = Result<JobPoll, String>> + Send;
}

/// Temporary object storage for in-flight documents.
pub trait ObjectStore: Send + Sync {
    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), String>> + Send;

    fn delete(&self, bucket: &str, key: &str) -> impl Future<Output = Result<(), String>> + Send;
}
