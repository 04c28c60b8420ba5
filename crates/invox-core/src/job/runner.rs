//! Remote analysis job lifecycle: upload, submit, poll, paginate,
//! cleanup.
//!
//! State machine: Submitted -> Polling -> Succeeded | Failed |
//! TimedOut. The temporary storage object is deleted on every terminal
//! transition; cleanup is unconditional once the upload has happened.

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::job::backoff::{BackoffPolicy, PollError, PollOutcome, poll_until_terminal};
use crate::job::service::{
    DocumentAnalysisService, JobPoll, JobStatus, ObjectLocation, ObjectStore, TypedLabelledField,
};
use crate::models::{PipelineConfig, StorageConfig};

/// Everything the remote path produced for one document.
#[derive(Debug, Clone)]
pub struct AnalyzedDocument {
    pub fields: Vec<TypedLabelledField>,
    pub raw_text: String,
    pub elapsed_ms: u64,
    /// Locator the document occupied while in flight; already deleted
    /// by the time this struct exists.
    pub temp_locator: String,
}

/// Drives one document through the remote analysis service.
///
/// Instances hold only read-only configuration and the two
/// collaborators; concurrent documents may share one runner.
pub struct AnalysisJobRunner<S, O> {
    service: S,
    store: O,
    storage: StorageConfig,
    backoff: BackoffPolicy,
}

impl<S: DocumentAnalysisService, O: ObjectStore> AnalysisJobRunner<S, O> {
    pub fn new(service: S, store: O, config: &PipelineConfig) -> Self {
        Self {
            service,
            store,
            storage: config.storage.clone(),
            backoff: BackoffPolicy::from_config(&config.job),
        }
    }

    /// Upload the document, run the analysis job to a terminal state,
    /// and return the full field list. The temporary object is deleted
    /// before this returns, on every path.
    pub async fn run(&self, bytes: &[u8], filename: &str) -> Result<AnalyzedDocument> {
        let started = Instant::now();
        let location = ObjectLocation {
            bucket: self.storage.bucket.clone(),
            key: format!(
                "{}/{}-{}",
                self.storage.key_prefix,
                Utc::now().timestamp_millis(),
                filename
            ),
        };

        self.store
            .put(&location.bucket, &location.key, bytes)
            .await
            .map_err(PipelineError::Upload)?;
        debug!(locator = %location.locator(), "document uploaded to temporary storage");

        // The object exists from here on: run the job, then delete
        // regardless of how it ended.
        let outcome = self.analyze(&location).await;

        if let Err(e) = self.store.delete(&location.bucket, &location.key).await {
            warn!(locator = %location.locator(), error = %e, "temporary object cleanup failed");
        }

        let (fields, raw_text) = outcome?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            fields = fields.len(),
            elapsed_ms, "analysis job finished"
        );

        Ok(AnalyzedDocument {
            fields,
            raw_text,
            elapsed_ms,
            temp_locator: location.locator(),
        })
    }

    async fn analyze(
        &self,
        location: &ObjectLocation,
    ) -> Result<(Vec<TypedLabelledField>, String)> {
        let job = self
            .service
            .submit_job(location)
            .await
            .map_err(PipelineError::Submission)?;
        debug!(job = %job, "analysis job submitted");

        let service = &self.service;
        let job_ref = &job;
        let first = poll_until_terminal(&self.backoff, move || async move {
            let poll = service
                .poll_job(job_ref, None)
                .await
                .map_err(|e| PipelineError::JobFailed {
                    reason: format!("status query failed: {e}"),
                })?;
            match &poll.status {
                JobStatus::Running => Ok(PollOutcome::Pending),
                JobStatus::Succeeded => Ok(PollOutcome::Complete(poll)),
                JobStatus::Failed { reason } => Err(PipelineError::JobFailed {
                    reason: reason.clone(),
                }),
            }
        })
        .await
        .map_err(|e| match e {
            PollError::DeadlineExceeded { elapsed } => PipelineError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
            },
            PollError::Inner(inner) => inner,
        })?;

        let raw_text = first.content.clone().unwrap_or_default();
        let fields = self.drain_pages(&job, first).await?;
        Ok((fields, raw_text))
    }

    /// Collect every field page by following continuation tokens.
    async fn drain_pages(
        &self,
        job: &crate::job::service::JobId,
        first: JobPoll,
    ) -> Result<Vec<TypedLabelledField>> {
        let mut fields = first.fields;
        let mut token = first.continuation_token;

        while let Some(t) = token {
            let page = self
                .service
                .poll_job(job, Some(&t))
                .await
                .map_err(|e| PipelineError::JobFailed {
                    reason: format!("page fetch failed: {e}"),
                })?;
            debug!(page_fields = page.fields.len(), "fetched continuation page");
            fields.extend(page.fields);
            token = page.continuation_token;
        }

        Ok(fields)
    }
}
