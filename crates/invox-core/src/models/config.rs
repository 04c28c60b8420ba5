//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};

/// Main configuration for the invox pipeline.
///
/// Read-only once a pipeline instance is built; concurrent documents
/// share it without synchronization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Remote analysis job configuration.
    pub job: JobConfig,

    /// Temporary object storage configuration.
    pub storage: StorageConfig,

    /// Field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Reconciliation workflow configuration.
    pub reconcile: ReconcileConfig,
}

/// Polling/backoff configuration for the remote analysis job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobConfig {
    /// First wait between status polls, in milliseconds.
    pub initial_interval_ms: u64,

    /// Factor applied to the interval after each non-terminal poll.
    pub backoff_multiplier: f64,

    /// Upper bound on a single wait, in milliseconds.
    pub max_interval_ms: u64,

    /// Hard ceiling on total polling time, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            backoff_multiplier: 2.0,
            max_interval_ms: 3_000,
            timeout_ms: 90_000,
        }
    }
}

/// Temporary object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Bucket holding in-flight documents.
    pub bucket: String,

    /// Key prefix for uploaded documents.
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "invox-inflight".to_string(),
            key_prefix: "uploads".to_string(),
        }
    }
}

/// Field extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Known customer names, matched before generic name patterns.
    pub known_customers: Vec<String>,

    /// Days added to the invoice date when no due date is found.
    pub default_due_term_days: i64,

    /// Upper bound on raw text retained in the result.
    pub max_raw_text_len: usize,

    /// Sanity bound for plausibility correction: candidates above
    /// `vat * multiplier` are discarded.
    pub correction_vat_multiplier: u32,

    /// Default currency if none is detected.
    pub default_currency: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            known_customers: Vec::new(),
            default_due_term_days: 30,
            max_raw_text_len: 32_768,
            correction_vat_multiplier: 10,
            default_currency: "AED".to_string(),
        }
    }
}

/// Reconciliation workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Confidence at or above which a field is committed without
    /// review.
    pub auto_accept_threshold: u8,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            auto_accept_threshold: 95,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}
