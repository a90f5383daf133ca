//! Error kinds
//!
//! [`PipelineError`] aborts a run. [`ServiceFailure`] is scoped to a single
//! service and ends up in the dataset's `failedServices` list.

use thiserror::Error;

/// Fatal errors that stop the run before any dataset is produced
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch service directory from {url}: {reason}")]
    DirectoryFetch { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to initialize HTTP client: {0}")]
    ClientInit(String),
}

/// Recoverable failure of one service's pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceFailure {
    #[error("no documentation page found for '{service_id}'")]
    PageResolution { service_id: String },

    #[error("failed to fetch documentation page {url}: {reason}")]
    PageFetch { url: String, reason: String },

    #[error("failed to fetch structured data from {url}: {reason}")]
    StructuredFetch { url: String, reason: String },
}

impl ServiceFailure {
    /// Short label used in console summaries
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PageResolution { .. } => "resolution",
            Self::PageFetch { .. } => "page-fetch",
            Self::StructuredFetch { .. } => "structured-fetch",
        }
    }
}

/// Render an `anyhow` error chain on one line
pub(crate) fn reason(error: &anyhow::Error) -> String {
    format!("{error:#}")
}
