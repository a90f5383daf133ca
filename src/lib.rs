//! iamref
//!
//! Builds one consolidated AWS IAM authorization dataset from the service
//! reference directory and the Service Authorization Reference
//! documentation pages.
//!
//! - [`aws`] - HTTP transport, service directory, structured JSON
//! - [`docs`] - Documentation page resolution and table parsing
//! - [`pipeline`] - Orchestration and consolidation
//! - [`model`] - Dataset records
//! - [`config`] - Run configuration
//! - [`output`] - Dataset writer

pub mod aws;
pub mod config;
pub mod docs;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;

pub use config::{Config, SourceMode};
pub use error::{PipelineError, ServiceFailure};
pub use model::{ConsolidatedDataset, ServiceRecord};
