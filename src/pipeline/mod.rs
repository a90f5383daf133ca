//! Extraction and reconciliation pipeline
//!
//! # Architecture
//!
//! - [`source`] - Directory, documentation and combined data sources
//! - [`fetcher`] - Bounded-concurrency orchestrator with failure accounting
//! - [`consolidate`] - Sorting, deduplication and aggregate counters
//!
//! [`run`] ties them together: fetch the service directory, run the
//! configured source for every service, consolidate.

pub mod consolidate;
pub mod fetcher;
pub mod source;

pub use consolidate::{consolidate, Consolidated};
pub use fetcher::{FailedService, Orchestrator, RunOutcome, ServiceTiming};
pub use source::{merge_documentation, DirectorySource, DocumentationSource, ServiceSource};

use crate::aws::directory::fetch_service_directory;
use crate::aws::http::HttpClient;
use crate::config::Config;
use crate::error::{self, PipelineError};
use crate::model::{ConsolidatedDataset, DatasetStats};
use chrono::{DateTime, Utc};

/// Result of a complete run
#[derive(Debug)]
pub struct RunReport {
    pub dataset: ConsolidatedDataset,
    pub stats: DatasetStats,
    /// Failures sorted by service id
    pub failures: Vec<FailedService>,
    /// Per-service timings, slowest first
    pub timings: Vec<ServiceTiming>,
    pub empty_services: Vec<String>,
}

impl RunReport {
    pub fn from_outcome(outcome: RunOutcome, generated_at: DateTime<Utc>) -> Self {
        let RunOutcome {
            records,
            mut failures,
            mut timings,
            mut empty_services,
        } = outcome;

        failures.sort_by(|a, b| a.service_id.cmp(&b.service_id));
        timings.sort_by(|a, b| b.elapsed.cmp(&a.elapsed));
        empty_services.sort();

        let failed_ids = failures.iter().map(|f| f.service_id.clone()).collect();
        let Consolidated { dataset, stats } = consolidate(records, failed_ids, generated_at);

        Self {
            dataset,
            stats,
            failures,
            timings,
            empty_services,
        }
    }
}

/// Run the whole pipeline.
///
/// Only configuration problems and a failed directory fetch are errors;
/// per-service failures are reported inside the dataset.
pub async fn run(config: &Config) -> Result<RunReport, PipelineError> {
    config.validate()?;

    let http = HttpClient::new(config.request_timeout(), config.probe_timeout())
        .map_err(|e| PipelineError::ClientInit(error::reason(&e)))?;

    let entries = fetch_service_directory(&http, &config.directory_url).await?;

    let source = ServiceSource::from_config(config, http)
        .map_err(|e| PipelineError::InvalidConfig(error::reason(&e)))?;

    let outcome = Orchestrator::new(source, config.concurrency)
        .run(&entries)
        .await;

    Ok(RunReport::from_outcome(outcome, Utc::now()))
}
