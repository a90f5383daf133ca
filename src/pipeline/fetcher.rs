//! Fetch Orchestrator
//!
//! Runs the configured source for every directory entry under bounded
//! concurrency. A failing service is recorded and never stops the others.

use super::source::ServiceSource;
use crate::error::ServiceFailure;
use crate::model::{ServiceDirectoryEntry, ServiceRecord};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A service whose pipeline failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedService {
    pub service_id: String,
    pub failure: ServiceFailure,
}

/// Wall-clock time spent on one service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceTiming {
    pub service_id: String,
    pub elapsed: Duration,
    pub succeeded: bool,
}

/// Everything collected by one orchestrator run, in completion order
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub records: Vec<ServiceRecord>,
    pub failures: Vec<FailedService>,
    pub timings: Vec<ServiceTiming>,
    /// Services that resolved and parsed but yielded no operations
    pub empty_services: Vec<String>,
}

impl RunOutcome {
    fn record(
        &mut self,
        entry: &ServiceDirectoryEntry,
        result: Result<ServiceRecord, ServiceFailure>,
        elapsed: Duration,
        progress: (usize, usize),
    ) {
        let (done, total) = progress;
        let service_id = entry.service_id.clone();

        self.timings.push(ServiceTiming {
            service_id: service_id.clone(),
            elapsed,
            succeeded: result.is_ok(),
        });

        match result {
            Ok(record) if record.operations.is_empty() => {
                tracing::warn!("[{}/{}] ○ {}: no operations found", done, total, service_id);
                self.empty_services.push(service_id);
                self.records.push(record);
            }
            Ok(record) => {
                tracing::info!(
                    "[{}/{}] ✓ {} ({} operations, {} dependent actions, {:.2}s)",
                    done,
                    total,
                    service_id,
                    record.operations.len(),
                    record.dependency_edges(),
                    elapsed.as_secs_f64()
                );
                self.records.push(record);
            }
            Err(failure) => {
                tracing::warn!("[{}/{}] ✗ {}: {}", done, total, service_id, failure);
                self.failures.push(FailedService {
                    service_id,
                    failure,
                });
            }
        }
    }
}

/// Drives a [`ServiceSource`] across the service directory
pub struct Orchestrator {
    source: ServiceSource,
    concurrency: usize,
}

impl Orchestrator {
    pub fn new(source: ServiceSource, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
        }
    }

    /// Attempt every service exactly once.
    ///
    /// Entries repeating an already seen service id are skipped.
    pub async fn run(&self, entries: &[ServiceDirectoryEntry]) -> RunOutcome {
        let entries = unique_entries(entries);
        let total = entries.len();
        tracing::info!(
            "Fetching {} services ({:?} source, concurrency {})",
            total,
            self.source.mode(),
            self.concurrency
        );

        let mut results = stream::iter(entries)
            .map(|entry| async move {
                let started = Instant::now();
                let result = self.source.fetch(entry).await;
                (entry, result, started.elapsed())
            })
            .buffer_unordered(self.concurrency);

        let mut outcome = RunOutcome::default();
        let mut done = 0;
        while let Some((entry, result, elapsed)) = results.next().await {
            done += 1;
            outcome.record(entry, result, elapsed, (done, total));
        }
        outcome
    }
}

fn unique_entries(entries: &[ServiceDirectoryEntry]) -> Vec<&ServiceDirectoryEntry> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|entry| {
            let first = seen.insert(entry.service_id.as_str());
            if !first {
                tracing::warn!("Skipping duplicate directory entry for {}", entry.service_id);
            }
            first
        })
        .collect()
}
