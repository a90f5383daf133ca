//! Consolidation & Normalization
//!
//! Turns the unordered results of a run into the final dataset.

use crate::model::{ConsolidatedDataset, DatasetStats, ServiceRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Final dataset plus its aggregate counters
#[derive(Debug, Clone)]
pub struct Consolidated {
    pub dataset: ConsolidatedDataset,
    pub stats: DatasetStats,
}

/// Sort, deduplicate and freeze the collected records.
///
/// Services are ordered by id regardless of completion order. A service id
/// listed as failed never appears among the services.
pub fn consolidate(
    records: Vec<ServiceRecord>,
    failed_ids: Vec<String>,
    generated_at: DateTime<Utc>,
) -> Consolidated {
    let failed: BTreeSet<String> = failed_ids.into_iter().collect();

    let mut services = records;
    services.retain(|s| !failed.contains(&s.service_id));
    services.sort_by(|a, b| a.service_id.cmp(&b.service_id));
    services.dedup_by(|later, earlier| later.service_id == earlier.service_id);

    let stats = DatasetStats::from_services(&services);

    let dataset = ConsolidatedDataset {
        total_services: services.len(),
        services,
        failed_service_ids: failed.into_iter().collect(),
        generated_at,
    };

    Consolidated { dataset, stats }
}
