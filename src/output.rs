//! Output writer

use crate::model::ConsolidatedDataset;
use anyhow::{Context, Result};
use std::path::Path;

/// Write the dataset as pretty-printed JSON, creating parent directories
pub fn write_dataset(path: &Path, dataset: &ConsolidatedDataset) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(dataset)?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!("Wrote {} services to {}", dataset.total_services, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AccessLevel, OperationRecord, ServiceRecord};
    use chrono::Utc;

    #[test]
    fn test_write_creates_parent_and_keeps_empty_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("dataset.json");

        let dataset = ConsolidatedDataset {
            services: vec![ServiceRecord {
                service_id: "s3".to_string(),
                display_name: "Amazon S3".to_string(),
                operations: vec![OperationRecord::new("ListAllMyBuckets", "", AccessLevel::List)],
                resource_types: vec![],
                condition_keys: vec![],
            }],
            total_services: 1,
            failed_service_ids: vec![],
            generated_at: Utc::now(),
        };

        write_dataset(&path, &dataset).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["totalServices"], 1);
        assert_eq!(written["failedServices"], serde_json::json!([]));
        assert_eq!(written["services"][0]["resourceTypes"], serde_json::json!([]));
        assert_eq!(written["services"][0]["operations"][0]["accessLevel"], "List");
        assert!(written["lastUpdated"].is_string());
    }
}
