//! Service Reference Directory
//!
//! Fetches the list of services and converts the per-service structured
//! JSON documents into [`ServiceRecord`]s.

use super::http::HttpClient;
use crate::error::{self, PipelineError};
use crate::model::{
    AccessLevel, ConditionKeyRecord, OperationRecord, ResourceTypeRecord, ServiceDirectoryEntry,
    ServiceRecord,
};
use serde::Deserialize;

/// Fetch the full service directory. Any failure here is fatal for the run.
pub async fn fetch_service_directory(
    http: &HttpClient,
    url: &str,
) -> Result<Vec<ServiceDirectoryEntry>, PipelineError> {
    let entries: Vec<ServiceDirectoryEntry> =
        http.get_json(url).await.map_err(|e| PipelineError::DirectoryFetch {
            url: url.to_string(),
            reason: error::reason(&e),
        })?;

    tracing::info!("Service directory lists {} services", entries.len());
    Ok(entries)
}

/// Structured JSON document for one service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructuredService {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub actions: Vec<StructuredAction>,
    #[serde(default)]
    pub resources: Vec<StructuredResource>,
    #[serde(default)]
    pub condition_keys: Vec<StructuredConditionKey>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructuredAction {
    pub name: String,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub action_condition_keys: Vec<String>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Annotations {
    #[serde(default)]
    pub properties: Properties,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Properties {
    #[serde(default)]
    pub is_list: bool,
    #[serde(default)]
    pub is_write: bool,
    #[serde(default)]
    pub is_permission_management: bool,
    #[serde(default)]
    pub is_tagging_only: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructuredResource {
    pub name: String,
    #[serde(rename = "ARNFormats", default)]
    pub arn_formats: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StructuredConditionKey {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl StructuredService {
    /// Convert into a record. Descriptions and dependent actions are not
    /// part of the structured source and stay empty.
    pub fn into_record(self, service_id: &str) -> ServiceRecord {
        let operations = self
            .actions
            .into_iter()
            .map(|action| {
                let props = action.annotations.properties;
                let level = AccessLevel::from_properties(
                    props.is_list,
                    props.is_write,
                    props.is_permission_management,
                    props.is_tagging_only,
                );
                let mut op = OperationRecord::new(action.name, "", level);
                for resource in &action.resources {
                    op.add_resource_type(&resource.name);
                }
                op.set_condition_keys(action.action_condition_keys);
                op
            })
            .collect();

        let resource_types = self
            .resources
            .into_iter()
            .map(|r| ResourceTypeRecord {
                name: r.name,
                arn_formats: r.arn_formats,
            })
            .collect();

        let condition_keys = self
            .condition_keys
            .into_iter()
            .map(|ck| ConditionKeyRecord::new(ck.name, ck.types))
            .collect();

        ServiceRecord {
            service_id: service_id.to_string(),
            display_name: self.name.unwrap_or_else(|| service_id.to_string()),
            operations,
            resource_types,
            condition_keys,
        }
    }
}
