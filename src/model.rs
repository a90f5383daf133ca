//! Dataset model
//!
//! Records produced by the pipeline and serialized into the consolidated
//! output document. Field names serialize in camelCase and list fields are
//! always emitted, empty or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Timestamp format used for `lastUpdated`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One entry of the service reference directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDirectoryEntry {
    #[serde(alias = "service")]
    pub service_id: String,
    #[serde(alias = "url")]
    pub structured_data_url: String,
}

/// Access level of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AccessLevel {
    #[default]
    Read,
    Write,
    List,
    #[serde(rename = "Permissions management")]
    PermissionsManagement,
    Tagging,
}

impl AccessLevel {
    /// Map the documentation's access-level cell text to a level.
    ///
    /// Rules are substring matches on the lower-cased text, checked in
    /// priority order: list, write, permission/management, tagging, then
    /// read as the fallback.
    pub fn from_doc_text(text: &str) -> Self {
        let text = text.to_lowercase();
        if text.contains("list") {
            Self::List
        } else if text.contains("write") {
            Self::Write
        } else if text.contains("permission") || text.contains("management") {
            Self::PermissionsManagement
        } else if text.contains("tagging") {
            Self::Tagging
        } else {
            Self::Read
        }
    }

    /// Map structured-JSON annotation flags to a level
    pub fn from_properties(
        is_list: bool,
        is_write: bool,
        is_permission_management: bool,
        is_tagging_only: bool,
    ) -> Self {
        if is_list {
            Self::List
        } else if is_write {
            Self::Write
        } else if is_permission_management {
            Self::PermissionsManagement
        } else if is_tagging_only {
            Self::Tagging
        } else {
            Self::Read
        }
    }
}

/// A permission-checkable action exposed by a service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    pub name: String,
    pub description: String,
    pub access_level: AccessLevel,
    pub resource_types: Vec<String>,
    pub condition_keys: Vec<String>,
    pub dependent_actions: Vec<String>,
    pub supports_resource_level_permissions: bool,
    pub has_request_tag_condition: bool,
    pub has_resource_tag_condition: bool,
    pub has_tag_keys_condition: bool,
}

impl OperationRecord {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        access_level: AccessLevel,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            access_level,
            ..Self::default()
        }
    }

    /// Append a resource type unless one with the same name is already present.
    /// Returns whether the list grew.
    pub fn add_resource_type(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.resource_types.iter().any(|r| r == name) {
            return false;
        }
        self.resource_types.push(name.to_string());
        self.refresh_flags();
        true
    }

    pub fn set_condition_keys(&mut self, keys: Vec<String>) {
        self.condition_keys = keys;
        self.refresh_flags();
    }

    /// Recompute the derived boolean flags from the collected lists
    pub fn refresh_flags(&mut self) {
        self.supports_resource_level_permissions = !self.resource_types.is_empty();
        self.has_request_tag_condition = self.has_condition_containing("RequestTag");
        self.has_resource_tag_condition = self.has_condition_containing("ResourceTag");
        self.has_tag_keys_condition = self.has_condition_containing("TagKeys");
    }

    fn has_condition_containing(&self, needle: &str) -> bool {
        self.condition_keys.iter().any(|key| key.contains(needle))
    }
}

/// A named class of addressable entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypeRecord {
    pub name: String,
    pub arn_formats: Vec<String>,
}

/// A policy condition key and its value types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionKeyRecord {
    pub name: String,
    pub value_types: Vec<String>,
}

impl ConditionKeyRecord {
    /// Build a record, defaulting the value types to `String` when none are known
    pub fn new(name: impl Into<String>, value_types: Vec<String>) -> Self {
        let value_types = if value_types.is_empty() {
            vec!["String".to_string()]
        } else {
            value_types
        };
        Self {
            name: name.into(),
            value_types,
        }
    }
}

/// Everything known about one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub service_id: String,
    pub display_name: String,
    pub operations: Vec<OperationRecord>,
    pub resource_types: Vec<ResourceTypeRecord>,
    pub condition_keys: Vec<ConditionKeyRecord>,
}

impl ServiceRecord {
    pub fn operation_mut(&mut self, name: &str) -> Option<&mut OperationRecord> {
        self.operations.iter_mut().find(|op| op.name == name)
    }

    pub fn dependency_edges(&self) -> usize {
        self.operations.iter().map(|op| op.dependent_actions.len()).sum()
    }
}

/// The final output document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedDataset {
    pub services: Vec<ServiceRecord>,
    pub total_services: usize,
    #[serde(rename = "failedServices")]
    pub failed_service_ids: Vec<String>,
    #[serde(rename = "lastUpdated", serialize_with = "serialize_timestamp")]
    pub generated_at: DateTime<Utc>,
}

fn serialize_timestamp<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&at.format(TIMESTAMP_FORMAT))
}

/// Aggregate counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetStats {
    pub total_operations: usize,
    pub operations_with_description: usize,
    pub operations_with_dependencies: usize,
    pub dependency_edges: usize,
    pub resource_types: usize,
    pub condition_keys: usize,
}

impl DatasetStats {
    pub fn from_services(services: &[ServiceRecord]) -> Self {
        let mut stats = Self::default();
        for service in services {
            stats.resource_types += service.resource_types.len();
            stats.condition_keys += service.condition_keys.len();
            for op in &service.operations {
                stats.total_operations += 1;
                if !op.description.is_empty() {
                    stats.operations_with_description += 1;
                }
                if !op.dependent_actions.is_empty() {
                    stats.operations_with_dependencies += 1;
                }
                stats.dependency_edges += op.dependent_actions.len();
            }
        }
        stats
    }
}
