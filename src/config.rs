//! Configuration Management
//!
//! Run settings for iamref. Values come from built-in defaults, an optional
//! YAML or JSON file, and finally command-line overrides applied by `main`.

use crate::docs::ResolverConfig;
use crate::error::PipelineError;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Default service reference directory endpoint
pub const DEFAULT_DIRECTORY_URL: &str = "https://servicereference.us-east-1.amazonaws.com";

/// Config file names looked up in the user config directory, in order
const CONFIG_FILE_NAMES: &[&str] = &["config.yaml", "config.yml", "config.json"];

/// Where service records come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Structured JSON from the service reference directory only
    Directory,
    /// Documentation pages only
    #[default]
    Documentation,
    /// Structured JSON enriched with descriptions and dependencies from documentation
    Combined,
}

/// Run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service reference directory endpoint
    pub directory_url: String,
    pub source: SourceMode,
    /// Number of services processed concurrently
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    /// Delay before each documentation-host request
    pub pacing_delay_ms: u64,
    pub output_path: PathBuf,
    pub docs: ResolverConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            source: SourceMode::default(),
            concurrency: 10,
            request_timeout_secs: 30,
            probe_timeout_secs: 10,
            pacing_delay_ms: 200,
            output_path: PathBuf::from("data").join("aws-iam-consolidated.json"),
            docs: ResolverConfig::default(),
        }
    }
}

impl Config {
    /// Directory holding user configuration
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("iamref"))
    }

    /// First existing config file in the user config directory
    pub fn default_path() -> Option<PathBuf> {
        let dir = Self::config_dir()?;
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Load configuration.
    ///
    /// An explicit path must exist and parse. Without one, the user config
    /// directory is searched and built-in defaults are used if nothing is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Read a config file, choosing the format from its extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config = if is_json {
            serde_json::from_str(&content).context("Failed to parse JSON config")?
        } else {
            serde_yaml::from_str(&content).context("Failed to parse YAML config")?
        };

        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.concurrency == 0 {
            return Err(PipelineError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }

        for (field, value) in [
            ("directory_url", &self.directory_url),
            ("docs.base_url", &self.docs.base_url),
        ] {
            Url::parse(value).map_err(|e| {
                PipelineError::InvalidConfig(format!("{field} '{value}' is not a valid URL: {e}"))
            })?;
        }

        if self.source != SourceMode::Directory && self.docs.templates.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "at least one documentation page template is required".to_string(),
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.source, SourceMode::Documentation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str(
            "source: combined\nconcurrency: 4\ndocs:\n  overrides:\n    ec2: list_amazonec2.html\n",
        )
        .unwrap();

        assert_eq!(config.source, SourceMode::Combined);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.directory_url, DEFAULT_DIRECTORY_URL);
        assert_eq!(config.docs.templates.len(), 3);
        assert_eq!(config.docs.overrides.len(), 1);
    }

    #[test]
    fn test_from_file_reads_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"pacing_delay_ms": 0, "source": "directory"}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.pacing_delay(), Duration::ZERO);
        assert_eq!(config.source, SourceMode::Directory);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let result = Config::load(Some(Path::new("/nonexistent/iamref/config.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = Config {
            concurrency: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let mut config = Config::default();
        config.docs.base_url = "not a url".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("docs.base_url"));
    }

    #[test]
    fn test_validate_requires_templates_for_documentation() {
        let mut config = Config::default();
        config.docs.templates.clear();
        assert!(config.validate().is_err());

        config.source = SourceMode::Directory;
        assert!(config.validate().is_ok());
    }
}
