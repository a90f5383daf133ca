//! Documentation Page Resolver
//!
//! Finds the documentation page for a service identifier. There is no
//! authoritative mapping from service id to page name, so the resolver
//! probes a small ordered list of candidates: a per-service override first,
//! then the generic name templates.

use crate::aws::http::HttpClient;
use crate::error::ServiceFailure;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default documentation host
pub const DEFAULT_DOCS_BASE_URL: &str =
    "https://docs.aws.amazon.com/service-authorization/latest/reference";

/// Placeholder substituted with the normalized service id in templates
pub const SERVICE_PLACEHOLDER: &str = "{service}";

/// Resolver settings: host, page-name templates and per-service overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub base_url: String,
    /// Page-name templates, tried in order
    pub templates: Vec<String>,
    /// Normalized service id -> page name
    pub overrides: BTreeMap<String, String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let overrides = [
            ("iam", "list_awsidentityandaccessmanagementiam.html"),
            (
                "identityandaccessmanagement",
                "list_awsidentityandaccessmanagementiam.html",
            ),
            ("glue", "list_awsglue.html"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            base_url: DEFAULT_DOCS_BASE_URL.to_string(),
            templates: vec![
                "list_amazon{service}.html".to_string(),
                "list_aws{service}.html".to_string(),
                "list_{service}.html".to_string(),
            ],
            overrides,
        }
    }
}

/// Canonical form used for page names and override lookup
pub fn normalize_service_id(service_id: &str) -> String {
    service_id
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_lowercase()
}

/// Resolves service ids to existing documentation page URLs
#[derive(Clone)]
pub struct PageResolver {
    base: Url,
    templates: Arc<Vec<String>>,
    overrides: Arc<HashMap<String, String>>,
    http: HttpClient,
    pacing: Duration,
}

impl PageResolver {
    /// Build a resolver. Fails if the base URL does not parse.
    pub fn new(
        config: &ResolverConfig,
        http: HttpClient,
        pacing: Duration,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))?;
        let overrides = config
            .overrides
            .iter()
            .map(|(id, page)| (normalize_service_id(id), page.clone()))
            .collect();

        Ok(Self {
            base,
            templates: Arc::new(config.templates.clone()),
            overrides: Arc::new(overrides),
            http,
            pacing,
        })
    }

    /// Candidate URLs in probe order: override first, then each template.
    pub fn candidate_urls(&self, service_id: &str) -> Vec<String> {
        let normalized = normalize_service_id(service_id);

        let pages = self
            .overrides
            .get(&normalized)
            .cloned()
            .into_iter()
            .chain(
                self.templates
                    .iter()
                    .map(|t| t.replace(SERVICE_PLACEHOLDER, &normalized)),
            );

        let mut urls: Vec<String> = Vec::new();
        for page in pages {
            match self.base.join(&page) {
                Ok(url) => {
                    let url = url.to_string();
                    if !urls.contains(&url) {
                        urls.push(url);
                    }
                }
                Err(e) => tracing::warn!("Skipping invalid page name '{}': {}", page, e),
            }
        }
        urls
    }

    /// Probe candidates in order and return the first one that exists
    pub async fn resolve(&self, service_id: &str) -> Result<String, ServiceFailure> {
        for url in self.candidate_urls(service_id) {
            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match self.http.probe(&url).await {
                Ok(status) if status.is_success() => {
                    tracing::debug!("Resolved {} -> {}", service_id, url);
                    return Ok(url);
                }
                Ok(status) => tracing::trace!("Probe {} returned {}", url, status),
                Err(e) => tracing::debug!("Probe {} failed: {:#}", url, e),
            }
        }

        Err(ServiceFailure::PageResolution {
            service_id: service_id.to_string(),
        })
    }
}
