//! Data sources
//!
//! One pipeline, three ways of producing a [`ServiceRecord`] for a directory
//! entry. The variant is chosen from [`SourceMode`] in the configuration.

use crate::aws::directory::StructuredService;
use crate::aws::http::HttpClient;
use crate::config::{Config, SourceMode};
use crate::docs::{parse_page, PageResolver, ParsedPage};
use crate::error::{self, ServiceFailure};
use crate::model::{ServiceDirectoryEntry, ServiceRecord};
use std::time::Duration;

/// Structured JSON from the service reference directory
#[derive(Clone)]
pub struct DirectorySource {
    http: HttpClient,
}

impl DirectorySource {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn fetch(
        &self,
        entry: &ServiceDirectoryEntry,
    ) -> Result<ServiceRecord, ServiceFailure> {
        let structured: StructuredService = self
            .http
            .get_json(&entry.structured_data_url)
            .await
            .map_err(|e| ServiceFailure::StructuredFetch {
                url: entry.structured_data_url.clone(),
                reason: error::reason(&e),
            })?;

        Ok(structured.into_record(&entry.service_id))
    }
}

/// Documentation pages: resolve, fetch, parse
#[derive(Clone)]
pub struct DocumentationSource {
    resolver: PageResolver,
    http: HttpClient,
    pacing: Duration,
}

impl DocumentationSource {
    pub fn new(resolver: PageResolver, http: HttpClient, pacing: Duration) -> Self {
        Self {
            resolver,
            http,
            pacing,
        }
    }

    /// Resolve and parse the documentation page of a service
    pub async fn fetch_page(&self, service_id: &str) -> Result<ParsedPage, ServiceFailure> {
        let url = self.resolver.resolve(service_id).await?;

        if !self.pacing.is_zero() {
            tokio::time::sleep(self.pacing).await;
        }

        let body = self
            .http
            .get_text(&url)
            .await
            .map_err(|e| ServiceFailure::PageFetch {
                url: url.clone(),
                reason: error::reason(&e),
            })?;

        let page = parse_page(&body);
        for anomaly in &page.anomalies {
            tracing::warn!("{}: skipped malformed row ({})", service_id, anomaly);
        }
        Ok(page)
    }

    pub async fn fetch(
        &self,
        entry: &ServiceDirectoryEntry,
    ) -> Result<ServiceRecord, ServiceFailure> {
        let page = self.fetch_page(&entry.service_id).await?;
        Ok(page.into_record(&entry.service_id))
    }
}

/// Strategy used by the orchestrator for every service
#[derive(Clone)]
pub enum ServiceSource {
    Directory(DirectorySource),
    Documentation(DocumentationSource),
    Combined {
        directory: DirectorySource,
        documentation: DocumentationSource,
    },
}

impl ServiceSource {
    /// Build the source selected by `config.source`
    pub fn from_config(config: &Config, http: HttpClient) -> anyhow::Result<Self> {
        let documentation = || -> anyhow::Result<DocumentationSource> {
            let resolver = PageResolver::new(&config.docs, http.clone(), config.pacing_delay())?;
            Ok(DocumentationSource::new(resolver, http.clone(), config.pacing_delay()))
        };

        Ok(match config.source {
            SourceMode::Directory => Self::Directory(DirectorySource::new(http.clone())),
            SourceMode::Documentation => Self::Documentation(documentation()?),
            SourceMode::Combined => Self::Combined {
                directory: DirectorySource::new(http.clone()),
                documentation: documentation()?,
            },
        })
    }

    pub fn mode(&self) -> SourceMode {
        match self {
            Self::Directory(_) => SourceMode::Directory,
            Self::Documentation(_) => SourceMode::Documentation,
            Self::Combined { .. } => SourceMode::Combined,
        }
    }

    /// Produce the record for one service
    pub async fn fetch(
        &self,
        entry: &ServiceDirectoryEntry,
    ) -> Result<ServiceRecord, ServiceFailure> {
        match self {
            Self::Directory(directory) => directory.fetch(entry).await,
            Self::Documentation(documentation) => documentation.fetch(entry).await,
            Self::Combined {
                directory,
                documentation,
            } => {
                let mut record = directory.fetch(entry).await?;
                match documentation.fetch_page(&entry.service_id).await {
                    Ok(page) => {
                        let matched = merge_documentation(&mut record, page);
                        tracing::debug!(
                            "{}: documentation matched {} of {} operations",
                            entry.service_id,
                            matched,
                            record.operations.len()
                        );
                    }
                    Err(e) => {
                        tracing::warn!("{}: keeping structured data only: {}", entry.service_id, e)
                    }
                }
                Ok(record)
            }
        }
    }
}

/// Fill descriptions, dependent actions and the display name of a
/// structured record from its documentation page.
///
/// Operations are matched by name; the documentation may suffix names with
/// a note such as `[permission only]`, so only the leading word is compared.
/// Returns the number of matched operations.
pub fn merge_documentation(record: &mut ServiceRecord, page: ParsedPage) -> usize {
    if let Some(name) = page.display_name {
        record.display_name = name;
    }

    let mut matched = 0;
    for doc_op in page.operations {
        let Some(name) = doc_op.name.split_whitespace().next() else {
            continue;
        };
        if let Some(op) = record.operation_mut(name) {
            if op.description.is_empty() {
                op.description = doc_op.description;
            }
            if op.dependent_actions.is_empty() {
                op.dependent_actions = doc_op.dependent_actions;
            }
            matched += 1;
        }
    }
    matched
}
