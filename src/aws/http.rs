//! HTTP utilities for the service reference and documentation hosts

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body for logging and drop control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.chars().count() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control() && c != ' ', "")
}

/// Thin wrapper over `reqwest` exposing the three calls the pipeline needs
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    probe_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `request_timeout` bounds GET requests, `probe_timeout` bounds HEAD probes.
    pub fn new(request_timeout: Duration, probe_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("iamref/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            probe_timeout,
        })
    }

    /// GET a URL and return the body, failing on non-2xx statuses
    pub async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {url}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            tracing::debug!("HTTP error: {} - {}", status, sanitize_for_log(&body));
            return Err(anyhow::anyhow!("request failed with status {}", status));
        }

        Ok(body)
    }

    /// GET a URL and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let body = self.get_text(url).await?;
        serde_json::from_str(&body).context("Failed to parse response JSON")
    }

    /// HEAD a URL and return its final status after redirects.
    ///
    /// No body is transferred.
    pub async fn probe(&self, url: &str) -> Result<StatusCode> {
        tracing::debug!("HEAD {}", url);

        let response = self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .with_context(|| format!("Failed to probe {url}"))?;

        Ok(response.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("500 bytes total"));
    }

    #[test]
    fn test_sanitize_handles_multibyte_boundaries() {
        let body = "é".repeat(300);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.contains("[truncated"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
        assert_eq!(sanitize_for_log("short body"), "short body");
    }
}
