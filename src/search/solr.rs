//! Solr JSON update API client.

use super::{SearchClient, SearchDocument};
use crate::config::PipelineConfig;
use crate::error::ArchiveError;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Talks to one Solr core: `GET /admin/ping`, `POST /update`,
/// `POST /update?commit=true`.
#[derive(Debug, Clone)]
pub struct SolrClient {
    client: reqwest::Client,
    base_url: String,
}

impl SolrClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArchiveError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, ArchiveError> {
        Self::new(
            &config.search_url,
            Duration::from_secs(config.http_timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn update_url(&self) -> String {
        format!("{}/update", self.base_url)
    }
}

/// Turn a non-2xx response into its status line plus a body excerpt.
async fn check(response: reqwest::Response) -> Result<(), String> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(300).collect();
    Err(format!("HTTP {status}: {excerpt}"))
}

#[async_trait]
impl SearchClient for SolrClient {
    async fn ping(&self) -> Result<(), ArchiveError> {
        let url = format!("{}/admin/ping", self.base_url);
        let unavailable = |reason: String| ArchiveError::SearchUnavailable {
            url: self.base_url.clone(),
            reason,
        };
        let response = self
            .client
            .get(&url)
            .query(&[("wt", "json")])
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        check(response).await.map_err(unavailable)?;
        info!(url = %self.base_url, "search endpoint reachable");
        Ok(())
    }

    async fn add(&self, document: &SearchDocument) -> Result<(), ArchiveError> {
        let failed = |reason: String| ArchiveError::SearchSubmitFailed {
            id: document.id.clone(),
            reason,
        };
        let response = self
            .client
            .post(self.update_url())
            .query(&[("wt", "json")])
            .json(&[document])
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        check(response).await.map_err(failed)?;
        debug!(id = %document.id, "document submitted");
        Ok(())
    }

    async fn commit(&self) -> Result<(), ArchiveError> {
        let failed = |reason: String| ArchiveError::SearchCommitFailed { reason };
        let response = self
            .client
            .post(self.update_url())
            .query(&[("commit", "true"), ("wt", "json")])
            .json(&serde_json::json!([]))
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;
        check(response).await.map_err(failed)?;
        info!(url = %self.base_url, "search index committed");
        Ok(())
    }
}
