//! Global Names Recognition and Discovery (GNRD) name-finder client.
//!
//! The finder takes a text file upload and answers with a redirect to the
//! result document; the scientific names are read from `names[].scientificName`.
//!
//! ## Retry Strategy
//!
//! The public service is slow and flaky under load. Failed attempts are
//! retried with exponential backoff (`retry_backoff_ms * 2^(attempt-1)`);
//! after `max_retries` the item is indexed without names.

use super::EntityExtractor;
use crate::config::PipelineConfig;
use crate::error::{ArchiveError, ItemError};
use async_trait::async_trait;
use reqwest::header::LOCATION;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const SERVICE: &str = "gnrd";

#[derive(Debug, Clone)]
pub struct GnrdClient {
    client: reqwest::Client,
    url: String,
    max_retries: u32,
    retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
struct FinderResult {
    #[serde(default)]
    names: Vec<FoundName>,
}

#[derive(Debug, Deserialize)]
struct FoundName {
    #[serde(rename = "scientificName")]
    scientific_name: Option<String>,
}

impl GnrdClient {
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ArchiveError> {
        // Redirects are followed by hand: the upload is answered with a
        // Location header pointing at the result document.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ArchiveError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: config.entity_finder_url.clone(),
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    async fn find_once(&self, text: &str) -> Result<Vec<String>, String> {
        let part = Part::bytes(format!("{text}\n").into_bytes())
            .file_name("object_tmp.txt")
            .mime_str("text/plain")
            .map_err(|e| e.to_string())?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let response = if response.status().is_redirection() {
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| "redirect without Location header".to_string())?;
            let target = response.url().join(location).map_err(|e| e.to_string())?;
            debug!(%target, "following name-finder result");
            self.client
                .get(target)
                .send()
                .await
                .map_err(|e| e.to_string())?
        } else {
            response
        };

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {status}"));
        }
        let result: FinderResult = response.json().await.map_err(|e| e.to_string())?;
        Ok(collect_names(result))
    }
}

/// Delay before retry number `attempt` (1-based), saturating at `u64::MAX`.
fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 2u64
        .checked_pow(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor)
}

fn collect_names(result: FinderResult) -> Vec<String> {
    result
        .names
        .into_iter()
        .filter_map(|n| n.scientific_name)
        .filter(|n| !n.trim().is_empty())
        .collect()
}

#[async_trait]
impl EntityExtractor for GnrdClient {
    async fn find_names(&self, text: &str) -> Result<Vec<String>, ItemError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                debug!(attempt, max = self.max_retries, backoff_ms = backoff, "retrying name finder");
                sleep(Duration::from_millis(backoff)).await;
            }
            match self.find_once(text).await {
                Ok(names) => {
                    debug!(count = names.len(), "names found");
                    return Ok(names);
                }
                Err(e) => {
                    warn!(attempt = attempt + 1, error = %e, "name finder attempt failed");
                    last_error = e;
                }
            }
        }
        Err(ItemError::ExternalService {
            service: SERVICE.into(),
            detail: last_error,
        })
    }
}
