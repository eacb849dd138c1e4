use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, COOKIE};
use reqwest::{Client, Response};
use std::time::Duration;
use tokio::time::sleep;

use super::{PanoptoApi, SessionPage};
use crate::config::Config;
use crate::{ArchiverError, Result};

/// How failed requests are retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Exponential backoff, capped at 30 seconds
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.base_delay.saturating_mul(factor), Duration::from_secs(30))
    }
}

/// reqwest-backed client for the Panopto REST API
pub struct PanoptoClient {
    client: Client,
    api_root: String,
    page_size: usize,
    retry: RetryPolicy,
}

impl PanoptoClient {
    /// Create a client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let retry = RetryPolicy {
            max_retries: config.api.max_retries,
            base_delay: Duration::from_millis(config.api.retry_base_delay_ms),
        };

        Self::with_api_root(
            config.api_root(),
            config.api.page_size,
            config.request_timeout(),
            config.api.cookie.as_deref(),
            retry,
        )
    }

    /// Create a client against an explicit REST root (`.../Panopto/api/v1`)
    pub fn with_api_root(
        api_root: impl Into<String>,
        page_size: usize,
        timeout: Duration,
        cookie: Option<&str>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = cookie {
            let mut value = HeaderValue::from_str(cookie)
                .context("Cookie contains characters not allowed in a header")?;
            value.set_sensitive(true);
            headers.insert(COOKIE, value);
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_root: api_root.into().trim_end_matches('/').to_string(),
            page_size,
            retry,
        })
    }

    /// URL of one listing page
    pub fn sessions_page_url(&self, folder_id: &str, page: usize) -> String {
        format!(
            "{}/folders/{}/sessions?pageNumber={}&pageSize={}",
            self.api_root,
            urlencoding::encode(folder_id),
            page,
            self.page_size
        )
    }

    /// GET with bounded retry on transient failures
    async fn get(&self, url: &str, accept: &'static str) -> Result<Response> {
        let mut attempt = 0;

        loop {
            let error = match self
                .client
                .get(url)
                .header(ACCEPT, accept)
                .send()
                .await
            {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => anyhow::Error::new(ArchiverError::HttpStatus {
                    status: response.status(),
                    url: url.to_string(),
                }),
                Err(e) if e.is_timeout() => anyhow::Error::new(ArchiverError::Timeout(url.to_string())),
                Err(e) => anyhow::Error::new(e).context(format!("Request to {} failed", url)),
            };

            if attempt >= self.retry.max_retries || !is_retryable(&error) {
                return Err(error);
            }

            let delay = self.retry.delay_for(attempt);
            tracing::warn!(
                "Request to {} failed ({}), retrying in {}ms",
                url,
                error,
                delay.as_millis()
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

fn is_retryable(error: &anyhow::Error) -> bool {
    if let Some(e) = error.downcast_ref::<ArchiverError>() {
        return e.is_transient();
    }
    if let Some(e) = error.downcast_ref::<reqwest::Error>() {
        return e.is_connect() || e.is_request();
    }
    false
}

#[async_trait]
impl PanoptoApi for PanoptoClient {
    async fn list_sessions_page(&self, folder_id: &str, page: usize) -> Result<SessionPage> {
        let url = self.sessions_page_url(folder_id, page);
        tracing::debug!("Fetching sessions page {}: {}", page, url);

        let response = self
            .get(&url, "application/json")
            .await
            .with_context(|| format!("Sessions API error on page {}", page))?;

        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse sessions page {}", page))?;

        Ok(SessionPage::from_json(body))
    }

    async fn fetch_caption(&self, url: &str) -> Result<String> {
        let response = self
            .get(url, "text/plain, */*")
            .await
            .context("Caption download error")?;

        let content = response
            .text()
            .await
            .context("Failed to read caption content")?;

        Ok(content)
    }
}
