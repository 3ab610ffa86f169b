// src/backend.rs
//
// HTTP client for the aggregation backend. Everything the harvester asks of
// the backend goes through `BackendApi`, so integration tests can stand in a
// stub that never touches the network.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::scrape::types::NormalizedArticle;

#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Ask whether an equivalent article (same title + source) already exists.
    async fn check_duplicate(&self, title: &str, source: &str, link: Option<&str>)
        -> Result<bool>;

    /// Submit one normalized article to the aggregation endpoint.
    async fn submit_article(&self, article: &NormalizedArticle) -> Result<AggregateResponse>;

    /// Report the scheduler's running flag. Callers treat failures as
    /// log-only.
    async fn update_status(&self, is_running: bool, last_error: Option<&str>) -> Result<()>;
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AggregateResponse {
    pub id: Option<String>,
    pub message: Option<String>,
    pub added_count: Option<u64>,
    pub total_articles: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckDuplicateResponse {
    is_duplicate: bool,
}

#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn check_duplicate(
        &self,
        title: &str,
        source: &str,
        link: Option<&str>,
    ) -> Result<bool> {
        let resp = self
            .client
            .post(self.url("/api/articles/check-duplicate"))
            .timeout(self.timeout)
            .json(&json!({ "title": title, "link": link, "source": source }))
            .send()
            .await
            .context("duplicate check request")?
            .error_for_status()
            .context("duplicate check status")?;
        let body: CheckDuplicateResponse =
            resp.json().await.context("duplicate check body")?;
        Ok(body.is_duplicate)
    }

    async fn submit_article(&self, article: &NormalizedArticle) -> Result<AggregateResponse> {
        let resp = self
            .client
            .post(self.url("/api/articles/aggregate"))
            .timeout(self.timeout)
            .json(article)
            .send()
            .await
            .context("aggregate request")?
            .error_for_status()
            .context("aggregate status")?;
        resp.json().await.context("aggregate body")
    }

    async fn update_status(&self, is_running: bool, last_error: Option<&str>) -> Result<()> {
        self.client
            .post(self.url("/api/scraper/status"))
            .timeout(self.timeout)
            .json(&json!({ "isRunning": is_running, "lastError": last_error }))
            .send()
            .await
            .context("status update request")?
            .error_for_status()
            .context("status update status")?;
        Ok(())
    }
}
