// src/ingest/providers/http_feed.rs
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::ingest::types::{FeedPayload, FeedProvider};

/// Reads `{base_url}/api/resources` once per call. No retry.
pub struct HttpFeedProvider {
    http: reqwest::Client,
    url: String,
}

impl HttpFeedProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("feedla-discovery/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            http,
            url: resources_url(base_url),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn resources_url(base_url: &str) -> String {
    format!("{}/api/resources", base_url.trim_end_matches('/'))
}

#[async_trait]
impl FeedProvider for HttpFeedProvider {
    async fn fetch(&self) -> Result<FeedPayload> {
        let resp = self
            .http
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("requesting {}", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("resource feed returned {status}"));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .context("decoding resource feed body")?;
        Ok(FeedPayload::from_value(body))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
