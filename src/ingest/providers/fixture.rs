// src/ingest/providers/fixture.rs
use anyhow::Result;
use async_trait::async_trait;

use crate::ingest::types::{FeedPayload, FeedProvider};

/// Feed provider that parses an in-memory JSON document (tests, local files).
pub struct FixtureFeedProvider {
    pub json_content: String,
}

impl FixtureFeedProvider {
    pub fn from_fixture(content: &str) -> Self {
        Self {
            json_content: content.to_string(),
        }
    }

    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        use anyhow::Context;
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading resource feed from {}", path.display()))?;
        Ok(Self {
            json_content: content,
        })
    }
}

#[async_trait]
impl FeedProvider for FixtureFeedProvider {
    async fn fetch(&self) -> Result<FeedPayload> {
        FeedPayload::from_json_str(&self.json_content)
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
