// src/ingest/types.rs
use anyhow::{Context, Result};
use serde_json::Value;

/// Raw feed document: two provenance groups of records with unspecified shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedPayload {
    pub static_records: Vec<Value>, // curated catalogue
    pub dynamic_records: Vec<Value>, // business submissions
}

impl FeedPayload {
    /// Accepts `{ "static": [...], "dynamic": [...] }`. A missing or non-array
    /// group is treated as empty; a top-level array is read as `static`.
    pub fn from_value(v: Value) -> Self {
        fn group(v: &mut Value, key: &str) -> Vec<Value> {
            match v.get_mut(key).map(Value::take) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }

        match v {
            Value::Array(items) => Self {
                static_records: items,
                dynamic_records: Vec::new(),
            },
            mut obj => Self {
                static_records: group(&mut obj, "static"),
                dynamic_records: group(&mut obj, "dynamic"),
            },
        }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let v: Value = serde_json::from_str(s).context("parsing resource feed json")?;
        Ok(Self::from_value(v))
    }

    /// Static records first, then dynamic ones.
    pub fn into_records(self) -> impl Iterator<Item = Value> {
        self.static_records
            .into_iter()
            .chain(self.dynamic_records)
    }

    pub fn len(&self) -> usize {
        self.static_records.len() + self.dynamic_records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
pub trait FeedProvider: Send + Sync {
    async fn fetch(&self) -> Result<FeedPayload>;
    fn name(&self) -> &'static str;
}
