//! # Text Search Index
//! Fuzzy, multi-field matching over the normalized resource set.
//!
//! Indexed fields: `name`, `notes`, `category`, `address`, `zone`.
//! Scores live on a 0.0 (exact) .. 1.0 (anything) scale; a resource matches
//! when its best field score is at or below the threshold.
//!
//! Per field:
//! - substring hit → 0.0;
//! - otherwise the best of
//!   (a) `1 - normalized_levenshtein` between the query and each window of
//!       consecutive field words with the query's word count, and
//!   (b) the mean per-word distance, if every query word is within the
//!       threshold of some field word.
//!
//! Similarity: `strsim::normalized_levenshtein`.

use metrics::histogram;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::sync::Arc;
use strsim::normalized_levenshtein;

use crate::resource::Resource;

pub const DEFAULT_SEARCH_THRESHOLD: f64 = 0.4;

/// One match with its relevance score (lower is better).
#[derive(Debug, Clone, Copy)]
pub struct SearchHit<'a> {
    pub resource: &'a Resource,
    pub score: f64,
}

#[derive(Debug)]
struct IndexedField {
    text: String,
    words: Vec<String>,
}

#[derive(Debug)]
struct IndexedDoc {
    fields: Vec<IndexedField>,
}

/// Immutable index over one resource set. Rebuild it when the set changes.
#[derive(Debug)]
pub struct SearchIndex {
    resources: Arc<[Resource]>,
    docs: Vec<IndexedDoc>,
    threshold: f64,
}

/// Lower-case, collapse whitespace, trim.
pub fn normalize_query(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(s.trim(), " ").to_lowercase()
}

fn split_words(s: &str) -> Vec<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn index_field(raw: Option<&str>) -> Option<IndexedField> {
    let text = normalize_query(raw?);
    if text.is_empty() {
        return None;
    }
    let words = split_words(&text);
    Some(IndexedField { text, words })
}

impl SearchIndex {
    pub fn build(resources: Arc<[Resource]>, threshold: f64) -> Self {
        let docs = resources
            .iter()
            .map(|r| IndexedDoc {
                fields: [
                    Some(r.name.as_str()),
                    r.notes.as_deref(),
                    Some(r.category.as_str()),
                    Some(r.address.as_str()),
                    r.zone.as_deref(),
                ]
                .into_iter()
                .filter_map(index_field)
                .collect(),
            })
            .collect();

        Self {
            resources,
            docs,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Matching resources, most relevant first.
    pub fn search(&self, query: &str) -> Vec<&Resource> {
        self.search_scored(query)
            .into_iter()
            .map(|h| h.resource)
            .collect()
    }

    /// Matching resources with scores, best first; ties keep catalogue order.
    pub fn search_scored(&self, query: &str) -> Vec<SearchHit<'_>> {
        let t0 = std::time::Instant::now();

        let q = normalize_query(query);
        if q.is_empty() {
            return Vec::new();
        }
        let q_words = split_words(&q);

        let mut hits = self
            .docs
            .iter()
            .zip(self.resources.iter())
            .filter_map(|(doc, resource)| {
                let best = doc
                    .fields
                    .iter()
                    .filter_map(|f| self.field_score(&q, &q_words, f))
                    .min_by(f64::total_cmp)?;
                (best <= self.threshold).then_some(SearchHit {
                    resource,
                    score: best,
                })
            })
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| a.score.total_cmp(&b.score));

        histogram!("search_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        hits
    }

    fn field_score(&self, q: &str, q_words: &[String], field: &IndexedField) -> Option<f64> {
        if field.text.contains(q) {
            return Some(0.0);
        }
        if field.words.is_empty() || q_words.is_empty() {
            return None;
        }

        let width = q_words.len().min(field.words.len());
        let window_best = field
            .words
            .windows(width)
            .map(|w| 1.0 - normalized_levenshtein(q, &w.join(" ")))
            .min_by(f64::total_cmp);

        let token_best = if q_words.len() > 1 {
            self.token_score(q_words, &field.words)
        } else {
            None
        };

        [window_best, token_best]
            .into_iter()
            .flatten()
            .min_by(f64::total_cmp)
    }

    /// Mean per-word distance, only when every query word has a close field word.
    fn token_score(&self, q_words: &[String], words: &[String]) -> Option<f64> {
        let mut acc = 0.0;
        for qw in q_words {
            let best = words
                .iter()
                .map(|w| {
                    if w.contains(qw.as_str()) {
                        0.0
                    } else {
                        1.0 - normalized_levenshtein(qw, w)
                    }
                })
                .min_by(f64::total_cmp)?;
            if best > self.threshold {
                return None;
            }
            acc += best;
        }
        Some(acc / q_words.len() as f64)
    }
}
