// src/ingest/mod.rs
//! Resource Normalizer: turns raw feed records into `Resource`s.
//!
//! Records whose latitude or longitude is not a finite JSON number are dropped
//! silently (counted in metrics, never surfaced). Everything else passes
//! through field-for-field; each survivor gets a derived category.

pub mod providers;
pub mod types;

use crate::categorize::categorize_name;
use crate::ingest::types::{FeedPayload, FeedProvider};
use crate::resource::Resource;
use metrics::{counter, describe_counter, describe_histogram};
use once_cell::sync::OnceCell;
use serde_json::{Map, Value};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_records_total", "Raw records received from the feed.");
        describe_counter!(
            "feed_kept_total",
            "Records kept after coordinate validation."
        );
        describe_counter!(
            "feed_dropped_total",
            "Records dropped for missing or non-finite coordinates."
        );
        describe_counter!("feed_errors_total", "Feed fetch/parse errors.");
        describe_histogram!("feed_fetch_ms", "Feed fetch time in milliseconds.");
    });
}

fn coord(obj: &Map<String, Value>, keys: [&str; 2]) -> Option<f64> {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Normalize a single raw record. `None` means "drop".
pub fn normalize_record(raw: &Value) -> Option<Resource> {
    let obj = raw.as_object()?;
    let latitude = coord(obj, ["lat", "latitude"])?;
    let longitude = coord(obj, ["lng", "longitude"])?;
    let name = opt_str(obj, "name").unwrap_or_default();

    Some(Resource {
        category: categorize_name(&name),
        name,
        address: opt_str(obj, "address").unwrap_or_default(),
        latitude,
        longitude,
        phone: opt_str(obj, "phone"),
        website: opt_str(obj, "website"),
        hours: opt_str(obj, "hours"),
        notes: opt_str(obj, "notes"),
        zone: opt_str(obj, "zone"),
        kind: opt_str(obj, "type"),
        google_maps_url: opt_str(obj, "google_maps_url"),
    })
}

/// Concatenate static-then-dynamic and normalize.
/// Returns (kept, dropped_count).
pub fn normalize_feed(payload: FeedPayload) -> (Vec<Resource>, usize) {
    let mut dropped = 0usize;
    let mut kept = Vec::with_capacity(payload.len());
    for raw in payload.into_records() {
        match normalize_record(&raw) {
            Some(r) => kept.push(r),
            None => dropped += 1,
        }
    }
    (kept, dropped)
}

/// Fetch once from `provider` and normalize.
/// Transport/parse failures are returned; malformed records are not.
pub async fn load_resources(provider: &dyn FeedProvider) -> anyhow::Result<Vec<Resource>> {
    ensure_metrics_described();

    let t0 = std::time::Instant::now();
    let payload = match provider.fetch().await {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, provider = provider.name(), "feed error");
            counter!("feed_errors_total").increment(1);
            return Err(e);
        }
    };
    metrics::histogram!("feed_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    let total = payload.len();
    let (kept, dropped) = normalize_feed(payload);

    // Telemetry
    counter!("feed_records_total").increment(total as u64);
    counter!("feed_kept_total").increment(kept.len() as u64);
    counter!("feed_dropped_total").increment(dropped as u64);

    tracing::info!(
        target: "ingest",
        provider = provider.name(),
        total,
        kept = kept.len(),
        dropped,
        "feed normalized"
    );

    Ok(kept)
}
