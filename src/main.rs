//! Resource Discovery Service: binary entrypoint.
//! Boots the Axum HTTP server, loads the resource feed in the background,
//! and wires sessions, metrics and CORS.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use feedla_discovery::api::{self, AppState};
use feedla_discovery::config::DiscoveryConfig;
use feedla_discovery::ingest::providers::HttpFeedProvider;
use feedla_discovery::locate::NominatimGeocoder;
use feedla_discovery::metrics::Metrics;
use feedla_discovery::telemetry;
use shuttle_axum::ShuttleAxum;

const SWEEP_EVERY: Duration = Duration::from_secs(60);

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing("discovery=info,ingest=info,sessions=info,warn");

    let cfg = DiscoveryConfig::load_default().context("loading discovery config")?;
    let metrics = Metrics::init()?;

    let mut state = AppState::new(&cfg);
    if let Some(url) = cfg.geocoder_url.as_deref() {
        state = state.with_geocoder(Arc::new(NominatimGeocoder::new(url)?));
    }

    // Feed loads once; sessions created meanwhile report `loading`.
    let feed = HttpFeedProvider::new(&cfg.feed_base_url, cfg.feed_timeout())?;
    tracing::info!(target: "discovery", url = feed.url(), "loading resource feed");
    api::spawn_catalog_loader(state.clone(), Box::new(feed));
    api::spawn_session_sweeper(state.clone(), SWEEP_EVERY);

    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
