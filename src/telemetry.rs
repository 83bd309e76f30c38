// src/telemetry.rs
//! Tracing setup and the dev-only, anonymized query log.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_DEV_LOG: &str = "FEEDLA_DEV_LOG";

// Dev logging gate: FEEDLA_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_DEV_LOG).ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short, stable id for a piece of user text (first 6 bytes of SHA-256, hex).
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Dev logger for query transitions. Never logs raw text.
pub fn dev_log_query(mode: &str, text: &str, results: usize) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    info!(target: "discovery", %id, mode, results, "query applied");
}

/// Install a compact fmt subscriber. `default_filter` applies when RUST_LOG is
/// unset. Safe to call more than once (later calls are no-ops).
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
