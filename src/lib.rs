// src/lib.rs
// Public library surface for the service binary, the CLI and integration tests.

pub mod api;
pub mod categorize;
pub mod config;
pub mod controller;
pub mod geo;
pub mod ingest;
pub mod intent;
pub mod locate;
pub mod metrics;
pub mod resource;
pub mod search;
pub mod sessions;
pub mod telemetry;

// ---- Re-exports for stable public API ----
// `crate_root::api::create_router` and `crate_root::router` both work.
pub use crate::api::create_router as router;
pub use crate::api::AppState;
pub use crate::controller::{DiscoveryController, MapView};
pub use crate::geo::GeoPoint;
pub use crate::resource::{Category, Resource};
