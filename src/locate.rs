//! # Location services
//! Best-effort geolocation (bounded wait, silent fallback) and address
//! geocoding used to recentre the map on a typed place name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::geo::GeoPoint;

/// One-shot user location lookup. `Ok(None)` means the user denied access.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Option<GeoPoint>>;
}

/// Where the reference point came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocationOutcome {
    Located(GeoPoint),
    Fallback,
}

impl LocationOutcome {
    pub fn point(self) -> Option<GeoPoint> {
        match self {
            LocationOutcome::Located(p) => Some(p),
            LocationOutcome::Fallback => None,
        }
    }
}

/// Ask `provider` once, waiting at most `wait`. Denial, error, timeout or a
/// non-finite coordinate all resolve to `Fallback`.
pub async fn resolve_location(provider: &dyn GeolocationProvider, wait: Duration) -> LocationOutcome {
    match tokio::time::timeout(wait, provider.locate()).await {
        Ok(Ok(Some(p))) if p.is_finite() => LocationOutcome::Located(p),
        Ok(Ok(_)) => {
            debug!(target: "locate", "geolocation denied, using default center");
            LocationOutcome::Fallback
        }
        Ok(Err(e)) => {
            warn!(target: "locate", error = ?e, "geolocation failed, using default center");
            LocationOutcome::Fallback
        }
        Err(_) => {
            warn!(target: "locate", wait_ms = wait.as_millis() as u64, "geolocation timed out");
            LocationOutcome::Fallback
        }
    }
}

/// Fixed answer; used by the CLI (`--near lat,lng`) and tests.
pub struct StaticLocation(pub Option<GeoPoint>);

#[async_trait]
impl GeolocationProvider for StaticLocation {
    async fn locate(&self) -> Result<Option<GeoPoint>> {
        Ok(self.0)
    }
}

/// Free text → coordinate. `Ok(None)` when nothing was found.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, text: &str) -> Result<Option<GeoPoint>>;
}

/// Geocoder backed by a Nominatim-compatible `/search` endpoint, US only.
pub struct NominatimGeocoder {
    http: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("feedla_resource_finder")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()
            .context("building geocoder http client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
}

fn first_point(places: &[Place]) -> Option<GeoPoint> {
    let p = places.first()?;
    let point = GeoPoint::new(p.lat.trim().parse().ok()?, p.lon.trim().parse().ok()?);
    point.is_finite().then_some(point)
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, text: &str) -> Result<Option<GeoPoint>> {
        let url = format!("{}/search", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[
                ("q", text),
                ("format", "json"),
                ("countrycodes", "us"),
                ("limit", "1"),
            ])
            .send()
            .await
            .context("geocoder request")?
            .error_for_status()
            .context("geocoder status")?;
        let places: Vec<Place> = resp.json().await.context("decoding geocoder body")?;
        Ok(first_point(&places))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slow;

    #[async_trait]
    impl GeolocationProvider for Slow {
        async fn locate(&self) -> Result<Option<GeoPoint>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Some(GeoPoint::new(1.0, 1.0)))
        }
    }

    struct Broken;

    #[async_trait]
    impl GeolocationProvider for Broken {
        async fn locate(&self) -> Result<Option<GeoPoint>> {
            Err(anyhow::anyhow!("sensor offline"))
        }
    }

    #[tokio::test]
    async fn located_point_is_used() {
        let p = GeoPoint::new(34.1, -118.3);
        let out = resolve_location(&StaticLocation(Some(p)), Duration::from_millis(50)).await;
        assert_eq!(out, LocationOutcome::Located(p));
    }

    #[tokio::test]
    async fn denial_error_and_timeout_fall_back() {
        let wait = Duration::from_millis(20);
        assert_eq!(
            resolve_location(&StaticLocation(None), wait).await,
            LocationOutcome::Fallback
        );
        assert_eq!(resolve_location(&Broken, wait).await, LocationOutcome::Fallback);
        assert_eq!(resolve_location(&Slow, wait).await, LocationOutcome::Fallback);
        assert_eq!(
            resolve_location(&StaticLocation(Some(GeoPoint::new(f64::NAN, 0.0))), wait).await,
            LocationOutcome::Fallback
        );
    }

    #[test]
    fn parses_first_nominatim_place() {
        let places: Vec<Place> =
            serde_json::from_str(r#"[{"lat":"34.0407","lon":"-118.2468","display_name":"x"}]"#)
                .unwrap();
        assert_eq!(first_point(&places), Some(GeoPoint::new(34.0407, -118.2468)));
        assert_eq!(first_point(&[]), None);
    }
}
