//! # Geo Ranker
//! Great-circle distance (haversine, R = 6371 km) and the distance-sorted,
//! size-bounded result list handed to the map layer.

use serde::{Deserialize, Serialize};

use crate::resource::Resource;

/// Mean Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default cap on the number of ranked results.
pub const DEFAULT_RESULT_LIMIT: usize = 20;

/// Downtown Los Angeles; used when no geolocation is available.
pub const DEFAULT_CENTER: GeoPoint = GeoPoint {
    lat: 34.0522,
    lng: -118.2437,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// A resource decorated with its distance from the reference point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResource {
    #[serde(flatten)]
    pub resource: Resource,
    pub distance_km: f64,
}

/// Haversine distance in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Sort `items` ascending by distance from `origin` and keep the first `limit`.
///
/// The sort is stable: resources at exactly the same distance keep their input
/// order. An empty input yields an empty output.
pub fn rank_by_distance<'a, I>(origin: GeoPoint, items: I, limit: usize) -> Vec<RankedResource>
where
    I: IntoIterator<Item = &'a Resource>,
{
    let mut ranked = items
        .into_iter()
        .map(|r| RankedResource {
            distance_km: haversine_km(origin, r.point()),
            resource: r.clone(),
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(limit);
    ranked
}
