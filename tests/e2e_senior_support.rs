//! End-to-end: a crowded catalogue, the "Senior Support" menu pick, and the
//! ranked, capped result set. Coordinates are jittered with a seeded RNG so
//! the run is deterministic.

use feedla_discovery::controller::{DiscoveryController, Status, ViewSettings};
use feedla_discovery::geo::{haversine_km, DEFAULT_CENTER};
use feedla_discovery::ingest::{normalize_feed, types::FeedPayload};
use feedla_discovery::resource::Category;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::{json, Value};

fn jittered(rng: &mut StdRng, name: String) -> Value {
    json!({
        "name": name,
        "address": "Los Angeles, CA",
        "lat": DEFAULT_CENTER.lat + rng.random_range(-0.25..0.25),
        "lng": DEFAULT_CENTER.lng + rng.random_range(-0.25..0.25),
    })
}

fn crowded_catalogue() -> Vec<feedla_discovery::resource::Resource> {
    let mut rng = StdRng::seed_from_u64(0x5e_1102);
    let mut statics: Vec<Value> = (0..25)
        .map(|i| jittered(&mut rng, format!("District {i} Senior Center")))
        .collect();
    statics.extend((0..3).map(|i| jittered(&mut rng, format!("Corner Pantry {i}"))));
    let dynamics: Vec<Value> = (0..2)
        .map(|i| jittered(&mut rng, format!("Soup Kitchen {i}")))
        .collect();

    let (kept, dropped) = normalize_feed(FeedPayload::from_value(json!({
        "static": statics,
        "dynamic": dynamics,
    })));
    assert_eq!(dropped, 0);
    assert_eq!(kept.len(), 30);
    kept
}

#[test]
fn senior_support_returns_only_senior_sites_nearest_first() {
    let mut ctl = DiscoveryController::new(ViewSettings::default());
    ctl.on_feed(Ok(crowded_catalogue()));

    let turn = ctl.select_chat_option("Senior Support").expect("ready");
    assert_eq!(turn.reply, "Searching for senior support options near you…");

    let view = ctl.view();
    assert_eq!(view.status, Status::Filtering);
    assert_eq!(view.category, Some(Category::Senior));
    assert_eq!(view.results.len(), 20, "capped at the default limit");
    assert!(view
        .results
        .iter()
        .all(|r| r.resource.category == Category::Senior));
    assert!(view
        .results
        .windows(2)
        .all(|w| w[0].distance_km <= w[1].distance_km));

    // Distances are measured from the reference point.
    for r in &view.results {
        let d = haversine_km(DEFAULT_CENTER, r.resource.point());
        assert!((d - r.distance_km).abs() < 1e-9);
    }
    // Map frames the nearest site.
    assert_eq!(view.center, view.results[0].resource.point());
}

#[test]
fn the_five_farthest_senior_sites_are_the_ones_cut() {
    let catalogue = crowded_catalogue();
    let mut all: Vec<f64> = catalogue
        .iter()
        .filter(|r| r.category == Category::Senior)
        .map(|r| haversine_km(DEFAULT_CENTER, r.point()))
        .collect();
    all.sort_by(f64::total_cmp);

    let mut ctl = DiscoveryController::new(ViewSettings::default());
    ctl.on_feed(Ok(catalogue));
    ctl.select_chat_option("Senior Support");

    let shown: Vec<f64> = ctl.results().iter().map(|r| r.distance_km).collect();
    assert_eq!(shown, all[..20].to_vec());
}
