//! # Discovery Controller
//! Owns the catalogue, the reference point, the active query and the bounded
//! result set handed to the map layer.
//!
//! States: `Loading` → `Idle` ⇄ `Filtering` / `Searching`, or `Unavailable`
//! when the feed failed. While not ready, every query operation is a no-op.
//! Each public method is one atomic transition; the newest query replaces the
//! previous one.
//!
//! Cleared input returns to `Idle` with an empty result set, centred on the
//! reference point at the wide zoom.

use metrics::counter;
use serde::Serialize;
use std::sync::Arc;

use crate::config::DiscoveryConfig;
use crate::geo::{rank_by_distance, GeoPoint, RankedResource};
use crate::intent::{chat_text_turn, find_option, ChatTurn, QueryIntent};
use crate::resource::{Category, Resource};
use crate::search::SearchIndex;
use crate::telemetry::dev_log_query;

pub const RESOURCES_UNAVAILABLE: &str =
    "Unable to load resources right now. Please try again soon.";

/// Normalized resources plus the search index built over them.
#[derive(Debug)]
pub struct Catalog {
    resources: Arc<[Resource]>,
    index: SearchIndex,
}

impl Catalog {
    pub fn new(resources: Vec<Resource>, search_threshold: f64) -> Self {
        let resources: Arc<[Resource]> = resources.into();
        let index = SearchIndex::build(Arc::clone(&resources), search_threshold);
        Self { resources, index }
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Outcome of the feed fetch, shared by every session.
#[derive(Debug, Clone)]
pub enum CatalogState {
    Loading,
    Ready(Arc<Catalog>),
    Unavailable,
}

impl CatalogState {
    /// Build from a feed result. Failures become `Unavailable`.
    pub fn from_feed(result: anyhow::Result<Vec<Resource>>, search_threshold: f64) -> Self {
        match result {
            Ok(resources) => CatalogState::Ready(Arc::new(Catalog::new(resources, search_threshold))),
            Err(e) => {
                tracing::warn!(target: "discovery", error = ?e, "resources unavailable");
                CatalogState::Unavailable
            }
        }
    }
}

/// Map and ranking knobs taken from `DiscoveryConfig`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSettings {
    pub default_center: GeoPoint,
    pub result_limit: usize,
    pub search_threshold: f64,
    pub idle_zoom: u8,
    pub focus_zoom: u8,
}

impl From<&DiscoveryConfig> for ViewSettings {
    fn from(cfg: &DiscoveryConfig) -> Self {
        Self {
            default_center: cfg.default_center,
            result_limit: cfg.result_limit,
            search_threshold: cfg.search_threshold,
            idle_zoom: cfg.idle_zoom,
            focus_zoom: cfg.focus_zoom,
        }
    }
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Filtering(Category),
    Searching(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Loading,
    Unavailable,
    Idle,
    Filtering,
    Searching,
}

/// Neutral, user-facing advisory attached to the view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    Loading,
    ResourcesUnavailable { message: String },
    NoMatches { term: String, message: String },
}

impl Notice {
    fn no_matches(term: &str) -> Self {
        Notice::NoMatches {
            term: term.to_string(),
            message: format!(
                "No resources found for \"{term}\". Try another term or a category like \"meals\"."
            ),
        }
    }
}

/// Read-only snapshot for the map layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub results: Vec<RankedResource>,
    pub center: GeoPoint,
    pub zoom: u8,
    pub reference: GeoPoint,
    pub located: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Debug)]
pub struct DiscoveryController {
    settings: ViewSettings,
    catalog: CatalogState,
    reference: GeoPoint,
    located: bool,
    mode: Mode,
    results: Vec<RankedResource>,
    center: GeoPoint,
    zoom: u8,
    notice: Option<Notice>,
}

impl DiscoveryController {
    /// Fresh session waiting for the feed.
    pub fn new(settings: ViewSettings) -> Self {
        Self {
            settings,
            catalog: CatalogState::Loading,
            reference: settings.default_center,
            located: false,
            mode: Mode::Idle,
            results: Vec::new(),
            center: settings.default_center,
            zoom: settings.idle_zoom,
            notice: Some(Notice::Loading),
        }
    }

    /// Fresh session starting from an already-known catalogue state.
    pub fn with_catalog(settings: ViewSettings, catalog: CatalogState) -> Self {
        let mut ctl = Self::new(settings);
        ctl.on_catalog(catalog);
        ctl
    }

    pub fn status(&self) -> Status {
        match (&self.catalog, &self.mode) {
            (CatalogState::Loading, _) => Status::Loading,
            (CatalogState::Unavailable, _) => Status::Unavailable,
            (CatalogState::Ready(_), Mode::Idle) => Status::Idle,
            (CatalogState::Ready(_), Mode::Filtering(_)) => Status::Filtering,
            (CatalogState::Ready(_), Mode::Searching(_)) => Status::Searching,
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn reference(&self) -> GeoPoint {
        self.reference
    }

    pub fn results(&self) -> &[RankedResource] {
        &self.results
    }

    pub fn view(&self) -> MapView {
        let (category, query) = match &self.mode {
            Mode::Idle => (None, None),
            Mode::Filtering(c) => (Some(*c), None),
            Mode::Searching(t) => (None, Some(t.clone())),
        };
        MapView {
            status: self.status(),
            category,
            query,
            results: self.results.clone(),
            center: self.center,
            zoom: self.zoom,
            reference: self.reference,
            located: self.located,
            notice: self.notice.clone(),
        }
    }

    /// Feed completion. A ready catalogue replays the active query (if any).
    pub fn on_catalog(&mut self, catalog: CatalogState) {
        self.catalog = catalog;
        match &self.catalog {
            CatalogState::Loading => self.notice = Some(Notice::Loading),
            CatalogState::Unavailable => {
                self.mode = Mode::Idle;
                self.results.clear();
                self.notice = Some(Notice::ResourcesUnavailable {
                    message: RESOURCES_UNAVAILABLE.to_string(),
                });
            }
            CatalogState::Ready(_) => {
                self.notice = None;
                self.refresh();
            }
        }
    }

    /// Convenience for a raw feed result.
    pub fn on_feed(&mut self, result: anyhow::Result<Vec<Resource>>) {
        let state = CatalogState::from_feed(result, self.settings.search_threshold);
        self.on_catalog(state);
    }

    /// Geolocation resolution. `None` (denied/failed) keeps the default centre.
    /// An active query is re-ranked against the new origin.
    pub fn on_geolocation(&mut self, located: Option<GeoPoint>) {
        match located.filter(GeoPoint::is_finite) {
            Some(p) => {
                self.reference = p;
                self.located = true;
            }
            None => {
                self.reference = self.settings.default_center;
                self.located = false;
            }
        }
        if self.ready_catalog().is_some() {
            self.refresh();
        } else {
            self.center = self.reference;
        }
    }

    /// Apply a resolved intent. Returns `false` when dropped (not ready).
    pub fn apply_intent(&mut self, intent: &QueryIntent) -> bool {
        if self.ready_catalog().is_none() {
            return false;
        }
        self.mode = match intent.category {
            Some(c) => Mode::Filtering(c),
            None => {
                let term = intent.raw_text.trim();
                if term.is_empty() {
                    Mode::Idle
                } else {
                    Mode::Searching(term.to_string())
                }
            }
        };
        self.refresh();
        self.record_query();
        true
    }

    /// Typed search box input. Blank input clears.
    pub fn search_text(&mut self, text: &str) -> bool {
        self.apply_intent(&QueryIntent::text(text))
    }

    /// Free-typed chat message. `None` when blank or not ready.
    pub fn submit_chat_text(&mut self, text: &str) -> Option<ChatTurn> {
        if text.trim().is_empty() {
            return None;
        }
        let turn = chat_text_turn(text);
        self.apply_intent(&turn.intent).then_some(turn)
    }

    /// Chat menu pick by label. `None` for unknown labels or when not ready.
    pub fn select_chat_option(&mut self, label: &str) -> Option<ChatTurn> {
        let turn = find_option(label)?.turn();
        self.apply_intent(&turn.intent).then_some(turn)
    }

    /// Back to `Idle`. No-op while not ready.
    pub fn clear(&mut self) -> bool {
        self.apply_intent(&QueryIntent::text(""))
    }

    /// Recentre on a geocoded place for a typed term that matched nothing.
    /// Ignored if a newer query has replaced `term`.
    pub fn focus_on(&mut self, term: &str, point: GeoPoint) -> bool {
        let same_term = matches!(&self.mode, Mode::Searching(t) if t == term.trim());
        if !same_term || !self.results.is_empty() || !point.is_finite() {
            return false;
        }
        self.center = point;
        self.zoom = self.settings.focus_zoom;
        true
    }

    fn ready_catalog(&self) -> Option<Arc<Catalog>> {
        match &self.catalog {
            CatalogState::Ready(c) => Some(Arc::clone(c)),
            _ => None,
        }
    }

    /// Recompute results and framing for the current mode.
    fn refresh(&mut self) {
        let Some(catalog) = self.ready_catalog() else {
            return;
        };
        let limit = self.settings.result_limit;

        let (ranked, term) = match &self.mode {
            Mode::Idle => {
                self.results.clear();
                self.notice = None;
                self.center = self.reference;
                self.zoom = self.settings.idle_zoom;
                return;
            }
            Mode::Filtering(cat) => {
                let matches = catalog.resources().iter().filter(|r| r.category == *cat);
                (
                    rank_by_distance(self.reference, matches, limit),
                    cat.as_str().to_string(),
                )
            }
            Mode::Searching(term) => {
                let hits = catalog.index().search(term);
                (rank_by_distance(self.reference, hits, limit), term.clone())
            }
        };
        self.show(ranked, &term);
    }

    /// Count and dev-log a user query. Re-ranks caused by location or feed
    /// updates are not queries.
    fn record_query(&self) {
        let (label, term) = match &self.mode {
            Mode::Idle => return,
            Mode::Filtering(cat) => ("filtering", cat.as_str()),
            Mode::Searching(term) => ("searching", term.as_str()),
        };
        counter!("discovery_queries_total", "mode" => label).increment(1);
        if self.results.is_empty() {
            counter!("discovery_no_match_total").increment(1);
        }
        dev_log_query(label, term, self.results.len());
    }

    fn show(&mut self, ranked: Vec<RankedResource>, term: &str) {
        match ranked.first() {
            Some(nearest) => {
                self.center = nearest.resource.point();
                self.zoom = self.settings.focus_zoom;
                self.notice = None;
            }
            None => {
                self.center = self.reference;
                self.zoom = self.settings.idle_zoom;
                self.notice = Some(Notice::no_matches(term));
            }
        }
        self.results = ranked;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorize::categorize_name;
    use crate::geo::DEFAULT_CENTER;

    fn res(name: &str, lat: f64, lng: f64) -> Resource {
        Resource {
            name: name.into(),
            address: String::new(),
            latitude: lat,
            longitude: lng,
            phone: None,
            website: None,
            hours: None,
            notes: None,
            zone: None,
            kind: None,
            google_maps_url: None,
            category: categorize_name(name),
        }
    }

    fn ready() -> DiscoveryController {
        let mut ctl = DiscoveryController::new(ViewSettings::default());
        ctl.on_feed(Ok(vec![
            res("Westside Food Pantry", 34.02, -118.45),
            res("Hope Soup Kitchen", 34.05, -118.25),
            res("Eastside Senior Center", 34.03, -118.20),
            res("Northside Senior Center", 34.20, -118.24),
        ]));
        ctl
    }

    #[test]
    fn queries_are_dropped_while_loading() {
        let mut ctl = DiscoveryController::new(ViewSettings::default());
        assert!(!ctl.search_text("pantry"));
        assert!(ctl.select_chat_option("Groceries").is_none());
        assert_eq!(ctl.status(), Status::Loading);
        assert_eq!(ctl.view().notice, Some(Notice::Loading));
        assert!(ctl.results().is_empty());
    }

    #[test]
    fn feed_failure_is_an_advisory_not_a_crash() {
        let mut ctl = DiscoveryController::new(ViewSettings::default());
        ctl.on_feed(Err(anyhow::anyhow!("connection refused")));
        assert_eq!(ctl.status(), Status::Unavailable);
        assert!(!ctl.search_text("pantry"));
        assert!(matches!(
            ctl.view().notice,
            Some(Notice::ResourcesUnavailable { .. })
        ));
    }

    #[test]
    fn category_filter_ranks_by_distance_and_frames_nearest() {
        let mut ctl = ready();
        let turn = ctl.select_chat_option("Senior Support").unwrap();
        assert_eq!(turn.intent.category, Some(Category::Senior));

        let view = ctl.view();
        assert_eq!(view.status, Status::Filtering);
        let names: Vec<_> = view.results.iter().map(|r| r.resource.name.as_str()).collect();
        assert_eq!(names, vec!["Eastside Senior Center", "Northside Senior Center"]);
        assert_eq!(view.center, GeoPoint::new(34.03, -118.20));
        assert_eq!(view.zoom, 13);
    }

    #[test]
    fn unmatched_text_sets_no_matches_notice() {
        let mut ctl = ready();
        ctl.search_text("pantry");
        assert_eq!(ctl.results().len(), 1);

        let turn = ctl.submit_chat_text("xyz nonsense").unwrap();
        assert_eq!(turn.intent, QueryIntent::text("xyz nonsense"));
        let view = ctl.view();
        assert_eq!(view.status, Status::Searching);
        assert!(view.results.is_empty());
        assert_eq!(view.center, DEFAULT_CENTER);
        assert!(matches!(view.notice, Some(Notice::NoMatches { ref term, .. }) if term == "xyz nonsense"));
    }

    #[test]
    fn clearing_returns_to_idle_with_wide_zoom() {
        let mut ctl = ready();
        ctl.search_text("soup");
        assert_eq!(ctl.view().zoom, 13);

        assert!(ctl.search_text("   "));
        let view = ctl.view();
        assert_eq!(view.status, Status::Idle);
        assert!(view.results.is_empty());
        assert_eq!(view.center, ctl.reference());
        assert_eq!(view.zoom, 12);
        assert_eq!(view.notice, None);
    }

    #[test]
    fn geolocation_reranks_active_query() {
        let mut ctl = ready();
        ctl.select_chat_option("Senior Support");
        assert_eq!(ctl.results()[0].resource.name, "Eastside Senior Center");

        // Move the user next to the northern site.
        ctl.on_geolocation(Some(GeoPoint::new(34.21, -118.24)));
        assert!(ctl.view().located);
        assert_eq!(ctl.results()[0].resource.name, "Northside Senior Center");

        ctl.on_geolocation(None);
        assert_eq!(ctl.reference(), DEFAULT_CENTER);
        assert!(!ctl.view().located);
    }

    #[test]
    fn geolocation_before_feed_recentres_idle_map() {
        let mut ctl = DiscoveryController::new(ViewSettings::default());
        let here = GeoPoint::new(34.10, -118.30);
        ctl.on_geolocation(Some(here));
        assert_eq!(ctl.view().center, here);

        ctl.on_feed(Ok(vec![res("Hope Soup Kitchen", 34.05, -118.25)]));
        assert_eq!(ctl.status(), Status::Idle);
        assert_eq!(ctl.view().center, here);
    }

    #[test]
    fn focus_on_only_applies_to_the_current_unmatched_term() {
        let mut ctl = ready();
        let place = GeoPoint::new(34.0407, -118.2468);
        ctl.search_text("xyz nonsense");
        assert!(!ctl.focus_on("older term", place));
        assert!(ctl.focus_on("xyz nonsense", place));
        assert_eq!(ctl.view().center, place);
        assert_eq!(ctl.view().zoom, 13);

        ctl.search_text("soup");
        assert!(!ctl.focus_on("soup", place));
    }

    #[test]
    fn result_set_is_capped_by_limit() {
        let settings = ViewSettings {
            result_limit: 2,
            ..ViewSettings::default()
        };
        let mut ctl = DiscoveryController::with_catalog(settings, CatalogState::Loading);
        ctl.on_feed(Ok((0..5)
            .map(|i| res(&format!("Pantry {i}"), 34.0 + i as f64 * 0.01, -118.2))
            .collect()));
        ctl.select_chat_option("Groceries");
        assert_eq!(ctl.results().len(), 2);
    }
}
