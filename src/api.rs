use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shuttle_axum::axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::DiscoveryConfig;
use crate::controller::{CatalogState, DiscoveryController, MapView, Notice, Status, ViewSettings};
use crate::ingest::{self, types::FeedProvider};
use crate::intent::{find_option, ChatOption, CHAT_OPTIONS};
use crate::locate::Geocoder;
use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct AppState {
    sessions: Arc<RwLock<SessionStore>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    allowed_origins: Vec<String>,
    search_threshold: f64,
}

impl AppState {
    pub fn new(cfg: &DiscoveryConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(SessionStore::new(
                ViewSettings::from(cfg),
                cfg.session_ttl(),
            ))),
            geocoder: None,
            allowed_origins: cfg.allowed_origins.clone(),
            search_threshold: cfg.search_threshold,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    /// Deliver the feed outcome to every session (and to future ones).
    pub fn publish_catalog(&self, catalog: CatalogState) -> Result<(), ApiError> {
        let mut store = self.sessions.write().map_err(|_| ApiError::Poisoned)?;
        store.publish_catalog(catalog);
        Ok(())
    }

    fn with_session<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut DiscoveryController) -> T,
    ) -> Result<T, ApiError> {
        let mut store = self.sessions.write().map_err(|_| ApiError::Poisoned)?;
        let ctl = store
            .get_mut(id, Utc::now())
            .ok_or_else(|| ApiError::UnknownSession(id.to_string()))?;
        Ok(f(ctl))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unknown session `{0}`")]
    UnknownSession(String),
    #[error("unknown chat option `{0}`")]
    UnknownOption(String),
    #[error("session store unavailable")]
    Poisoned,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownSession(_) => StatusCode::NOT_FOUND,
            ApiError::UnknownOption(_) => StatusCode::BAD_REQUEST,
            ApiError::Poisoned => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/chat/options", get(chat_options))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_view).delete(delete_session))
        .route("/sessions/{id}/location", post(set_location))
        .route("/sessions/{id}/search", post(search))
        .route("/sessions/{id}/chat", post(chat))
        .route("/sessions/{id}/chat/select", post(chat_select))
        .route("/sessions/{id}/clear", post(clear))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::very_permissive();
    }
    let allowed = origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect::<Vec<_>>();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Fetch the feed once in the background and publish the outcome.
pub fn spawn_catalog_loader(state: AppState, provider: Box<dyn FeedProvider>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let result = ingest::load_resources(provider.as_ref()).await;
        let catalog = CatalogState::from_feed(result, state.search_threshold);
        if let CatalogState::Ready(c) = &catalog {
            info!(target: "discovery", resources = c.len(), "catalogue ready");
        }
        if let Err(e) = state.publish_catalog(catalog) {
            warn!(target: "discovery", error = %e, "could not publish catalogue");
        }
    })
}

/// Periodically evict idle sessions.
pub fn spawn_session_sweeper(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match state.sessions.write() {
                Ok(mut store) => {
                    store.sweep_expired(Utc::now());
                }
                Err(_) => {
                    warn!(target: "sessions", "session store poisoned; sweeper stopping");
                    return;
                }
            }
        }
    })
}

#[derive(Deserialize)]
struct TextReq {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct SelectReq {
    label: String,
}

#[derive(Deserialize)]
struct LocationReq {
    lat: Option<f64>,
    lng: Option<f64>,
    #[serde(default)]
    denied: bool,
}

#[derive(Serialize)]
struct SessionCreated {
    id: String,
    view: MapView,
}

#[derive(Serialize)]
struct ChatResp {
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<String>,
    view: MapView,
}

async fn chat_options() -> Json<&'static [ChatOption]> {
    Json(CHAT_OPTIONS)
}

async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), ApiError> {
    let mut store = state.sessions.write().map_err(|_| ApiError::Poisoned)?;
    let (id, view) = store.create(Utc::now());
    Ok((StatusCode::CREATED, Json(SessionCreated { id, view })))
}

async fn get_view(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MapView>, ApiError> {
    state.with_session(&id, |ctl| Json(ctl.view()))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.sessions.write().map_err(|_| ApiError::Poisoned)?;
    if store.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::UnknownSession(id))
    }
}

async fn set_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<LocationReq>,
) -> Result<Json<MapView>, ApiError> {
    let point = match (body.denied, body.lat, body.lng) {
        (false, Some(lat), Some(lng)) => Some(crate::geo::GeoPoint::new(lat, lng)),
        _ => None,
    };
    state.with_session(&id, |ctl| {
        ctl.on_geolocation(point);
        Json(ctl.view())
    })
}

async fn search(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TextReq>,
) -> Result<Json<MapView>, ApiError> {
    let view = state.with_session(&id, |ctl| {
        ctl.search_text(&body.text);
        ctl.view()
    })?;

    let unmatched = view.status == Status::Searching
        && matches!(view.notice, Some(Notice::NoMatches { .. }));
    let (Some(geocoder), Some(term), true) = (state.geocoder.clone(), view.query.clone(), unmatched)
    else {
        return Ok(Json(view));
    };

    // Lock is not held while the geocoder runs; a newer query wins.
    match geocoder.geocode(&term).await {
        Ok(Some(point)) => state.with_session(&id, |ctl| {
            ctl.focus_on(&term, point);
            Json(ctl.view())
        }),
        Ok(None) => Ok(Json(view)),
        Err(e) => {
            warn!(target: "locate", error = ?e, "geocoding failed");
            Ok(Json(view))
        }
    }
}

async fn chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<TextReq>,
) -> Result<Json<ChatResp>, ApiError> {
    state.with_session(&id, |ctl| {
        let turn = ctl.submit_chat_text(&body.text);
        Json(ChatResp {
            reply: turn.map(|t| t.reply),
            view: ctl.view(),
        })
    })
}

async fn chat_select(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SelectReq>,
) -> Result<Json<ChatResp>, ApiError> {
    if find_option(&body.label).is_none() {
        return Err(ApiError::UnknownOption(body.label));
    }
    state.with_session(&id, |ctl| {
        let turn = ctl.select_chat_option(&body.label);
        Json(ChatResp {
            reply: turn.map(|t| t.reply),
            view: ctl.view(),
        })
    })
}

async fn clear(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MapView>, ApiError> {
    state.with_session(&id, |ctl| {
        ctl.clear();
        Json(ctl.view())
    })
}
