//! Per-visitor discovery sessions.
//!
//! One `DiscoveryController` per session, created on page load and torn down
//! on navigation away (explicit delete) or after an idle TTL. The shared
//! catalogue state is broadcast to every live session when the feed resolves;
//! sessions created later start from it directly.

use chrono::{DateTime, Duration, Utc};
use metrics::gauge;
use std::collections::HashMap;
use uuid::Uuid;

use crate::controller::{CatalogState, DiscoveryController, MapView, ViewSettings};

#[derive(Debug)]
struct SessionEntry {
    controller: DiscoveryController,
    last_seen: DateTime<Utc>,
}

#[derive(Debug)]
pub struct SessionStore {
    settings: ViewSettings,
    catalog: CatalogState,
    sessions: HashMap<String, SessionEntry>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(settings: ViewSettings, ttl: Duration) -> Self {
        Self {
            settings,
            catalog: CatalogState::Loading,
            sessions: HashMap::new(),
            ttl,
        }
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Start a session. Returns its id (random v4 UUID, the only handle on
    /// the visitor's location) and initial view.
    pub fn create(&mut self, now: DateTime<Utc>) -> (String, MapView) {
        let id = Uuid::new_v4().to_string();

        let controller = DiscoveryController::with_catalog(self.settings, self.catalog.clone());
        let view = controller.view();
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                controller,
                last_seen: now,
            },
        );
        gauge!("sessions_active").set(self.sessions.len() as f64);
        (id, view)
    }

    /// Borrow a live session's controller and mark it as seen.
    pub fn get_mut(&mut self, id: &str, now: DateTime<Utc>) -> Option<&mut DiscoveryController> {
        let entry = self.sessions.get_mut(id)?;
        entry.last_seen = now;
        Some(&mut entry.controller)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        gauge!("sessions_active").set(self.sessions.len() as f64);
        removed
    }

    /// Feed completion: remember the state and deliver it to every session.
    pub fn publish_catalog(&mut self, catalog: CatalogState) {
        for entry in self.sessions.values_mut() {
            entry.controller.on_catalog(catalog.clone());
        }
        self.catalog = catalog;
    }

    /// Drop sessions idle for longer than the TTL. Returns how many went.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|_, e| now - e.last_seen <= ttl);
        let removed = before - self.sessions.len();
        if removed > 0 {
            tracing::debug!(target: "sessions", removed, "expired sessions swept");
            gauge!("sessions_active").set(self.sessions.len() as f64);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Status;

    fn store() -> SessionStore {
        SessionStore::new(ViewSettings::default(), Duration::seconds(60))
    }

    #[test]
    fn sessions_receive_catalog_published_after_creation() {
        let mut s = store();
        assert!(s.is_empty());
        assert!(matches!(s.catalog(), CatalogState::Loading));
        let t0 = Utc::now();
        let (id, view) = s.create(t0);
        assert_eq!(view.status, Status::Loading);

        s.publish_catalog(CatalogState::from_feed(Ok(Vec::new()), 0.4));
        assert!(matches!(s.catalog(), CatalogState::Ready(_)));
        assert_eq!(s.get_mut(&id, t0).unwrap().status(), Status::Idle);

        // Later sessions start ready.
        let (_, view2) = s.create(t0);
        assert_eq!(view2.status, Status::Idle);
    }

    #[test]
    fn ids_are_unique_and_removable() {
        let mut s = store();
        let t0 = Utc::now();
        let (a, _) = s.create(t0);
        let (b, _) = s.create(t0);
        assert_ne!(a, b);
        assert_eq!(s.len(), 2);
        assert!(s.remove(&a));
        assert_eq!(s.len(), 1);
        assert!(!s.remove(&a));
        assert!(s.get_mut(&a, t0).is_none());
        assert!(s.get_mut(&b, t0).is_some());
    }

    #[test]
    fn ids_do_not_repeat_across_stores_at_the_same_instant() {
        let now = Utc::now();
        let (a, _) = store().create(now);
        let (b, _) = store().create(now);
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn idle_sessions_expire() {
        let mut s = store();
        let t0 = Utc::now();
        let (stale, _) = s.create(t0);
        let (fresh, _) = s.create(t0);

        let t1 = t0 + Duration::seconds(45);
        s.get_mut(&fresh, t1);

        let t2 = t0 + Duration::seconds(90);
        assert_eq!(s.sweep_expired(t2), 1);
        assert!(s.get_mut(&stale, t2).is_none());
        assert!(s.get_mut(&fresh, t2).is_some());
    }
}
