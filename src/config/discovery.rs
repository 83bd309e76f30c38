// src/config/discovery.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::geo::{GeoPoint, DEFAULT_CENTER, DEFAULT_RESULT_LIMIT};
use crate::search::DEFAULT_SEARCH_THRESHOLD;

pub const ENV_CONFIG_PATH: &str = "FEEDLA_CONFIG_PATH";
pub const ENV_FEED_URL: &str = "FEEDLA_FEED_URL";
pub const ENV_SEARCH_THRESHOLD: &str = "FEEDLA_SEARCH_THRESHOLD";
pub const ENV_GEOCODER_URL: &str = "FEEDLA_GEOCODER_URL";
pub const ENV_ALLOWED_ORIGINS: &str = "ALLOWED_ORIGINS";

pub const DEFAULT_CONFIG_PATH: &str = "config/discovery.toml";

const MAX_ZOOM: u8 = 21;
/// One week; longer idle sessions are not worth keeping.
const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Base URL of the resource feed; `/api/resources` is appended.
    pub feed_base_url: String,
    /// Reference point used until (or instead of) geolocation.
    pub default_center: GeoPoint,
    pub result_limit: usize,
    /// 0.0 = exact … 1.0 = match anything.
    pub search_threshold: f64,
    /// Wide zoom used when nothing is displayed.
    pub idle_zoom: u8,
    /// "Single area" zoom used when results are displayed.
    pub focus_zoom: u8,
    pub geolocation_timeout_ms: u64,
    pub feed_timeout_secs: u64,
    pub session_ttl_secs: u64,
    /// Nominatim-compatible base URL; geocoding is off when unset.
    pub geocoder_url: Option<String>,
    pub allowed_origins: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            feed_base_url: "http://127.0.0.1:8000".to_string(),
            default_center: DEFAULT_CENTER,
            result_limit: DEFAULT_RESULT_LIMIT,
            search_threshold: DEFAULT_SEARCH_THRESHOLD,
            idle_zoom: 12,
            focus_zoom: 13,
            geolocation_timeout_ms: 5_000,
            feed_timeout_secs: 10,
            session_ttl_secs: 30 * 60,
            geocoder_url: None,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl DiscoveryConfig {
    /// Parse TOML and sanitize. Missing keys take defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: DiscoveryConfig = toml::from_str(s).context("parsing discovery config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading discovery config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $FEEDLA_CONFIG_PATH (must exist when set)
    /// 2) config/discovery.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
            if fallback.exists() {
                Self::load_from(&fallback)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg.sanitized())
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env(ENV_FEED_URL) {
            self.feed_base_url = url;
        }
        if let Some(t) = parse_threshold_env(std::env::var(ENV_SEARCH_THRESHOLD).ok()) {
            self.search_threshold = t;
        }
        if let Some(url) = non_empty_env(ENV_GEOCODER_URL) {
            self.geocoder_url = Some(url);
        }
        if let Some(origins) = non_empty_env(ENV_ALLOWED_ORIGINS) {
            self.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    /// Clamp odd values back into range instead of failing.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.search_threshold.is_finite() {
            self.search_threshold = defaults.search_threshold;
        }
        self.search_threshold = self.search_threshold.clamp(0.0, 1.0);
        if !self.default_center.is_finite() {
            self.default_center = defaults.default_center;
        }
        self.result_limit = self.result_limit.max(1);
        self.idle_zoom = self.idle_zoom.min(MAX_ZOOM);
        self.focus_zoom = self.focus_zoom.min(MAX_ZOOM);
        self.session_ttl_secs = self.session_ttl_secs.clamp(1, MAX_SESSION_TTL_SECS);
        self.geocoder_url = self
            .geocoder_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        if self.allowed_origins.is_empty() {
            self.allowed_origins = defaults.allowed_origins;
        }
        self
    }

    pub fn geolocation_timeout(&self) -> Duration {
        Duration::from_millis(self.geolocation_timeout_ms)
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs.max(1))
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        let secs = self.session_ttl_secs.min(MAX_SESSION_TTL_SECS) as i64;
        chrono::Duration::try_seconds(secs).unwrap_or_else(|| chrono::Duration::seconds(30 * 60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = DiscoveryConfig::from_toml_str(
            r#"
result_limit = 5
[default_center]
lat = 34.1
lng = -118.3
"#,
        )
        .unwrap();
        assert_eq!(cfg.result_limit, 5);
        assert_eq!(cfg.default_center, GeoPoint::new(34.1, -118.3));
        assert_eq!(cfg.search_threshold, DEFAULT_SEARCH_THRESHOLD);
        assert_eq!(cfg.idle_zoom, 12);
        assert_eq!(cfg.focus_zoom, 13);
    }

    #[test]
    fn sanitizes_out_of_range_values() {
        let cfg = DiscoveryConfig::from_toml_str(
            r#"
search_threshold = 3.5
result_limit = 0
focus_zoom = 40
geocoder_url = "   "
allowed_origins = []
session_ttl_secs = 9223372036854775807
"#,
        )
        .unwrap();
        assert_eq!(cfg.session_ttl_secs, MAX_SESSION_TTL_SECS);
        assert_eq!(cfg.session_ttl(), chrono::Duration::days(7));
        assert_eq!(cfg.search_threshold, 1.0);
        assert_eq!(cfg.result_limit, 1);
        assert_eq!(cfg.focus_zoom, MAX_ZOOM);
        assert_eq!(cfg.geocoder_url, None);
        assert_eq!(cfg.allowed_origins, vec!["*".to_string()]);
    }

    #[test]
    fn zero_or_unsanitized_ttl_never_panics() {
        let cfg = DiscoveryConfig::from_toml_str("session_ttl_secs = 0").unwrap();
        assert_eq!(cfg.session_ttl(), chrono::Duration::seconds(1));

        let raw = DiscoveryConfig {
            session_ttl_secs: u64::MAX,
            ..DiscoveryConfig::default()
        };
        assert_eq!(raw.session_ttl(), chrono::Duration::days(7));
    }

    #[test]
    fn threshold_env_parsing() {
        assert_eq!(parse_threshold_env(Some(" 0.25 ".into())), Some(0.25));
        assert_eq!(parse_threshold_env(Some("-1".into())), Some(0.0));
        assert_eq!(parse_threshold_env(Some("NaN".into())), None);
        assert_eq!(parse_threshold_env(Some("abc".into())), None);
        assert_eq!(parse_threshold_env(None), None);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ is not picked up.
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        for k in [
            ENV_CONFIG_PATH,
            ENV_FEED_URL,
            ENV_SEARCH_THRESHOLD,
            ENV_GEOCODER_URL,
            ENV_ALLOWED_ORIGINS,
        ] {
            env::remove_var(k);
        }

        // Nothing on disk → defaults.
        assert_eq!(
            DiscoveryConfig::load_default().unwrap(),
            DiscoveryConfig::default()
        );

        // Fallback file in ./config/
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(tmp.path().join(DEFAULT_CONFIG_PATH), "result_limit = 7").unwrap();
        assert_eq!(DiscoveryConfig::load_default().unwrap().result_limit, 7);

        // Env path wins; env overrides apply on top.
        let p_env = tmp.path().join("other.toml");
        fs::write(&p_env, "result_limit = 3").unwrap();
        env::set_var(ENV_CONFIG_PATH, p_env.display().to_string());
        env::set_var(ENV_SEARCH_THRESHOLD, "0.2");
        env::set_var(ENV_ALLOWED_ORIGINS, "https://a.example, https://b.example");
        let cfg = DiscoveryConfig::load_default().unwrap();
        assert_eq!(cfg.result_limit, 3);
        assert_eq!(cfg.search_threshold, 0.2);
        assert_eq!(cfg.allowed_origins.len(), 2);

        // Env path that does not exist is an error.
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(DiscoveryConfig::load_default().is_err());

        for k in [ENV_CONFIG_PATH, ENV_SEARCH_THRESHOLD, ENV_ALLOWED_ORIGINS] {
            env::remove_var(k);
        }
        env::set_current_dir(&old).unwrap();
    }
}
