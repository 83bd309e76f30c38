//! # Resource model
//! One food-assistance location after normalization, plus its derived category.
//!
//! Resources are immutable once normalized. Distance is attached later by the
//! geo ranker as a separate view type (`geo::RankedResource`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary service type of a resource, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    Meals,
    Senior,
    BabyFood,
    General,
}

impl Category {
    /// All categories, in declaration order.
    pub const ALL: [Category; 5] = [
        Category::Groceries,
        Category::Meals,
        Category::Senior,
        Category::BabyFood,
        Category::General,
    ];

    /// Wire/search label (`"baby_food"` etc.), identical to the serde form.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Groceries => "groceries",
            Category::Meals => "meals",
            Category::Senior => "senior",
            Category::BabyFood => "baby_food",
            Category::General => "general",
        }
    }

    /// Parse a label case-insensitively. Unknown labels yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized resource. Coordinates are always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub address: String,
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lng")]
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// Free-form `type` label from the feed (e.g. "Food Bank"), passed through.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,
    pub category: Category,
}

impl Resource {
    /// Stable key for list rendering: non-empty parts of
    /// (name, address, lat, lng) joined with `|`.
    pub fn list_key(&self) -> String {
        let lat = self.latitude.to_string();
        let lng = self.longitude.to_string();
        [self.name.as_str(), self.address.as_str(), &lat, &lng]
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn point(&self) -> crate::geo::GeoPoint {
        crate::geo::GeoPoint::new(self.latitude, self.longitude)
    }
}
