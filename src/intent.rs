//! # Intent Resolver
//! Turns a chat menu pick or free-typed chat text into a `QueryIntent`.
//!
//! Both lookup tables are ordered slices. For free text, the keyword table is
//! scanned meals → groceries → senior → baby_food and the first category with
//! a substring hit wins (so "baby food" resolves to `groceries` via "food").

use serde::Serialize;

use crate::resource::Category;

/// Resolved meaning of one user action. A category, when present, takes
/// precedence over the raw text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryIntent {
    pub category: Option<Category>,
    pub raw_text: String,
}

impl QueryIntent {
    pub fn category(category: Category, raw_text: impl Into<String>) -> Self {
        Self {
            category: Some(category),
            raw_text: raw_text.into(),
        }
    }

    pub fn text(raw_text: impl Into<String>) -> Self {
        Self {
            category: None,
            raw_text: raw_text.into(),
        }
    }
}

/// One statically declared chat menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChatOption {
    pub label: &'static str,
    pub category: Option<Category>,
    pub raw: &'static str,
}

pub const CHAT_OPTIONS: &[ChatOption] = &[
    ChatOption {
        label: "Groceries",
        category: Some(Category::Groceries),
        raw: "groceries",
    },
    ChatOption {
        label: "Vegetables & Produce",
        category: Some(Category::Groceries),
        raw: "vegetables",
    },
    ChatOption {
        label: "Prepared Meals",
        category: Some(Category::Meals),
        raw: "prepared meals",
    },
    ChatOption {
        label: "Senior Support",
        category: Some(Category::Senior),
        raw: "senior meals",
    },
    ChatOption {
        label: "Baby Food & Family",
        category: Some(Category::BabyFood),
        raw: "baby food",
    },
    ChatOption {
        label: "Community Fridges",
        category: None,
        raw: "community fridge",
    },
];

/// Ordered keyword table for free-typed chat text.
const KEYWORDS: &[(Category, &[&str])] = &[
    (Category::Meals, &["meal", "kitchen", "soup", "lunch", "dinner"]),
    (
        Category::Groceries,
        &["food", "pantry", "produce", "grocery", "staples"],
    ),
    (Category::Senior, &["senior", "elder", "wheels"]),
    (Category::BabyFood, &["baby", "infant", "formula", "family"]),
];

/// Chat intent plus the assistant's reply line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatTurn {
    pub intent: QueryIntent,
    pub reply: String,
}

impl ChatOption {
    pub fn intent(&self) -> QueryIntent {
        let raw = if self.raw.is_empty() {
            self.label
        } else {
            self.raw
        };
        QueryIntent {
            category: self.category,
            raw_text: raw.to_string(),
        }
    }

    pub fn turn(&self) -> ChatTurn {
        ChatTurn {
            intent: self.intent(),
            reply: reply_for(self.category, self.label),
        }
    }
}

/// Look up a menu entry by its label (case-insensitive).
pub fn find_option(label: &str) -> Option<&'static ChatOption> {
    let label = label.trim();
    CHAT_OPTIONS
        .iter()
        .find(|o| o.label.eq_ignore_ascii_case(label))
}

/// Scan free text against the keyword table. `None` when nothing hits.
pub fn match_keywords(text: &str) -> Option<Category> {
    let lower = text.to_lowercase();
    KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(cat, _)| *cat)
}

/// Resolve free-typed chat text. No keyword hit falls through to raw search
/// carrying the original text.
pub fn resolve_text(text: &str) -> QueryIntent {
    match match_keywords(text) {
        Some(cat) => QueryIntent::category(cat, text),
        None => QueryIntent::text(text),
    }
}

/// Resolve free-typed chat text together with the reply line.
pub fn chat_text_turn(text: &str) -> ChatTurn {
    let intent = resolve_text(text);
    let label = match intent.category {
        Some(cat) => category_label(cat),
        None => text.trim(),
    };
    ChatTurn {
        reply: reply_for(intent.category, label),
        intent,
    }
}

fn category_label(cat: Category) -> &'static str {
    match cat {
        Category::Groceries => "Groceries",
        Category::Meals => "Prepared Meals",
        Category::Senior => "Senior Support",
        Category::BabyFood => "Baby Food & Family",
        Category::General => "General",
    }
}

fn reply_for(category: Option<Category>, label: &str) -> String {
    let label = label.to_lowercase();
    match category {
        Some(_) => format!("Searching for {label} options near you…"),
        None => format!("Looking for {label} around Los Angeles…"),
    }
}
