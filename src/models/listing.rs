use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{ModerationStatus, TimeCommitment};

pub const DEFAULT_CURRENCY: &str = "VND";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ListingKind {
    Service,
    Demand,
}

impl ListingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingKind::Service => "service",
            ListingKind::Demand => "demand",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "service" => Some(ListingKind::Service),
            "demand" => Some(ListingKind::Demand),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub platform: String,
    pub value: String,
}

/// A service offer or demand request under moderation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub kind: ListingKind,
    pub title: String,
    pub description: Option<String>,
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub weekdays: Vec<String>,
    #[serde(default)]
    pub selected_time_slots: TimeCommitment,
    pub category: Option<String>,
    pub note: Option<String>,
    pub status: ModerationStatus,
    #[serde(default)]
    pub need_support: bool,
    #[serde(default)]
    pub contacts: Vec<Contact>,
    pub post_content: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub is_public: bool,
    pub owner_id: Option<String>,
    pub owner_email: Option<String>,
    pub owner_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Listing {
    pub fn has_post(&self) -> bool {
        self.post_content
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }
}
