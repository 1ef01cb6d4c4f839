use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{ModerationStatus, PriceRange, TimeCommitment};

/// An application (against a demand) or rental request (against a service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRecord {
    pub id: String,
    pub listing_id: String,
    pub applicant_name: Option<String>,
    pub applicant_id: Option<String>,
    pub note: Option<String>,
    pub expect_price_range: Option<PriceRange>,
    pub status: ModerationStatus,
    #[serde(default)]
    pub selected_time_slots: TimeCommitment,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BookingRecord {
    pub fn claimed_dates(&self) -> BTreeSet<NaiveDate> {
        self.selected_time_slots.claimed_dates()
    }
}
