//! Duplicate-booking detection across the bookings of one listing.
//!
//! Everything here is a pure read over a snapshot: nothing is cached and
//! nothing is enforced. Approving a conflicting booking stays possible; the
//! reviewer is only warned.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::BookingRecord;

pub const DUPLICATE_MESSAGE: &str = "Duplicate booking dates detected";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    /// Sorted, each date once.
    pub dates: Vec<NaiveDate>,
    pub message: String,
    pub description: String,
}

impl DuplicateReport {
    fn new(dates: Vec<NaiveDate>) -> Self {
        let listed = dates
            .iter()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            message: DUPLICATE_MESSAGE.to_string(),
            description: format!("These dates are claimed by more than one booking: {listed}"),
            dates,
        }
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.dates.binary_search(date).is_ok()
    }
}

/// Maps every claimed date to the distinct ids claiming it, in input order.
pub(crate) fn claimants_by_date(records: &[BookingRecord]) -> BTreeMap<NaiveDate, Vec<&str>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&str>> = BTreeMap::new();
    for record in records {
        for date in record.claimed_dates() {
            let ids = by_date.entry(date).or_default();
            if !ids.contains(&record.id.as_str()) {
                ids.push(record.id.as_str());
            }
        }
    }
    by_date
}

/// Dates claimed by two or more distinct bookings, or `None` when there are
/// none (including when fewer than two bookings are given).
pub fn find_collective_duplicates(records: &[BookingRecord]) -> Option<DuplicateReport> {
    if records.len() < 2 {
        return None;
    }

    let dates: Vec<NaiveDate> = claimants_by_date(records)
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(date, _)| date)
        .collect();

    if dates.is_empty() {
        None
    } else {
        Some(DuplicateReport::new(dates))
    }
}

/// The target's dates that some other booking (by id) also claims.
pub fn conflicting_dates(target: &BookingRecord, all: &[BookingRecord]) -> BTreeSet<NaiveDate> {
    let target_dates = target.claimed_dates();
    if target_dates.is_empty() {
        return BTreeSet::new();
    }

    let mut conflicts = BTreeSet::new();
    for other in all.iter().filter(|r| r.id != target.id) {
        for date in other.claimed_dates() {
            if target_dates.contains(&date) {
                conflicts.insert(date);
            }
        }
        if conflicts.len() == target_dates.len() {
            break;
        }
    }
    conflicts
}

/// Whether approving `target` would double-book a date against its siblings.
pub fn record_conflicts_with_others(target: &BookingRecord, all: &[BookingRecord]) -> bool {
    let target_dates = target.claimed_dates();
    if target_dates.is_empty() {
        return false;
    }

    all.iter()
        .filter(|r| r.id != target.id)
        .any(|other| other.claimed_dates().iter().any(|d| target_dates.contains(d)))
}
