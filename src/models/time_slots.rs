use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest `{start, end}` range that is still expanded day by day.
/// Anything wider is treated as malformed and claims nothing.
pub const MAX_RANGE_DAYS: i64 = 3660;

/// Stored JSON shape of `selected_time_slots`: either `{"slots": [...]}`
/// or `{"start": ..., "end": ...}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTimeSlots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeSlotsError {
    #[error("time slots carry both an explicit slot list and a start/end range")]
    Ambiguous,

    #[error("date range needs both start and end")]
    IncompleteRange,
}

/// The time a booking or demand commits to, normalized from [`RawTimeSlots`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Option<RawTimeSlots>", into = "Option<RawTimeSlots>")]
pub enum TimeCommitment {
    ExplicitSlots(Vec<String>),
    DateRange { start: String, end: String },
    #[default]
    None,
}

impl TimeCommitment {
    /// Strict normalization used at the request boundary.
    pub fn from_raw(raw: RawTimeSlots) -> Result<Self, TimeSlotsError> {
        match raw {
            RawTimeSlots {
                slots: Some(_),
                start,
                end,
            } if start.is_some() || end.is_some() => Err(TimeSlotsError::Ambiguous),
            RawTimeSlots {
                slots: Some(slots), ..
            } => Ok(TimeCommitment::ExplicitSlots(slots)),
            RawTimeSlots {
                start: Some(start),
                end: Some(end),
                ..
            } => Ok(TimeCommitment::DateRange { start, end }),
            RawTimeSlots {
                start: None,
                end: None,
                ..
            } => Ok(TimeCommitment::None),
            _ => Err(TimeSlotsError::IncompleteRange),
        }
    }

    /// Lenient normalization for rows already in storage: an explicit slot
    /// list wins over a range, non-string entries are skipped one by one,
    /// and anything unreadable claims nothing.
    pub fn from_stored(json: Option<&str>) -> Self {
        let Some(json) = json.filter(|s| !s.trim().is_empty()) else {
            return TimeCommitment::None;
        };

        let stored: Option<StoredTimeSlots> = match serde_json::from_str(json) {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable selected_time_slots, ignoring");
                return TimeCommitment::None;
            }
        };
        let Some(stored) = stored else {
            return TimeCommitment::None;
        };
        let raw = stored.into_raw();

        match TimeCommitment::from_raw(raw.clone()) {
            Ok(commitment) => commitment,
            Err(TimeSlotsError::Ambiguous) => {
                tracing::warn!("selected_time_slots has both slots and a range, using slots");
                TimeCommitment::ExplicitSlots(raw.slots.unwrap_or_default())
            }
            Err(e) => {
                tracing::warn!(error = %e, "incomplete selected_time_slots, ignoring");
                TimeCommitment::None
            }
        }
    }

    pub fn to_raw(&self) -> Option<RawTimeSlots> {
        match self {
            TimeCommitment::ExplicitSlots(slots) => Some(RawTimeSlots {
                slots: Some(slots.clone()),
                ..Default::default()
            }),
            TimeCommitment::DateRange { start, end } => Some(RawTimeSlots {
                start: Some(start.clone()),
                end: Some(end.clone()),
                ..Default::default()
            }),
            TimeCommitment::None => None,
        }
    }

    /// Canonical set of calendar days this commitment occupies.
    pub fn claimed_dates(&self) -> BTreeSet<NaiveDate> {
        match self {
            TimeCommitment::ExplicitSlots(slots) => {
                slots.iter().filter_map(|s| parse_calendar_day(s)).collect()
            }
            TimeCommitment::DateRange { start, end } => {
                match (parse_calendar_day(start), parse_calendar_day(end)) {
                    (Some(start), Some(end)) => expand_range(start, end),
                    _ => BTreeSet::new(),
                }
            }
            TimeCommitment::None => BTreeSet::new(),
        }
    }
}

/// Loosely typed view of a stored row, so one bad element does not void the
/// whole commitment.
#[derive(Debug, Deserialize)]
struct StoredTimeSlots {
    #[serde(default)]
    slots: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    start: Option<serde_json::Value>,
    #[serde(default)]
    end: Option<serde_json::Value>,
}

impl StoredTimeSlots {
    fn into_raw(self) -> RawTimeSlots {
        let slots = self.slots.map(|items| {
            let total = items.len();
            let kept: Vec<String> = items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            if kept.len() < total {
                tracing::warn!(
                    skipped = total - kept.len(),
                    "non-string entries in selected_time_slots, skipping them"
                );
            }
            kept
        });
        RawTimeSlots {
            slots,
            start: self.start.and_then(|v| stored_string(v, "start")),
            end: self.end.and_then(|v| stored_string(v, "end")),
        }
    }
}

fn stored_string(value: serde_json::Value, field: &str) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => {
            tracing::warn!(field, value = %other, "non-string range bound in selected_time_slots");
            None
        }
    }
}

impl TryFrom<Option<RawTimeSlots>> for TimeCommitment {
    type Error = TimeSlotsError;

    fn try_from(value: Option<RawTimeSlots>) -> Result<Self, Self::Error> {
        match value {
            Some(raw) => TimeCommitment::from_raw(raw),
            None => Ok(TimeCommitment::None),
        }
    }
}

impl From<TimeCommitment> for Option<RawTimeSlots> {
    fn from(value: TimeCommitment) -> Self {
        value.to_raw()
    }
}

/// Calendar day of a slot string such as `2024-01-02T09:00:00Z` or
/// `2024-01-02 09:00:00`. Everything from the first `T` or space is discarded.
pub fn parse_calendar_day(slot: &str) -> Option<NaiveDate> {
    let day = slot
        .trim()
        .split(|c: char| c == 'T' || c == ' ')
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Every calendar day from `start` to `end`, both inclusive.
pub fn expand_range(start: NaiveDate, end: NaiveDate) -> BTreeSet<NaiveDate> {
    if end < start || (end - start).num_days() > MAX_RANGE_DAYS {
        return BTreeSet::new();
    }
    start.iter_days().take_while(|d| *d <= end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_slots_drop_time_of_day_and_dedupe() {
        let commitment = TimeCommitment::ExplicitSlots(vec![
            "2024-01-01T09:00:00Z".to_string(),
            "2024-01-01T17:30:00Z".to_string(),
            "2024-01-02".to_string(),
        ]);
        let dates: Vec<_> = commitment.claimed_dates().into_iter().collect();
        assert_eq!(dates, vec![day("2024-01-01"), day("2024-01-02")]);
    }

    #[test]
    fn test_malformed_slot_contributes_nothing() {
        let commitment = TimeCommitment::ExplicitSlots(vec![
            "not-a-date".to_string(),
            "2024-02-30T10:00:00".to_string(),
            "2024-03-05T10:00:00".to_string(),
        ]);
        let dates: Vec<_> = commitment.claimed_dates().into_iter().collect();
        assert_eq!(dates, vec![day("2024-03-05")]);
    }

    #[test]
    fn test_range_is_inclusive() {
        let commitment = TimeCommitment::DateRange {
            start: "2024-03-01".to_string(),
            end: "2024-03-03".to_string(),
        };
        let dates: Vec<_> = commitment.claimed_dates().into_iter().collect();
        assert_eq!(
            dates,
            vec![day("2024-03-01"), day("2024-03-02"), day("2024-03-03")]
        );
    }

    #[test]
    fn test_range_across_dst_change_has_no_gaps() {
        // US DST starts 2024-03-10, EU on 2024-03-31
        let dates = expand_range(day("2024-03-09"), day("2024-04-01"));
        assert_eq!(dates.len(), 24);
    }

    #[test]
    fn test_range_with_timestamps() {
        let commitment = TimeCommitment::DateRange {
            start: "2024-05-30T22:00:00Z".to_string(),
            end: "2024-06-01T01:00:00Z".to_string(),
        };
        assert_eq!(commitment.claimed_dates().len(), 3);
    }

    #[test]
    fn test_reversed_or_oversized_range_is_empty() {
        assert!(expand_range(day("2024-03-03"), day("2024-03-01")).is_empty());
        assert!(expand_range(day("2000-01-01"), day("2099-01-01")).is_empty());
    }

    #[test]
    fn test_single_day_range() {
        assert_eq!(expand_range(day("2024-03-01"), day("2024-03-01")).len(), 1);
    }

    #[test]
    fn test_deserialize_shapes() {
        let slots: TimeCommitment =
            serde_json::from_str(r#"{"slots":["2024-01-01T10:00:00"]}"#).unwrap();
        assert!(matches!(slots, TimeCommitment::ExplicitSlots(ref s) if s.len() == 1));

        let range: TimeCommitment =
            serde_json::from_str(r#"{"start":"2024-01-01","end":"2024-01-02"}"#).unwrap();
        assert!(matches!(range, TimeCommitment::DateRange { .. }));

        let none: TimeCommitment = serde_json::from_str("null").unwrap();
        assert_eq!(none, TimeCommitment::None);
    }

    #[test]
    fn test_deserialize_rejects_both_encodings() {
        let result: Result<TimeCommitment, _> = serde_json::from_str(
            r#"{"slots":["2024-01-01"],"start":"2024-01-01","end":"2024-01-02"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_half_range() {
        let result: Result<TimeCommitment, _> = serde_json::from_str(r#"{"start":"2024-01-01"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_stored_prefers_slots() {
        let commitment = TimeCommitment::from_stored(Some(
            r#"{"slots":["2024-01-05"],"start":"2024-01-01","end":"2024-01-02"}"#,
        ));
        assert_eq!(
            commitment,
            TimeCommitment::ExplicitSlots(vec!["2024-01-05".to_string()])
        );
    }

    #[test]
    fn test_from_stored_garbage_is_none() {
        assert_eq!(TimeCommitment::from_stored(Some("{oops")), TimeCommitment::None);
        assert_eq!(TimeCommitment::from_stored(None), TimeCommitment::None);
        assert_eq!(TimeCommitment::from_stored(Some("null")), TimeCommitment::None);
    }

    #[test]
    fn test_serialize_keeps_stored_shape() {
        let range = TimeCommitment::DateRange {
            start: "2024-01-01".to_string(),
            end: "2024-01-02".to_string(),
        };
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"start":"2024-01-01","end":"2024-01-02"}"#);
        assert_eq!(serde_json::to_string(&TimeCommitment::None).unwrap(), "null");
    }

    #[test]
    fn test_space_separated_slot() {
        assert_eq!(parse_calendar_day("2024-01-01 10:00:00"), Some(day("2024-01-01")));
        assert_eq!(parse_calendar_day("2024-01-01"), Some(day("2024-01-01")));
        assert_eq!(parse_calendar_day("01/01/2024 10:00"), None);
    }

    #[test]
    fn test_from_stored_skips_non_string_slots() {
        let commitment =
            TimeCommitment::from_stored(Some(r#"{"slots":[123,"2024-01-01T10:00:00",null]}"#));
        assert_eq!(
            commitment,
            TimeCommitment::ExplicitSlots(vec!["2024-01-01T10:00:00".to_string()])
        );
        assert_eq!(
            commitment.claimed_dates().into_iter().collect::<Vec<_>>(),
            vec![day("2024-01-01")]
        );
    }

    #[test]
    fn test_from_stored_non_string_bound_is_incomplete() {
        assert_eq!(
            TimeCommitment::from_stored(Some(r#"{"start":20240101,"end":"2024-01-02"}"#)),
            TimeCommitment::None
        );
    }
}
