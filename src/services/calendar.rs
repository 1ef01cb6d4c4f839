use chrono::NaiveDate;
use serde::Serialize;

use crate::models::BookingRecord;
use crate::services::overlap::claimants_by_date;

/// One marked day on a listing's booking calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub booking_ids: Vec<String>,
    pub duplicate: bool,
}

/// Every day claimed by at least one booking, in date order.
pub fn calendar_days(records: &[BookingRecord]) -> Vec<CalendarDay> {
    claimants_by_date(records)
        .into_iter()
        .map(|(date, ids)| CalendarDay {
            date,
            duplicate: ids.len() > 1,
            booking_ids: ids.into_iter().map(str::to_string).collect(),
        })
        .collect()
}
