use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{
    Contact, Listing, ModerationStatus, PriceRange, RawTimeSlots, RentalDays, TimeCommitment,
};
use crate::services::overlap;

pub const MAX_POST_IMAGES: usize = 5;

/// Fields submitted from the listing edit form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub weekdays: Option<Vec<String>>,
    /// Demand dates. Absent keeps the stored value.
    pub selected_time_slots: Option<RawTimeSlots>,
    pub category: Option<String>,
    pub note: Option<String>,
    pub status: Option<String>,
    pub contacts: Option<Vec<Contact>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub post_content: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub is_public: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    /// The booking shares dates with a sibling; nothing was written.
    NeedsConfirmation { conflicting_dates: Vec<NaiveDate> },
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn load_listing(conn: &Connection, id: &str) -> Result<Listing, AppError> {
    queries::get_listing(conn, id)?.ok_or_else(|| AppError::NotFound(format!("listing {id}")))
}

/// Validates the form and applies it on top of the stored listing.
pub fn update_listing(
    conn: &Connection,
    id: &str,
    update: ListingUpdate,
    default_currency: &str,
) -> Result<Listing, AppError> {
    let mut listing = load_listing(conn, id)?;

    let title = non_blank(update.title)
        .ok_or_else(|| AppError::Validation("title is required".to_string()))?;
    let (Some(min), Some(max)) = (update.min, update.max) else {
        return Err(AppError::Validation(
            "min and max price are required".to_string(),
        ));
    };
    if min < 0 || max < 0 {
        return Err(AppError::Validation("prices must not be negative".to_string()));
    }
    if min > max {
        return Err(AppError::Validation(
            "min price must not exceed max price".to_string(),
        ));
    }
    let status = match update.status.as_deref() {
        Some(s) => ModerationStatus::from_request(s)
            .ok_or_else(|| AppError::Validation(format!("unknown status: {s}")))?,
        None => return Err(AppError::Validation("status is required".to_string())),
    };
    let weekdays = match update.weekdays {
        Some(days) => RentalDays::parse(&days)
            .map_err(|e| AppError::Validation(e.to_string()))?
            .days,
        None => listing.weekdays.clone(),
    };
    let selected_time_slots = match update.selected_time_slots {
        Some(raw) => {
            TimeCommitment::from_raw(raw).map_err(|e| AppError::Validation(e.to_string()))?
        }
        None => listing.selected_time_slots.clone(),
    };
    let contacts = update.contacts.unwrap_or_default();
    if contacts
        .iter()
        .any(|c| c.platform.trim().is_empty() || c.value.trim().is_empty())
    {
        return Err(AppError::Validation(
            "every contact needs a platform and a value".to_string(),
        ));
    }

    let currency = listing
        .price_range
        .as_ref()
        .map(|p| p.currency.clone())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| default_currency.to_string());

    let was_approved = listing.status == ModerationStatus::Approved;
    listing.title = title;
    listing.description = non_blank(update.description);
    listing.price_range = Some(PriceRange {
        min: Some(min),
        max: Some(max),
        currency,
    });
    listing.weekdays = weekdays;
    listing.selected_time_slots = selected_time_slots;
    listing.category = non_blank(update.category);
    listing.note = non_blank(update.note);
    listing.status = status;
    listing.contacts = contacts;

    queries::update_listing(conn, &listing)?;

    if status == ModerationStatus::Approved && !was_approved {
        tracing::info!(listing_id = %id, "listing approved from edit form");
    }
    load_listing(conn, id)
}

pub fn approve_listing(conn: &Connection, id: &str) -> Result<Listing, AppError> {
    let listing = load_listing(conn, id)?;
    if listing.status != ModerationStatus::Approved {
        queries::update_listing_status(conn, id, ModerationStatus::Approved)?;
        tracing::info!(listing_id = %id, kind = listing.kind.as_str(), "listing approved");
    }
    load_listing(conn, id)
}

/// Publishes the markdown post. A pending listing is approved by publishing.
pub fn save_post(conn: &Connection, id: &str, update: PostUpdate) -> Result<Listing, AppError> {
    let listing = load_listing(conn, id)?;

    let content = update
        .post_content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Validation("post_content is required".to_string()))?;
    let image_urls: Vec<String> = update
        .image_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();
    if image_urls.len() > MAX_POST_IMAGES {
        return Err(AppError::Validation(format!(
            "at most {MAX_POST_IMAGES} images per post"
        )));
    }
    let is_public = update.is_public.unwrap_or(true);

    let status = match listing.status {
        ModerationStatus::Pending => ModerationStatus::Approved,
        other => other,
    };

    queries::save_post(conn, id, &content, &image_urls, is_public, status)?;
    tracing::info!(listing_id = %id, is_public, "post saved");

    load_listing(conn, id)
}

/// Approves a booking unless it collides with a sibling and the reviewer has
/// not confirmed. Collisions never block a confirmed approval.
pub fn approve_booking(
    conn: &Connection,
    booking_id: &str,
    confirm: bool,
) -> Result<ApprovalOutcome, AppError> {
    let booking = queries::get_booking_by_id(conn, booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {booking_id}")))?;

    if booking.status == ModerationStatus::Approved {
        return Ok(ApprovalOutcome::Approved);
    }

    let siblings = queries::get_bookings_for_listing(conn, &booking.listing_id)?;
    if overlap::record_conflicts_with_others(&booking, &siblings) {
        let conflicting_dates: Vec<NaiveDate> = overlap::conflicting_dates(&booking, &siblings)
            .into_iter()
            .collect();
        if !confirm {
            return Ok(ApprovalOutcome::NeedsConfirmation { conflicting_dates });
        }
        tracing::warn!(
            booking_id,
            listing_id = %booking.listing_id,
            dates = ?conflicting_dates,
            "approving booking despite duplicate dates"
        );
    }

    queries::update_booking_status(conn, booking_id, ModerationStatus::Approved)?;
    tracing::info!(booking_id, "booking approved");
    Ok(ApprovalOutcome::Approved)
}

pub fn reject_booking(conn: &Connection, booking_id: &str) -> Result<(), AppError> {
    let updated = queries::update_booking_status(conn, booking_id, ModerationStatus::Rejected)?;
    if !updated {
        return Err(AppError::NotFound(format!("booking {booking_id}")));
    }
    tracing::info!(booking_id, "booking rejected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{BookingRecord, ListingKind, TimeCommitment};

    fn setup() -> Connection {
        let conn = db::init_db(":memory:").unwrap();
        let now = chrono::Utc::now().naive_utc();
        let listing = Listing {
            id: "s-1".to_string(),
            kind: ListingKind::Service,
            title: "Camera rental".to_string(),
            description: None,
            price_range: None,
            weekdays: vec![],
            selected_time_slots: TimeCommitment::None,
            category: None,
            note: None,
            status: ModerationStatus::Pending,
            need_support: false,
            contacts: vec![],
            post_content: None,
            image_urls: vec![],
            is_public: true,
            owner_id: None,
            owner_email: None,
            owner_name: None,
            created_at: now,
            updated_at: now,
        };
        queries::create_listing(&conn, &listing).unwrap();
        conn
    }

    fn add_booking(conn: &Connection, id: &str, slots: &[&str]) {
        let now = chrono::Utc::now().naive_utc();
        let booking = BookingRecord {
            id: id.to_string(),
            listing_id: "s-1".to_string(),
            applicant_name: None,
            applicant_id: None,
            note: None,
            expect_price_range: None,
            status: ModerationStatus::Pending,
            selected_time_slots: TimeCommitment::ExplicitSlots(
                slots.iter().map(|s| s.to_string()).collect(),
            ),
            created_at: now,
            updated_at: now,
        };
        queries::create_booking(conn, &booking).unwrap();
    }

    fn status_of(conn: &Connection, id: &str) -> ModerationStatus {
        queries::get_booking_by_id(conn, id).unwrap().unwrap().status
    }

    fn valid_update() -> ListingUpdate {
        ListingUpdate {
            title: Some("  Camera rental  ".to_string()),
            min: Some(100000),
            max: Some(500000),
            status: Some("pending".to_string()),
            weekdays: Some(vec!["sat".to_string(), "mon".to_string()]),
            contacts: Some(vec![Contact {
                platform: "email".to_string(),
                value: "owner@example.com".to_string(),
            }]),
            ..Default::default()
        }
    }

    #[test]
    fn test_approve_without_conflict() {
        let conn = setup();
        add_booking(&conn, "b-1", &["2025-06-16T09:00:00"]);
        add_booking(&conn, "b-2", &["2025-06-17T09:00:00"]);

        let outcome = approve_booking(&conn, "b-1", false).unwrap();
        assert_eq!(outcome, ApprovalOutcome::Approved);
        assert_eq!(status_of(&conn, "b-1"), ModerationStatus::Approved);
    }

    #[test]
    fn test_conflict_needs_confirmation() {
        let conn = setup();
        add_booking(&conn, "b-1", &["2025-06-16T09:00:00", "2025-06-18T09:00:00"]);
        add_booking(&conn, "b-2", &["2025-06-16T15:00:00"]);

        let outcome = approve_booking(&conn, "b-1", false).unwrap();
        match outcome {
            ApprovalOutcome::NeedsConfirmation { conflicting_dates } => {
                assert_eq!(conflicting_dates.len(), 1);
                assert_eq!(conflicting_dates[0].to_string(), "2025-06-16");
            }
            other => panic!("expected confirmation, got {other:?}"),
        }
        assert_eq!(status_of(&conn, "b-1"), ModerationStatus::Pending);

        let outcome = approve_booking(&conn, "b-1", true).unwrap();
        assert_eq!(outcome, ApprovalOutcome::Approved);
        assert_eq!(status_of(&conn, "b-1"), ModerationStatus::Approved);
    }

    #[test]
    fn test_already_approved_is_noop() {
        let conn = setup();
        add_booking(&conn, "b-1", &["2025-06-16"]);
        add_booking(&conn, "b-2", &["2025-06-16"]);
        approve_booking(&conn, "b-1", true).unwrap();

        assert_eq!(
            approve_booking(&conn, "b-1", false).unwrap(),
            ApprovalOutcome::Approved
        );
    }

    #[test]
    fn test_approve_missing_booking() {
        let conn = setup();
        assert!(matches!(
            approve_booking(&conn, "ghost", true),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_reject_booking() {
        let conn = setup();
        add_booking(&conn, "b-1", &[]);
        reject_booking(&conn, "b-1").unwrap();
        assert_eq!(status_of(&conn, "b-1"), ModerationStatus::Rejected);
        assert!(matches!(
            reject_booking(&conn, "ghost"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_listing_applies_form() {
        let conn = setup();
        let listing = update_listing(&conn, "s-1", valid_update(), "VND").unwrap();
        assert_eq!(listing.title, "Camera rental");
        assert_eq!(listing.weekdays, vec!["mon", "sat"]);
        let price = listing.price_range.unwrap();
        assert_eq!((price.min, price.max), (Some(100000), Some(500000)));
        assert_eq!(price.currency, "VND");
        assert_eq!(listing.contacts.len(), 1);
    }

    #[test]
    fn test_update_listing_validation() {
        let conn = setup();

        let mut missing_title = valid_update();
        missing_title.title = Some("   ".to_string());
        assert!(matches!(
            update_listing(&conn, "s-1", missing_title, "VND"),
            Err(AppError::Validation(_))
        ));

        let mut inverted = valid_update();
        inverted.min = Some(900);
        inverted.max = Some(100);
        assert!(matches!(
            update_listing(&conn, "s-1", inverted, "VND"),
            Err(AppError::Validation(_))
        ));

        let mut bad_status = valid_update();
        bad_status.status = Some("archived".to_string());
        assert!(matches!(
            update_listing(&conn, "s-1", bad_status, "VND"),
            Err(AppError::Validation(_))
        ));

        let mut bad_day = valid_update();
        bad_day.weekdays = Some(vec!["someday".to_string()]);
        assert!(matches!(
            update_listing(&conn, "s-1", bad_day, "VND"),
            Err(AppError::Validation(_))
        ));

        let mut ambiguous_dates = valid_update();
        ambiguous_dates.selected_time_slots = Some(RawTimeSlots {
            slots: Some(vec!["2025-01-01".to_string()]),
            start: Some("2025-01-01".to_string()),
            end: Some("2025-01-02".to_string()),
        });
        assert!(matches!(
            update_listing(&conn, "s-1", ambiguous_dates, "VND"),
            Err(AppError::Validation(_))
        ));

        let mut half_range = valid_update();
        half_range.selected_time_slots = Some(RawTimeSlots {
            start: Some("2025-01-01".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            update_listing(&conn, "s-1", half_range, "VND"),
            Err(AppError::Validation(_))
        ));

        let mut bad_contact = valid_update();
        bad_contact.contacts = Some(vec![Contact {
            platform: "phone".to_string(),
            value: " ".to_string(),
        }]);
        assert!(matches!(
            update_listing(&conn, "s-1", bad_contact, "VND"),
            Err(AppError::Validation(_))
        ));

        assert!(matches!(
            update_listing(&conn, "ghost", valid_update(), "VND"),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_approve_listing_idempotent() {
        let conn = setup();
        let listing = approve_listing(&conn, "s-1").unwrap();
        assert_eq!(listing.status, ModerationStatus::Approved);
        let listing = approve_listing(&conn, "s-1").unwrap();
        assert_eq!(listing.status, ModerationStatus::Approved);
    }

    #[test]
    fn test_save_post_approves_pending() {
        let conn = setup();
        let listing = save_post(
            &conn,
            "s-1",
            PostUpdate {
                post_content: Some("## Camera for rent".to_string()),
                image_urls: vec!["https://cdn.example.com/1.jpg".to_string(), " ".to_string()],
                is_public: None,
            },
        )
        .unwrap();
        assert_eq!(listing.status, ModerationStatus::Approved);
        assert!(listing.is_public);
        assert!(listing.has_post());
        assert_eq!(listing.image_urls.len(), 1);
    }

    #[test]
    fn test_save_post_keeps_rejected_status() {
        let conn = setup();
        queries::update_listing_status(&conn, "s-1", ModerationStatus::Rejected).unwrap();
        let listing = save_post(
            &conn,
            "s-1",
            PostUpdate {
                post_content: Some("text".to_string()),
                image_urls: vec![],
                is_public: Some(false),
            },
        )
        .unwrap();
        assert_eq!(listing.status, ModerationStatus::Rejected);
        assert!(!listing.is_public);
    }

    #[test]
    fn test_save_post_validation() {
        let conn = setup();
        let empty = PostUpdate {
            post_content: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            save_post(&conn, "s-1", empty),
            Err(AppError::Validation(_))
        ));

        let too_many = PostUpdate {
            post_content: Some("text".to_string()),
            image_urls: (0..6).map(|i| format!("https://cdn.example.com/{i}.jpg")).collect(),
            is_public: None,
        };
        assert!(matches!(
            save_post(&conn, "s-1", too_many),
            Err(AppError::Validation(_))
        ));
    }
}
