use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::BookingRecord;
use crate::services::moderation::{self, ApprovalOutcome};
use crate::services::overlap::{self, DuplicateReport};
use crate::services::search::matches_search;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingResponse {
    #[serde(flatten)]
    booking: BookingRecord,
    claimed_dates: Vec<NaiveDate>,
    has_conflict: bool,
}

#[derive(Serialize)]
pub struct ListingBookingsResponse {
    listing_id: String,
    bookings: Vec<BookingResponse>,
    duplicates: Option<DuplicateReport>,
}

#[derive(Deserialize)]
pub struct BookingsQuery {
    pub q: Option<String>,
}

// GET /api/admin/listings/:id/bookings
pub async fn get_listing_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<ListingBookingsResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let siblings = {
        let db = state.db()?;
        if queries::get_listing(&db, &listing_id)?.is_none() {
            return Err(AppError::NotFound(format!("listing {listing_id}")));
        }
        queries::get_bookings_for_listing(&db, &listing_id)?
    };

    // duplicates are computed over every sibling, the search only narrows what is shown
    let duplicates = overlap::find_collective_duplicates(&siblings);
    let bookings = siblings
        .iter()
        .filter(|b| matches_search(b.applicant_name.as_deref(), query.q.as_deref()))
        .map(|b| BookingResponse {
            claimed_dates: b.claimed_dates().into_iter().collect(),
            has_conflict: overlap::record_conflicts_with_others(b, &siblings),
            booking: b.clone(),
        })
        .collect();

    Ok(Json(ListingBookingsResponse {
        listing_id,
        bookings,
        duplicates,
    }))
}

// GET /api/admin/bookings/:id
#[derive(Serialize)]
pub struct BookingDetailResponse {
    #[serde(flatten)]
    booking: BookingRecord,
    claimed_dates: Vec<NaiveDate>,
    conflicting_dates: Vec<NaiveDate>,
    has_conflict: bool,
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<BookingDetailResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let (booking, siblings) = {
        let db = state.db()?;
        let booking = queries::get_booking_by_id(&db, &id)?
            .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;
        let siblings = queries::get_bookings_for_listing(&db, &booking.listing_id)?;
        (booking, siblings)
    };

    let conflicting_dates: Vec<NaiveDate> = overlap::conflicting_dates(&booking, &siblings)
        .into_iter()
        .collect();

    Ok(Json(BookingDetailResponse {
        claimed_dates: booking.claimed_dates().into_iter().collect(),
        has_conflict: !conflicting_dates.is_empty(),
        conflicting_dates,
        booking,
    }))
}

// POST /api/admin/bookings/:id/approve
#[derive(Deserialize)]
pub struct ApproveRequest {
    #[serde(default)]
    pub confirm: bool,
}

pub async fn approve_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Option<Json<ApproveRequest>>,
) -> Result<Response, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    // a bare POST means no confirmation
    let confirm = body.map(|Json(b)| b.confirm).unwrap_or(false);
    let outcome = {
        let db = state.db()?;
        moderation::approve_booking(&db, &id, confirm)?
    };

    let response = match outcome {
        ApprovalOutcome::Approved => {
            Json(serde_json::json!({ "ok": true, "outcome": "approved" })).into_response()
        }
        ApprovalOutcome::NeedsConfirmation { conflicting_dates } => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({
                "ok": false,
                "outcome": "needs_confirmation",
                "conflicting_dates": conflicting_dates,
                "error": "booking shares dates with other bookings, resend with confirm to approve anyway",
            })),
        )
            .into_response(),
    };
    Ok(response)
}

// POST /api/admin/bookings/:id/reject
pub async fn reject_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    {
        let db = state.db()?;
        moderation::reject_booking(&db, &id)?;
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
