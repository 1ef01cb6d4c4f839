use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::services::calendar::{calendar_days, CalendarDay};
use crate::services::overlap::{find_collective_duplicates, DuplicateReport};
use crate::state::AppState;

#[derive(Serialize)]
pub struct CalendarResponse {
    listing_id: String,
    days: Vec<CalendarDay>,
    duplicates: Option<DuplicateReport>,
}

// GET /api/admin/listings/:id/calendar
pub async fn listing_calendar(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(listing_id): Path<String>,
) -> Result<Json<CalendarResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let bookings = {
        let db = state.db()?;
        if queries::get_listing(&db, &listing_id)?.is_none() {
            return Err(AppError::NotFound(format!("listing {listing_id}")));
        }
        queries::get_bookings_for_listing(&db, &listing_id)?
    };

    Ok(Json(CalendarResponse {
        days: calendar_days(&bookings),
        duplicates: find_collective_duplicates(&bookings),
        listing_id,
    }))
}
