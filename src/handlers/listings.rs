use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries::{self, DashboardStats};
use crate::errors::AppError;
use crate::handlers::check_auth;
use crate::models::{Listing, ListingKind, ModerationStatus, RentalDays};
use crate::services::csv_export::export_listings_csv;
use crate::services::currency::price_label;
use crate::services::moderation::{self, ListingUpdate, PostUpdate};
use crate::services::search::matches_search;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ListingResponse {
    #[serde(flatten)]
    listing: Listing,
    price_label: Option<String>,
    rental_days: String,
    has_post: bool,
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            price_label: listing.price_range.as_ref().and_then(price_label),
            rental_days: RentalDays::from_stored(&listing.weekdays).to_human_readable(),
            has_post: listing.has_post(),
            listing,
        }
    }
}

fn parse_kind(kind: Option<&str>) -> Result<Option<ListingKind>, AppError> {
    match kind.map(str::trim).filter(|k| !k.is_empty()) {
        Some(k) => ListingKind::parse(k)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("unknown listing kind: {k}"))),
        None => Ok(None),
    }
}

fn parse_status(status: Option<&str>) -> Result<Option<ModerationStatus>, AppError> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => ModerationStatus::from_request(s)
            .map(Some)
            .ok_or_else(|| AppError::Validation(format!("unknown status: {s}"))),
        None => Ok(None),
    }
}

// GET /api/admin/stats
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardStats>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let stats = {
        let db = state.db()?;
        queries::get_dashboard_stats(&db)?
    };
    Ok(Json(stats))
}

// GET /api/admin/listings
#[derive(Deserialize)]
pub struct ListingsQuery {
    pub kind: Option<String>,
    pub status: Option<String>,
    pub q: Option<String>,
}

pub async fn get_listings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<Vec<ListingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let kind = parse_kind(query.kind.as_deref())?;
    let status = parse_status(query.status.as_deref())?;

    let listings = {
        let db = state.db()?;
        queries::list_listings(&db, kind, status)?
    };

    let response = listings
        .into_iter()
        .filter(|l| matches_search(Some(&l.title), query.q.as_deref()))
        .map(ListingResponse::from)
        .collect();
    Ok(Json(response))
}

// GET /api/admin/listings/export.csv
#[derive(Deserialize)]
pub struct ExportQuery {
    pub kind: Option<String>,
}

pub async fn export_listings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    // services and demands have different column sets
    let kind = parse_kind(query.kind.as_deref())?
        .ok_or_else(|| AppError::Validation("kind is required for export".to_string()))?;
    let listings = {
        let db = state.db()?;
        queries::list_listings(&db, Some(kind), None)?
    };

    let csv = export_listings_csv(kind, &listings);
    let filename = format!("{}s.csv", kind.as_str());
    tracing::info!(rows = listings.len(), %filename, "exported listings");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

// GET /api/admin/listings/:id
pub async fn get_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ListingResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let listing = {
        let db = state.db()?;
        queries::get_listing(&db, &id)?
    };
    let listing = listing.ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;
    Ok(Json(listing.into()))
}

// PUT /api/admin/listings/:id
pub async fn update_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ListingUpdate>,
) -> Result<Json<ListingResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let listing = {
        let db = state.db()?;
        moderation::update_listing(&db, &id, body, &state.config.default_currency)?
    };
    Ok(Json(listing.into()))
}

// POST /api/admin/listings/:id/approve
pub async fn approve_listing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ListingResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let listing = {
        let db = state.db()?;
        moderation::approve_listing(&db, &id)?
    };
    Ok(Json(listing.into()))
}

// GET /api/admin/listings/:id/post
#[derive(Serialize)]
pub struct PostResponse {
    listing_id: String,
    title: String,
    status: ModerationStatus,
    post_content: String,
    image_urls: Vec<String>,
    is_public: bool,
    has_post: bool,
}

impl From<Listing> for PostResponse {
    fn from(listing: Listing) -> Self {
        Self {
            has_post: listing.has_post(),
            listing_id: listing.id,
            title: listing.title,
            status: listing.status,
            post_content: listing.post_content.unwrap_or_default(),
            image_urls: listing.image_urls,
            is_public: listing.is_public,
        }
    }
}

pub async fn get_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<PostResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let listing = {
        let db = state.db()?;
        queries::get_listing(&db, &id)?
    };
    let listing = listing.ok_or_else(|| AppError::NotFound(format!("listing {id}")))?;
    Ok(Json(listing.into()))
}

// POST /api/admin/listings/:id/post
pub async fn save_post(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<PostUpdate>,
) -> Result<Json<PostResponse>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let listing = {
        let db = state.db()?;
        moderation::save_post(&db, &id, body)?
    };
    Ok(Json(listing.into()))
}
