use std::sync::Arc;
use std::time::Duration;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/admin/stats", get(handlers::listings::get_stats))
        .route("/api/admin/listings", get(handlers::listings::get_listings))
        .route(
            "/api/admin/listings/export.csv",
            get(handlers::listings::export_listings),
        )
        .route(
            "/api/admin/listings/:id",
            get(handlers::listings::get_listing).put(handlers::listings::update_listing),
        )
        .route(
            "/api/admin/listings/:id/approve",
            post(handlers::listings::approve_listing),
        )
        .route(
            "/api/admin/listings/:id/post",
            get(handlers::listings::get_post).post(handlers::listings::save_post),
        )
        .route(
            "/api/admin/listings/:id/bookings",
            get(handlers::bookings::get_listing_bookings),
        )
        .route(
            "/api/admin/listings/:id/calendar",
            get(handlers::calendar::listing_calendar),
        )
        .route("/api/admin/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/admin/bookings/:id/approve",
            post(handlers::bookings::approve_booking),
        )
        .route(
            "/api/admin/bookings/:id/reject",
            post(handlers::bookings::reject_booking),
        );

    let cors = cors_layer(state.config.cors_origin.as_deref());

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Any origin is allowed unless `CORS_ORIGIN` pins one.
fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    match origin.map(HeaderValue::from_str) {
        Some(Ok(value)) => layer.allow_origin(value),
        Some(Err(_)) => {
            tracing::warn!("CORS_ORIGIN is not a valid header value, allowing any origin");
            layer.allow_origin(Any)
        }
        None => layer.allow_origin(Any),
    }
}
