//! HTTP surface of the marketplace. Every failure renders as `{success: false, message}`.

mod accounts;
mod bookings;
pub(crate) mod extract;
mod listings;
mod reviews;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::Value;

use super::error::{ApiError, MarketplaceError};
use super::media::{MAX_IMAGES_PER_REQUEST, MAX_IMAGE_BYTES};
use super::Marketplace;

/// Room for a full batch of images plus the text parts around them.
const BODY_LIMIT_BYTES: usize = MAX_IMAGES_PER_REQUEST * MAX_IMAGE_BYTES + 1_000_000;

pub(crate) type Reply = Result<Response, ApiError>;

pub(crate) fn ok(body: Value) -> Reply {
    Ok((StatusCode::OK, Json(body)).into_response())
}

pub(crate) fn created(body: Value) -> Reply {
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// Run password hashing or image file I/O off the async workers.
pub(crate) async fn run_blocking<T, F>(marketplace: &Arc<Marketplace>, task: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Marketplace) -> Result<T, MarketplaceError> + Send + 'static,
{
    let shared = Arc::clone(marketplace);
    tokio::task::spawn_blocking(move || task(&shared))
        .await
        .map_err(|err| MarketplaceError::Internal(format!("worker task failed: {err}")))
        .and_then(|outcome| outcome)
        .map_err(|err| marketplace.reject(err))
}

/// Build the marketplace API router.
pub fn marketplace_router(marketplace: Arc<Marketplace>) -> Router {
    Router::new()
        .route("/api/auth/register", post(accounts::register))
        .route("/api/auth/login", post(accounts::login))
        .route("/api/auth/me", get(accounts::profile))
        .route("/api/auth/verify-token", get(accounts::profile))
        .route("/api/auth/send-otp", post(accounts::send_otp))
        .route("/api/admin/login", post(accounts::admin_login))
        .route("/api/admin/verify", get(accounts::admin_verify))
        .route("/api/admin/stats", get(accounts::admin_stats))
        .route("/api/admin/activities", get(accounts::admin_activities))
        .route("/api/listings", get(listings::browse))
        .route("/api/listings/pending", get(listings::pending))
        .route("/api/listings/mine", get(listings::mine))
        .route("/api/listings/create/:category", post(listings::create))
        .route(
            "/api/listings/:key",
            get(listings::by_category)
                .put(listings::update)
                .delete(listings::remove),
        )
        .route("/api/listings/:key/approve", post(listings::approve))
        .route("/api/listings/:key/reject", post(listings::reject))
        .route("/api/listings/:key/resubmit", post(listings::resubmit))
        .route("/api/listings/:key/:id", get(listings::by_id))
        .route("/api/reviews", get(reviews::list_all).post(reviews::create))
        .route("/api/reviews/listing/:id", get(reviews::by_listing))
        .route("/api/reviews/:id", put(reviews::update).delete(reviews::remove))
        .route("/api/reviews/:id/feedback", post(reviews::feedback))
        .route("/api/bookings/user", get(bookings::for_user))
        .route("/api/bookings/owner", get(bookings::for_owner))
        .route(
            "/api/bookings/:id",
            post(bookings::create).delete(bookings::cancel),
        )
        .route("/api/bookings/:id/status", put(bookings::update_status))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(marketplace)
}
