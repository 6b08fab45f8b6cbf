use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use super::extract::{json_body, parse_id, Authenticated};
use super::{created, ok, Reply};
use crate::marketplace::bookings::{BookingId, BookingRequest, StatusChange};
use crate::marketplace::listings::ListingId;
use crate::marketplace::Marketplace;

pub(crate) async fn create(
    State(marketplace): State<Arc<Marketplace>>,
    Path(listing): Path<String>,
    Authenticated(principal): Authenticated,
    payload: Option<Json<BookingRequest>>,
) -> Reply {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let booking = parse_id::<ListingId>(&listing, "listing")
        .and_then(|id| marketplace.bookings.create(&principal, &id, request))
        .map_err(|err| marketplace.reject(err))?;
    created(json!({ "success": true, "booking": booking }))
}

pub(crate) async fn for_user(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let bookings = marketplace
        .bookings
        .for_user(&principal)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "bookings": bookings }))
}

pub(crate) async fn for_owner(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let bookings = marketplace
        .bookings
        .for_owner(&principal)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "bookings": bookings }))
}

pub(crate) async fn update_status(
    State(marketplace): State<Arc<Marketplace>>,
    Path(id): Path<String>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Reply {
    let booking = parse_id::<BookingId>(&id, "booking")
        .and_then(|id| {
            let change = json_body(payload)?;
            marketplace
                .bookings
                .update_status(&principal, &id, &change.status)
        })
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "booking": booking }))
}

pub(crate) async fn cancel(
    State(marketplace): State<Arc<Marketplace>>,
    Path(id): Path<String>,
    Authenticated(principal): Authenticated,
) -> Reply {
    parse_id::<BookingId>(&id, "booking")
        .and_then(|id| marketplace.bookings.cancel(&principal, &id))
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "message": "Booking cancelled successfully" }))
}
