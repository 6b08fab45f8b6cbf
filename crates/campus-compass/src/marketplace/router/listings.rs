use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::extract::{json_body, parse_id, Authenticated, MultipartForm};
use super::{created, ok, run_blocking, Reply};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::listings::{Category, ListingId, ListingPatch};
use crate::marketplace::Marketplace;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RejectRequest {
    #[serde(default)]
    rejection_reason: Option<String>,
}

fn category(segment: &str) -> Result<Category, MarketplaceError> {
    Category::from_path_segment(segment).ok_or_else(|| {
        MarketplaceError::not_found(format!("Unknown listing category '{segment}'"))
    })
}

fn listing_id(raw: &str) -> Result<ListingId, MarketplaceError> {
    parse_id(raw, "listing")
}

pub(crate) async fn browse(State(marketplace): State<Arc<Marketplace>>) -> Reply {
    let listings = marketplace
        .listings
        .browse()
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "listings": listings }))
}

pub(crate) async fn pending(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let listings = marketplace
        .listings
        .list_pending(&principal)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "listings": listings }))
}

pub(crate) async fn mine(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let listings = marketplace
        .listings
        .owned(&principal)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "listings": listings }))
}

pub(crate) async fn by_category(
    State(marketplace): State<Arc<Marketplace>>,
    Path(key): Path<String>,
) -> Reply {
    let listings = category(&key)
        .and_then(|category| marketplace.listings.list_approved(category))
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "listings": listings }))
}

pub(crate) async fn by_id(
    State(marketplace): State<Arc<Marketplace>>,
    Path((key, id)): Path<(String, String)>,
) -> Reply {
    let listing = category(&key)
        .and_then(|category| {
            let id = listing_id(&id)?;
            marketplace.listings.find_in_category(category, &id)
        })
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "listing": listing }))
}

pub(crate) async fn create(
    State(marketplace): State<Arc<Marketplace>>,
    Path(segment): Path<String>,
    Authenticated(principal): Authenticated,
    multipart: Multipart,
) -> Reply {
    let category = category(&segment).map_err(|err| marketplace.reject(err))?;
    let form = MultipartForm::read(multipart)
        .await
        .map_err(|err| marketplace.reject(err))?;
    let form = form.into_listing_form();
    let listing = run_blocking(&marketplace, move |market| {
        market.listings.create(&principal, category, form)
    })
    .await?;
    created(json!({
        "success": true,
        "message": "Listing created successfully and pending approval",
        "listing": listing,
    }))
}

pub(crate) async fn approve(
    State(marketplace): State<Arc<Marketplace>>,
    Path(key): Path<String>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let listing = listing_id(&key)
        .and_then(|id| marketplace.listings.approve(&principal, &id))
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({
        "success": true,
        "message": "Listing approved successfully",
        "listing": listing,
    }))
}

pub(crate) async fn reject(
    State(marketplace): State<Arc<Marketplace>>,
    Path(key): Path<String>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<RejectRequest>, JsonRejection>,
) -> Reply {
    let listing = listing_id(&key)
        .and_then(|id| {
            let reason = match payload {
                Err(JsonRejection::MissingJsonContentType(_)) => String::new(),
                other => json_body(other)?.rejection_reason.unwrap_or_default(),
            };
            marketplace.listings.reject(&principal, &id, reason)
        })
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({
        "success": true,
        "message": "Listing rejected successfully",
        "listing": listing,
    }))
}

pub(crate) async fn resubmit(
    State(marketplace): State<Arc<Marketplace>>,
    Path(key): Path<String>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let listing = listing_id(&key)
        .and_then(|id| marketplace.listings.resubmit(&principal, &id))
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({
        "success": true,
        "message": "Listing resubmitted for approval",
        "listing": listing,
    }))
}

pub(crate) async fn update(
    State(marketplace): State<Arc<Marketplace>>,
    Path(key): Path<String>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<ListingPatch>, JsonRejection>,
) -> Reply {
    let listing = listing_id(&key)
        .and_then(|id| {
            let patch = json_body(payload)?;
            marketplace.listings.update(&principal, &id, patch)
        })
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "listing": listing }))
}

pub(crate) async fn remove(
    State(marketplace): State<Arc<Marketplace>>,
    Path(key): Path<String>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let id = listing_id(&key).map_err(|err| marketplace.reject(err))?;
    run_blocking(&marketplace, move |market| {
        market.listings.delete(&principal, &id)
    })
    .await?;
    ok(json!({ "success": true, "message": "Listing deleted successfully" }))
}
