use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::extract::{json_body, parse_id, Authenticated, MultipartForm};
use super::{created, ok, run_blocking, Reply};
use crate::marketplace::listings::ListingId;
use crate::marketplace::reviews::ReviewId;
use crate::marketplace::Marketplace;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FeedbackRequest {
    #[serde(default)]
    comment: String,
}

pub(crate) async fn create(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
    multipart: Multipart,
) -> Reply {
    let form = MultipartForm::read(multipart)
        .await
        .map_err(|err| marketplace.reject(err))?;
    let form = form.into_review_form();
    let review = run_blocking(&marketplace, move |market| {
        market.reviews.create(&principal, form)
    })
    .await?;
    created(json!({ "success": true, "review": review }))
}

pub(crate) async fn list_all(State(marketplace): State<Arc<Marketplace>>) -> Reply {
    let reviews = marketplace
        .reviews
        .list_all()
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "reviews": reviews }))
}

pub(crate) async fn by_listing(
    State(marketplace): State<Arc<Marketplace>>,
    Path(id): Path<String>,
) -> Reply {
    let reviews = parse_id::<ListingId>(&id, "listing")
        .and_then(|id| marketplace.reviews.list_by_listing(&id))
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "reviews": reviews }))
}

pub(crate) async fn update(
    State(marketplace): State<Arc<Marketplace>>,
    Path(id): Path<String>,
    Authenticated(principal): Authenticated,
    multipart: Multipart,
) -> Reply {
    let id = parse_id::<ReviewId>(&id, "review").map_err(|err| marketplace.reject(err))?;
    let form = MultipartForm::read(multipart)
        .await
        .map_err(|err| marketplace.reject(err))?;
    let update = form.into_review_update();
    let review = run_blocking(&marketplace, move |market| {
        market.reviews.update(&principal, &id, update)
    })
    .await?;
    ok(json!({ "success": true, "review": review }))
}

pub(crate) async fn remove(
    State(marketplace): State<Arc<Marketplace>>,
    Path(id): Path<String>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let id = parse_id::<ReviewId>(&id, "review").map_err(|err| marketplace.reject(err))?;
    run_blocking(&marketplace, move |market| {
        market.reviews.delete(&principal, &id)
    })
    .await?;
    ok(json!({ "success": true, "message": "Review deleted successfully" }))
}

pub(crate) async fn feedback(
    State(marketplace): State<Arc<Marketplace>>,
    Path(id): Path<String>,
    Authenticated(principal): Authenticated,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Reply {
    let review = parse_id::<ReviewId>(&id, "review")
        .and_then(|id| {
            let request = json_body(payload)?;
            marketplace
                .reviews
                .attach_feedback(&principal, &id, &request.comment)
        })
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "review": review }))
}
