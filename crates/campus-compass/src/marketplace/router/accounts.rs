use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::extract::{json_body, Authenticated, ClientIp};
use super::{created, ok, run_blocking, Reply};
use crate::marketplace::accounts::{require_admin, Credentials, Registration};
use crate::marketplace::Marketplace;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OtpRequest {
    #[serde(default)]
    phone_number: String,
}

pub(crate) async fn register(
    State(marketplace): State<Arc<Marketplace>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Reply {
    let registration = json_body(payload).map_err(|err| marketplace.reject(err))?;
    let session =
        run_blocking(&marketplace, move |market| market.accounts.register(registration)).await?;
    created(json!({
        "success": true,
        "token": session.token,
        "user": session.account,
    }))
}

pub(crate) async fn login(
    State(marketplace): State<Arc<Marketplace>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Reply {
    let credentials = json_body(payload).map_err(|err| marketplace.reject(err))?;
    let session =
        run_blocking(&marketplace, move |market| market.accounts.login(credentials)).await?;
    ok(json!({
        "success": true,
        "token": session.token,
        "user": session.account,
    }))
}

pub(crate) async fn profile(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let account = marketplace
        .accounts
        .profile(&principal)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "user": account }))
}

pub(crate) async fn send_otp(
    State(marketplace): State<Arc<Marketplace>>,
    ClientIp(ip): ClientIp,
    payload: Result<Json<OtpRequest>, JsonRejection>,
) -> Reply {
    let request = json_body(payload).map_err(|err| marketplace.reject(err))?;
    marketplace
        .otp
        .check(&ip, &request.phone_number)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "message": "Security checks passed" }))
}

pub(crate) async fn admin_login(
    State(marketplace): State<Arc<Marketplace>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Reply {
    let credentials = json_body(payload).map_err(|err| marketplace.reject(err))?;
    let session = run_blocking(&marketplace, move |market| {
        market.accounts.admin_login(credentials)
    })
    .await?;
    ok(json!({
        "success": true,
        "token": session.token,
        "admin": session.account,
    }))
}

pub(crate) async fn admin_verify(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let admin = require_admin(&principal, "access the admin panel")
        .and_then(|()| marketplace.accounts.profile(&principal))
        .map_err(|err| marketplace.reject(err))?;
    ok(json!({ "success": true, "admin": admin }))
}

pub(crate) async fn admin_stats(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let stats = marketplace
        .dashboard_stats(&principal)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!(stats))
}

pub(crate) async fn admin_activities(
    State(marketplace): State<Arc<Marketplace>>,
    Authenticated(principal): Authenticated,
) -> Reply {
    let activity = marketplace
        .recent_activity(&principal)
        .map_err(|err| marketplace.reject(err))?;
    ok(json!(activity))
}
