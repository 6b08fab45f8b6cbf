use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use campus_compass::marketplace::media::UPLOADS_URL_PREFIX;
use campus_compass::marketplace::{marketplace_router, Marketplace};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Marketplace API plus operational endpoints and the public uploads directory.
pub(crate) fn with_marketplace_routes(marketplace: Arc<Marketplace>, uploads: &Path) -> Router {
    marketplace_router(marketplace)
        .nest_service(&format!("/{UPLOADS_URL_PREFIX}"), ServeDir::new(uploads))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use campus_compass::config::{AuthConfig, ModerationConfig, OtpConfig};
    use campus_compass::marketplace::media::MemoryImageStore;
    use campus_compass::marketplace::{MarketplaceSettings, MarketplaceStores};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        let settings = MarketplaceSettings {
            auth: AuthConfig {
                jwt_secret: "routes-test-secret".to_string(),
                token_ttl_hours: 1,
                bcrypt_cost: 4,
            },
            moderation: ModerationConfig::default(),
            otp: OtpConfig::default(),
            hide_internal_errors: true,
            trusted_proxies: Vec::new(),
        };
        let stores = MarketplaceStores::in_memory(Arc::new(MemoryImageStore::default()));
        let marketplace = Arc::new(Marketplace::new(settings, stores));
        with_marketplace_routes(marketplace, &std::env::temp_dir()).layer(Extension(state))
    }

    fn state() -> AppState {
        AppState::new(PrometheusBuilder::new().build_recorder().handle())
    }

    async fn status_of(router: Router, uri: &str) -> StatusCode {
        router
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds")
            .status()
    }

    #[tokio::test]
    async fn health_is_always_ok() {
        assert_eq!(status_of(app(state()), "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_follows_the_startup_flag() {
        let state = state();
        assert_eq!(
            status_of(app(state.clone()), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.readiness.store(true, Ordering::Release);
        assert_eq!(status_of(app(state), "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn marketplace_routes_are_mounted() {
        let router = app(state());
        assert_eq!(status_of(router.clone(), "/api/listings").await, StatusCode::OK);
        assert_eq!(
            status_of(router, "/api/listings/pending").await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let response = app(state())
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }
}
