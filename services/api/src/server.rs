use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campus_compass::config::AppConfig;
use campus_compass::error::AppError;
use campus_compass::marketplace::media::DiskImageStore;
use campus_compass::marketplace::{Marketplace, MarketplaceSettings, MarketplaceStores};
use campus_compass::telemetry;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(uploads_dir) = args.uploads_dir.take() {
        config.storage.uploads_dir = uploads_dir;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let images = DiskImageStore::new(config.storage.uploads_dir.clone());
    images.prepare()?;

    let marketplace = Arc::new(Marketplace::new(
        MarketplaceSettings::from_config(&config),
        MarketplaceStores::in_memory(Arc::new(images.clone())),
    ));
    if let Some(seed) = &config.bootstrap_admin {
        let admin = marketplace
            .accounts
            .ensure_admin(&seed.name, &seed.email, &seed.password)?;
        info!(admin_id = %admin.id, "bootstrap admin available");
    }

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let app_state = AppState::new(prometheus_handle);
    let readiness_flag = app_state.readiness.clone();

    let app = with_marketplace_routes(marketplace, images.root())
        .layer(Extension(app_state))
        .layer(TraceLayer::new_for_http())
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        uploads = %images.root().display(),
        "campus compass marketplace ready"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
