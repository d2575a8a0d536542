use std::sync::Arc;
use std::time::Duration;
use ride_reconciler::{
    RideResult,
    handlers,
    state::{AppConfig, AppState},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> RideResult<()> {
    init_tracing();

    let config = AppConfig::from_env()?;
    let bind_addr = config.bind_addr.clone();
    let snapshot_ttl = config.snapshot_ttl_seconds;

    let app_state = Arc::new(AppState::new(config)?);

    // Expired snapshots are never served, this only bounds memory.
    let cache = app_state.snapshot_cache.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(snapshot_ttl));
        loop {
            ticker.tick().await;
            let purged = cache.purge_expired().await;
            if purged > 0 {
                tracing::debug!("Purged {} expired snapshots", purged);
            }
        }
    });

    let app = handlers::router(app_state.clone());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(
        "ride-reconciler listening on {} (backend {})",
        bind_addr,
        app_state.config.backend_base_url
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ride_reconciler=info,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Unable to install ctrl+c handler: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
