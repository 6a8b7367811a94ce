use daily_dashboard::{router, AppConfig, AppState};
use std::net::SocketAddr;
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env();
    fs::create_dir_all(&config.data_dir).await?;
    match &config.remote_url {
        Some(url) => info!("syncing widgets with {url}"),
        None => info!("no remote configured, widgets are local-only"),
    }

    let state = AppState::new(&config);
    let app = router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.close_all().await;
    info!("panels closed, snapshots kept in {}", config.data_dir.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
}
