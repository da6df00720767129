//! Binary entrypoint for the blastgraph HTTP server.
//!
//! Configuration comes from `BLASTGRAPH_*` environment variables (see
//! [`ServerConfig`]); log filtering from `RUST_LOG`.

use std::process;

use tracing_subscriber::EnvFilter;

use blastgraph_server::config::ServerConfig;
use blastgraph_server::router::build_router;
use blastgraph_server::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = serve().await {
        tracing::error!(error = %e, "server stopped");
        process::exit(1);
    }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env()?;
    let state = AppState::new(&config)?;
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(db = %config.db_path, converge = config.propagation.converge, "blastgraph server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
