//! Server bootstrap: wires the injected block store and parser into the
//! table registry and serves the Flight surface until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_flight::flight_service_server::FlightServiceServer;
use blockchain_common::{BlockParser, BlockSource};
use tonic::transport::Server;
use tracing::{error, info};

use crate::chains::Controller;
use crate::config::Config;
use crate::handler::FlightHandler;
use crate::metrics;
use crate::session::Session;

/// Initializes tracing from `RUST_LOG`, the way the service binaries do.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Runs the gateway until ctrl_c. The block store client and the parser
/// are injected by the embedding application.
pub async fn serve(
    config: Config,
    source: Arc<dyn BlockSource>,
    parser: Arc<dyn BlockParser>,
) -> Result<()> {
    info!("🚀 Starting {}", config.service_name);

    if let Err(err) = metrics::init_metrics(config.metrics_port) {
        error!("Metrics server error: {err:#}");
    }

    let session = Session::new(source, parser);
    let controller =
        Controller::new(&config, session.clone()).context("failed to build table registry")?;
    info!(
        chain = config.chain.as_str(),
        network = %config.network,
        tables = controller.tables().len(),
        "table registry ready",
    );

    let handler =
        FlightHandler::new(&controller, session).context("failed to build flight handler")?;

    let addr: SocketAddr = config
        .bind_address
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.bind_address))?;
    info!("✅ Flight server listening on {addr}");

    Server::builder()
        .add_service(FlightServiceServer::new(handler))
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("flight server terminated")?;

    info!("👋 {} stopped", config.service_name);
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("🛑 Received shutdown signal");
}
