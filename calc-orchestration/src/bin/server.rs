//! Thin wrapper binary for running the orchestrator as a standalone gRPC
//! server.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use calc_orchestration::api::Orchestrator;
use calc_orchestration::grpc::CalcServiceImpl;
use calc_orchestration::store::SledStore;
use calc_orchestration::sweeper;
use calc_shared::config::OrchestratorConfig;
use calc_shared::logging;
use calc_shared::proto::calc::v1::calculator_service_server::CalculatorServiceServer;
use tokio::signal;
use tonic::transport::Server;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "orchestrator failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = OrchestratorConfig::from_env()?;
    info!(grpc_addr = %config.grpc_addr, db_path = %config.db_path, "starting calculator orchestrator");

    let store = Arc::new(SledStore::open(&config.db_path)?);
    let orchestrator = Arc::new(Orchestrator::new(
        store.clone(),
        config.lease_ttl_seconds * 1_000,
        config.timings,
    ));

    let sweep_interval = Duration::from_secs(config.sweep_interval_seconds);
    tokio::spawn(sweeper::run(store, sweep_interval));

    let addr = config.grpc_addr.parse()?;
    let service = CalcServiceImpl::new(orchestrator);

    info!(addr = %addr, "gRPC server listening");
    Server::builder()
        .add_service(CalculatorServiceServer::new(service))
        .serve_with_shutdown(addr, shutdown_signal())
        .await?;

    info!("orchestrator shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}
