//! Thin wrapper binary running `COMPUTING_POWER` independent worker loops
//! against a shared gRPC channel.

use std::process::ExitCode;

use calc_client::GrpcClient;
use calc_shared::config::WorkerConfig;
use calc_shared::logging;
use calc_worker::worker_loop;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "worker failed to start");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = WorkerConfig::from_env()?;
    info!(
        calculator_addr = %config.calculator_addr,
        computing_power = config.computing_power,
        "starting calculator worker"
    );

    let client = GrpcClient::connect(config.calculator_addr.clone()).await?;
    let cancel = CancellationToken::new();

    let mut handles = Vec::with_capacity(config.computing_power);
    for worker_id in 0..config.computing_power {
        let client = client.clone();
        let cancel = cancel.clone();
        handles.push(tokio::spawn(async move {
            worker_loop::run(worker_id, client, cancel).await;
        }));
    }

    signal::ctrl_c().await?;
    info!("received Ctrl+C, shutting down workers");
    cancel.cancel();

    for handle in handles {
        let _ = handle.await;
    }

    info!("worker shut down cleanly");
    Ok(())
}
