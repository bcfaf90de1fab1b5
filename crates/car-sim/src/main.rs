//! Car Simulator - Main Entry Point
//!
//! Usage: `car-sim [CONFIG_FILE]`. Runs until Ctrl-C.

use car_sim::{init_logging, install_metrics, run, SimConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args().nth(1);
    let config = SimConfig::load(path.as_deref())?;
    init_logging(&config)?;

    info!("=== Car Simulator v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Telemetry log: {}", config.log_path.display());

    if let Some(addr) = config.metrics_listen {
        install_metrics(addr)?;
    }

    let summary = run(config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Ctrl-C received, shutting down");
    })
    .await?;

    info!(
        "Simulation finished after {} telemetry samples",
        summary.snapshot.write_count
    );
    Ok(())
}
