//! Home Monitoring Assistant - Main Entry Point

use anyhow::Context;
use api::settings::Settings;
use api::{init_logging, run_server};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_logging(&settings.logging)?;

    info!("=== Home Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Sampling every {} ms, alert threshold {:.2}",
        settings.monitor.analysis_interval_ms, settings.monitor.min_confidence
    );

    run_server(settings).await?;
    Ok(())
}
