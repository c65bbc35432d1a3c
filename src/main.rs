use std::sync::Arc;

use chunkserve::config::Config;
use chunkserve::server;
use chunkserve::stats::ResourceStats;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    let stats = Arc::new(ResourceStats::new());

    tokio::select! {
        res = server::listener::run(&cfg, stats.clone()) => {
            if let Err(e) = &res {
                tracing::error!("Server failed: {:#}", e);
            }
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!(
        accepted = stats.connections_accepted(),
        open_sockets = stats.open_sockets(),
        open_files = stats.open_files(),
        bytes_sent = stats.total_bytes_sent(),
        "Shutdown complete"
    );

    Ok(())
}
