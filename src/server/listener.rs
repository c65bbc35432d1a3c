use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::{Config, StaticFilesConfig};
use crate::error::ServeError;
use crate::http::connection::Connection;
use crate::stats::ResourceStats;

pub async fn run(cfg: &Config, stats: Arc<ResourceStats>) -> anyhow::Result<()> {
    let listener = bind(&cfg.server.listen_addr).await?;
    info!("Listening on {}", cfg.server.listen_addr);

    serve(listener, cfg.static_files.clone(), stats).await;
    Ok(())
}

pub async fn bind(addr: &str) -> Result<TcpListener, ServeError> {
    TcpListener::bind(addr).await.map_err(|source| ServeError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Pause before the next accept. Errors like `EMFILE` persist until a
/// connection closes, so an immediate retry would spin.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

/// Accepts connections forever, running each one on its own task.
///
/// A failed accept only costs that one connection.
pub async fn serve(listener: TcpListener, static_config: StaticFilesConfig, stats: Arc<ResourceStats>) {
    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                pause_after_accept_error(e).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let mut conn = Connection::new(socket, static_config.clone(), stats.clone());
        tokio::spawn(async move {
            match conn.run().await {
                Ok(bytes) => debug!(%peer, bytes, "Connection closed"),
                Err(e) => warn!(%peer, kind = e.kind(), error = %e, "Connection closed with error"),
            }
        });
    }
}

async fn pause_after_accept_error(e: io::Error) {
    let err = ServeError::Accept(e);
    warn!(error = %err, "Accept failed, continuing");
    tokio::time::sleep(ACCEPT_BACKOFF).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn accept_error_pauses_before_retry() {
        let started = Instant::now();
        pause_after_accept_error(io::Error::from_raw_os_error(24)).await;
        assert!(started.elapsed() >= ACCEPT_BACKOFF);
    }
}
