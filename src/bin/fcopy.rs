//! Streams a file to standard output through the same chunked pipeline the
//! server uses, without the HTTP response head.
//!
//! ```text
//! $ fcopy index.html
//! ```

use std::sync::Arc;

use chunkserve::config::DEFAULT_BUFFER_SIZE;
use chunkserve::http::pipeline::FilePipeline;
use chunkserve::stats::ResourceStats;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let mut args = std::env::args();
    if args.len() != 2 {
        eprintln!("Usage: fcopy <FILE>");
        std::process::exit(1);
    }
    let Some(path) = args.nth(1) else {
        std::process::exit(1);
    };

    let mut stdout = tokio::io::stdout();
    let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];
    let mut pipeline = FilePipeline::new(path, Arc::new(ResourceStats::new()));

    if let Err(e) = pipeline.run(&mut stdout, &mut buffer).await {
        tracing::error!(kind = e.kind(), "{}", e);
        std::process::exit(1);
    }
}
