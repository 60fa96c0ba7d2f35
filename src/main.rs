//! rapi demo server.
//!
//! ```text
//!     Client Request
//!     ─────────────▶ HttpServer (axum + TraceLayer)
//!                      → Handler (route table, method gate)
//!                      → binding (query | JSON body)
//!                      → middleware (request_id, ...)
//!                      → demo handlers
//!     ◀───────────── Sender (JSON, gzip/deflate)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rapi::config::{load_config, ServerConfig};
use rapi::http::middleware::request_id;
use rapi::lifecycle::{spawn_signal_listener, Shutdown};
use rapi::observability::init_logging;
use rapi::{demo, Handler, HttpServer};

#[derive(Parser)]
#[command(name = "rapi-server")]
#[command(about = "Demo JSON RPC server", long_about = None)]
struct Cli {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.logging)?;
    tracing::info!("rapi-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_request_body_size = config.limits.max_request_body_size,
        read_ms = config.timeouts.read_ms,
        write_ms = config.timeouts.write_ms,
        compression = config.compression.enabled,
        "Configuration loaded"
    );

    let handler = Handler::new(config.handler_options().with_middleware(request_id()));
    demo::register(&handler);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    HttpServer::new(handler)
        .run(listener, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
