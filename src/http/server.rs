//! HTTP server setup.
//!
//! # Responsibilities
//! - Mount a [`Handler`] as the sole service of an axum router
//! - Wrap it in request tracing
//! - Serve a listener until shutdown is signalled
//!
//! # Design Decisions
//! - Routing is the dispatcher's job, so the router only has a fallback
//! - Graceful shutdown lets in-flight calls finish writing

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::handler::Handler;

/// Serves one dispatcher over HTTP/1.1 and HTTP/2.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(handler: Handler) -> Self {
        let router = Router::new()
            .fallback_service(handler)
            .layer(TraceLayer::new_for_http());
        Self { router }
    }

    /// Accept connections until a value arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
