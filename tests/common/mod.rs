//! Shared utilities for integration tests.

use std::net::SocketAddr;

use rapi::{Handler, HttpServer, Shutdown};
use tokio::net::TcpListener;

/// A live server on an ephemeral port. Dropping it does not stop the
/// server; call [`TestServer::stop`].
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

/// Serve `handler` on 127.0.0.1 with an OS-assigned port.
#[allow(dead_code)]
pub async fn start_server(handler: Handler) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = HttpServer::new(handler).run(listener, rx).await;
    });

    TestServer { addr, shutdown }
}
