//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use graphql_http::config::ServerConfig;
use graphql_http::demo::HelloSchema;
use graphql_http::http::HttpServer;
use graphql_http::lifecycle::Shutdown;
use graphql_http::{GraphQLView, ViewOptions};
use tokio::net::TcpListener;

/// A running server and the handle that stops it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}/graphql", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the demo schema on an ephemeral local port.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let view = GraphQLView::new(HelloSchema).with_options(ViewOptions::from(&config.graphql));
    let server = HttpServer::new(config, view);

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    TestServer { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
