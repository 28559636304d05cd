//! GraphQL over HTTP server
//!
//! Serves the demo schema over the GraphQL-over-HTTP protocol layer.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request     ┌──────────┐    ┌─────────────┐    ┌─────────────┐
//!     ──────────────────▶│   http   │───▶│ graphql     │───▶│  executor   │
//!                        │  (axum)  │    │ view/parser │    │  (engine)   │
//!     Client Response    │          │    │             │    │             │
//!     ◀──────────────────│ response │◀───│ response    │◀───│   result    │
//!                        └──────────┘    └─────────────┘    └─────────────┘
//!
//!     cross-cutting: config, observability, lifecycle
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use graphql_http::config::{load_config, ServerConfig};
use graphql_http::demo::HelloSchema;
use graphql_http::lifecycle::{signals, Shutdown};
use graphql_http::observability::{logging, metrics};
use graphql_http::{GraphQLView, HttpServer, ViewOptions};

#[derive(Debug, Parser)]
#[command(name = "graphql-http", version, about = "GraphQL over HTTP server")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "graphql-http starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        path = %config.graphql.path,
        allow_queries_via_get = config.graphql.allow_queries_via_get,
        console_enabled = config.graphql.console_enabled,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let view = GraphQLView::new(HelloSchema).with_options(ViewOptions::from(&config.graphql));
    let server = HttpServer::new(config, view);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
