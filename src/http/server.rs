//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with the GraphQL endpoint
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bind server to listener and stop on the shutdown signal
//! - Record per-request metrics

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::graphql::executor::Executor;
use crate::graphql::transport::TransportResponse;
use crate::graphql::view::{ContextBuilder, GraphQLView, RootValueBuilder};
use crate::http::request::{AxumRequest, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Anything that can answer a GraphQL request arriving through axum.
///
/// Implemented for every [`GraphQLView`] whose engine and builders are
/// asynchronous, which lets the server hold views of any type.
#[async_trait]
pub trait GraphQLService: Send + Sync + 'static {
    async fn handle(&self, request: AxumRequest) -> TransportResponse;
}

#[async_trait]
impl<E, C, V> GraphQLService for GraphQLView<E, C, V>
where
    C: ContextBuilder + 'static,
    V: RootValueBuilder + 'static,
    E: Executor<C::Context, V::RootValue> + 'static,
{
    async fn handle(&self, request: AxumRequest) -> TransportResponse {
        self.run(request).await
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn GraphQLService>,
    pub max_body_size: usize,
}

/// HTTP server exposing one GraphQL endpoint.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Route `config.graphql.path` to `service` behind the middleware stack.
    pub fn new(config: ServerConfig, service: impl GraphQLService) -> Self {
        let state = AppState {
            service: Arc::new(service),
            max_body_size: config.limits.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        Router::new()
            .route(&config.graphql.path, any(graphql_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// A clone of the router, for driving it without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight
    /// requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            path = %self.config.graphql.path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn graphql_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();

    let response = state
        .service
        .handle(AxumRequest::new(request, state.max_body_size))
        .await;

    let status = response.status.as_u16();
    metrics::record_request(&method, status, start_time);
    tracing::debug!(
        method = %method,
        status,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "GraphQL request handled"
    );

    response.into_response()
}
