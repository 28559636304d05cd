//! The GraphQL-over-HTTP request orchestrator.
//!
//! # Data Flow
//! ```text
//! request
//!     → admit (GET/POST only; bare GET → console or 404)
//!     → parser.rs (query params / JSON / multipart)
//!     → context + root value construction (user supplied)
//!     → operation.rs (allowed operation kinds)
//!     → executor (external engine)
//!     → response.rs (status, content type, body)
//!     → merged with the context-phase sub-response
//! ```
//!
//! # Design Decisions
//! - One pass per request, no retries; every failure maps to exactly one
//!   response
//! - `run` and `run_blocking` share every step and differ only in how the
//!   body is read and how collaborators are awaited
//! - Engine failures other than the two typed rejections are the engine's
//!   business and arrive inside the execution result

use async_trait::async_trait;
use http::Method;

use crate::graphql::console;
use crate::graphql::error::ProtocolError;
use crate::graphql::executor::{
    BlockingExecutor, ExecutionError, ExecutionRequest, ExecutionResult, Executor,
};
use crate::graphql::operation;
use crate::graphql::parser;
use crate::graphql::request::GraphQLRequestData;
use crate::graphql::response::{GraphQLHttpResponse, ResponseBuilder};
use crate::graphql::transport::{
    BlockingTransportRequest, RequestHead, SubResponse, TransportRequest, TransportResponse,
};

/// Builds the per-request context handed to the engine.
///
/// Plain closures `Fn(&dyn RequestHead, &mut SubResponse) -> T` implement
/// this; implement it by hand when construction has to await.
#[async_trait]
pub trait ContextBuilder: Send + Sync {
    type Context: Send + 'static;

    async fn build_context(
        &self,
        request: &dyn RequestHead,
        response: &mut SubResponse,
    ) -> Self::Context;
}

#[async_trait]
impl<F, C> ContextBuilder for F
where
    F: Fn(&dyn RequestHead, &mut SubResponse) -> C + Send + Sync,
    C: Send + 'static,
{
    type Context = C;

    async fn build_context(&self, request: &dyn RequestHead, response: &mut SubResponse) -> C {
        self(request, response)
    }
}

/// Builds the per-request root value handed to the engine.
#[async_trait]
pub trait RootValueBuilder: Send + Sync {
    type RootValue: Send + 'static;

    async fn build_root_value(&self, request: &dyn RequestHead) -> Self::RootValue;
}

#[async_trait]
impl<F, R> RootValueBuilder for F
where
    F: Fn(&dyn RequestHead) -> R + Send + Sync,
    R: Send + 'static,
{
    type RootValue = R;

    async fn build_root_value(&self, request: &dyn RequestHead) -> R {
        self(request)
    }
}

/// Context builder used until one is configured.
pub type DefaultContext = fn(&dyn RequestHead, &mut SubResponse);

/// Root value builder used until one is configured.
pub type DefaultRootValue = fn(&dyn RequestHead);

fn no_context(_: &dyn RequestHead, _: &mut SubResponse) {}

fn no_root_value(_: &dyn RequestHead) {}

/// Switches read by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewOptions {
    /// Execute queries sent with GET.
    pub allow_queries_via_get: bool,
    /// Serve the interactive console to browsers on a bare GET.
    pub console_enabled: bool,
    /// Log every operation before it executes.
    pub debug: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            allow_queries_via_get: true,
            console_enabled: true,
            debug: false,
        }
    }
}

enum Admission {
    Console,
    Execute,
}

/// Serves GraphQL over HTTP for one execution engine.
pub struct GraphQLView<E, C = DefaultContext, V = DefaultRootValue> {
    executor: E,
    context_builder: C,
    root_value_builder: V,
    options: ViewOptions,
    responses: ResponseBuilder,
}

impl<E> GraphQLView<E> {
    /// A view over `executor` with no context, no root value and default
    /// options.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            context_builder: no_context,
            root_value_builder: no_root_value,
            options: ViewOptions::default(),
            responses: ResponseBuilder::new(),
        }
    }
}

impl<E, C, V> GraphQLView<E, C, V> {
    /// Replace the view options.
    pub fn with_options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }

    /// Build the context with a closure.
    pub fn with_context<F, Ctx>(self, context_builder: F) -> GraphQLView<E, F, V>
    where
        F: Fn(&dyn RequestHead, &mut SubResponse) -> Ctx + Send + Sync,
    {
        self.with_context_builder(context_builder)
    }

    /// Build the context with any builder, including asynchronous ones.
    pub fn with_context_builder<C2>(self, context_builder: C2) -> GraphQLView<E, C2, V> {
        GraphQLView {
            executor: self.executor,
            context_builder,
            root_value_builder: self.root_value_builder,
            options: self.options,
            responses: self.responses,
        }
    }

    /// Build the root value with a closure.
    pub fn with_root_value<F, Root>(self, root_value_builder: F) -> GraphQLView<E, C, F>
    where
        F: Fn(&dyn RequestHead) -> Root + Send + Sync,
    {
        self.with_root_value_builder(root_value_builder)
    }

    /// Build the root value with any builder, including asynchronous ones.
    pub fn with_root_value_builder<V2>(self, root_value_builder: V2) -> GraphQLView<E, C, V2> {
        GraphQLView {
            executor: self.executor,
            context_builder: self.context_builder,
            root_value_builder,
            options: self.options,
            responses: self.responses,
        }
    }

    /// Reshape execution results before they are encoded.
    pub fn with_result_transform(
        mut self,
        transform: impl Fn(ExecutionResult) -> GraphQLHttpResponse + Send + Sync + 'static,
    ) -> Self {
        self.responses = self.responses.with_result_transform(transform);
        self
    }

    /// Encode response bodies with `encoder` instead of `serde_json`.
    pub fn with_json_encoder(
        mut self,
        encoder: impl Fn(&GraphQLHttpResponse) -> Result<Vec<u8>, serde_json::Error>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.responses = self.responses.with_json_encoder(encoder);
        self
    }

    fn admit(&self, request: &dyn RequestHead) -> Result<Admission, ProtocolError> {
        let method = request.method();
        if method != Method::GET && method != Method::POST {
            return Err(ProtocolError::MethodNotAllowed);
        }

        if method == Method::GET && request.query_params().is_empty() {
            if self.options.console_enabled && console::accepts_html(request) {
                return Ok(Admission::Console);
            }
            return Err(ProtocolError::NotFound);
        }

        Ok(Admission::Execute)
    }

    fn reject(&self, error: ProtocolError) -> TransportResponse {
        match &error {
            ProtocolError::NotFound => {
                tracing::debug!("Bare GET without a console, nothing to execute");
            }
            ProtocolError::BodyRead(detail) => {
                tracing::warn!(
                    status = error.status().as_u16(),
                    detail = %detail,
                    "Failed to read GraphQL request body"
                );
            }
            _ => {
                tracing::warn!(
                    status = error.status().as_u16(),
                    error = %error,
                    "GraphQL request rejected"
                );
            }
        }
        self.responses.error(&error)
    }

    fn execution_request<Ctx, Root>(
        &self,
        method: &Method,
        data: GraphQLRequestData,
        context: Ctx,
        root_value: Root,
    ) -> ExecutionRequest<Ctx, Root> {
        let allowed_operation_types =
            operation::allowed_types(method, self.options.allow_queries_via_get);

        if self.options.debug {
            tracing::info!(
                operation_name = ?data.operation_name,
                query = ?data.query,
                variables = ?data.variables,
                allowed = ?allowed_operation_types,
                "Executing GraphQL operation"
            );
        }

        ExecutionRequest {
            query: data.query,
            variables: data.variables,
            operation_name: data.operation_name,
            context,
            root_value,
            allowed_operation_types,
        }
    }

    fn respond(
        &self,
        method: &Method,
        outcome: Result<ExecutionResult, ExecutionError>,
    ) -> TransportResponse {
        match outcome {
            Ok(result) => self.responses.build(result),
            Err(error) => self.reject(ProtocolError::from_execution(error, method)),
        }
    }

    /// Run one request on a thread-per-request host.
    pub fn run_blocking<R, Ctx, Root>(&self, mut request: R) -> TransportResponse
    where
        R: BlockingTransportRequest,
        C: Fn(&dyn RequestHead, &mut SubResponse) -> Ctx,
        V: Fn(&dyn RequestHead) -> Root,
        E: BlockingExecutor<Ctx, Root>,
    {
        match self.admit(&request) {
            Ok(Admission::Console) => return TransportResponse::html(console::render()),
            Ok(Admission::Execute) => {}
            Err(error) => return self.reject(error),
        }

        let data = match parser::parse_blocking(&mut request) {
            Ok(data) => data,
            Err(error) => return self.reject(error),
        };

        let mut sub_response = SubResponse::new();
        let context = (self.context_builder)(&request, &mut sub_response);
        let root_value = (self.root_value_builder)(&request);

        let execution = self.execution_request(request.method(), data, context, root_value);
        let outcome = self.executor.execute(execution);

        self.respond(request.method(), outcome).merge(sub_response)
    }
}

impl<E, C, V> GraphQLView<E, C, V>
where
    C: ContextBuilder,
    V: RootValueBuilder,
    E: Executor<C::Context, V::RootValue>,
{
    /// Run one request on an async host.
    pub async fn run<R: TransportRequest>(&self, mut request: R) -> TransportResponse {
        match self.admit(&request) {
            Ok(Admission::Console) => return TransportResponse::html(console::render()),
            Ok(Admission::Execute) => {}
            Err(error) => return self.reject(error),
        }

        let data = match parser::parse(&mut request).await {
            Ok(data) => data,
            Err(error) => return self.reject(error),
        };

        let mut sub_response = SubResponse::new();
        let context = self
            .context_builder
            .build_context(&request, &mut sub_response)
            .await;
        let root_value = self.root_value_builder.build_root_value(&request).await;

        let execution = self.execution_request(request.method(), data, context, root_value);
        let outcome = self.executor.execute(execution).await;

        self.respond(request.method(), outcome).merge(sub_response)
    }
}
