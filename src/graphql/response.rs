//! Turning execution outcomes into HTTP responses.
//!
//! # Design Decisions
//! - A result is always sent with 200, even when it carries GraphQL errors
//! - `errors` and `extensions` are left out of the body when empty
//! - The result transform and the JSON encoder are pluggable; their output
//!   is trusted as-is

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::graphql::error::ProtocolError;
use crate::graphql::executor::{ExecutionResult, GraphQLError};
use crate::graphql::transport::TransportResponse;

/// Body of a successful GraphQL-over-HTTP response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLHttpResponse {
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

fn is_empty_map(map: &Option<serde_json::Map<String, serde_json::Value>>) -> bool {
    map.as_ref().map_or(true, |map| map.is_empty())
}

impl From<ExecutionResult> for GraphQLHttpResponse {
    fn from(result: ExecutionResult) -> Self {
        Self {
            data: result.data,
            errors: result.errors,
            extensions: result.extensions,
        }
    }
}

/// Rewrites an execution result before it is serialized.
pub type ResultTransform = Arc<dyn Fn(ExecutionResult) -> GraphQLHttpResponse + Send + Sync>;

/// Serializes the response body.
pub type JsonEncoder =
    Arc<dyn Fn(&GraphQLHttpResponse) -> Result<Vec<u8>, serde_json::Error> + Send + Sync>;

/// Maps execution results and transport errors to [`TransportResponse`]s.
#[derive(Clone, Default)]
pub struct ResponseBuilder {
    transform: Option<ResultTransform>,
    encoder: Option<JsonEncoder>,
}

impl ResponseBuilder {
    /// Plain `{data, errors, extensions}` bodies, encoded by `serde_json`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the result-to-body mapping.
    pub fn with_result_transform(
        mut self,
        transform: impl Fn(ExecutionResult) -> GraphQLHttpResponse + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Replace the JSON encoder. A failing encoder yields a 500.
    pub fn with_json_encoder(
        mut self,
        encoder: impl Fn(&GraphQLHttpResponse) -> Result<Vec<u8>, serde_json::Error>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.encoder = Some(Arc::new(encoder));
        self
    }

    /// A 200 JSON response for an executed operation.
    pub fn build(&self, result: ExecutionResult) -> TransportResponse {
        let response = match &self.transform {
            Some(transform) => transform(result),
            None => GraphQLHttpResponse::from(result),
        };

        let encoded = match &self.encoder {
            Some(encoder) => encoder(&response),
            None => serde_json::to_vec(&response),
        };

        match encoded {
            Ok(body) => TransportResponse::json(body),
            Err(err) => {
                tracing::error!(error = %err, "Failed to encode GraphQL response");
                TransportResponse::text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
        }
    }

    /// A plain text response for a transport error.
    pub fn error(&self, error: &ProtocolError) -> TransportResponse {
        match error {
            ProtocolError::NotFound => TransportResponse::empty(StatusCode::NOT_FOUND),
            _ => TransportResponse::text(error.status(), error.reason()),
        }
    }
}

impl fmt::Debug for ResponseBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBuilder")
            .field("transform", &self.transform.is_some())
            .field("encoder", &self.encoder.is_some())
            .finish()
    }
}
