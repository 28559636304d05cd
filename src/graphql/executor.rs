//! Boundary to the GraphQL execution engine.
//!
//! The engine owns the schema, parsing, validation and resolvers. This layer
//! hands it one normalized request plus the operation kinds the transport
//! permits, and gets back either a result or one of two typed rejections.
//! Resolver and engine internal failures belong in
//! [`ExecutionResult::errors`], never in [`ExecutionError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graphql::operation::{OperationType, OperationTypes};
use crate::graphql::value::Variables;

/// Everything the engine needs to run one operation.
#[derive(Debug)]
pub struct ExecutionRequest<C, R> {
    pub query: Option<String>,
    pub variables: Option<Variables>,
    pub operation_name: Option<String>,
    pub context: C,
    pub root_value: R,
    /// The engine must reject an operation whose kind is not in this set.
    pub allowed_operation_types: OperationTypes,
}

/// Source location of a GraphQL error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// A GraphQL error as carried in the `errors` array of a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extensions
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value);
        self
    }
}

/// Outcome of an operation the engine accepted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    pub data: Option<serde_json::Value>,
    pub errors: Vec<GraphQLError>,
    pub extensions: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ExecutionResult {
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    pub fn error(error: GraphQLError) -> Self {
        Self {
            errors: vec![error],
            ..Default::default()
        }
    }
}

/// Engine rejections this layer turns into transport errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("{} are not allowed for this request", .0.plural())]
    InvalidOperationType(OperationType),

    #[error("no GraphQL query found")]
    MissingQuery,
}

/// An asynchronous execution engine.
#[async_trait]
pub trait Executor<C, R>: Send + Sync
where
    C: Send + 'static,
    R: Send + 'static,
{
    async fn execute(
        &self,
        request: ExecutionRequest<C, R>,
    ) -> Result<ExecutionResult, ExecutionError>;
}

/// A blocking execution engine, for thread-per-request hosts.
pub trait BlockingExecutor<C, R> {
    fn execute(&self, request: ExecutionRequest<C, R>) -> Result<ExecutionResult, ExecutionError>;
}
