//! A minimal stand-in engine served by the `graphql-http` binary.
//!
//! It does not parse GraphQL. The operation kind is read from the leading
//! keyword of the document, which is enough to exercise every path of the
//! protocol layer:
//! - queries answer `{"hello": "Hello <name>"}` (`name` variable, default
//!   `world`)
//! - mutations answer `{"upload": [...]}` with the filenames of every upload
//!   found in the variables
//! - subscriptions are never permitted over HTTP

use async_trait::async_trait;
use serde_json::json;

use crate::graphql::executor::{
    BlockingExecutor, ExecutionError, ExecutionRequest, ExecutionResult, Executor, GraphQLError,
};
use crate::graphql::operation::OperationType;
use crate::graphql::value::{Value, Variables};

#[derive(Debug, Clone, Copy, Default)]
pub struct HelloSchema;

impl HelloSchema {
    fn resolve<C, R>(
        &self,
        request: ExecutionRequest<C, R>,
    ) -> Result<ExecutionResult, ExecutionError> {
        let query = request.query.ok_or(ExecutionError::MissingQuery)?;

        let operation_type = operation_type(&query);
        if !request.allowed_operation_types.contains(operation_type) {
            return Err(ExecutionError::InvalidOperationType(operation_type));
        }

        let variables = request.variables.unwrap_or_default();
        let result = match operation_type {
            OperationType::Query => hello(&variables),
            OperationType::Mutation => upload(&variables),
            OperationType::Subscription => ExecutionResult::error(GraphQLError::new(
                "subscriptions are not supported by this schema",
            )),
        };
        Ok(result)
    }
}

#[async_trait]
impl<C, R> Executor<C, R> for HelloSchema
where
    C: Send + 'static,
    R: Send + 'static,
{
    async fn execute(
        &self,
        request: ExecutionRequest<C, R>,
    ) -> Result<ExecutionResult, ExecutionError> {
        self.resolve(request)
    }
}

impl<C, R> BlockingExecutor<C, R> for HelloSchema {
    fn execute(&self, request: ExecutionRequest<C, R>) -> Result<ExecutionResult, ExecutionError> {
        self.resolve(request)
    }
}

/// Kind of the first operation in the document. Shorthand `{ ... }` is a query.
fn operation_type(query: &str) -> OperationType {
    let keyword = query
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();

    match keyword {
        "mutation" => OperationType::Mutation,
        "subscription" => OperationType::Subscription,
        _ => OperationType::Query,
    }
}

fn hello(variables: &Variables) -> ExecutionResult {
    let name = variables
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("world");
    ExecutionResult::data(json!({ "hello": format!("Hello {name}") }))
}

fn upload(variables: &Variables) -> ExecutionResult {
    let filenames: Vec<_> = variables
        .values()
        .flat_map(Value::uploads)
        .map(|file| file.filename.clone().unwrap_or_else(|| file.field_name.clone()))
        .collect();

    if filenames.is_empty() {
        return ExecutionResult::error(GraphQLError::new("no file was uploaded"));
    }
    ExecutionResult::data(json!({ "upload": filenames }))
}
