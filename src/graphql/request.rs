//! Normalized GraphQL request data.

use indexmap::IndexMap;

use crate::graphql::error::ProtocolError;
use crate::graphql::value::{Value, Variables};

/// The three GraphQL-over-HTTP request fields, whatever encoding carried them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphQLRequestData {
    pub query: Option<String>,
    pub variables: Option<Variables>,
    pub operation_name: Option<String>,
}

impl GraphQLRequestData {
    /// Extract `query`, `variables` and `operationName` from a decoded object.
    ///
    /// Absent keys and explicit `null`s both map to `None`. Any other type
    /// in those slots makes the body malformed.
    pub fn from_object(mut object: IndexMap<String, Value>) -> Result<Self, ProtocolError> {
        let query = string_field(object.shift_remove("query"))?;
        let operation_name = string_field(object.shift_remove("operationName"))?;
        let variables = match object.shift_remove("variables") {
            None | Some(Value::Null) => None,
            Some(Value::Object(variables)) => Some(variables),
            Some(_) => return Err(ProtocolError::MalformedBody),
        };

        Ok(Self {
            query,
            variables,
            operation_name,
        })
    }
}

fn string_field(value: Option<Value>) -> Result<Option<String>, ProtocolError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ProtocolError::MalformedBody),
    }
}
