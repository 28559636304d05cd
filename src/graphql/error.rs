//! Transport level failures and their HTTP mapping.

use http::{Method, StatusCode};
use thiserror::Error;

use crate::graphql::executor::ExecutionError;
use crate::graphql::operation::OperationType;
use crate::graphql::uploads::UploadError;

/// Every way a request can fail before or around execution.
///
/// The `Display` text is the body sent to the client.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Unsupported Media Type")]
    UnsupportedMediaType,

    #[error("Unable to parse request body as JSON")]
    MalformedBody,

    #[error("File(s) missing in form data")]
    MissingUploads(#[from] UploadError),

    #[error("No GraphQL query found in the request")]
    MissingQuery,

    #[error("{} are not allowed when using {method}", .operation_type.plural())]
    InvalidOperationType {
        operation_type: OperationType,
        method: Method,
    },

    /// The framework binding failed to read the body or a multipart stream.
    #[error("Unable to read request body")]
    BodyRead(String),

    /// A GET without parameters when no console is served.
    #[error("")]
    NotFound,
}

impl ProtocolError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProtocolError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProtocolError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ProtocolError::NotFound => StatusCode::NOT_FOUND,
            ProtocolError::MalformedBody
            | ProtocolError::MissingUploads(_)
            | ProtocolError::MissingQuery
            | ProtocolError::InvalidOperationType { .. }
            | ProtocolError::BodyRead(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client facing reason text.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Attach the request method to an engine rejection.
    pub fn from_execution(error: ExecutionError, method: &Method) -> Self {
        match error {
            ExecutionError::InvalidOperationType(operation_type) => {
                ProtocolError::InvalidOperationType {
                    operation_type,
                    method: method.clone(),
                }
            }
            ExecutionError::MissingQuery => ProtocolError::MissingQuery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ProtocolError::MethodNotAllowed.status(), 405);
        assert_eq!(ProtocolError::UnsupportedMediaType.status(), 415);
        assert_eq!(ProtocolError::MalformedBody.status(), 400);
        assert_eq!(
            ProtocolError::MissingUploads(UploadError::MissingFile("0".into())).status(),
            400
        );
        assert_eq!(ProtocolError::MissingQuery.status(), 400);
        assert_eq!(ProtocolError::NotFound.status(), 404);
    }

    #[test]
    fn test_reasons() {
        assert_eq!(ProtocolError::MethodNotAllowed.reason(), "Method Not Allowed");
        assert_eq!(
            ProtocolError::MissingUploads(UploadError::UnreferencedFile("1".into())).reason(),
            "File(s) missing in form data"
        );
        assert_eq!(ProtocolError::NotFound.reason(), "");
    }

    #[test]
    fn test_invalid_operation_type_names_kind_and_method() {
        let err = ProtocolError::from_execution(
            ExecutionError::InvalidOperationType(OperationType::Mutation),
            &Method::GET,
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.reason(), "mutations are not allowed when using GET");
    }
}
