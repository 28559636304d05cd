//! GraphQL-over-HTTP protocol layer.
//!
//! Framework independent: everything here works on the shapes defined in
//! [`transport`], and the axum binding in [`crate::http`] adapts to them.

pub mod console;
pub mod error;
pub mod executor;
pub mod operation;
pub mod parser;
pub mod request;
pub mod response;
pub mod transport;
pub mod uploads;
pub mod value;
pub mod view;

pub use error::ProtocolError;
pub use executor::{
    BlockingExecutor, ExecutionError, ExecutionRequest, ExecutionResult, Executor, GraphQLError,
};
pub use operation::{OperationType, OperationTypes};
pub use request::GraphQLRequestData;
pub use response::{GraphQLHttpResponse, ResponseBuilder};
pub use transport::{
    BlockingTransportRequest, FormData, MemoryRequest, QueryParams, RequestHead, SubResponse,
    TransportRequest, TransportResponse,
};
pub use uploads::UploadedFile;
pub use value::{Value, Variables};
pub use view::{ContextBuilder, GraphQLView, RootValueBuilder, ViewOptions};
