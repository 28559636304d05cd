//! axum binding for the GraphQL protocol layer.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request ID, trace, timeout)
//!     → request.rs (AxumRequest: query string, body, multipart)
//!     → graphql::view (protocol handling)
//!     → response.rs (TransportResponse → axum Response)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{AxumRequest, MakeRequestUuid, X_REQUEST_ID};
pub use server::{GraphQLService, HttpServer};
