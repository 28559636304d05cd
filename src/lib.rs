//! GraphQL over HTTP
//!
//! Framework independent GraphQL-over-HTTP protocol handling, an axum
//! binding, and a small server binary around them.

pub mod config;
pub mod demo;
pub mod graphql;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use crate::config::schema::ServerConfig;
pub use crate::graphql::view::{GraphQLView, ViewOptions};
pub use crate::http::HttpServer;
pub use crate::lifecycle::Shutdown;
