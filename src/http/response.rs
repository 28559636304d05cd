//! Protocol responses as axum responses.

use axum::body::Body;
use axum::response::{IntoResponse, Response};

use crate::graphql::transport::TransportResponse;

impl IntoResponse for TransportResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
