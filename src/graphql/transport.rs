//! Framework independent request and response shapes.
//!
//! # Responsibilities
//! - Define the capabilities a framework request must offer
//!   ([`RequestHead`] plus [`TransportRequest`] or
//!   [`BlockingTransportRequest`])
//! - Define the response the protocol produces ([`TransportResponse`]) and
//!   the accumulator context construction writes to ([`SubResponse`])
//! - Provide [`MemoryRequest`], a fully buffered request for hosts without
//!   a framework and for tests
//!
//! # Design Decisions
//! - Each framework binding implements these traits once, at its boundary
//! - Body and form are read at most once; a second read is an error

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, StatusCode};
use indexmap::IndexMap;

use crate::graphql::error::ProtocolError;
use crate::graphql::uploads::{Files, UploadedFile};

/// Decoded query string parameters.
pub type QueryParams = IndexMap<String, String>;

/// A decoded `multipart/form-data` body.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    /// Text parts.
    pub fields: HashMap<String, String>,
    /// File parts, keyed by part name.
    pub files: Files,
}

/// Request metadata available without touching the body.
pub trait RequestHead: Send + Sync {
    fn method(&self) -> &Method;

    fn headers(&self) -> &HeaderMap;

    fn query_params(&self) -> &QueryParams;

    fn content_type(&self) -> Option<&str> {
        self.headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }
}

/// A request whose body is read asynchronously.
#[async_trait]
pub trait TransportRequest: RequestHead {
    /// Read the whole raw body.
    async fn read_body(&mut self) -> Result<Bytes, ProtocolError>;

    /// Read and decode a multipart body.
    async fn read_form(&mut self) -> Result<FormData, ProtocolError>;
}

/// A request whose body is read on the calling thread.
pub trait BlockingTransportRequest: RequestHead {
    fn read_body(&mut self) -> Result<Bytes, ProtocolError>;

    fn read_form(&mut self) -> Result<FormData, ProtocolError>;
}

/// Headers and status user code may set while the context is built.
#[derive(Debug, Clone, Default)]
pub struct SubResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
}

impl SubResponse {
    /// An accumulator with no headers and no forced status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the final status code, whatever the protocol decides.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// The forced status, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Headers set here reach the final response unless the protocol
    /// writes the same name.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Append a header; repeated names (e.g. `set-cookie`) are kept.
    pub fn append_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }
}

/// Response produced by the protocol, ready for a framework to send.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TransportResponse {
    /// A response with an optional `content-type` and no other headers.
    pub fn new(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, Some("application/json"), body.into())
    }

    pub fn html(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, Some("text/html; charset=utf-8"), body.into())
    }

    pub fn text(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::new(status, Some("text/plain; charset=utf-8"), body.into())
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, None, Bytes::new())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Fold the context-phase accumulator into this response.
    ///
    /// Context headers come first and protocol headers are written over
    /// them. A status set during context construction replaces ours.
    pub fn merge(self, sub_response: SubResponse) -> Self {
        let SubResponse {
            status,
            headers: mut merged,
        } = sub_response;

        let mut last_name = None;
        for (name, value) in self.headers {
            // HeaderMap's owned iterator yields `None` for repeated values
            // of the previous name.
            let name = match name {
                Some(name) => {
                    merged.remove(&name);
                    last_name = Some(name.clone());
                    name
                }
                None => match &last_name {
                    Some(name) => name.clone(),
                    None => continue,
                },
            };
            merged.append(name, value);
        }

        Self {
            status: status.unwrap_or(self.status),
            headers: merged,
            body: self.body,
        }
    }
}

/// A fully buffered request, independent of any HTTP framework.
#[derive(Debug, Clone)]
pub struct MemoryRequest {
    method: Method,
    headers: HeaderMap,
    query_params: QueryParams,
    body: Option<Bytes>,
    form: Option<FormData>,
}

impl MemoryRequest {
    /// An empty request: no headers, no query string, empty body and form.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: HeaderMap::new(),
            query_params: QueryParams::new(),
            body: Some(Bytes::new()),
            form: Some(FormData::default()),
        }
    }

    /// Shorthand for `MemoryRequest::new(Method::GET)`.
    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    /// Shorthand for `MemoryRequest::new(Method::POST)`.
    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    /// Set a header. Invalid names or values are ignored.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add a header value, keeping earlier values of the same name.
    pub fn append_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// A JSON body with the matching content type.
    pub fn json(self, body: &serde_json::Value) -> Self {
        self.header("content-type", "application/json")
            .body(body.to_string())
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Some(form) = self.form.as_mut() {
            form.fields.insert(name.into(), value.into());
        }
        self
    }

    pub fn form_file(mut self, file: UploadedFile) -> Self {
        if let Some(form) = self.form.as_mut() {
            form.files.insert(file.field_name.clone(), Arc::new(file));
        }
        self
    }

    fn take_body(&mut self) -> Result<Bytes, ProtocolError> {
        self.body
            .take()
            .ok_or_else(|| ProtocolError::BodyRead("request body already consumed".into()))
    }

    fn take_form(&mut self) -> Result<FormData, ProtocolError> {
        self.form
            .take()
            .ok_or_else(|| ProtocolError::BodyRead("form data already consumed".into()))
    }
}

impl RequestHead for MemoryRequest {
    fn method(&self) -> &Method {
        &self.method
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn query_params(&self) -> &QueryParams {
        &self.query_params
    }
}

#[async_trait]
impl TransportRequest for MemoryRequest {
    async fn read_body(&mut self) -> Result<Bytes, ProtocolError> {
        self.take_body()
    }

    async fn read_form(&mut self) -> Result<FormData, ProtocolError> {
        self.take_form()
    }
}

impl BlockingTransportRequest for MemoryRequest {
    fn read_body(&mut self) -> Result<Bytes, ProtocolError> {
        self.take_body()
    }

    fn read_form(&mut self) -> Result<FormData, ProtocolError> {
        self.take_form()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;

    #[test]
    fn test_merge_keeps_protocol_status_without_override() {
        let mut sub = SubResponse::new();
        sub.append_header(SET_COOKIE, HeaderValue::from_static("a=1"));
        sub.append_header(SET_COOKIE, HeaderValue::from_static("b=2"));

        let response = TransportResponse::json("{}").merge(sub);

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.headers.get_all(SET_COOKIE).iter().count(), 2);
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[test]
    fn test_merge_context_status_wins() {
        let mut sub = SubResponse::new();
        sub.set_status(StatusCode::ACCEPTED);

        let response = TransportResponse::text(StatusCode::BAD_REQUEST, "nope").merge(sub);
        assert_eq!(response.status, StatusCode::ACCEPTED);
        assert_eq!(response.body, Bytes::from_static(b"nope"));
    }

    #[test]
    fn test_merge_protocol_headers_replace_context_headers() {
        let mut sub = SubResponse::new();
        sub.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("text/csv"));

        let response = TransportResponse::json("{}").merge(sub);
        assert_eq!(
            response.headers.get_all(CONTENT_TYPE).iter().count(),
            1,
            "protocol content type should replace the context one"
        );
        assert_eq!(response.content_type(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_memory_request_body_reads_once() {
        let mut request = MemoryRequest::post().body("payload");

        let body = TransportRequest::read_body(&mut request).await.unwrap();
        assert_eq!(body, Bytes::from_static(b"payload"));
        assert!(matches!(
            TransportRequest::read_body(&mut request).await,
            Err(ProtocolError::BodyRead(_))
        ));
    }

    #[test]
    fn test_memory_request_head() {
        let request = MemoryRequest::get()
            .header("Accept", "application/json")
            .append_header("Accept", "text/html")
            .query_param("query", "{ a }");

        let accept: Vec<_> = request.headers().get_all("accept").iter().collect();
        assert_eq!(accept, ["application/json", "text/html"]);
        assert_eq!(request.content_type(), None);
        assert_eq!(request.query_params().get("query").map(String::as_str), Some("{ a }"));
    }
}
