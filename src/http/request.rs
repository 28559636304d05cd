//! axum request adapter.
//!
//! # Responsibilities
//! - Expose an axum request through the protocol's transport traits
//! - Buffer JSON bodies and decode multipart bodies under the size limit
//! - Generate request ids (UUID v4) for the request-id layers
//!
//! # Design Decisions
//! - Method, headers and query string are taken apart up front; the body is
//!   read lazily and at most once
//! - Multipart parts carrying a filename are uploads, everything else is a
//!   text field
//! - `max_body_size` caps the buffered body as a whole, for JSON and
//!   multipart alike
//! - Part names are unique; a repeated name fails the request

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::body::Body;
use bytes::Bytes;
use http::header::HeaderValue;
use http::{HeaderMap, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::graphql::error::ProtocolError;
use crate::graphql::transport::{FormData, QueryParams, RequestHead, TransportRequest};
use crate::graphql::uploads::UploadedFile;

/// Header carrying the request id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request id generator for `SetRequestIdLayer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// An axum request seen through [`TransportRequest`].
pub struct AxumRequest {
    method: Method,
    headers: HeaderMap,
    query_params: QueryParams,
    // `Body` is not `Sync`; it is only ever reached through `&mut self`.
    body: Mutex<Option<Body>>,
    max_body_size: usize,
}

impl AxumRequest {
    /// Wrap `request`; bodies larger than `max_body_size` fail to read.
    pub fn new(request: Request<Body>, max_body_size: usize) -> Self {
        let (parts, body) = request.into_parts();
        let query_params = decode_query(parts.uri.query().unwrap_or_default());

        Self {
            method: parts.method,
            headers: parts.headers,
            query_params,
            body: Mutex::new(Some(body)),
            max_body_size,
        }
    }

    fn take_body(&mut self) -> Result<Body, ProtocolError> {
        self.body
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| ProtocolError::BodyRead("request body already consumed".into()))
    }
}

/// Decode a query string. An undecodable one counts as empty.
fn decode_query(query: &str) -> QueryParams {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(err) => {
            tracing::debug!(error = %err, "Ignoring undecodable query string");
            QueryParams::new()
        }
    }
}

fn read_error(err: impl std::fmt::Display) -> ProtocolError {
    ProtocolError::BodyRead(err.to_string())
}

impl RequestHead for AxumRequest {
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
impl TransportRequest for AxumRequest {
    async fn read_body(&mut self) -> Result<Bytes, ProtocolError> {
        let body = self.take_body()?;
        axum::body::to_bytes(body, self.max_body_size)
            .await
            .map_err(read_error)
    }

    async fn read_form(&mut self) -> Result<FormData, ProtocolError> {
        let boundary = multer::parse_boundary(self.content_type().unwrap_or_default())
            .map_err(read_error)?;
        let body = self.take_body()?;

        // The limit bounds the whole body, not only each part.
        let limit = self.max_body_size as u64;
        let constraints = multer::Constraints::new()
            .size_limit(multer::SizeLimit::new().whole_stream(limit).per_field(limit));
        let mut multipart =
            multer::Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await.map_err(read_error)? {
            let name = field.name().unwrap_or_default().to_string();
            if form.fields.contains_key(&name) || form.files.contains_key(&name) {
                return Err(ProtocolError::BodyRead(format!(
                    "duplicate multipart part '{name}'"
                )));
            }

            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let content_type = field.content_type().map(ToString::to_string);
                    let content = field.bytes().await.map_err(read_error)?;

                    let mut file = UploadedFile::new(name.clone(), content).with_filename(filename);
                    if let Some(content_type) = content_type {
                        file = file.with_content_type(content_type);
                    }
                    form.files.insert(name, Arc::new(file));
                }
                None => {
                    let text = field.text().await.map_err(read_error)?;
                    form.fields.insert(name, text);
                }
            }
        }

        tracing::debug!(
            fields = form.fields.len(),
            files = form.files.len(),
            "Multipart body decoded"
        );
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDARY: &str = "X-BOUNDARY";

    fn multipart_body() -> String {
        [
            format!("--{BOUNDARY}\r\n"),
            "Content-Disposition: form-data; name=\"operations\"\r\n\r\n".to_string(),
            "{\"query\":\"mutation { upload }\"}\r\n".to_string(),
            format!("--{BOUNDARY}\r\n"),
            "Content-Disposition: form-data; name=\"0\"; filename=\"a.txt\"\r\n".to_string(),
            "Content-Type: text/plain\r\n\r\n".to_string(),
            "hello\r\n".to_string(),
            format!("--{BOUNDARY}--\r\n"),
        ]
        .concat()
    }

    fn part(name: &str, filename: Option<&str>, content: &str) -> String {
        let disposition = match filename {
            Some(filename) => format!("name=\"{name}\"; filename=\"{filename}\""),
            None => format!("name=\"{name}\""),
        };
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; {disposition}\r\n\r\n{content}\r\n")
    }

    fn form_request(parts: &[String], max_body_size: usize) -> AxumRequest {
        let body = format!("{}--{BOUNDARY}--\r\n", parts.concat());
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        AxumRequest::new(request("/", &content_type, body), max_body_size)
    }

    fn request(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", content_type)
            .body(body.into())
            .unwrap()
    }

    #[test]
    fn test_query_string_decoding() {
        let request = Request::builder()
            .uri("/graphql?query=%7B%20hello%20%7D&operationName=Q")
            .body(Body::empty())
            .unwrap();
        let request = AxumRequest::new(request, 1024);

        assert_eq!(request.query_params()["query"], "{ hello }");
        assert_eq!(request.query_params()["operationName"], "Q");
        assert!(decode_query("").is_empty());
    }

    #[tokio::test]
    async fn test_body_limit() {
        let mut small = AxumRequest::new(request("/", "application/json", "{}"), 1024);
        assert_eq!(small.read_body().await.unwrap(), Bytes::from_static(b"{}"));
        assert!(matches!(small.read_body().await, Err(ProtocolError::BodyRead(_))));

        let mut large = AxumRequest::new(request("/", "application/json", "x".repeat(64)), 16);
        assert!(matches!(large.read_body().await, Err(ProtocolError::BodyRead(_))));
    }

    #[tokio::test]
    async fn test_multipart_limit_covers_whole_body() {
        // every part fits the limit on its own, together they do not
        let parts: Vec<_> = (0..20)
            .map(|i| part(&format!("field{i}"), None, &"x".repeat(50)))
            .collect();

        let mut request = form_request(&parts, 64);
        assert!(matches!(request.read_form().await, Err(ProtocolError::BodyRead(_))));

        let mut request = form_request(&parts, 4096);
        assert_eq!(request.read_form().await.unwrap().fields.len(), 20);
    }

    #[tokio::test]
    async fn test_multipart_duplicate_part_names() {
        let files = [
            part("0", Some("a.txt"), "first"),
            part("0", Some("b.txt"), "second"),
        ];
        let mut request = form_request(&files, 1024);
        assert!(matches!(request.read_form().await, Err(ProtocolError::BodyRead(_))));

        let mixed = [part("map", None, "{}"), part("map", Some("map.json"), "{}")];
        let mut request = form_request(&mixed, 1024);
        assert!(matches!(request.read_form().await, Err(ProtocolError::BodyRead(_))));
    }

    #[tokio::test]
    async fn test_multipart_fields_and_files() {
        let content_type = format!("multipart/form-data; boundary={BOUNDARY}");
        let mut request = AxumRequest::new(request("/", &content_type, multipart_body()), 1024);

        let form = request.read_form().await.unwrap();

        assert_eq!(form.fields["operations"], "{\"query\":\"mutation { upload }\"}");
        let file = &form.files["0"];
        assert_eq!(file.filename.as_deref(), Some("a.txt"));
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(file.content, Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_multipart_without_boundary() {
        let mut request = AxumRequest::new(request("/", "multipart/form-data", ""), 1024);
        assert!(matches!(request.read_form().await, Err(ProtocolError::BodyRead(_))));
    }

    #[test]
    fn test_request_ids_are_uuids() {
        let request = Request::new(());
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let id = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
