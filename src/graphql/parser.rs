//! Request decoding.
//!
//! # Responsibilities
//! - Pick the encoding from method and content type
//! - Decode query parameters, JSON bodies and multipart uploads into
//!   [`GraphQLRequestData`]
//!
//! # Design Decisions
//! - GET always reads query parameters, whatever the content type says
//! - `application/json` matches anywhere in the content type,
//!   `multipart/form-data` only as a prefix
//! - Decoding is shared by the async and blocking readers; only the way the
//!   body is obtained differs

use bytes::Bytes;
use http::Method;
use indexmap::IndexMap;

use crate::graphql::error::ProtocolError;
use crate::graphql::request::GraphQLRequestData;
use crate::graphql::transport::{
    BlockingTransportRequest, FormData, QueryParams, TransportRequest,
};
use crate::graphql::uploads::{self, FileMap};
use crate::graphql::value::Value;

/// How the GraphQL request travels in the HTTP request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEncoding {
    QueryParams,
    Json,
    Multipart,
}

impl RequestEncoding {
    pub fn detect(method: &Method, content_type: Option<&str>) -> Result<Self, ProtocolError> {
        if method == Method::GET {
            return Ok(RequestEncoding::QueryParams);
        }
        if method != Method::POST {
            return Err(ProtocolError::MethodNotAllowed);
        }

        let content_type = content_type.unwrap_or_default();
        if content_type.contains("application/json") {
            Ok(RequestEncoding::Json)
        } else if content_type.starts_with("multipart/form-data") {
            Ok(RequestEncoding::Multipart)
        } else {
            Err(ProtocolError::UnsupportedMediaType)
        }
    }
}

/// Decode an async transport request.
pub async fn parse<R: TransportRequest>(request: &mut R) -> Result<GraphQLRequestData, ProtocolError> {
    let encoding = RequestEncoding::detect(request.method(), request.content_type())?;
    tracing::debug!(method = %request.method(), ?encoding, "Decoding GraphQL request");

    match encoding {
        RequestEncoding::QueryParams => parse_query_params(request.query_params()),
        RequestEncoding::Json => {
            let body = request.read_body().await?;
            parse_json_body(&body)
        }
        RequestEncoding::Multipart => {
            let form = request.read_form().await?;
            parse_multipart(form)
        }
    }
}

/// Decode a blocking transport request.
pub fn parse_blocking<R: BlockingTransportRequest>(
    request: &mut R,
) -> Result<GraphQLRequestData, ProtocolError> {
    let encoding = RequestEncoding::detect(request.method(), request.content_type())?;
    tracing::debug!(method = %request.method(), ?encoding, "Decoding GraphQL request");

    match encoding {
        RequestEncoding::QueryParams => parse_query_params(request.query_params()),
        RequestEncoding::Json => {
            let body = request.read_body()?;
            parse_json_body(&body)
        }
        RequestEncoding::Multipart => {
            let form = request.read_form()?;
            parse_multipart(form)
        }
    }
}

/// `query`, `operationName` and a JSON encoded `variables` from a query string.
pub fn parse_query_params(params: &QueryParams) -> Result<GraphQLRequestData, ProtocolError> {
    let variables = match params.get("variables") {
        Some(raw) => match decode_json(raw.as_bytes())? {
            serde_json::Value::Null => None,
            serde_json::Value::Object(map) => Some(into_object(map)),
            _ => return Err(ProtocolError::MalformedBody),
        },
        None => None,
    };

    Ok(GraphQLRequestData {
        query: params.get("query").cloned(),
        variables,
        operation_name: params.get("operationName").cloned(),
    })
}

/// A JSON body holding one request object.
pub fn parse_json_body(body: &Bytes) -> Result<GraphQLRequestData, ProtocolError> {
    let object = decode_object(body)?;
    GraphQLRequestData::from_object(object)
}

/// The `operations` + `map` + file parts upload convention.
pub fn parse_multipart(form: FormData) -> Result<GraphQLRequestData, ProtocolError> {
    let operations = decode_object(field_or_empty(&form, "operations").as_bytes())?;
    let file_map: FileMap = serde_json::from_str(field_or_empty(&form, "map")).map_err(|err| {
        tracing::debug!(error = %err, "Invalid 'map' field");
        ProtocolError::MalformedBody
    })?;

    let resolved = uploads::resolve(&operations, &file_map, &form.files).map_err(|err| {
        tracing::debug!(error = %err, "Multipart upload could not be resolved");
        ProtocolError::from(err)
    })?;

    GraphQLRequestData::from_object(resolved)
}

fn field_or_empty<'a>(form: &'a FormData, name: &str) -> &'a str {
    form.fields.get(name).map(String::as_str).unwrap_or("{}")
}

fn decode_json(raw: &[u8]) -> Result<serde_json::Value, ProtocolError> {
    serde_json::from_slice(raw).map_err(|err| {
        tracing::debug!(error = %err, "Request JSON could not be decoded");
        ProtocolError::MalformedBody
    })
}

fn decode_object(raw: &[u8]) -> Result<IndexMap<String, Value>, ProtocolError> {
    match decode_json(raw)? {
        serde_json::Value::Object(map) => Ok(into_object(map)),
        // batched (array) requests are not supported
        _ => Err(ProtocolError::MalformedBody),
    }
}

fn into_object(map: serde_json::Map<String, serde_json::Value>) -> IndexMap<String, Value> {
    map.into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::graphql::transport::MemoryRequest;
    use crate::graphql::uploads::{UploadError, UploadedFile};

    #[test]
    fn test_detect_encoding() {
        let cases = [
            (Method::GET, None, RequestEncoding::QueryParams),
            (Method::GET, Some("text/plain"), RequestEncoding::QueryParams),
            (Method::POST, Some("application/json"), RequestEncoding::Json),
            (
                Method::POST,
                Some("application/json; charset=utf-8"),
                RequestEncoding::Json,
            ),
            (
                Method::POST,
                Some("multipart/form-data; boundary=xyz"),
                RequestEncoding::Multipart,
            ),
        ];
        for (method, content_type, expected) in cases {
            assert_eq!(RequestEncoding::detect(&method, content_type).unwrap(), expected);
        }

        assert!(matches!(
            RequestEncoding::detect(&Method::POST, Some("text/plain")),
            Err(ProtocolError::UnsupportedMediaType)
        ));
        assert!(matches!(
            RequestEncoding::detect(&Method::POST, None),
            Err(ProtocolError::UnsupportedMediaType)
        ));
        assert!(matches!(
            RequestEncoding::detect(&Method::PUT, Some("application/json")),
            Err(ProtocolError::MethodNotAllowed)
        ));
    }

    #[tokio::test]
    async fn test_json_body_round_trip() {
        let mut request = MemoryRequest::post().json(&json!({
            "query": "query Hello($name: String) { hello(name: $name) }",
            "variables": {"name": "ferris", "tags": ["a", 1]},
            "operationName": "Hello"
        }));

        let data = parse(&mut request).await.unwrap();

        assert_eq!(
            data.query.as_deref(),
            Some("query Hello($name: String) { hello(name: $name) }")
        );
        assert_eq!(data.operation_name.as_deref(), Some("Hello"));
        let variables = data.variables.unwrap();
        assert_eq!(variables["name"].as_str(), Some("ferris"));
        assert_eq!(variables["tags"], Value::from(json!(["a", 1])));
    }

    #[tokio::test]
    async fn test_json_body_errors() {
        for body in ["{not json", "[{\"query\": \"{ a }\"}]", "\"{ a }\""] {
            let mut request = MemoryRequest::post()
                .header("content-type", "application/json")
                .body(body);
            assert!(
                matches!(parse(&mut request).await, Err(ProtocolError::MalformedBody)),
                "body {:?} should be malformed",
                body
            );
        }
    }

    #[test]
    fn test_query_params_decode_variables() {
        let mut params = QueryParams::new();
        params.insert("query".into(), "query Q($id: ID) { node(id: $id) }".into());
        params.insert("variables".into(), r#"{"id": "42"}"#.into());
        params.insert("operationName".into(), "Q".into());

        let data = parse_query_params(&params).unwrap();
        assert_eq!(data.variables.unwrap()["id"].as_str(), Some("42"));
        assert_eq!(data.operation_name.as_deref(), Some("Q"));
    }

    #[test]
    fn test_query_params_malformed_variables() {
        for raw in ["{\"id\": ", "", "[1, 2]", "\"text\""] {
            let mut params = QueryParams::new();
            params.insert("query".into(), "{ a }".into());
            params.insert("variables".into(), raw.into());
            assert!(
                matches!(parse_query_params(&params), Err(ProtocolError::MalformedBody)),
                "variables {:?} should be malformed",
                raw
            );
        }
    }

    #[test]
    fn test_blocking_parse_reads_query_params() {
        let mut request = MemoryRequest::get().query_param("query", "{ hello }");
        let data = parse_blocking(&mut request).unwrap();
        assert_eq!(data.query.as_deref(), Some("{ hello }"));
        assert!(data.variables.is_none());
    }

    #[tokio::test]
    async fn test_multipart_resolves_uploads() {
        let mut request = MemoryRequest::post()
            .header("content-type", "multipart/form-data; boundary=abc")
            .form_field(
                "operations",
                r#"{"query": "mutation($f: Upload!) { upload(file: $f) }", "variables": {"f": null}}"#,
            )
            .form_field("map", r#"{"0": ["variables.f"]}"#)
            .form_file(UploadedFile::new("0", Bytes::from_static(b"contents")).with_filename("a.txt"));

        let data = parse(&mut request).await.unwrap();

        assert_eq!(
            data.query.as_deref(),
            Some("mutation($f: Upload!) { upload(file: $f) }")
        );
        let file: &Arc<UploadedFile> = data.variables.as_ref().unwrap()["f"].as_upload().unwrap();
        assert_eq!(file.filename.as_deref(), Some("a.txt"));
        assert_eq!(file.content, Bytes::from_static(b"contents"));
    }

    #[test]
    fn test_multipart_defaults_and_errors() {
        // no operations and no map: an empty request, executed as such
        let data = parse_multipart(FormData::default()).unwrap();
        assert_eq!(data, GraphQLRequestData::default());

        let mut form = FormData::default();
        form.fields.insert("operations".into(), "{\"variables\": {}".into());
        assert!(matches!(parse_multipart(form), Err(ProtocolError::MalformedBody)));

        let mut form = FormData::default();
        form.fields.insert("map".into(), r#"{"0": "variables.f"}"#.into());
        assert!(matches!(parse_multipart(form), Err(ProtocolError::MalformedBody)));

        let mut form = FormData::default();
        form.fields.insert("operations".into(), r#"{"variables": {"f": null}}"#.into());
        form.fields.insert("map".into(), r#"{"0": ["variables.f"]}"#.into());
        assert!(matches!(
            parse_multipart(form),
            Err(ProtocolError::MissingUploads(UploadError::MissingFile(_)))
        ));
    }
}
