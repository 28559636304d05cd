//! Variable values handed to the execution engine.
//!
//! Request variables start life as JSON but may have uploaded files spliced
//! into them by the multipart resolver, so they cannot stay
//! `serde_json::Value`.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::graphql::uploads::UploadedFile;

/// Variables of a single operation, in request order.
pub type Variables = IndexMap<String, Value>;

/// A JSON value that may also hold an uploaded file.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
    /// A file part bound to this slot. Several slots may share one upload.
    Upload(Arc<UploadedFile>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_upload(&self) -> Option<&Arc<UploadedFile>> {
        match self {
            Value::Upload(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up a key if this value is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|map| map.get(key))
    }

    /// Collect every upload reachable from this value, depth first.
    pub fn uploads(&self) -> Vec<&Arc<UploadedFile>> {
        let mut found = Vec::new();
        self.collect_uploads(&mut found);
        found
    }

    fn collect_uploads<'a>(&'a self, found: &mut Vec<&'a Arc<UploadedFile>>) {
        match self {
            Value::Upload(file) => found.push(file),
            Value::List(items) => items.iter().for_each(|item| item.collect_uploads(found)),
            Value::Object(map) => map.values().for_each(|item| item.collect_uploads(found)),
            _ => {}
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
