//! GraphQL multipart request file resolution.
//!
//! # Responsibilities
//! - Splice uploaded file parts into the `operations` object at the slots
//!   declared by the `map` field
//! - Reject maps that reference absent files and files nothing references
//!
//! # Design Decisions
//! - Paths are dot separated and rooted at `variables`
//! - The container being walked decides how a segment is read: objects by
//!   key, lists by numeric index
//! - The same file key may be mapped to several slots; every slot receives
//!   the same `Arc`, nothing is consumed

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use indexmap::IndexMap;
use thiserror::Error;

use crate::graphql::value::Value;

/// The `map` multipart field: file key to the variable paths it fills.
pub type FileMap = IndexMap<String, Vec<String>>;

/// File parts of a multipart request, keyed by form field name.
pub type Files = HashMap<String, Arc<UploadedFile>>;

/// A file part received in a multipart request, fully buffered.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    /// Form field name the part was sent under (the key used in `map`).
    pub field_name: String,
    /// Client supplied file name, if any.
    pub filename: Option<String>,
    /// Content type of the part, if the client sent one.
    pub content_type: Option<String>,
    pub content: Bytes,
}

impl UploadedFile {
    /// A file with no filename or content type.
    pub fn new(field_name: impl Into<String>, content: Bytes) -> Self {
        Self {
            field_name: field_name.into(),
            filename: None,
            content_type: None,
            content,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Reasons a multipart request cannot be resolved.
///
/// All of them surface to clients as the same "files missing" transport
/// error; the detail is kept for logs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("file '{0}' is referenced in 'map' but missing from the request")]
    MissingFile(String),

    #[error("file '{0}' is not referenced by any path in 'map'")]
    UnreferencedFile(String),

    #[error("path '{0}' in 'map' must start with 'variables.' and name a variable")]
    InvalidPath(String),

    #[error("path '{0}' in 'map' does not point inside 'operations'")]
    PathNotFound(String),
}

/// Replace the placeholders named by `file_map` with the uploaded files.
///
/// `operations` is left untouched; the substituted copy is returned, so
/// resolving the same inputs twice gives equal trees.
pub fn resolve(
    operations: &IndexMap<String, Value>,
    file_map: &FileMap,
    files: &Files,
) -> Result<IndexMap<String, Value>, UploadError> {
    let mut root = Value::Object(operations.clone());

    for (file_key, paths) in file_map {
        let file = files
            .get(file_key)
            .ok_or_else(|| UploadError::MissingFile(file_key.clone()))?;

        for path in paths {
            place(&mut root, path, file)?;
        }
    }

    if let Some(unreferenced) = files.keys().find(|key| !file_map.contains_key(*key)) {
        return Err(UploadError::UnreferencedFile(unreferenced.clone()));
    }

    match root {
        Value::Object(resolved) => Ok(resolved),
        // root was built as an object above and place() only writes below it
        _ => Ok(IndexMap::new()),
    }
}

fn place(root: &mut Value, path: &str, file: &Arc<UploadedFile>) -> Result<(), UploadError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.len() < 2 || segments[0] != "variables" {
        return Err(UploadError::InvalidPath(path.to_string()));
    }

    let Some((leaf, parents)) = segments.split_last() else {
        return Err(UploadError::InvalidPath(path.to_string()));
    };

    let mut target = root;
    for segment in parents {
        target = child_mut(target, segment)
            .ok_or_else(|| UploadError::PathNotFound(path.to_string()))?;
    }

    match target {
        Value::Object(map) => {
            map.insert((*leaf).to_string(), Value::Upload(file.clone()));
            Ok(())
        }
        Value::List(items) => {
            let slot = leaf
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| UploadError::PathNotFound(path.to_string()))?;
            *slot = Value::Upload(file.clone());
            Ok(())
        }
        _ => Err(UploadError::PathNotFound(path.to_string())),
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(segment),
        Value::List(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |index| items.get_mut(index)),
        _ => None,
    }
}
