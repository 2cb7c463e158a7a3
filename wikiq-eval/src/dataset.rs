//! Dataset loading.
//!
//! A dataset is a YAML (or JSON) sequence of mappings. Every item needs a
//! string `query`; other fields are rater-specific and read on demand.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur when loading or reading datasets.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// Failed to read dataset file
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse dataset
    #[error("Failed to parse dataset {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// An item lacks a required field
    #[error("Item {index} is missing required field '{field}'")]
    MissingField { field: String, index: usize },

    /// An item has a field of the wrong type
    #[error("Item {index} field '{field}' must be a {expected}")]
    InvalidField {
        field: String,
        index: usize,
        expected: &'static str,
    },
}

/// One dataset entry: a string-keyed mapping with at least `query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetItem(Map<String, Value>);

impl DatasetItem {
    /// Wrap a mapping, checking that `query` is a string.
    pub fn new(fields: Map<String, Value>, index: usize) -> Result<Self, DatasetError> {
        match fields.get("query") {
            Some(Value::String(_)) => Ok(Self(fields)),
            Some(_) => Err(DatasetError::InvalidField {
                field: "query".to_string(),
                index,
                expected: "string",
            }),
            None => Err(DatasetError::MissingField {
                field: "query".to_string(),
                index,
            }),
        }
    }

    /// Build an item with only a query.
    pub fn from_query(query: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("query".to_string(), Value::String(query.into()));
        Self(fields)
    }

    /// Add or replace a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn query(&self) -> &str {
        self.0.get("query").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// A field rendered as text: strings verbatim, other values as JSON.
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.0.get(key).map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// A required boolean field.
    ///
    /// `index` is the item's position in its dataset, used in errors.
    pub fn require_bool(&self, field: &str, index: usize) -> Result<bool, DatasetError> {
        match self.0.get(field) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(DatasetError::InvalidField {
                field: field.to_string(),
                index,
                expected: "boolean",
            }),
            None => Err(DatasetError::MissingField {
                field: field.to_string(),
                index,
            }),
        }
    }
}

/// Load a dataset file.
///
/// `.json` files are parsed as JSON, everything else as YAML. An empty or
/// null document is an empty dataset.
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetItem>, DatasetError> {
    let contents = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    let parse_error = |message: String| DatasetError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let raw: Option<Vec<Map<String, Value>>> = if is_json {
        serde_json::from_str(&contents).map_err(|e| parse_error(e.to_string()))?
    } else {
        serde_yaml::from_str(&contents).map_err(|e| parse_error(e.to_string()))?
    };

    let items = raw
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, fields)| DatasetItem::new(fields, index))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!("Loaded {} items from {}", items.len(), path.display());
    Ok(items)
}
