/// JSON-backed persistent state with backups and staleness checks
///
/// The filesystem is the only source of truth: nothing here caches file
/// contents between calls, so every load re-reads from disk.

pub mod cache;
pub mod correlation;
pub mod inventory;

pub use cache::CacheFile;
pub use correlation::{CleanupReport, CorrelationEntry};
pub use inventory::{scan_dir, CacheStatus};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Top-level JSON shape of a state file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    /// JSON object (ledger, metrics, timestamped caches)
    Object,
    /// JSON array (per-entry timestamped caches)
    Array,
}

impl Shape {
    /// Shape of a parsed value, `None` for scalars
    pub fn of(value: &serde_json::Value) -> Option<Shape> {
        match value {
            serde_json::Value::Object(_) => Some(Shape::Object),
            serde_json::Value::Array(_) => Some(Shape::Array),
            _ => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Object => write!(f, "object"),
            Shape::Array => write!(f, "array"),
        }
    }
}

/// A value that can be persisted by [`CacheFile`], tagged with its expected shape
pub trait Document: Serialize + DeserializeOwned {
    const SHAPE: Shape;
}

impl<T: Serialize + DeserializeOwned> Document for Vec<T> {
    const SHAPE: Shape = Shape::Array;
}

impl<V: Serialize + DeserializeOwned> Document for BTreeMap<String, V> {
    const SHAPE: Shape = Shape::Object;
}

impl<V: Serialize + DeserializeOwned> Document for HashMap<String, V> {
    const SHAPE: Shape = Shape::Object;
}

impl Document for serde_json::Map<String, serde_json::Value> {
    const SHAPE: Shape = Shape::Object;
}

/// Error types for store operations
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("file is empty: {0}")]
    Empty(String),

    #[error("malformed JSON: {0}")]
    Malformed(String),

    #[error("expected a JSON {expected}, found {found}")]
    ShapeMismatch { expected: Shape, found: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Result of a load: always carries a usable value, tagged with where it came from
#[derive(Debug)]
pub enum LoadOutcome<T> {
    /// Parsed from disk
    Found(T),
    /// No file at the path; the default is returned
    NotFound(T),
    /// File exists but has no content; the default is returned
    Empty(T),
    /// Malformed JSON or wrong top-level shape; the default is returned
    Corrupt(T, StoreError),
    /// The file could not be read; the default is returned
    IoError(T, StoreError),
}

impl<T> LoadOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            LoadOutcome::Found(v)
            | LoadOutcome::NotFound(v)
            | LoadOutcome::Empty(v)
            | LoadOutcome::Corrupt(v, _)
            | LoadOutcome::IoError(v, _) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            LoadOutcome::Found(v)
            | LoadOutcome::NotFound(v)
            | LoadOutcome::Empty(v)
            | LoadOutcome::Corrupt(v, _)
            | LoadOutcome::IoError(v, _) => v,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, LoadOutcome::Found(_))
    }

    /// True when the default was used because of absence rather than damage
    pub fn is_absent(&self) -> bool {
        matches!(self, LoadOutcome::NotFound(_) | LoadOutcome::Empty(_))
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, LoadOutcome::Corrupt(_, _))
    }

    pub fn error(&self) -> Option<&StoreError> {
        match self {
            LoadOutcome::Corrupt(_, e) | LoadOutcome::IoError(_, e) => Some(e),
            _ => None,
        }
    }
}
