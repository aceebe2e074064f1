//! Error types for the lazy tree core.
//!
//! The core distinguishes four kinds of failure (format, path, tree,
//! schema-violation — see the crate's top-level design notes). Each is its
//! own `thiserror`-derived enum; [`LazyTreeError`] unifies them for callers
//! who don't care which subsystem failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes.
///
/// Once published, variant names and their serialized `snake_case` strings
/// must never change across versions — callers may match on these instead
/// of on error message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// The character buffer is not valid JSON at some offset.
    FormatError,
    /// A path navigation could not be satisfied.
    PathError,
    /// An operation is incompatible with the actual node type at a path.
    TreeError,
    /// Validation produced one or more errors.
    SchemaViolation,
}

/// The character buffer is not valid JSON at `offset`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("format error at offset {offset}: expected {expected}, near \"{context}\"")]
pub struct FormatError {
    pub offset: usize,
    /// Either a single expected character/class (`"a digit"`, `"a JSON value"`)
    /// or a literal character.
    pub expected: String,
    /// A short window of the buffer around `offset`, for diagnostics.
    pub context: String,
}

impl FormatError {
    pub fn new(offset: usize, expected: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            offset,
            expected: expected.into(),
            context: context.into(),
        }
    }
}

/// A path navigation could not be satisfied.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("path error at {path}: {message}")]
pub struct PathError {
    pub path: String,
    pub message: String,
}

impl PathError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// An operation is incompatible with the node's actual type.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("tree error: cannot call `{operation}` on a {actual_type} at {path}")]
pub struct TreeError {
    pub path: String,
    pub actual_type: String,
    pub operation: String,
}

impl TreeError {
    pub fn new(
        path: impl Into<String>,
        actual_type: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            actual_type: actual_type.into(),
            operation: operation.into(),
        }
    }
}

/// One structured validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub rule: String,
    pub path: String,
    /// Textual declaration of the offending value, when one exists.
    pub value: Option<String>,
    pub message: String,
}

/// Validation produced one or more errors.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("schema violation: {} error(s)", .errors.len())]
pub struct SchemaViolation {
    pub errors: Vec<ValidationError>,
}

/// Umbrella error for the crate's fallible entry points.
///
/// Named `LazyTreeError` (rather than reusing `TreeError`) because it wraps
/// all four failure kinds, not just the tree-operation one.
#[derive(Debug, Error)]
pub enum LazyTreeError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Tree(#[from] TreeError),

    #[error(transparent)]
    Schema(#[from] SchemaViolation),
}

impl LazyTreeError {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            LazyTreeError::Format(_) => ErrorCode::FormatError,
            LazyTreeError::Path(_) => ErrorCode::PathError,
            LazyTreeError::Tree(_) => ErrorCode::TreeError,
            LazyTreeError::Schema(_) => ErrorCode::SchemaViolation,
        }
    }

    /// Structured form for FFI / CLI consumers: `{"code": ..., "message": ...}`.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
        })
    }
}

pub type Result<T> = std::result::Result<T, LazyTreeError>;
