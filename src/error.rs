//! Error types for configuration, path expansion, document loading and
//! resolution.
//!
//! Only [`ConfigError`] is fatal. Everything else is collected per point as a
//! [`SideloadError`] and the point continues through the pipeline.

use crate::value::{IntegerOutOfRange, ScalarKind};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error categories for counters and programmatic handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Config,
    Path,
    Load,
    TypeMismatch,
}

impl ErrorKind {
    /// Label used for the `kind` dimension of the error counter.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::Config => "config",
            ErrorKind::Path => "path",
            ErrorKind::Load => "load",
            ErrorKind::TypeMismatch => "type_mismatch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Raised while building a node. The node refuses to start.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("order must contain at least one path template")]
    EmptyOrder,

    #[error("invalid template '{template}' at offset {offset}: {reason}")]
    MalformedTemplate {
        template: String,
        offset: usize,
        reason: String,
    },

    #[error("template '{template}' escapes the source root: {reason}")]
    TemplateEscapesRoot { template: String, reason: String },

    #[error("default for field '{field}' must be an integer, float, boolean or string")]
    NonScalarDefault { field: String },

    #[error("default for field '{field}': {source}")]
    DefaultOutOfRange {
        field: String,
        source: IntegerOutOfRange,
    },

    #[error("unsupported source scheme '{scheme}' in '{uri}', only file:// is supported")]
    UnsupportedScheme { uri: String, scheme: String },

    #[error("invalid source '{uri}': {reason}")]
    InvalidSource { uri: String, reason: String },

    #[error("source is not configured")]
    MissingSource,
}

/// Failure to construct a node.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to register metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// A relative path that cannot be used to address a document.
#[derive(Debug, Error, Clone, PartialEq, Eq, Hash)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("absolute path '{0}' is not allowed")]
    Absolute(String),

    #[error("path '{0}' contains a parent traversal segment")]
    Traversal(String),

    #[error("path '{0}' contains an illegal character")]
    IllegalCharacter(String),
}

/// Failure to read or parse a document that exists.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to read '{path}': {message}")]
    Io {
        path: String,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("failed to parse '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("no document parser registered for '{path}'")]
    UnsupportedFormat { path: String },

    #[error("'{path}' resolves outside the source root")]
    OutsideRoot { path: String },
}

impl LoadError {
    pub fn io(path: impl Into<String>, err: &std::io::Error) -> Self {
        LoadError::Io {
            path: path.into(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    pub fn parse(path: impl Into<String>, err: impl fmt::Display) -> Self {
        LoadError::Parse {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// Non-fatal problem recorded while enriching a single point.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SideloadError {
    #[error("template '{template}' expanded to an unusable path: {source}")]
    Path {
        template: String,
        #[source]
        source: PathError,
    },

    #[error("loading '{path}' failed: {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("'{key}' in '{path}' is {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        path: String,
        expected: ScalarKind,
        found: ScalarKind,
    },
}

impl SideloadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SideloadError::Path { .. } => ErrorKind::Path,
            SideloadError::Load { .. } => ErrorKind::Load,
            SideloadError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
        }
    }
}
