//! Document sources.
//!
//! A source turns a canonical relative path into a parsed flat document. The
//! rest of the node only sees the [`Source`] trait; the filesystem backend is
//! one implementation.

mod file;
mod format;

pub use file::FileSource;
pub use format::{DocumentParser, JsonParser, YamlParser};

use crate::error::{ConfigError, LoadError};
use crate::paths::RelPath;
use crate::value::Scalar;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Flat key to scalar mapping parsed from one source file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    values: BTreeMap<String, Scalar>,
}

impl Document {
    pub fn new(values: BTreeMap<String, Scalar>) -> Self {
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, Scalar)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Outcome of a successful lookup. Both variants are cacheable.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Arc<Document>),
    NotFound,
}

impl Lookup {
    pub fn document(&self) -> Option<&Document> {
        match self {
            Lookup::Found(doc) => Some(doc),
            Lookup::NotFound => None,
        }
    }
}

/// Resolves relative paths to documents.
pub trait Source: Send + Sync {
    fn load(&self, path: &RelPath) -> Result<Lookup, LoadError>;

    /// Human readable location, used in logs.
    fn describe(&self) -> String;
}

/// Build the source named by a config URI.
pub fn from_uri(uri: &str) -> Result<Arc<dyn Source>, ConfigError> {
    Ok(Arc::new(FileSource::from_uri(uri)?))
}
