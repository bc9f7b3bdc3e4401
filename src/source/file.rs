//! Local directory tree source.

use super::format::{DocumentParser, JsonParser, YamlParser};
use super::{Lookup, Source};
use crate::error::{ConfigError, LoadError};
use crate::paths::{RelPath, root_from_uri};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// Reads documents from files under a root directory.
pub struct FileSource {
    /// Canonical root directory.
    root: PathBuf,
    parsers: Vec<Box<dyn DocumentParser>>,
}

impl FileSource {
    /// Create a source for an existing directory with the YAML and JSON
    /// parsers registered.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let canonical = root.canonicalize().map_err(|e| ConfigError::InvalidSource {
            uri: root.display().to_string(),
            reason: e.to_string(),
        })?;
        if !canonical.is_dir() {
            return Err(ConfigError::InvalidSource {
                uri: root.display().to_string(),
                reason: "not a directory".to_string(),
            });
        }
        Ok(Self::with_root(canonical))
    }

    /// Create a source from a `file://` URI.
    pub fn from_uri(uri: &str) -> Result<Self, ConfigError> {
        root_from_uri(uri).map(Self::with_root)
    }

    fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            parsers: vec![Box::new(YamlParser), Box::new(JsonParser)],
        }
    }

    /// Register an additional parser. Later registrations win for shared
    /// extensions.
    pub fn with_parser(mut self, parser: impl DocumentParser + 'static) -> Self {
        self.parsers.insert(0, Box::new(parser));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn parser_for(&self, path: &RelPath) -> Option<&dyn DocumentParser> {
        let ext = path.extension()?.to_ascii_lowercase();
        self.parsers
            .iter()
            .find(|p| p.extensions().contains(&ext.as_str()))
            .map(|p| p.as_ref())
    }
}

impl Source for FileSource {
    fn load(&self, path: &RelPath) -> Result<Lookup, LoadError> {
        let full = path.under(&self.root);

        // Resolve symlinks so a link inside the tree cannot point outside it.
        let real = match full.canonicalize() {
            Ok(real) => real,
            Err(e) if is_missing(&e) => {
                trace!(path = %path, "Document not found");
                return Ok(Lookup::NotFound);
            }
            Err(e) => return Err(LoadError::io(path.as_str(), &e)),
        };
        if !real.starts_with(&self.root) {
            return Err(LoadError::OutsideRoot {
                path: path.to_string(),
            });
        }
        if real.is_dir() {
            return Ok(Lookup::NotFound);
        }

        let parser = self
            .parser_for(path)
            .ok_or_else(|| LoadError::UnsupportedFormat {
                path: path.to_string(),
            })?;

        let content = match std::fs::read_to_string(&real) {
            Ok(content) => content,
            // Removed between canonicalize and read
            Err(e) if is_missing(&e) => return Ok(Lookup::NotFound),
            Err(e) => return Err(LoadError::io(path.as_str(), &e)),
        };

        let document = parser
            .parse(&content)
            .map_err(|e| LoadError::parse(path.as_str(), e))?;
        trace!(path = %path, keys = document.len(), "Loaded document");
        Ok(Lookup::Found(Arc::new(document)))
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

/// A missing intermediate directory surfaces as NotADirectory on some
/// platforms when a path segment is a regular file.
fn is_missing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}
