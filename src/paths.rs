//! Relative document paths and source root handling.
//!
//! Document paths are pure strings until the file source joins them under
//! its root:
//! - forward slashes only
//! - `.` and empty segments collapsed
//! - `..`, absolute paths, backslashes and NUL rejected

use crate::error::{ConfigError, PathError};
use std::fmt;
use std::path::{Path, PathBuf};

/// A canonical, root-relative document path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RelPath(String);

impl RelPath {
    /// Canonicalize `raw` into a relative path that cannot leave the root.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.starts_with('/') || (cfg!(windows) && is_drive_prefixed(raw)) {
            return Err(PathError::Absolute(raw.to_string()));
        }
        if raw.contains('\\') || raw.contains('\0') {
            return Err(PathError::IllegalCharacter(raw.to_string()));
        }

        let mut segments = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(PathError::Traversal(raw.to_string())),
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Err(PathError::Empty);
        }

        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File extension of the last segment, if any.
    pub fn extension(&self) -> Option<&str> {
        let file_name = self.0.rsplit('/').next()?;
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(ext),
            _ => None,
        }
    }

    /// Join under `root` using platform separators.
    pub fn under(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
    }
}

impl fmt::Display for RelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// `C:foo` style prefixes are absolute on Windows. Elsewhere `:` is an
/// ordinary file name character.
fn is_drive_prefixed(raw: &str) -> bool {
    let mut chars = raw.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), Some(':')) if c.is_ascii_alphabetic()
    )
}

/// Split a `file://` URI into the (percent-decoded) path it names.
///
/// Accepts `file:///abs/dir`, `file://localhost/abs/dir` and
/// `file://relative/dir`. Does not touch the filesystem.
pub fn parse_file_uri(uri: &str) -> Result<PathBuf, ConfigError> {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return Err(ConfigError::InvalidSource {
            uri: uri.to_string(),
            reason: "expected a URI of the form file:///path/to/dir".to_string(),
        });
    };

    if !scheme.eq_ignore_ascii_case("file") {
        return Err(ConfigError::UnsupportedScheme {
            uri: uri.to_string(),
            scheme: scheme.to_string(),
        });
    }

    // file://localhost/dir is the same as file:///dir
    let rest = match rest.strip_prefix("localhost/") {
        Some(tail) => &rest[rest.len() - tail.len() - 1..],
        None => rest,
    };
    if rest.is_empty() {
        return Err(ConfigError::InvalidSource {
            uri: uri.to_string(),
            reason: "missing path".to_string(),
        });
    }

    let decoded = urlencoding::decode(rest).map_err(|e| ConfigError::InvalidSource {
        uri: uri.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(decoded.as_ref()))
}

/// Resolve a `file://` URI to the canonical directory it names.
///
/// Relative roots are resolved against the current working directory. The
/// directory must exist.
pub fn root_from_uri(uri: &str) -> Result<PathBuf, ConfigError> {
    let path = parse_file_uri(uri)?;
    let invalid = |reason: String| ConfigError::InvalidSource {
        uri: uri.to_string(),
        reason,
    };

    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(|e| invalid(e.to_string()))?
            .join(path)
    };

    let root = absolute
        .canonicalize()
        .map_err(|e| invalid(format!("{}: {}", absolute.display(), e)))?;

    if !root.is_dir() {
        return Err(invalid(format!("{} is not a directory", root.display())));
    }

    Ok(root)
}

/// Build a `file://` URI for a local directory.
pub fn uri_for_dir(dir: &Path) -> String {
    format!("file://{}", dir.to_string_lossy().replace('\\', "/"))
}
