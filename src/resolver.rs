//! First-hit-wins resolution of enrolled fields and tags for one point.
//!
//! For every enrolled key the expanded paths are searched in precedence
//! order. The first document holding the key with the required kind supplies
//! the value; a wrongly kinded value is reported and the search continues.
//! Keys nobody supplies fall back to their defaults.

use crate::cache::DocumentCache;
use crate::config::SideloadConfig;
use crate::error::SideloadError;
use crate::paths::RelPath;
use crate::source::{Document, Lookup};
use crate::template::{Rejected, expand};
use crate::value::{Scalar, ScalarKind};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Values to overlay onto a point, plus the errors met on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Every enrolled field, resolved or defaulted.
    pub fields: BTreeMap<String, Scalar>,
    /// Every enrolled tag, resolved or defaulted.
    pub tags: BTreeMap<String, String>,
    pub errors: Vec<SideloadError>,
    /// Templates whose expansion was rejected, in declared order.
    pub rejected: Vec<Rejected>,
}

/// Resolve every enrolled key for a point carrying `tags`.
pub fn resolve(
    config: &SideloadConfig,
    cache: &DocumentCache,
    tags: &BTreeMap<String, String>,
) -> Resolution {
    let expansion = expand(config.order(), tags);
    let mut errors: Vec<SideloadError> = expansion
        .rejected
        .iter()
        .map(|r| SideloadError::Path {
            template: r.template.clone(),
            source: r.error.clone(),
        })
        .collect();

    let mut documents = Documents::new(cache, expansion.paths);

    let fields = config
        .fields()
        .iter()
        .map(|(name, default)| {
            let value = documents
                .search(name, default.kind(), &mut errors)
                .unwrap_or_else(|| default.clone());
            (name.clone(), value)
        })
        .collect();

    let tags = config
        .tags()
        .iter()
        .map(|(name, default)| {
            let value = match documents.search(name, ScalarKind::String, &mut errors) {
                Some(Scalar::String(s)) => s,
                _ => default.clone(),
            };
            (name.clone(), value)
        })
        .collect();

    Resolution {
        fields,
        tags,
        errors,
        rejected: expansion.rejected,
    }
}

/// Lazily fetched documents for one point.
///
/// Each distinct path is fetched at most once. A later duplicate of an
/// earlier path can never change the outcome and is skipped.
struct Documents<'a> {
    cache: &'a DocumentCache,
    paths: Vec<RelPath>,
    // None until fetched; Some(None) for NotFound or a failed load
    loaded: Vec<Option<Option<Arc<Document>>>>,
}

impl<'a> Documents<'a> {
    fn new(cache: &'a DocumentCache, paths: Vec<RelPath>) -> Self {
        let mut seen = HashSet::new();
        let paths: Vec<RelPath> = paths
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
        let loaded = vec![None; paths.len()];
        Self {
            cache,
            paths,
            loaded,
        }
    }

    fn document(&mut self, index: usize, errors: &mut Vec<SideloadError>) -> Option<Arc<Document>> {
        if let Some(ref loaded) = self.loaded[index] {
            return loaded.clone();
        }

        let path = &self.paths[index];
        let loaded = match self.cache.get(path) {
            Ok(Lookup::Found(doc)) => Some(doc),
            Ok(Lookup::NotFound) => None,
            Err(source) => {
                errors.push(SideloadError::Load {
                    path: path.to_string(),
                    source,
                });
                None
            }
        };
        self.loaded[index] = Some(loaded.clone());
        loaded
    }

    fn search(
        &mut self,
        key: &str,
        expected: ScalarKind,
        errors: &mut Vec<SideloadError>,
    ) -> Option<Scalar> {
        for index in 0..self.paths.len() {
            let Some(doc) = self.document(index, errors) else {
                continue;
            };
            let Some(value) = doc.get(key) else {
                continue;
            };
            if value.kind() == expected {
                return Some(value.clone());
            }
            errors.push(SideloadError::TypeMismatch {
                key: key.to_string(),
                path: self.paths[index].to_string(),
                expected,
                found: value.kind(),
            });
        }
        None
    }
}
