//! Per-node document cache.
//!
//! Readers load an immutable snapshot through `ArcSwap` and never block.
//! Misses take the `fill` lock, re-check the current snapshot, consult the
//! source and publish a copy of the snapshot containing the result. `reload`
//! takes the same lock and swaps in an empty snapshot, so a fill in progress
//! either lands before the reload or starts after it.

use crate::error::LoadError;
use crate::paths::RelPath;
use crate::source::{Lookup, Source};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

#[derive(Debug, Default)]
struct Snapshot {
    generation: u64,
    entries: HashMap<RelPath, Lookup>,
}

/// Memoizes source lookups by canonical path.
pub struct DocumentCache {
    source: Arc<dyn Source>,
    snapshot: ArcSwap<Snapshot>,
    fill: Mutex<()>,
}

impl DocumentCache {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            source,
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            fill: Mutex::new(()),
        }
    }

    /// Look up `path`, loading it from the source on first use.
    ///
    /// Found and NotFound outcomes are cached until the next [`reload`].
    /// Load errors are returned without caching so the next call retries.
    ///
    /// [`reload`]: DocumentCache::reload
    pub fn get(&self, path: &RelPath) -> Result<Lookup, LoadError> {
        if let Some(hit) = self.snapshot.load().entries.get(path) {
            return Ok(hit.clone());
        }

        let _guard = self.fill.lock().unwrap_or_else(|e| e.into_inner());

        // Another edge may have filled it while we waited.
        let current = self.snapshot.load_full();
        if let Some(hit) = current.entries.get(path) {
            return Ok(hit.clone());
        }

        let lookup = self.source.load(path)?;
        debug!(
            path = %path,
            found = matches!(lookup, Lookup::Found(_)),
            "Cached document lookup"
        );

        let mut entries = current.entries.clone();
        entries.insert(path.clone(), lookup.clone());
        self.snapshot.store(Arc::new(Snapshot {
            generation: current.generation,
            entries,
        }));

        Ok(lookup)
    }

    /// Drop every cached entry. The next `get` for any path reads the source.
    pub fn reload(&self) {
        let _guard = self.fill.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.snapshot.load();
        let dropped = previous.entries.len();
        let generation = previous.generation + 1;
        self.snapshot.store(Arc::new(Snapshot {
            generation,
            entries: HashMap::new(),
        }));
        info!(
            source = %self.source.describe(),
            dropped,
            generation,
            "Sideload cache reloaded"
        );
    }

    /// Number of cached paths, found or not.
    pub fn len(&self) -> usize {
        self.snapshot.load().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Times the cache has been reloaded.
    pub fn generation(&self) -> u64 {
        self.snapshot.load().generation
    }
}
