//! The sideload node: enriches points with values from the source hierarchy.
//!
//! A node is `Send + Sync` and meant to be shared as `Arc<SideloadNode>` by
//! every edge that feeds it. The document cache, metrics and log throttle
//! are the only shared mutable state. The throttle holds a bounded number of
//! sites, so distinct bad tag values cannot grow it without limit.

use crate::cache::DocumentCache;
use crate::config::{SideloadConfig, TagPolicy};
use crate::error::{ErrorKind, NodeError, SideloadError};
use crate::logging::LogThrottle;
use crate::metrics::NodeMetrics;
use crate::point::{Batch, Point, Record};
use crate::resolver::{Resolution, resolve};
use crate::source::{self, Source};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Output of the node: the enriched copy plus every non-fatal error.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<T> {
    pub data: T,
    pub errors: Vec<SideloadError>,
}

/// Anything an edge can carry through the node.
pub trait Enrich: Sized {
    fn enrich(&self, node: &SideloadNode) -> Enriched<Self>;
}

impl Enrich for Point {
    fn enrich(&self, node: &SideloadNode) -> Enriched<Self> {
        node.process(self)
    }
}

impl Enrich for Batch {
    fn enrich(&self, node: &SideloadNode) -> Enriched<Self> {
        node.process_batch(self)
    }
}

impl Enrich for Record {
    fn enrich(&self, node: &SideloadNode) -> Enriched<Self> {
        match self {
            Record::Point(point) => {
                let Enriched { data, errors } = node.process(point);
                Enriched {
                    data: Record::Point(data),
                    errors,
                }
            }
            Record::Batch(batch) => {
                let Enriched { data, errors } = node.process_batch(batch);
                Enriched {
                    data: Record::Batch(data),
                    errors,
                }
            }
        }
    }
}

pub struct SideloadNode {
    config: SideloadConfig,
    cache: DocumentCache,
    metrics: NodeMetrics,
    throttle: LogThrottle,
}

impl SideloadNode {
    /// Build a node reading from the config's `file://` source.
    pub fn new(config: SideloadConfig) -> Result<Self, NodeError> {
        let source = source::from_uri(config.source())?;
        Self::with_source(config, source)
    }

    /// Build a node over any [`Source`].
    pub fn with_source(config: SideloadConfig, source: Arc<dyn Source>) -> Result<Self, NodeError> {
        let metrics = NodeMetrics::new()?;
        info!(
            source = %source.describe(),
            templates = config.order().len(),
            fields = config.fields().len(),
            tags = config.tags().len(),
            "Sideload node created"
        );
        Ok(Self {
            throttle: LogThrottle::new(config.log_throttle()),
            cache: DocumentCache::new(source),
            config,
            metrics,
        })
    }

    pub fn config(&self) -> &SideloadConfig {
        &self.config
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    pub fn cache(&self) -> &DocumentCache {
        &self.cache
    }

    /// Enrich one point. The input is left untouched.
    pub fn process(&self, point: &Point) -> Enriched<Point> {
        self.enrich_with_tags(point, &point.tags)
    }

    /// Enrich every point of a batch independently, preserving order.
    ///
    /// Paths are expanded against the batch's group tags overlaid by each
    /// point's own tags.
    pub fn process_batch(&self, batch: &Batch) -> Enriched<Batch> {
        let mut errors = Vec::new();
        let points = batch
            .points
            .iter()
            .map(|point| {
                let tags = batch.effective_tags(point);
                let enriched = self.enrich_with_tags(point, &tags);
                errors.extend(enriched.errors);
                enriched.data
            })
            .collect();

        Enriched {
            data: Batch {
                name: batch.name.clone(),
                tags: batch.tags.clone(),
                points,
            },
            errors,
        }
    }

    /// `tags` are the tags paths were expanded against. Under
    /// [`TagPolicy::FillMissing`] a tag already present there is kept, even
    /// when it came from the batch group rather than the point.
    fn enrich_with_tags(&self, point: &Point, tags: &BTreeMap<String, String>) -> Enriched<Point> {
        let resolution = resolve(&self.config, &self.cache, tags);
        self.report(&resolution);

        let mut enriched = point.clone();
        enriched.fields.extend(resolution.fields);
        match self.config.tag_policy() {
            TagPolicy::Override => enriched.tags.extend(resolution.tags),
            TagPolicy::FillMissing => {
                for (name, value) in resolution.tags {
                    if !tags.contains_key(&name) {
                        enriched.tags.insert(name, value);
                    }
                }
            }
        }

        self.metrics.record_point();
        self.metrics.set_cache_entries(self.cache.len());

        Enriched {
            data: enriched,
            errors: resolution.errors,
        }
    }

    /// Count every error of one resolution and log it unless its site is
    /// throttled.
    fn report(&self, resolution: &Resolution) {
        for rejected in &resolution.rejected {
            self.metrics.record_error(ErrorKind::Path);
            let site = format!("path:{}:{:?}", rejected.index, rejected.rendered);
            if let Some(suppressed) = self.throttle.check(&site) {
                warn!(
                    template = %rejected.template,
                    tags = ?rejected.rendered,
                    error = %rejected.error,
                    suppressed,
                    "Sideload path rejected"
                );
            }
        }

        for error in &resolution.errors {
            let site = match error {
                SideloadError::Path { .. } => continue,
                SideloadError::Load { path, .. } => format!("load:{path}"),
                SideloadError::TypeMismatch { key, path, .. } => {
                    format!("type_mismatch:{path}:{key}")
                }
            };
            self.metrics.record_error(error.kind());
            if let Some(suppressed) = self.throttle.check(&site) {
                warn!(kind = %error.kind(), suppressed, "{}", error);
            }
        }
    }

    /// Drop every cached document so the next point sees current contents.
    pub fn reload(&self) {
        self.cache.reload();
        self.throttle.reset();
        self.metrics.record_reload();
        self.metrics.set_cache_entries(self.cache.len());
    }

    /// Drive one edge until the input closes, the output is dropped or
    /// `cancel` turns true.
    ///
    /// Items are emitted in arrival order. On cancellation the item being
    /// processed is still emitted and nothing further is taken from `input`.
    /// Returns the number of items emitted.
    pub async fn run_edge<T>(
        &self,
        mut input: mpsc::Receiver<T>,
        output: mpsc::Sender<Enriched<T>>,
        mut cancel: watch::Receiver<bool>,
    ) -> usize
    where
        T: Enrich + Send,
    {
        let mut emitted = 0;
        let mut cancel_open = true;

        loop {
            if *cancel.borrow_and_update() {
                debug!(emitted, "Sideload edge cancelled");
                break;
            }

            let item = tokio::select! {
                biased;
                changed = cancel.changed(), if cancel_open => {
                    if changed.is_err() {
                        // Nobody can cancel any more; keep draining input.
                        cancel_open = false;
                    }
                    continue;
                }
                item = input.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            if output.send(item.enrich(self)).await.is_err() {
                debug!(emitted, "Sideload edge output closed");
                break;
            }
            emitted += 1;
        }

        emitted
    }
}
