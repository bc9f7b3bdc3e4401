//! Prometheus metrics for a sideload node.
//!
//! Each node owns its registry so several nodes in one process never collide
//! on metric names.

use crate::error::ErrorKind;
use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    errors: IntCounterVec,
    cache_entries: IntGauge,
    points: IntCounter,
    reloads: IntCounter,
}

impl NodeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let errors = IntCounterVec::new(
            Opts::new(
                "sideload_errors_total",
                "Non-fatal enrichment errors by kind",
            ),
            &["kind"],
        )?;
        let cache_entries = IntGauge::with_opts(Opts::new(
            "sideload_cache_entries",
            "Paths currently held in the document cache",
        ))?;
        let points = IntCounter::with_opts(Opts::new(
            "sideload_points_total",
            "Points enriched by the node",
        ))?;
        let reloads = IntCounter::with_opts(Opts::new(
            "sideload_reloads_total",
            "Document cache reloads",
        ))?;

        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(cache_entries.clone()))?;
        registry.register(Box::new(points.clone()))?;
        registry.register(Box::new(reloads.clone()))?;

        // Pre-create the series so they render as zero before the first error.
        for kind in [ErrorKind::Path, ErrorKind::Load, ErrorKind::TypeMismatch] {
            errors.with_label_values(&[kind.as_label()]);
        }

        Ok(Self {
            registry,
            errors,
            cache_entries,
            points,
            reloads,
        })
    }

    pub fn record_error(&self, kind: ErrorKind) {
        self.errors.with_label_values(&[kind.as_label()]).inc();
    }

    pub fn error_count(&self, kind: ErrorKind) -> u64 {
        self.errors.with_label_values(&[kind.as_label()]).get()
    }

    pub fn set_cache_entries(&self, entries: usize) {
        self.cache_entries.set(i64::try_from(entries).unwrap_or(i64::MAX));
    }

    pub fn cache_entries(&self) -> i64 {
        self.cache_entries.get()
    }

    pub fn record_point(&self) {
        self.points.inc();
    }

    pub fn points(&self) -> u64 {
        self.points.get()
    }

    pub fn record_reload(&self) {
        self.reloads.inc();
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
