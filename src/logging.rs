//! Logging setup and per-site warning throttling.
//!
//! Output goes through `tracing`. The subscriber writes to stdout, stderr or
//! an append-mode file depending on the `--log` option, with `RUST_LOG`
//! taking precedence over the verbosity flag when set.

use anyhow::Result;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log output should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(String),
}

impl LogTarget {
    /// Parse the `--log` option: `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a
    /// filename.
    pub fn parse(value: &str) -> Self {
        match value {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" => LogTarget::Stderr,
            filename => LogTarget::File(filename.to_string()),
        }
    }
}

/// Install the global tracing subscriber.
pub fn init(target: &LogTarget, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    match target {
        LogTarget::Off => {}
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(filename) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

/// Limits how often a warning for the same site is emitted.
///
/// A site is any string key, typically `kind:path:key`. The first event for a
/// site passes; further events within `interval` are counted and the count is
/// handed back with the next event that passes.
///
/// Sites often embed values taken from points, so at most `max_sites` are
/// tracked. When full, sites whose interval has passed are evicted; if none
/// has, events for new sites are dropped.
pub struct LogThrottle {
    interval: Duration,
    max_sites: usize,
    sites: Mutex<HashMap<String, SiteState>>,
}

const DEFAULT_MAX_SITES: usize = 4096;

struct SiteState {
    last_emitted: Instant,
    suppressed: u64,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self::with_capacity(interval, DEFAULT_MAX_SITES)
    }

    pub fn with_capacity(interval: Duration, max_sites: usize) -> Self {
        Self {
            interval,
            max_sites,
            sites: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `Some(suppressed)` when the event should be logged, where
    /// `suppressed` counts events dropped since the last emission.
    pub fn check(&self, site: &str) -> Option<u64> {
        self.check_at(site, Instant::now())
    }

    fn check_at(&self, site: &str, now: Instant) -> Option<u64> {
        let mut sites = self.sites.lock().unwrap_or_else(|e| e.into_inner());
        match sites.get_mut(site) {
            None => {
                if sites.len() >= self.max_sites {
                    let interval = self.interval;
                    sites.retain(|_, state| now.duration_since(state.last_emitted) < interval);
                    if sites.len() >= self.max_sites {
                        return None;
                    }
                }
                sites.insert(
                    site.to_string(),
                    SiteState {
                        last_emitted: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
            Some(state) if now.duration_since(state.last_emitted) >= self.interval => {
                let suppressed = state.suppressed;
                state.last_emitted = now;
                state.suppressed = 0;
                Some(suppressed)
            }
            Some(state) => {
                state.suppressed = state.suppressed.saturating_add(1);
                None
            }
        }
    }

    /// Number of sites currently tracked.
    pub fn len(&self) -> usize {
        self.sites.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every site, e.g. after a reload changed the documents.
    pub fn reset(&self) {
        self.sites
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}
