//! Configuration file discovery and loading.
//!
//! The first existing file wins, in this order:
//! 1. `--config <path>` (must exist)
//! 2. `SIDELOAD_CONFIG`
//! 3. `./sideload.yaml`
//! 4. `<config_dir>/sideload/config.yaml`
//!
//! `SIDELOAD_SOURCE` then overrides the source URI. CLI flags are applied by
//! the binary after loading.

use super::types::NodeConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate config file locations, highest priority first.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// Explicit path from the command line
    pub explicit: Option<PathBuf>,
    /// Path from `SIDELOAD_CONFIG`
    pub env: Option<PathBuf>,
    /// `./sideload.yaml`
    pub project_file: Option<PathBuf>,
    /// `<config_dir>/sideload/config.yaml`
    pub user_file: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover configuration paths from environment and defaults.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            env: std::env::var("SIDELOAD_CONFIG").ok().map(PathBuf::from),
            project_file: Some(PathBuf::from("sideload.yaml")),
            user_file: dirs::config_dir().map(|d| d.join("sideload").join("config.yaml")),
        }
    }

    /// Create paths with explicit files only.
    pub fn with_files(project_file: Option<PathBuf>, user_file: Option<PathBuf>) -> Self {
        Self {
            explicit: None,
            env: None,
            project_file,
            user_file,
        }
    }

    /// The file that will be loaded, if any.
    ///
    /// An explicit path is returned even when it does not exist so that
    /// loading reports the error instead of silently falling through.
    pub fn effective_file(&self) -> Option<&Path> {
        if let Some(ref path) = self.explicit {
            return Some(path);
        }
        [&self.env, &self.project_file, &self.user_file]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
            .find(|p| p.is_file())
    }
}

/// Loads the node configuration from the discovered file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    pub paths: ConfigPaths,
    config: NodeConfig,
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn load(explicit: Option<PathBuf>) -> Result<Self> {
        Self::load_with_paths(ConfigPaths::discover(explicit))
    }

    /// Load with explicit paths. No file found means an empty config that the
    /// command line must complete.
    pub fn load_with_paths(paths: ConfigPaths) -> Result<Self> {
        let config_path = paths.effective_file().map(Path::to_path_buf);

        let mut config = match config_path {
            Some(ref path) => {
                debug!("Loading config from {}", path.display());
                NodeConfig::load(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?
            }
            None => {
                debug!("No config file found, using defaults");
                NodeConfig::default()
            }
        };

        Self::apply_env_overrides(&mut config);

        Ok(Self {
            paths,
            config,
            config_path,
        })
    }

    fn apply_env_overrides(config: &mut NodeConfig) {
        apply_source_override(config, std::env::var("SIDELOAD_SOURCE").ok());
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut NodeConfig {
        &mut self.config
    }

    pub fn into_config(self) -> NodeConfig {
        self.config
    }

    /// The config file that was used, if any.
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}

fn apply_source_override(config: &mut NodeConfig, source: Option<String>) {
    if let Some(source) = source.filter(|s| !s.is_empty()) {
        config.source = Some(source);
    }
}
