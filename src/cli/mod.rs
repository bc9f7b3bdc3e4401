//! CLI command definitions for the sideload binary.
//!
//! Global flags override whatever the config file provides; see
//! [`Cli::apply_overrides`].

pub mod check;
pub mod run;

use crate::config::{NodeConfig, TagPolicy};
use anyhow::{Context, Result};
use check::CheckArgs;
use clap::{Parser, Subcommand, ValueEnum};
use run::RunArgs;
use std::path::PathBuf;

/// Tag policy as accepted on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliTagPolicy {
    /// Replace tags the point already has
    Override,
    /// Only add tags the point lacks
    FillMissing,
}

impl From<CliTagPolicy> for TagPolicy {
    fn from(policy: CliTagPolicy) -> Self {
        match policy {
            CliTagPolicy::Override => TagPolicy::Override,
            CliTagPolicy::FillMissing => TagPolicy::FillMissing,
        }
    }
}

/// Enrich streams of points with values from a hierarchy of YAML/JSON files
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Source URI (file:// only), overrides config
    #[arg(short, long, global = true)]
    pub source: Option<String>,

    /// Path template, highest precedence first; repeat to build the order
    #[arg(short, long = "order", value_name = "TEMPLATE", global = true)]
    pub order: Vec<String>,

    /// Enroll a field with its default, e.g. `cpu_threshold=80`
    #[arg(long = "field", value_name = "NAME=DEFAULT", value_parser = parse_key_value, global = true)]
    pub fields: Vec<(String, String)>,

    /// Enroll a tag with its default, e.g. `region=unknown`
    #[arg(long = "tag", value_name = "NAME=DEFAULT", value_parser = parse_key_value, global = true)]
    pub tags: Vec<(String, String)>,

    /// What to do with tags the point already carries
    #[arg(long, value_enum, global = true)]
    pub tag_policy: Option<CliTagPolicy>,

    /// Minimum seconds between repeated warnings for the same file and key
    #[arg(long, value_name = "SECS", global = true)]
    pub log_throttle_secs: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Enrich JSON-lines points (default if no subcommand given)
    Run(RunArgs),

    /// Validate the configuration and show how tags expand to paths
    Check(CheckArgs),
}

impl Cli {
    /// Apply command line overrides on top of the loaded config.
    pub fn apply_overrides(&self, config: &mut NodeConfig) -> Result<()> {
        if let Some(ref source) = self.source {
            config.source = Some(source.clone());
        }
        if !self.order.is_empty() {
            config.order = self.order.clone();
        }
        for (name, raw) in &self.fields {
            let value = serde_yaml::from_str(raw)
                .with_context(|| format!("invalid default for field '{name}': {raw}"))?;
            config.fields.insert(name.clone(), value);
        }
        for (name, value) in &self.tags {
            config.tags.insert(name.clone(), value.clone());
        }
        if let Some(policy) = self.tag_policy {
            config.tag_policy = policy.into();
        }
        if let Some(secs) = self.log_throttle_secs {
            config.log_throttle_secs = secs;
        }
        Ok(())
    }
}

/// Parse `name=value`. The value may be empty; the name may not.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{raw}'")),
    }
}
