//! Run subcommand: stream JSON-lines points through a node.

use clap::Args;
use std::path::PathBuf;

/// Arguments for the run subcommand
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Input file of JSON-lines points or batches (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Output file for enriched JSON lines (default: stdout)
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Reload the cache when files under the source root change
    #[arg(short, long)]
    pub watch: bool,

    /// Write Prometheus metrics to this file on exit
    #[arg(long, value_name = "FILE")]
    pub metrics_file: Option<PathBuf>,

    /// Capacity of the edge channels
    #[arg(long, default_value_t = 1024)]
    pub buffer: usize,
}
