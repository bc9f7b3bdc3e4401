//! Sideload
//!
//! Enriches a stream of points with fields and tags read from a hierarchy of
//! YAML/JSON files selected by the points' own tags.

use anyhow::{Context, Result};
use clap::Parser;
use sideload_node::cli::check::{self, CheckArgs};
use sideload_node::cli::run::RunArgs;
use sideload_node::cli::{Cli, Command};
use sideload_node::config::watcher::{WatcherConfig, start_source_watcher};
use sideload_node::config::{ConfigLoader, SideloadConfig};
use sideload_node::logging::{self, LogTarget};
use sideload_node::node::{Enriched, SideloadNode};
use sideload_node::paths::root_from_uri;
use sideload_node::point::Record;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut loader = ConfigLoader::load(cli.config.clone())?;
    if let Some(path) = loader.config_path() {
        info!("Loaded config from {}", path.display());
    }
    cli.apply_overrides(loader.config_mut())?;
    let config = loader.into_config().validate()?;

    match cli.command {
        Some(Command::Check(args)) => run_check(config, args)?,
        Some(Command::Run(args)) => run_stream(config, args).await?,
        None => run_stream(config, RunArgs::default()).await?,
    }

    Ok(())
}

/// Run the check command
fn run_check(config: SideloadConfig, args: CheckArgs) -> Result<()> {
    let node = if args.resolve {
        Some(SideloadNode::new(config.clone())?)
    } else {
        // Still verify the source root exists
        root_from_uri(config.source())?;
        None
    };
    print!("{}", check::report(&config, &args, node.as_ref()));
    Ok(())
}

/// Run the streaming command: one edge from the input to the output.
async fn run_stream(config: SideloadConfig, args: RunArgs) -> Result<()> {
    let root = root_from_uri(config.source())?;
    let node = Arc::new(SideloadNode::new(config)?);

    if args.watch {
        start_source_file_watcher(&node, root);
    }
    #[cfg(unix)]
    start_hangup_handler(&node)?;

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, finishing the current point");
            let _ = cancel_tx.send(true);
        }
    });

    let capacity = args.buffer.max(1);
    let (input_tx, input_rx) = mpsc::channel::<Record>(capacity);
    let (output_tx, mut output_rx) = mpsc::channel::<Enriched<Record>>(capacity);

    spawn_reader(args.input.clone(), input_tx)?;

    let edge = {
        let node = Arc::clone(&node);
        tokio::spawn(async move { node.run_edge(input_rx, output_tx, cancel_rx).await })
    };

    let mut writer: Box<dyn Write + Send> = match args.output {
        Some(ref path) => Box::new(BufWriter::new(
            std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };

    while let Some(enriched) = output_rx.recv().await {
        serde_json::to_writer(&mut writer, &enriched.data)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    let emitted = edge.await?;
    info!(emitted, "Sideload stream finished");

    if let Some(ref path) = args.metrics_file {
        std::fs::write(path, node.metrics().render()?)
            .with_context(|| format!("failed to write metrics to {}", path.display()))?;
    }

    Ok(())
}

/// Read JSON lines on a plain thread so a blocked stdin never holds up
/// shutdown. Lines that are not points or batches are logged and skipped.
fn spawn_reader(input: Option<std::path::PathBuf>, tx: mpsc::Sender<Record>) -> Result<()> {
    let reader: Box<dyn BufRead + Send> = match input {
        Some(ref path) => Box::new(BufReader::new(
            std::fs::File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        )),
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    std::thread::spawn(move || {
        for (index, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Record>(&line) {
                Ok(record) => {
                    if tx.blocking_send(record).is_err() {
                        debug!("Edge closed, stopping reader");
                        break;
                    }
                }
                Err(e) => warn!(line = index + 1, "Skipping malformed input: {}", e),
            }
        }
    });

    Ok(())
}

/// Start the source watcher and reload the node on every change.
///
/// If the watcher fails to start, the node keeps running without automatic
/// reloads and a warning is logged.
fn start_source_file_watcher(node: &Arc<SideloadNode>, root: std::path::PathBuf) {
    match start_source_watcher(root, WatcherConfig::default()) {
        Ok(mut handle) => {
            let node = Arc::clone(node);
            tokio::spawn(async move {
                loop {
                    match handle.wait_for_change().await {
                        Some(event) => {
                            if event.requires_reload() {
                                info!("Source change detected: {:?}", event);
                                node.reload();
                            }
                        }
                        None => {
                            info!("Source watcher stopped");
                            break;
                        }
                    }
                }
            });
        }
        Err(e) => {
            warn!(
                "Failed to start source watcher: {}. \
                 Continuing without automatic reload.",
                e
            );
        }
    }
}

#[cfg(unix)]
fn start_hangup_handler(node: &Arc<SideloadNode>) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup())?;
    let node = Arc::clone(node);
    tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            info!("SIGHUP received, reloading sideload cache");
            node.reload();
        }
    });
    Ok(())
}
