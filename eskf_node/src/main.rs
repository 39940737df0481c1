//! eskf-node entry point.

use clap::Parser;
use eskf_node::{Config, EskfNode};
use eyre::{Result, WrapErr};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Replay a recorded sensor stream through the dispatch layer and write the
/// published poses as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "eskf-node", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    config: PathBuf,

    /// Validate the configuration and recording, then exit.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    // Poses may go to stdout, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!(config_file = %cli.config.display(), "Loading configuration");
    let config = Config::load(&cli.config)?;

    info!(
        fusion_mask = %config.dispatch.fusion_mask,
        publish_rate = config.dispatch.publish_rate,
        frame_id = %config.dispatch.frame_id,
        recording = %config.replay.path.display(),
        realtime = config.replay.realtime,
        "Configuration loaded"
    );

    let node = EskfNode::new(config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("Failed to create tokio runtime")?;

    if cli.dry_run {
        return runtime.block_on(node.check());
    }

    let summary = runtime.block_on(node.run())?;

    info!(
        interrupted = summary.interrupted,
        position = ?summary.final_position,
        "eskf-node shutting down"
    );
    Ok(())
}
