//! snowmelt: raw music-streaming JSON to a star-schema Parquet warehouse.
//!
//! Reads the song catalog and event log datasets from local disk or S3 and
//! overwrites the warehouse tables (songs, artists, users, time, songplay)
//! as Hive-partitioned Parquet.

use clap::Parser;
use snafu::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use snowmelt::config::Config;
use snowmelt::error::{AddressParseSnafu, ConfigSnafu, MetricsSnafu, PipelineError};
use snowmelt::metrics;
use snowmelt::pipeline::Pipeline;

/// Song-catalog and event-log ETL tool.
#[derive(Parser, Debug)]
#[command(name = "snowmelt")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration and inputs without writing.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
#[tokio::main]
async fn main() -> Result<(), PipelineError> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("snowmelt starting");

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;

    // Initialize metrics if enabled
    if config.metrics.enabled {
        let addr = config.metrics.address.parse().context(AddressParseSnafu)?;
        metrics::init(addr).context(MetricsSnafu)?;
        debug!(
            "Metrics endpoint listening on http://{}/metrics",
            config.metrics.address
        );
    }

    let input = config.input.path.clone();
    let output = config.output.path.clone();
    let pipeline = Pipeline::new(config).await?;

    if args.dry_run {
        info!("Dry run mode - validating configuration and inputs");
        info!("Input: {}", input);
        info!("Output: {}", output);
        pipeline.preflight().await?;
        info!("Configuration is valid");
        return Ok(());
    }

    let stats = pipeline.run().await?;

    info!("Pipeline completed successfully");
    info!("  Song files read: {}", stats.song_files);
    info!("  Log files read: {}", stats.log_files);
    info!("  Records read: {}", stats.records_read);
    info!("  songs rows: {}", stats.songs.rows);
    info!("  artists rows: {}", stats.artists.rows);
    info!("  users rows: {}", stats.users.rows);
    info!("  time rows: {}", stats.time.rows);
    info!("  songplay rows: {}", stats.songplays.rows);

    Ok(())
}
