use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use gcsr_core::{
    config::{DEFAULT_CAPACITY, DEFAULT_EXTENSION, DEFAULT_WORKERS},
    stopwatch::stopwatch,
    Config, FailurePolicy, Pipeline, MEBIBYTE,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Convert binary edge-list files into deduplicated CSR graphs.
///
/// Every `<stem>.<ext>` file of the input directory becomes `<stem>.row`,
/// `<stem>.ptr` and `<stem>.col`.
#[derive(Parser, Debug)]
#[command(name = "gcsr", author, version, about)]
struct Cli
{
    /// Directory holding the edge-list files
    input_dir: PathBuf,

    /// Directory for the CSR files, created if missing [default: next to each input]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Extension of the edge-list files
    #[arg(short, long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// Files converted at the same time
    #[arg(short, long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Threads shared by the parallel sort, scan and scatter [default: all cores]
    #[arg(short, long)]
    threads: Option<usize>,

    /// Pending files buffered ahead of the workers
    #[arg(long, default_value_t = DEFAULT_CAPACITY)]
    capacity: usize,

    /// Largest single read or write, in MiB
    #[arg(long, default_value_t = 128)]
    chunk_mib: usize,

    /// Log failing files and continue instead of stopping at the first one
    #[arg(long)]
    keep_going: bool,

    /// Do not delete the edge-list files after converting them
    #[arg(long)]
    keep_source: bool,

    /// Log every stage
    #[arg(short, long)]
    verbose: bool,
}

impl Cli
{
    fn config(&self) -> Config
    {
        let mut config = Config::new()
            .with_workers(self.workers)
            .with_capacity(self.capacity)
            .with_chunk_bytes(self.chunk_mib.saturating_mul(MEBIBYTE))
            .with_extension(self.extension.clone())
            .with_keep_source(self.keep_source)
            .with_policy(if self.keep_going {
                FailurePolicy::Skip
            }
            else {
                FailurePolicy::Abort
            });

        if let Some(threads) = self.threads {
            config = config.with_num_threads(threads);
        }
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir.clone());
        }
        config
    }
}

fn main() -> Result<()>
{
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "gcsr_core=debug,gcsr=debug"
    }
    else {
        "gcsr_core=info,gcsr=info"
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(dir) = &cli.output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }

    let pipeline = Pipeline::new(cli.config()).context("failed to set up pipeline")?;

    let summary = stopwatch("total", || pipeline.run(&cli.input_dir))
        .with_context(|| format!("failed to convert {}", cli.input_dir.display()))?;

    tracing::info!(
        "{} -> {} files converted, {} failed, {} of {} edges kept",
        cli.input_dir.display(),
        summary.converted,
        summary.failed,
        summary.edges,
        summary.raw_edges
    );

    if summary.failed > 0 {
        anyhow::bail!("{} of {} files failed", summary.failed, summary.queued);
    }

    Ok(())
}
