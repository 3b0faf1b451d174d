//! CLI entry point for the assetgrab tool.

use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use assetgrab_core::{
    BatchDownloader, BatchOptions, NullSink, ProgressSnapshot, ResourceRecord, wire,
};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Log level priority: RUST_LOG env var > quiet flag > verbose flag > info
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, "CLI arguments parsed");

    let manifest_text = read_manifest(&args.manifest)?;
    let records: Vec<ResourceRecord> =
        wire::decode(&manifest_text).context("failed to decode catalog manifest")?;
    info!(records = records.len(), out = %args.out.display(), "manifest loaded");

    if records.is_empty() {
        info!("manifest contains no resources, nothing to do");
        println!(
            "{}",
            wire::encode(&assetgrab_core::BatchResult {
                total_requested: 0,
                succeeded: 0,
                failed: 0,
                errors: Vec::new(),
            })?
        );
        return Ok(());
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create destination {}", args.out.display()))?;

    let options = BatchOptions {
        concurrency: usize::from(args.concurrency),
        ..BatchOptions::default()
    };
    let downloader = BatchDownloader::new(options);

    let bar = progress_bar(records.len(), args.no_progress, args.quiet);
    let result = match &bar {
        Some(bar) => {
            let bar = bar.clone();
            let sink = move |snapshot: ProgressSnapshot| {
                bar.set_position(snapshot.downloaded as u64);
                bar.set_message(format!(
                    "ok {} / failed {}",
                    snapshot.successful, snapshot.failed
                ));
            };
            downloader
                .download_all(&records, &args.out, args.cookie.as_deref(), &sink)
                .await
        }
        None => {
            downloader
                .download_all(&records, &args.out, args.cookie.as_deref(), &NullSink)
                .await
        }
    };
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    info!(
        succeeded = result.succeeded,
        failed = result.failed,
        total = result.total_requested,
        "download complete"
    );

    // Per-resource failures are data, not a process error: report them in
    // the result envelope and exit zero.
    println!("{}", wire::encode(&result)?);
    Ok(())
}

/// Reads the manifest from a file, or from stdin when the path is `-`.
fn read_manifest(path: &str) -> Result<String> {
    if path == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("failed to read manifest from stdin")?;
        Ok(buffer)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest file {path}"))
    }
}

/// Builds the progress bar unless disabled by flags or a non-terminal stderr.
fn progress_bar(total: usize, no_progress: bool, quiet: bool) -> Option<ProgressBar> {
    if no_progress || quiet || !io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
    {
        bar.set_style(style);
    }
    Some(bar)
}
