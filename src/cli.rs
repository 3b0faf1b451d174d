//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use assetgrab_core::DEFAULT_CONCURRENCY;

/// Batch-download cataloged browser resources.
///
/// Assetgrab reads a catalog manifest (a versioned JSON envelope of
/// resource records) and downloads every record into a destination
/// directory, preserving the original URL path structure.
#[derive(Parser, Debug)]
#[command(name = "assetgrab")]
#[command(author, version, about)]
pub struct Args {
    /// Path to the catalog manifest, or `-` to read it from stdin
    #[arg(short, long, default_value = "-")]
    pub manifest: String,

    /// Destination directory for downloaded resources
    #[arg(short, long, default_value = "./saved_resources")]
    pub out: PathBuf,

    /// Maximum concurrent downloads per group (1-20)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=20))]
    pub concurrency: u8,

    /// Cookie header forwarded with every request (e.g. "sid=abc; lang=en")
    #[arg(long)]
    pub cookie: Option<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}
