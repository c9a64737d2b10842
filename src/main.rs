//! Command-line interface for rangeread
//!
//! # Usage Examples
//!
//! ```bash
//! # Whole object to stdout
//! rangeread cat s3://my-bucket/exports/users.csv
//!
//! # A byte window
//! rangeread cat s3://my-bucket/exports/users.csv --offset 1024 --length 512
//!
//! # Lines from an HTTP server supporting Range requests
//! rangeread lines https://example.com/data.csv --limit 20
//!
//! # Object metadata
//! rangeread stat ./data.csv
//! ```
//!
//! Set `RUST_LOG=debug` to see every range fetch.

use anyhow::Context;
use clap::{Parser, Subcommand};
use rangeread::{CatOpts, LinesOpts, ReaderOpts};
use rangeread_file::FileSource;

#[derive(Parser)]
#[command(name = "rangeread")]
#[command(about = "Sequential reads over S3 objects, HTTP resources and local files")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write object bytes to stdout
    Cat {
        /// Object URI (s3://bucket/key, http(s)://..., or a local path)
        uri: String,

        #[command(flatten)]
        cat_opts: CatOpts,

        #[command(flatten)]
        reader_opts: ReaderOpts,
    },
    /// Write object lines to stdout
    Lines {
        /// Object URI (s3://bucket/key, http(s)://..., or a local path)
        uri: String,

        #[command(flatten)]
        lines_opts: LinesOpts,

        #[command(flatten)]
        reader_opts: ReaderOpts,
    },
    /// Show object size and last-modified time
    Stat {
        /// Object URI (s3://bucket/key, http(s)://..., or a local path)
        uri: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let uri = match &cli.command {
        Commands::Cat { uri, .. } | Commands::Lines { uri, .. } | Commands::Stat { uri } => {
            uri.clone()
        }
    };
    let file_source = FileSource::parse(&uri)?;
    let source = file_source
        .open_range_source()
        .await
        .with_context(|| format!("Failed to open {}", file_source.display_name()))?;

    // Readers block on fetches, so keep them off the runtime workers
    tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        match cli.command {
            Commands::Cat {
                cat_opts,
                reader_opts,
                ..
            } => {
                rangeread::cat(source, &cat_opts, &reader_opts, &mut out)?;
            }
            Commands::Lines {
                lines_opts,
                reader_opts,
                ..
            } => {
                rangeread::lines(source, &lines_opts, &reader_opts, &mut out)?;
            }
            Commands::Stat { .. } => {
                rangeread::stat(source, &mut out)?;
            }
        }
        Ok::<(), anyhow::Error>(())
    })
    .await
    .context("Reader task panicked")??;

    Ok(())
}
