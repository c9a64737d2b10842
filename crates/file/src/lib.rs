//! Range sources for reading objects from the local filesystem, S3, or HTTP/HTTPS
//!
//! Each source implements [`range_reader::RangeSource`], so any of them can be
//! wrapped in a [`range_reader::RangeReader`] for sequential, line-oriented
//! reads that fail loudly if the object changes mid-read.
//!
//! # Source Types
//!
//! - **Local**: A single file on the local filesystem
//! - **S3**: A single object in an AWS S3 bucket
//! - **HTTP/HTTPS**: A single URL served with `Range` support
//!
//! Directory and prefix URIs (ending with `/`) are recognized but rejected;
//! a reader covers exactly one object.
//!
//! # Blocking
//!
//! S3 and HTTP sources wrap async clients and block on the runtime they were
//! opened from. Drive readers over them from a blocking context such as
//! `tokio::task::spawn_blocking`, never directly on a runtime worker.
//!
//! # Example
//!
//! ```ignore
//! use range_reader::RangeReader;
//! use rangeread_file::FileSource;
//!
//! let source = FileSource::parse("s3://bucket/data/file.csv")?
//!     .open_range_source()
//!     .await?;
//! let lines = tokio::task::spawn_blocking(move || {
//!     let mut reader = RangeReader::new(source)?;
//!     reader.lines().collect::<Result<Vec<_>, _>>()
//! })
//! .await??;
//! ```

mod http;
mod local;
mod s3;

use anyhow::{Context, Result};
use range_reader::RangeSource;
use std::path::PathBuf;

pub use http::HttpRangeSource;
pub use local::LocalRangeSource;
pub use s3::{S3Client, S3RangeSource};

/// A range source that can be moved to a blocking thread and shared
pub type BoxedRangeSource = Box<dyn RangeSource + Send + Sync>;

/// Unified source type representing an object location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Local filesystem path
    Local(PathBuf),
    /// S3 location
    S3 { bucket: String, key: String },
    /// HTTP/HTTPS URL
    Http(String),
}

impl FileSource {
    /// Parse a string into a FileSource, auto-detecting the source type
    ///
    /// - `s3://bucket/key` -> S3
    /// - `http://` or `https://` -> Http
    /// - Everything else -> Local
    pub fn parse(uri: &str) -> Result<Self> {
        if uri.starts_with("s3://") {
            let (bucket, key) = parse_s3_uri(uri)?;
            Ok(FileSource::S3 { bucket, key })
        } else if uri.starts_with("http://") || uri.starts_with("https://") {
            Ok(FileSource::Http(uri.to_string()))
        } else {
            Ok(FileSource::Local(PathBuf::from(uri)))
        }
    }

    /// Check if this source names a directory/prefix (ends with /)
    pub fn is_directory(&self) -> bool {
        match self {
            FileSource::Local(path) => {
                path.to_string_lossy().ends_with('/')
                    || path.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR)
            }
            FileSource::S3 { key, .. } => key.ends_with('/'),
            FileSource::Http(_) => false,
        }
    }

    /// Open this location as a range source.
    ///
    /// S3 and HTTP sources capture the current tokio runtime, so this must
    /// be awaited inside one.
    pub async fn open_range_source(&self) -> Result<BoxedRangeSource> {
        if self.is_directory() {
            anyhow::bail!(
                "{} is a directory or prefix; only single objects can be read",
                self.display_name()
            );
        }

        let source: BoxedRangeSource = match self {
            FileSource::Local(path) => Box::new(LocalRangeSource::open(path)?),
            FileSource::S3 { bucket, key } => {
                let client = S3Client::new().await?;
                Box::new(client.open_range_source(bucket, key).await?)
            }
            FileSource::Http(url) => Box::new(HttpRangeSource::open(url).await?),
        };

        tracing::debug!("Opened range source: {}", self.display_name());
        Ok(source)
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            FileSource::Local(path) => path.display().to_string(),
            FileSource::S3 { bucket, key } => format!("s3://{bucket}/{key}"),
            FileSource::Http(url) => url.clone(),
        }
    }
}

/// Parse S3 URI in the format: s3://bucket/key/to/file
pub fn parse_s3_uri(uri: &str) -> Result<(String, String)> {
    let uri = uri
        .strip_prefix("s3://")
        .context("S3 URI must start with 's3://'")?;

    let parts: Vec<&str> = uri.splitn(2, '/').collect();
    if parts.len() != 2 {
        anyhow::bail!("S3 URI must be in format 's3://bucket/key/to/file'");
    }

    Ok((parts[0].to_string(), parts[1].to_string()))
}
