//! Local filesystem range source

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use range_reader::{FetchError, RangeSource};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Reads byte ranges of a local file.
///
/// Size and modification time are queried from the filesystem on every
/// call, so a file that is rewritten while being read is detected through
/// its mtime.
#[derive(Debug)]
pub struct LocalRangeSource {
    path: PathBuf,
    key: String,
}

impl LocalRangeSource {
    /// Open a local file for range reads
    ///
    /// # Example
    /// ```ignore
    /// let source = LocalRangeSource::open("data.csv")?;
    /// let mut reader = RangeReader::new(source)?;
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path)
            .with_context(|| format!("Failed to read metadata for: {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("Not a regular file: {}", path.display());
        }

        Ok(Self {
            key: path.display().to_string(),
            path,
        })
    }

    fn modified(file: &File, path: &Path) -> Result<DateTime<Utc>> {
        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to get modification time for: {}", path.display()))?;
        Ok(DateTime::<Utc>::from(modified))
    }

    fn open_file(&self) -> Result<File> {
        File::open(&self.path)
            .with_context(|| format!("Failed to open file: {}", self.path.display()))
    }
}

impl RangeSource for LocalRangeSource {
    fn fetch(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        let mut file = self.open_file()?;
        if Self::modified(&file, &self.path)? != if_unmodified_since {
            return Err(FetchError::PreconditionFailed);
        }

        file.seek(SeekFrom::Start(range.start))
            .with_context(|| format!("Failed to seek in: {}", self.path.display()))?;

        let len = range.end.saturating_sub(range.start);
        let mut bytes = Vec::with_capacity(len as usize);
        file.take(len)
            .read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read file: {}", self.path.display()))?;
        Ok(bytes)
    }

    fn size(&self) -> Result<u64, FetchError> {
        let metadata = std::fs::metadata(&self.path)
            .with_context(|| format!("Failed to read metadata for: {}", self.path.display()))?;
        Ok(metadata.len())
    }

    fn last_modified(&self) -> Result<DateTime<Utc>, FetchError> {
        let file = self.open_file()?;
        Ok(Self::modified(&file, &self.path)?)
    }

    fn key(&self) -> &str {
        &self.key
    }
}
