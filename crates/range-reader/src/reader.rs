//! Buffered, cursor-based reader over a [`RangeSource`]

use crate::lines::{LineSplitter, Lines};
use crate::{FetchError, RangeSource, ReadError, ReaderOptions};
use chrono::{DateTime, Utc};
use std::ops::Range;

/// Sequential, file-like reader over a range-addressable object.
///
/// The reader keeps a cursor and the most recently fetched byte range.
/// Every fetch carries the last-modified timestamp observed when the reader
/// was created; if the object changes underneath, the fetch is rejected and
/// the reader fails with [`ReadError::Modified`] from then on.
///
/// A reader is a single logical cursor. Line iterators returned by
/// [`lines`](Self::lines) borrow that cursor rather than copying it, so
/// iteration and direct reads advance the same position.
///
/// # Example
/// ```ignore
/// let source = S3RangeSource::open(client, "bucket", "data/file.csv").await?;
/// let mut reader = RangeReader::new(source)?;
/// let header = reader.read_line(b"\n")?;
/// for line in reader.lines() {
///     let line = line?;
///     // ...
/// }
/// ```
pub struct RangeReader<S> {
    source: S,
    options: ReaderOptions,
    pos: u64,
    buffer: Vec<u8>,
    buffer_start: u64,
    observed_modified: DateTime<Utc>,
    modified: bool,
}

impl<S: RangeSource> RangeReader<S> {
    /// Create a reader with default options, capturing the source's
    /// current last-modified timestamp as the consistency baseline.
    pub fn new(source: S) -> Result<Self, ReadError> {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: S, options: ReaderOptions) -> Result<Self, ReadError> {
        let observed_modified = source.last_modified().map_err(|e| match e {
            FetchError::PreconditionFailed => ReadError::Source {
                key: source.key().to_string(),
                source: anyhow::anyhow!("precondition failed while reading last-modified"),
            },
            FetchError::Source(source_err) => ReadError::Source {
                key: source.key().to_string(),
                source: source_err,
            },
        })?;

        tracing::debug!(
            "Opened range reader for {} (last modified {}, line buffer {} bytes)",
            source.key(),
            observed_modified,
            options.line_buffer_size
        );

        Ok(Self {
            source,
            options,
            pos: 0,
            buffer: Vec::new(),
            buffer_start: 0,
            observed_modified,
            modified: false,
        })
    }

    pub fn key(&self) -> &str {
        self.source.key()
    }

    /// Timestamp every fetch is conditioned on
    pub fn observed_modified(&self) -> DateTime<Utc> {
        self.observed_modified
    }

    /// Current cursor. May be past the end of the object.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Move the cursor. No bounds check is made; a position past the end
    /// simply produces empty reads. The fetch buffer is discarded.
    pub fn set_pos(&mut self, pos: u64) {
        self.pos = pos;
        self.buffer.clear();
        self.buffer_start = 0;
    }

    /// Move the cursor back to the start. A detected modification stays
    /// latched; the baseline timestamp is not refreshed.
    pub fn rewind(&mut self) {
        self.set_pos(0);
    }

    /// True if the cursor is at or past the object's current size
    pub fn eof(&mut self) -> Result<bool, ReadError> {
        Ok(self.pos >= self.size()?)
    }

    /// Read `length` bytes, or everything up to the end when `None`.
    ///
    /// `Some(0)` returns immediately without touching the source. A read
    /// that runs past the end delivers only the available bytes but still
    /// moves the cursor to the requested end position.
    pub fn read(&mut self, length: Option<u64>) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::new();
        self.read_into(length, &mut out)?;
        Ok(out)
    }

    /// Like [`read`](Self::read), but replaces the contents of `out`
    /// instead of allocating. Returns the number of bytes delivered.
    ///
    /// `out` is left untouched when the read fails.
    pub fn read_into(
        &mut self,
        length: Option<u64>,
        out: &mut Vec<u8>,
    ) -> Result<usize, ReadError> {
        if length == Some(0) {
            out.clear();
            return Ok(0);
        }
        self.ensure_unmodified()?;

        let size = self.size()?;
        let end = match length {
            Some(n) => self.pos.saturating_add(n),
            None => self.pos.max(size),
        };
        let stop = end.min(size);
        if self.pos < stop {
            let start = self.pos;
            let bytes = self.deliver(start..stop)?;
            out.clear();
            out.extend_from_slice(bytes);
        } else {
            out.clear();
        }

        self.pos = end;
        Ok(out.len())
    }

    /// Read the next line terminated by `separator`, or the unterminated
    /// tail. Returns `None` at the end of the object.
    ///
    /// The cursor is left just after the returned line. Bytes fetched past
    /// it stay buffered, so consecutive calls do not refetch them.
    pub fn read_line(&mut self, separator: &[u8]) -> Result<Option<Vec<u8>>, ReadError> {
        self.ensure_unmodified()?;

        let origin = self.pos;
        let chunk_size = self.options.chunk_size();
        let mut splitter = LineSplitter::new(separator);
        let mut filled = origin;

        let line = loop {
            if let Some(line) = splitter.next_line() {
                break Some(line);
            }

            let stop = filled.saturating_add(chunk_size).min(self.size()?);
            if filled >= stop {
                break splitter.finish();
            }

            let bytes = self.deliver(origin..stop)?;
            let fresh = bytes.get((filled - origin) as usize..).unwrap_or(&[]);
            if fresh.is_empty() {
                break splitter.finish();
            }
            filled += fresh.len() as u64;
            splitter.push(fresh);
        };

        if let Some(line) = &line {
            self.pos = origin + line.len() as u64;
        }
        Ok(line)
    }

    /// Iterate newline-terminated lines from the cursor
    pub fn lines(&mut self) -> Lines<'_, S> {
        self.lines_with(b"\n")
    }

    /// Iterate lines terminated by `separator` from the cursor.
    ///
    /// Each refill reads `line_buffer_size` bytes through [`read`](Self::read).
    /// Dropping the iterator early discards bytes it already pulled, leaving
    /// the cursor at the last refill boundary.
    pub fn lines_with(&mut self, separator: impl AsRef<[u8]>) -> Lines<'_, S> {
        Lines::new(self, separator.as_ref())
    }

    /// Call `f` with every remaining line, stopping at the first error
    pub fn each_line<F>(
        &mut self,
        separator: impl AsRef<[u8]>,
        mut f: F,
    ) -> Result<(), ReadError>
    where
        F: FnMut(Vec<u8>),
    {
        for line in self.lines_with(separator) {
            f(line?);
        }
        Ok(())
    }

    pub(crate) fn advance(&mut self, n: u64) {
        self.pos = self.pos.saturating_add(n);
    }

    pub(crate) fn chunk_size(&self) -> u64 {
        self.options.chunk_size()
    }

    pub(crate) fn ensure_unmodified(&self) -> Result<(), ReadError> {
        if self.modified {
            return Err(self.modified_error());
        }
        Ok(())
    }

    pub(crate) fn size(&mut self) -> Result<u64, ReadError> {
        self.source.size().map_err(|e| self.fetch_error(e))
    }

    /// Bytes for `range`, served from the buffer where possible. A range
    /// that starts inside the buffer only fetches the missing tail.
    ///
    /// On error neither the buffer nor the cursor is touched.
    pub(crate) fn deliver(&mut self, range: Range<u64>) -> Result<&[u8], ReadError> {
        let len = (range.end - range.start) as usize;
        let buffer_end = self.buffer_start + self.buffer.len() as u64;

        if range.start >= self.buffer_start && range.end <= buffer_end {
            tracing::trace!(
                "Serving {}..{} of {} from buffer",
                range.start,
                range.end,
                self.source.key()
            );
            let offset = (range.start - self.buffer_start) as usize;
            return Ok(&self.buffer[offset..offset + len]);
        }

        let resident = range.start >= self.buffer_start && range.start < buffer_end;
        let fetch_from = if resident { buffer_end } else { range.start };
        let fetched = self.fetch(fetch_from..range.end)?;

        if resident {
            self.buffer.drain(..(range.start - self.buffer_start) as usize);
            self.buffer.extend_from_slice(&fetched);
        } else {
            self.buffer = fetched;
        }
        self.buffer_start = range.start;

        let available = len.min(self.buffer.len());
        Ok(&self.buffer[..available])
    }

    fn fetch(&mut self, range: Range<u64>) -> Result<Vec<u8>, ReadError> {
        tracing::debug!(
            "Fetching bytes {}..{} of {}",
            range.start,
            range.end,
            self.source.key()
        );
        self.source
            .fetch(range, self.observed_modified)
            .map_err(|e| self.fetch_error(e))
    }

    fn fetch_error(&mut self, err: FetchError) -> ReadError {
        match err {
            FetchError::PreconditionFailed => {
                if !self.modified {
                    tracing::warn!(
                        "{} was modified since {}, refusing further reads",
                        self.source.key(),
                        self.observed_modified
                    );
                }
                self.modified = true;
                self.modified_error()
            }
            FetchError::Source(source) => ReadError::Source {
                key: self.source.key().to_string(),
                source,
            },
        }
    }

    fn modified_error(&self) -> ReadError {
        ReadError::Modified {
            key: self.source.key().to_string(),
            observed: self.observed_modified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySource;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Wraps a memory source and fails `fetch` or `size` on demand
    struct FlakySource {
        inner: MemorySource,
        fail_fetch: AtomicBool,
        fail_size: AtomicBool,
    }

    impl FlakySource {
        fn new(body: Vec<u8>) -> Self {
            Self {
                inner: MemorySource::new("flaky", body),
                fail_fetch: AtomicBool::new(false),
                fail_size: AtomicBool::new(false),
            }
        }
    }

    impl RangeSource for FlakySource {
        fn fetch(
            &self,
            range: Range<u64>,
            if_unmodified_since: DateTime<Utc>,
        ) -> Result<Vec<u8>, FetchError> {
            if self.fail_fetch.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("connection reset").into());
            }
            self.inner.fetch(range, if_unmodified_since)
        }

        fn size(&self) -> Result<u64, FetchError> {
            if self.fail_size.load(Ordering::SeqCst) {
                return Err(anyhow::anyhow!("stat timed out").into());
            }
            self.inner.size()
        }

        fn last_modified(&self) -> Result<DateTime<Utc>, FetchError> {
            self.inner.last_modified()
        }

        fn key(&self) -> &str {
            self.inner.key()
        }
    }

    fn csv_body() -> Vec<u8> {
        (0..8)
            .map(|i| format!("{i:03},row-{i:03},value-{i:06}\n"))
            .collect::<String>()
            .into_bytes()
    }

    #[test]
    fn test_rows_are_25_bytes() {
        assert_eq!(csv_body().len(), 200);
        assert!(csv_body().starts_with(b"000,row-000,value-000000\n"));
    }

    #[test]
    fn test_zero_read_does_not_fetch() {
        let source = MemorySource::new("mem", csv_body());
        let mut reader = RangeReader::new(&source).unwrap();

        assert!(reader.read(Some(0)).unwrap().is_empty());
        assert_eq!(reader.pos(), 0);
        assert_eq!(source.fetch_count(), 0);
    }

    #[test]
    fn test_covered_read_is_served_from_buffer() {
        let source = MemorySource::new("mem", csv_body());
        let mut reader = RangeReader::new(&source).unwrap();

        reader.read(Some(100)).unwrap();
        assert_eq!(source.fetch_count(), 1);

        let line = reader.read_line(b"\n").unwrap().unwrap();
        assert_eq!(line, b"004,row-004,value-000004\n");
        assert_eq!(source.fetch_count(), 2);
        assert_eq!(reader.pos(), 125);

        // The rest of the refill chunk is still buffered
        let line = reader.read_line(b"\n").unwrap().unwrap();
        assert_eq!(line, b"005,row-005,value-000005\n");
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn test_partial_overlap_fetches_only_tail() {
        let body = csv_body();
        let source = MemorySource::new("mem", body.clone());
        let mut reader =
            RangeReader::with_options(&source, ReaderOptions::default().with_line_buffer_size(40))
                .unwrap();

        // read_line buffers 0..40 but only consumes the first 25 bytes
        reader.read_line(b"\n").unwrap();
        assert_eq!(reader.pos(), 25);

        let data = reader.read(Some(50)).unwrap();
        assert_eq!(data, &body[25..75]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn test_set_pos_discards_buffer() {
        let body = csv_body();
        let source = MemorySource::new("mem", body.clone());
        let mut reader = RangeReader::new(&source).unwrap();

        reader.read(Some(50)).unwrap();
        reader.set_pos(10);
        assert_eq!(reader.read(Some(5)).unwrap(), &body[10..15]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[test]
    fn test_short_read_moves_cursor_to_requested_end() {
        let body = csv_body();
        let source = MemorySource::new("mem", body.clone());
        let mut reader = RangeReader::new(&source).unwrap();

        reader.set_pos(190);
        assert_eq!(reader.read(Some(32)).unwrap(), &body[190..]);
        assert_eq!(reader.pos(), 222);
        assert!(reader.eof().unwrap());

        let fetches = source.fetch_count();
        assert!(reader.read(None).unwrap().is_empty());
        assert_eq!(reader.pos(), 222);
        assert_eq!(source.fetch_count(), fetches);
    }

    #[test]
    fn test_read_into_replaces_contents() {
        let body = csv_body();
        let source = MemorySource::new("mem", body.clone());
        let mut reader = RangeReader::new(&source).unwrap();
        let mut out = b"stale".to_vec();

        assert_eq!(reader.read_into(Some(3), &mut out).unwrap(), 3);
        assert_eq!(out, &body[..3]);
    }

    #[test]
    fn test_modification_is_latched() {
        let source = MemorySource::new("mem", csv_body());
        let mut reader = RangeReader::new(&source).unwrap();

        reader.read(Some(10)).unwrap();
        source.touch();
        assert!(reader.read(Some(10)).unwrap_err().is_modified());
        assert_eq!(reader.pos(), 10);

        // Even a read the buffer could serve is refused once latched
        reader.rewind();
        let fetches = source.fetch_count();
        assert!(reader.read(Some(5)).unwrap_err().is_modified());
        assert!(reader.read_line(b"\n").unwrap_err().is_modified());
        assert_eq!(source.fetch_count(), fetches);
    }

    #[test]
    fn test_read_line_at_end_keeps_cursor() {
        let source = MemorySource::new("mem", "a\nb");
        let mut reader = RangeReader::new(&source).unwrap();

        assert_eq!(reader.read_line(b"\n").unwrap().unwrap(), b"a\n");
        assert_eq!(reader.read_line(b"\n").unwrap().unwrap(), b"b");
        assert_eq!(reader.pos(), 3);
        assert!(reader.read_line(b"\n").unwrap().is_none());
        assert_eq!(reader.pos(), 3);
    }

    #[test]
    fn test_shared_sources_read_independently() {
        let source = std::sync::Arc::new(MemorySource::new("mem", csv_body()));
        let mut first = RangeReader::new(source.clone()).unwrap();
        let mut second = RangeReader::new(source.clone()).unwrap();

        first.read(Some(100)).unwrap();
        assert_eq!(first.pos(), 100);
        assert_eq!(second.pos(), 0);
        assert_eq!(second.read(None).unwrap(), csv_body());
    }

    #[test]
    fn test_fetch_failure_is_not_a_modification() {
        let body = csv_body();
        let source = FlakySource::new(body.clone());
        let mut reader = RangeReader::new(&source).unwrap();
        reader.read(Some(25)).unwrap();

        source.fail_fetch.store(true, Ordering::SeqCst);
        let err = reader.read(Some(25)).unwrap_err();
        assert!(!err.is_modified());
        assert!(matches!(err, ReadError::Source { .. }));
        assert_eq!(reader.pos(), 25);

        // Not latched: the read succeeds once the source recovers
        source.fail_fetch.store(false, Ordering::SeqCst);
        assert_eq!(reader.read(Some(25)).unwrap(), &body[25..50]);
    }

    #[test]
    fn test_size_failure_is_not_a_modification() {
        let source = FlakySource::new(csv_body());
        let mut reader = RangeReader::new(&source).unwrap();
        reader.read(Some(25)).unwrap();

        source.fail_size.store(true, Ordering::SeqCst);
        let err = reader.read(Some(25)).unwrap_err();
        assert!(!err.is_modified());
        assert!(matches!(err, ReadError::Source { .. }));
        assert_eq!(reader.pos(), 25);
        assert!(reader.eof().is_err());

        source.fail_size.store(false, Ordering::SeqCst);
        assert!(!reader.eof().unwrap());
    }

    #[test]
    fn test_eof_follows_growing_object() {
        let source = MemorySource::new("mem", csv_body());
        let mut reader = RangeReader::new(&source).unwrap();

        reader.read(None).unwrap();
        assert!(reader.eof().unwrap());

        let mut longer = csv_body();
        longer.extend_from_slice(b"008,row-008,value-000008\n");
        source.set_body(longer);
        assert!(!reader.eof().unwrap());

        // The new bytes belong to a different version of the object
        assert!(reader.read(None).unwrap_err().is_modified());
    }

    #[test]
    fn test_failed_read_into_keeps_out() {
        let body = csv_body();
        let source = MemorySource::new("mem", body.clone());
        let mut reader = RangeReader::new(&source).unwrap();
        let mut out = Vec::new();

        reader.read_into(Some(10), &mut out).unwrap();
        source.touch();
        assert!(reader.read_into(Some(10), &mut out).unwrap_err().is_modified());
        assert_eq!(out, &body[..10]);
    }
}
