//! Separator-based line splitting across refills

use crate::{RangeReader, RangeSource, ReadError};
use std::iter::FusedIterator;

/// Accumulates refilled bytes and cuts them at a separator.
///
/// Kept apart from the reader's fetch buffer. Scanning resumes where the
/// previous search stopped, backing up far enough to catch a separator that
/// straddles two refills.
pub(crate) struct LineSplitter {
    separator: Vec<u8>,
    pending: Vec<u8>,
    scanned: usize,
}

impl LineSplitter {
    pub(crate) fn new(separator: &[u8]) -> Self {
        Self {
            separator: separator.to_vec(),
            pending: Vec::new(),
            scanned: 0,
        }
    }

    pub(crate) fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Pop the next complete line, separator included
    pub(crate) fn next_line(&mut self) -> Option<Vec<u8>> {
        // An empty separator never splits
        if self.separator.is_empty() {
            return None;
        }

        let from = self.scanned.saturating_sub(self.separator.len() - 1);
        match find(&self.pending[from..], &self.separator) {
            Some(idx) => {
                let end = from + idx + self.separator.len();
                let rest = self.pending.split_off(end);
                self.scanned = 0;
                Some(std::mem::replace(&mut self.pending, rest))
            }
            None => {
                self.scanned = self.pending.len();
                None
            }
        }
    }

    /// Take the unterminated remainder, if any
    pub(crate) fn finish(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        if self.pending.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.pending))
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    match needle {
        [byte] => memchr::memchr(*byte, haystack),
        _ => memchr::memmem::find(haystack, needle),
    }
}

/// Lazy line iterator borrowing a reader's cursor.
///
/// Created by [`RangeReader::lines`] and [`RangeReader::lines_with`].
/// Yields each line including its separator; the final line is yielded
/// without one if the object does not end with the separator. Iteration
/// stops after the first error.
pub struct Lines<'a, S> {
    reader: &'a mut RangeReader<S>,
    splitter: LineSplitter,
    exhausted: bool,
    done: bool,
}

impl<'a, S: RangeSource> Lines<'a, S> {
    pub(crate) fn new(reader: &'a mut RangeReader<S>, separator: &[u8]) -> Self {
        Self {
            reader,
            splitter: LineSplitter::new(separator),
            exhausted: false,
            done: false,
        }
    }
}

impl<S: RangeSource> Iterator for Lines<'_, S> {
    type Item = Result<Vec<u8>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if let Some(line) = self.splitter.next_line() {
                return Some(Ok(line));
            }

            if self.exhausted {
                self.done = true;
                return self.splitter.finish().map(Ok);
            }

            let chunk_size = self.reader.chunk_size();
            match self.reader.read(Some(chunk_size)) {
                Ok(chunk) => {
                    // A short refill means the end of the object was reached
                    self.exhausted = (chunk.len() as u64) < chunk_size;
                    self.splitter.push(&chunk);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<S: RangeSource> FusedIterator for Lines<'_, S> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_all(chunks: &[&[u8]], separator: &[u8]) -> Vec<Vec<u8>> {
        let mut splitter = LineSplitter::new(separator);
        let mut lines = Vec::new();
        for chunk in chunks {
            splitter.push(chunk);
            while let Some(line) = splitter.next_line() {
                lines.push(line);
            }
        }
        lines.extend(splitter.finish());
        lines
    }

    #[test]
    fn test_split_keeps_separator() {
        let lines = split_all(&[b"a\nbb\nccc"], b"\n");
        assert_eq!(lines, vec![b"a\n".to_vec(), b"bb\n".to_vec(), b"ccc".to_vec()]);
    }

    #[test]
    fn test_no_trailing_empty_line() {
        let lines = split_all(&[b"a\n", b"b\n"], b"\n");
        assert_eq!(lines, vec![b"a\n".to_vec(), b"b\n".to_vec()]);
    }

    #[test]
    fn test_multibyte_separator_across_chunks() {
        let lines = split_all(&[b"one\r", b"\ntwo\r", b"\n"], b"\r\n");
        assert_eq!(lines, vec![b"one\r\n".to_vec(), b"two\r\n".to_vec()]);
    }

    #[test]
    fn test_line_spanning_many_chunks() {
        let lines = split_all(&[b"ab", b"cd", b"e,", b"f"], b",");
        assert_eq!(lines, vec![b"abcde,".to_vec(), b"f".to_vec()]);
    }

    #[test]
    fn test_empty_separator_yields_whole_remainder() {
        let lines = split_all(&[b"a\nb", b"c"], b"");
        assert_eq!(lines, vec![b"a\nbc".to_vec()]);
    }

    #[test]
    fn test_separator_split_at_every_byte() {
        let lines = split_all(&[b"a", b"<", b"/", b">", b"b<", b"/>c"], b"</>");
        assert_eq!(lines, vec![b"a</>".to_vec(), b"b</>".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_all(&[], b"\n").is_empty());
    }
}
