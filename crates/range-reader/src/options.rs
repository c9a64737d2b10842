//! Reader configuration

use serde::{Deserialize, Serialize};

/// Default refill chunk for line iteration (1MB)
pub const DEFAULT_LINE_BUFFER_SIZE: usize = 1024 * 1024;

/// Tunables for [`RangeReader`](crate::RangeReader)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReaderOptions {
    /// Bytes requested per refill while splitting lines. Zero is treated as one.
    pub line_buffer_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            line_buffer_size: DEFAULT_LINE_BUFFER_SIZE,
        }
    }
}

impl ReaderOptions {
    pub fn with_line_buffer_size(mut self, line_buffer_size: usize) -> Self {
        self.line_buffer_size = line_buffer_size;
        self
    }

    pub(crate) fn chunk_size(&self) -> u64 {
        self.line_buffer_size.max(1) as u64
    }
}
