//! Sequential, file-like reads over range-addressable objects
//!
//! Object stores such as S3 only offer random-access range fetches. This
//! crate turns them into a cursor-based stream:
//!
//! - [`RangeReader`] keeps a cursor and the last fetched range, serving small
//!   reads from that buffer and fetching only what is missing
//! - line iteration ([`RangeReader::lines`], [`RangeReader::read_line`])
//!   refills in large chunks and reassembles lines split across refills
//! - every fetch is conditioned on the object's last-modified timestamp as
//!   first observed, so a concurrent overwrite surfaces as
//!   [`ReadError::Modified`] instead of silently mixing two versions
//!
//! Concrete sources (local files, S3, HTTP) live in `rangeread-file`; this
//! crate only defines the [`RangeSource`] contract plus an in-memory
//! [`MemorySource`].
//!
//! # Example
//!
//! ```
//! use range_reader::{MemorySource, RangeReader};
//!
//! let source = MemorySource::new("inline", "id,name\n1,alice\n");
//! let mut reader = RangeReader::new(&source)?;
//! assert_eq!(reader.read(Some(3))?, b"id,");
//! assert_eq!(reader.read_line(b"\n")?, Some(b"name\n".to_vec()));
//! assert!(!reader.eof()?);
//! # Ok::<(), range_reader::ReadError>(())
//! ```

mod error;
mod io;
mod lines;
mod memory;
mod options;
mod reader;
mod source;

pub use error::{FetchError, ReadError};
pub use lines::Lines;
pub use memory::MemorySource;
pub use options::{ReaderOptions, DEFAULT_LINE_BUFFER_SIZE};
pub use reader::RangeReader;
pub use source::RangeSource;
