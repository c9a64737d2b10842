//! `std::io` adapters so a reader can feed `BufReader`, `csv`, `serde_json`, ...

use crate::{RangeReader, RangeSource};
use std::io::{self, Read, Seek, SeekFrom};

impl<S: RangeSource> Read for RangeReader<S> {
    /// Unlike [`RangeReader::read`], the cursor only advances by the bytes
    /// actually delivered.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.ensure_unmodified()?;

        let start = self.pos();
        let stop = start.saturating_add(buf.len() as u64).min(self.size()?);
        if start >= stop {
            return Ok(0);
        }

        let bytes = self.deliver(start..stop)?;
        let n = bytes.len();
        buf[..n].copy_from_slice(bytes);
        self.advance(n as u64);
        Ok(n)
    }
}

impl<S: RangeSource> Seek for RangeReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(n) => {
                self.set_pos(n);
                return Ok(n);
            }
            SeekFrom::End(offset) => (self.size()?, offset),
            SeekFrom::Current(offset) => (self.pos(), offset),
        };

        match base.checked_add_signed(offset) {
            Some(n) => {
                self.set_pos(n);
                Ok(n)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.pos())
    }
}
