//! The range source contract consumed by the reader

use crate::FetchError;
use chrono::{DateTime, Utc};
use std::ops::Range;
use std::sync::Arc;

/// A remote, range-addressable object.
///
/// Implementations only need random-access range fetches; the cursor and
/// buffering live in [`RangeReader`](crate::RangeReader). Sources are
/// read-only and may be shared by several independent readers.
pub trait RangeSource {
    /// Fetch the bytes in `range` (end exclusive).
    ///
    /// Must fail with [`FetchError::PreconditionFailed`] when the object's
    /// last-modified timestamp differs from `if_unmodified_since`. The reader
    /// never asks for bytes past [`size`](Self::size), but a source may still
    /// return fewer bytes than requested if the object shrank.
    fn fetch(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError>;

    /// Current object length in bytes
    fn size(&self) -> Result<u64, FetchError>;

    /// Current last-modified timestamp
    fn last_modified(&self) -> Result<DateTime<Utc>, FetchError>;

    /// Identifier used in diagnostics only
    fn key(&self) -> &str;
}

impl<T: RangeSource + ?Sized> RangeSource for &T {
    fn fetch(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(range, if_unmodified_since)
    }

    fn size(&self) -> Result<u64, FetchError> {
        (**self).size()
    }

    fn last_modified(&self) -> Result<DateTime<Utc>, FetchError> {
        (**self).last_modified()
    }

    fn key(&self) -> &str {
        (**self).key()
    }
}

impl<T: RangeSource + ?Sized> RangeSource for Box<T> {
    fn fetch(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(range, if_unmodified_since)
    }

    fn size(&self) -> Result<u64, FetchError> {
        (**self).size()
    }

    fn last_modified(&self) -> Result<DateTime<Utc>, FetchError> {
        (**self).last_modified()
    }

    fn key(&self) -> &str {
        (**self).key()
    }
}

impl<T: RangeSource + ?Sized> RangeSource for Arc<T> {
    fn fetch(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(range, if_unmodified_since)
    }

    fn size(&self) -> Result<u64, FetchError> {
        (**self).size()
    }

    fn last_modified(&self) -> Result<DateTime<Utc>, FetchError> {
        (**self).last_modified()
    }

    fn key(&self) -> &str {
        (**self).key()
    }
}
