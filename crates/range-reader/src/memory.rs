//! In-memory range source
//!
//! Useful for tests and for wrapping bytes that are already resident. The
//! timestamp can be bumped with [`MemorySource::touch`] to emulate a remote
//! overwrite.

use crate::{FetchError, RangeSource};
use chrono::{DateTime, Duration, Utc};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

struct State {
    body: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// A [`RangeSource`] backed by a byte vector
pub struct MemorySource {
    key: String,
    state: RwLock<State>,
    fetches: AtomicUsize,
}

impl MemorySource {
    pub fn new(key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            state: RwLock::new(State {
                body: body.into(),
                last_modified: Utc::now(),
            }),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Advance the last-modified timestamp by one second
    pub fn touch(&self) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.last_modified += Duration::seconds(1);
    }

    /// Replace the body, as an overwrite of the remote object would
    pub fn set_body(&self, body: impl Into<Vec<u8>>) {
        {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            state.body = body.into();
        }
        self.touch();
    }

    /// Number of `fetch` calls served so far, including rejected ones
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RangeSource for MemorySource {
    fn fetch(
        &self,
        range: Range<u64>,
        if_unmodified_since: DateTime<Utc>,
    ) -> Result<Vec<u8>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        if state.last_modified != if_unmodified_since {
            return Err(FetchError::PreconditionFailed);
        }

        let len = state.body.len() as u64;
        let start = range.start.min(len) as usize;
        let end = range.end.min(len) as usize;
        Ok(state.body[start..end.max(start)].to_vec())
    }

    fn size(&self) -> Result<u64, FetchError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state.body.len() as u64)
    }

    fn last_modified(&self) -> Result<DateTime<Utc>, FetchError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        Ok(state.last_modified)
    }

    fn key(&self) -> &str {
        &self.key
    }
}
