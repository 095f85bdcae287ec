//! Process-wide memo of natural image sizes.
//!
//! Reading dimensions is cheap but not free (a header parse per lookup), and
//! thumbnail-heavy pages ask for the same source many times. The memo keys by
//! source identity — which encodes the content version — so entries are never
//! invalidated in-process; a changed file shows up as a new identity. The map
//! is re-derivable and safely discarded on restart.
//!
//! Construct one at service start and pass it by reference into the
//! orchestrators; there is no implicit global.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::error::CacheError;
use crate::geometry::Size;

#[derive(Debug, Default)]
pub struct DimensionMemo {
    inner: Mutex<HashMap<String, Size>>,
}

impl DimensionMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached natural size for `identity`, probing on first access.
    ///
    /// The probe runs outside the lock: two threads racing on the same
    /// identity may both probe, which is benign (same result, last insert
    /// wins), but a partial entry is never visible. A failed probe caches
    /// nothing, so the next caller retries.
    pub fn resolve(
        &self,
        identity: &str,
        probe: impl FnOnce() -> Result<Size, CacheError>,
    ) -> Result<Size, CacheError> {
        if let Some(size) = self.lock().get(identity) {
            return Ok(*size);
        }
        let size = probe()?;
        self.lock().insert(identity.to_owned(), size);
        Ok(size)
    }

    /// Number of memoized identities.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Size>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
