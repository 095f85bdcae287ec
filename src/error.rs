//! Error taxonomy for the cache.
//!
//! Four families, with distinct propagation policies:
//!
//! - [`CacheError::InvalidParameter`] / [`CacheError::InvalidGeometry`] are
//!   caller errors — surfaced immediately, never retried.
//! - [`CacheError::Transformation`] covers decode failures, external process
//!   failures, and materialize write failures. A compile failure may be
//!   downgraded to a logged warning plus an uncompiled fallback artifact,
//!   but only when the caller explicitly opted in (see
//!   [`BundleOptions::fail_silently`](crate::scripts::BundleOptions)).
//! - [`CacheError::Storage`] is I/O propagated opaquely from the storage
//!   collaborator.
//!
//! The core never retries; retry policy belongs to the caller.

use thiserror::Error;

use crate::compiler::CompilerError;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Unknown resize method name, zero-sized request, or similar bad input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Degenerate geometry, e.g. an aspect ratio over a zero axis.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Decode, resample, external compile, or materialize-write failure.
    #[error("transformation failed: {0}")]
    Transformation(String),

    /// I/O from the storage layer, passed through opaquely.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

impl From<CompilerError> for CacheError {
    fn from(err: CompilerError) -> Self {
        Self::Transformation(err.to_string())
    }
}
