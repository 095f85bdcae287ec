//! The cacheable unit: one derivative of one or more sources.
//!
//! [`DerivativeAsset`] is a closed tagged union rather than a trait object:
//! the set of derivative kinds is fixed, and exhaustive matching keeps the
//! identifier and materialize arms in one place.
//!
//! Every variant honors the same two-part contract:
//!
//! - [`identifier`](DerivativeAsset::identifier) is a pure function of the
//!   constituent identities and transformation parameters — never of the
//!   clock, and never of whether the artifact already exists. It is the
//!   idempotency key: at most one artifact per identifier, however many
//!   requests race to compute it.
//! - [`materialize`](DerivativeAsset::materialize) writes the derivative's
//!   bytes to a destination path, or fails without leaving a partial file
//!   (the store additionally guards visibility with its temp-and-rename
//!   protocol).
//!
//! Identifiers are SHA-256 over a domain-prefixed encoding (one prefix per
//! variant, parameters in fixed order, little-endian integers), hex-encoded,
//! with the source's file extension appended so storage layout and encoders
//! know the artifact's format. They are not reversible, only
//! collision-resistant.

use std::fs;
use std::path::Path;

use image::ImageFormat;
use sha2::{Digest, Sha256};

use crate::compiler::ByteTransformer;
use crate::error::CacheError;
use crate::geometry::Size;
use crate::imaging;
use crate::source::SourceAsset;
use crate::strategy::ResizeMethod;

pub enum DerivativeAsset<'a> {
    /// Pass the source through unchanged. Used when the resolved transform
    /// is a no-op, so a copy is cached instead of a re-encode.
    Identity { source: &'a dyn SourceAsset },

    /// Ordered sources concatenated with a join separator, optionally piped
    /// through an external compiler.
    Grouped {
        sources: Vec<&'a dyn SourceAsset>,
        join: &'static str,
        compiler: Option<&'a dyn ByteTransformer>,
        /// On compile failure, cache the uncompiled concatenation instead of
        /// propagating. The failure is still logged; opting in only changes
        /// what gets served.
        fail_silently: bool,
    },

    /// A source resized by a method to resolved geometry.
    Transformed {
        source: &'a dyn SourceAsset,
        method: ResizeMethod,
        /// Logical dimensions reported to callers.
        display: Size,
        /// Dimensions actually resampled and stored.
        sample: Size,
    },
}

impl DerivativeAsset<'_> {
    /// Deterministic cache identifier for this derivative.
    pub fn identifier(&self) -> String {
        let mut hasher = Sha256::new();
        match self {
            Self::Identity { source } => {
                hasher.update(b"identity\0");
                hasher.update(source.identity().as_bytes());
            }
            Self::Grouped {
                sources, compiler, ..
            } => {
                hasher.update(b"bundle\0");
                for source in sources {
                    hasher.update(source.identity().as_bytes());
                    hasher.update(b"\0");
                }
                hasher.update([compiler.is_some() as u8]);
            }
            Self::Transformed {
                source,
                method,
                display,
                ..
            } => {
                hasher.update(b"thumbnail\0");
                hasher.update(source.identity().as_bytes());
                hasher.update(b"\0");
                hasher.update(method.key_fragment().as_bytes());
                hasher.update(b"\0");
                hasher.update(display.width.to_le_bytes());
                hasher.update(display.height.to_le_bytes());
            }
        }
        let digest = format!("{:x}", hasher.finalize());
        match self.extension() {
            Some(ext) => format!("{digest}.{ext}"),
            None => digest,
        }
    }

    /// Produce this derivative's bytes at `dest`.
    pub fn materialize(&self, dest: &Path) -> Result<(), CacheError> {
        match self {
            Self::Identity { source } => {
                let bytes = source.read()?;
                fs::write(dest, bytes).map_err(|e| {
                    CacheError::Transformation(format!(
                        "failed to write copy of {}: {e}",
                        source.name()
                    ))
                })
            }
            Self::Grouped {
                sources,
                join,
                compiler,
                fail_silently,
            } => materialize_bundle(sources, join, *compiler, *fail_silently, dest),
            Self::Transformed {
                source,
                method,
                sample,
                ..
            } => materialize_transformed(*source, *method, *sample, dest),
        }
    }

    /// File extension of the underlying content, lowercased. Drives both the
    /// identifier suffix and the stored encoding.
    fn extension(&self) -> Option<String> {
        let name = match self {
            Self::Identity { source } | Self::Transformed { source, .. } => source.name(),
            Self::Grouped { sources, .. } => sources.first()?.name(),
        };
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }
}

fn materialize_bundle(
    sources: &[&dyn SourceAsset],
    join: &str,
    compiler: Option<&dyn ByteTransformer>,
    fail_silently: bool,
    dest: &Path,
) -> Result<(), CacheError> {
    let mut parts = Vec::with_capacity(sources.len());
    for source in sources {
        parts.push(source.read()?);
    }
    let joined = parts.join(join.as_bytes());

    let bytes = match compiler {
        Some(compiler) => match compiler.transform(&joined) {
            Ok(compiled) => compiled,
            Err(err) => {
                tracing::error!(error = %err, "bundle compilation failed");
                if fail_silently {
                    tracing::warn!("caching uncompiled bundle after compile failure");
                    joined
                } else {
                    return Err(err.into());
                }
            }
        },
        None => joined,
    };

    fs::write(dest, bytes)
        .map_err(|e| CacheError::Transformation(format!("failed to write bundle: {e}")))
}

fn materialize_transformed(
    source: &dyn SourceAsset,
    method: ResizeMethod,
    sample: Size,
    dest: &Path,
) -> Result<(), CacheError> {
    let format = ImageFormat::from_path(source.path()).map_err(|_| {
        CacheError::Transformation(format!("no known image format for {}", source.name()))
    })?;
    // One decode handle per materialization, dropped on every exit path
    let img = imaging::open(source.path())?;
    let img = imaging::draft(img, sample);
    let out = method.apply(img, sample)?;
    imaging::save(&out, dest, format)
}
