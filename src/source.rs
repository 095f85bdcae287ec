//! Source assets: the originals the cache derives from.
//!
//! A [`SourceAsset`] exposes a stable identity token, a human-readable name,
//! a filesystem path for efficient direct decode, and a byte accessor.
//! Sources are owned by the caller; the cache only borrows them.
//!
//! The identity token must encode the content version: two processes looking
//! at the same bytes must agree on it, and changed bytes must change it.
//! [`FileAsset`] satisfies this with a SHA-256 content hash — content-based
//! rather than mtime-based so it survives `git checkout` (which resets
//! modification times).

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::CacheError;

/// Contract for an original artifact.
pub trait SourceAsset {
    /// Stable token for this content. Same bytes → same token, across
    /// processes; changed bytes → changed token.
    fn identity(&self) -> &str;

    /// Human-readable name, usually the file name. Its extension drives the
    /// stored format of derivatives.
    fn name(&self) -> &str;

    /// Filesystem location, for decoders that read directly from disk.
    fn path(&self) -> &Path;

    /// Full contents.
    fn read(&self) -> Result<Vec<u8>, CacheError>;
}

/// A source asset backed by a file on disk.
#[derive(Debug, Clone)]
pub struct FileAsset {
    path: PathBuf,
    name: String,
    identity: String,
}

impl FileAsset {
    /// Open a file and fingerprint its contents.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let bytes = fs::read(&path)?;
        let identity = format!("{:x}", Sha256::digest(&bytes));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_owned)
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            path,
            name,
            identity,
        })
    }
}

impl SourceAsset for FileAsset {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Vec<u8>, CacheError> {
        Ok(fs::read(&self.path)?)
    }
}
