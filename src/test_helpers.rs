//! Shared test utilities for the assetvault test suite.
//!
//! Fake sources and transformers let the derivative and orchestrator tests
//! run without disk images or subprocesses; the image fixture helper
//! produces small real files for the end-to-end paths.

use std::path::{Path, PathBuf};

use crate::compiler::{ByteTransformer, CompilerError};
use crate::error::CacheError;
use crate::source::SourceAsset;

/// In-memory source asset with a fixed identity.
pub(crate) struct FakeSource {
    identity: String,
    name: String,
    path: PathBuf,
    bytes: Vec<u8>,
}

impl FakeSource {
    pub fn new(identity: &str, name: &str, bytes: Vec<u8>) -> Self {
        Self {
            identity: identity.to_owned(),
            name: name.to_owned(),
            path: PathBuf::from("/virtual").join(name),
            bytes,
        }
    }
}

impl SourceAsset for FakeSource {
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
        Ok(self.bytes.clone())
    }
}

/// Stand-in minifier: uppercases its input.
pub(crate) struct UppercaseTransformer;

impl ByteTransformer for UppercaseTransformer {
    fn transform(&self, input: &[u8]) -> Result<Vec<u8>, CompilerError> {
        Ok(input.to_ascii_uppercase())
    }
}

/// Transformer that always fails with the given diagnostic.
pub(crate) struct FailingTransformer {
    stderr: String,
}

impl FailingTransformer {
    pub fn new(stderr: &str) -> Self {
        Self {
            stderr: stderr.to_owned(),
        }
    }
}

impl ByteTransformer for FailingTransformer {
    fn transform(&self, _input: &[u8]) -> Result<Vec<u8>, CompilerError> {
        Err(CompilerError::Failed {
            status: 1,
            stderr: self.stderr.clone(),
        })
    }
}

/// Write a small valid PNG with the given dimensions.
pub(crate) fn write_test_png(path: &Path, width: u32, height: u32) {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}
