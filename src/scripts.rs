//! Script bundle orchestration.
//!
//! Production wants one concatenated (and usually minified) bundle per set
//! of scripts; development wants the originals served straight so stack
//! traces line up. That switch is the caller's policy, not a property of the
//! assets, so it lives in [`BundleOptions`].

use std::path::PathBuf;

use crate::compiler::ByteTransformer;
use crate::derivative::DerivativeAsset;
use crate::error::CacheError;
use crate::source::SourceAsset;
use crate::store::AssetStore;

/// Separator between concatenated scripts. A semicolon keeps statement
/// boundaries intact when a source omits its trailing one.
const JOIN: &str = ";";

/// Caller policy for one bundle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleOptions {
    /// Pipe the concatenation through the external compiler.
    pub compile: bool,
    /// Materialize a single cached bundle. When false (debug mode), return
    /// direct references to the sources and never invoke the pipeline.
    pub force_save: bool,
    /// On compile failure, log and cache the uncompiled concatenation
    /// instead of propagating the error.
    pub fail_silently: bool,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            compile: true,
            force_save: true,
            fail_silently: false,
        }
    }
}

pub struct ScriptCache<'a> {
    store: &'a dyn AssetStore,
    compiler: &'a dyn ByteTransformer,
}

impl<'a> ScriptCache<'a> {
    pub fn new(store: &'a dyn AssetStore, compiler: &'a dyn ByteTransformer) -> Self {
        Self { store, compiler }
    }

    /// References for serving `sources` under the given policy.
    ///
    /// With `force_save` this is a single reference to the cached bundle
    /// (empty input → empty output); otherwise one direct reference per
    /// source, untouched.
    pub fn get_bundle(
        &self,
        sources: &[&dyn SourceAsset],
        options: &BundleOptions,
    ) -> Result<Vec<ScriptRef<'a>>, CacheError> {
        if !options.force_save {
            return Ok(sources
                .iter()
                .map(|source| ScriptRef::Source {
                    name: source.name().to_owned(),
                    path: source.path().to_owned(),
                })
                .collect());
        }
        if sources.is_empty() {
            return Ok(Vec::new());
        }

        let derivative = DerivativeAsset::Grouped {
            sources: sources.to_vec(),
            join: JOIN,
            compiler: options.compile.then_some(self.compiler),
            fail_silently: options.fail_silently,
        };
        let identifier = derivative.identifier();
        self.store
            .get_or_create(&identifier, &mut |dest| derivative.materialize(dest))?;
        tracing::debug!(identifier = %identifier, sources = sources.len(), "script bundle resolved");

        Ok(vec![ScriptRef::Bundle {
            store: self.store,
            identifier,
        }])
    }
}

/// A servable script: either a cached bundle or a raw source (debug mode).
pub enum ScriptRef<'a> {
    Bundle {
        store: &'a dyn AssetStore,
        identifier: String,
    },
    Source {
        name: String,
        path: PathBuf,
    },
}

impl std::fmt::Debug for ScriptRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bundle { identifier, .. } => f
                .debug_struct("ScriptRef::Bundle")
                .field("identifier", identifier)
                .finish_non_exhaustive(),
            Self::Source { name, path } => f
                .debug_struct("ScriptRef::Source")
                .field("name", name)
                .field("path", path)
                .finish(),
        }
    }
}

impl ScriptRef<'_> {
    /// URL for a cached bundle. Raw sources have no store-backed URL — the
    /// serving layer owns that mapping in debug mode.
    pub fn url(&self) -> Option<String> {
        match self {
            Self::Bundle { store, identifier } => Some(store.url(identifier)),
            Self::Source { .. } => None,
        }
    }

    pub fn path(&self) -> PathBuf {
        match self {
            Self::Bundle { store, identifier } => store.path(identifier),
            Self::Source { path, .. } => path.clone(),
        }
    }

    pub fn identifier(&self) -> Option<&str> {
        match self {
            Self::Bundle { identifier, .. } => Some(identifier),
            Self::Source { .. } => None,
        }
    }
}
