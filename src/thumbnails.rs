//! Thumbnail orchestration: request → geometry → derivative → reference.
//!
//! [`ThumbnailCache`] is a thin policy layer: it validates parameters,
//! resolves the natural size through the [`DimensionMemo`], picks the
//! derivative shape, and delegates idempotent materialization to the store.
//! No pixels are touched on a cache hit.
//!
//! Planning is split out as the pure [`plan_thumbnail`] so geometry and
//! derivative selection are testable without a store, a memo, or any image
//! on disk.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::derivative::DerivativeAsset;
use crate::dimensions::DimensionMemo;
use crate::error::CacheError;
use crate::geometry::{Size, SizeRequest};
use crate::imaging;
use crate::source::SourceAsset;
use crate::store::AssetStore;
use crate::strategy::ResizeMethod;

pub struct ThumbnailCache<'a> {
    store: &'a dyn AssetStore,
    dimensions: &'a DimensionMemo,
}

impl<'a> ThumbnailCache<'a> {
    pub fn new(store: &'a dyn AssetStore, dimensions: &'a DimensionMemo) -> Self {
        Self { store, dimensions }
    }

    /// A cached thumbnail of `source` at the requested size.
    ///
    /// Either or both axes may be `None`; the chosen method decides how the
    /// missing axis resolves. `method` is one of
    /// [`METHOD_NAMES`](crate::strategy::METHOD_NAMES). The artifact is
    /// materialized at most once per resolved geometry; subsequent calls
    /// only return a reference.
    pub fn get_thumbnail(
        &self,
        source: &dyn SourceAsset,
        width: Option<u32>,
        height: Option<u32>,
        method: &str,
    ) -> Result<Thumbnail<'a>, CacheError> {
        let method = ResizeMethod::from_name(method)?;
        let requested = SizeRequest::new(width, height)?;
        let natural = self
            .dimensions
            .resolve(source.identity(), || imaging::probe_dimensions(source.path()))?;

        let plan = plan_thumbnail(source, natural, requested, method)?;
        let identifier = plan.derivative.identifier();
        self.store
            .get_or_create(&identifier, &mut |dest| plan.derivative.materialize(dest))?;

        Ok(Thumbnail {
            store: self.store,
            identifier,
            name: source.name().to_owned(),
            width: plan.display.width,
            height: plan.display.height,
        })
    }
}

/// Resolved geometry plus the derivative that realizes it.
pub struct ThumbnailPlan<'a> {
    pub derivative: DerivativeAsset<'a>,
    pub display: Size,
    pub sample: Size,
}

/// Decide what a thumbnail request means, without touching pixels.
///
/// When the resolved sample equals the natural size the transform is a no-op
/// and the plan is an [`DerivativeAsset::Identity`] — original bytes are
/// cached as-is, no decode or resample ever runs.
pub fn plan_thumbnail<'a>(
    source: &'a dyn SourceAsset,
    natural: Size,
    requested: SizeRequest,
    method: ResizeMethod,
) -> Result<ThumbnailPlan<'a>, CacheError> {
    let display = method.display_size(natural, requested)?;
    let sample = method.sample_size(display, natural)?;
    let derivative = if sample == natural {
        DerivativeAsset::Identity { source }
    } else {
        DerivativeAsset::Transformed {
            source,
            method,
            display,
            sample,
        }
    };
    Ok(ThumbnailPlan {
        derivative,
        display,
        sample,
    })
}

/// Lightweight reference to a cached thumbnail.
///
/// Width and height are the *display* dimensions — what layout should use —
/// which may exceed the stored pixels for upscale requests. URL and path are
/// lazy and delegate to the store; nothing is recomputed.
pub struct Thumbnail<'a> {
    store: &'a dyn AssetStore,
    identifier: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for Thumbnail<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thumbnail")
            .field("identifier", &self.identifier)
            .field("name", &self.name)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Thumbnail<'_> {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn url(&self) -> String {
        self.store.url(&self.identifier)
    }

    pub fn path(&self) -> PathBuf {
        self.store.path(&self.identifier)
    }

    /// Owned descriptor for embedding in manifests or templates.
    pub fn info(&self) -> ThumbnailInfo {
        ThumbnailInfo {
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            url: self.url(),
        }
    }
}

/// Serializable thumbnail descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailInfo {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub url: String,
}
