//! # assetvault
//!
//! A content-addressed cache for derived assets. Hand it source artifacts —
//! images, scripts — and a transformation — resize, crop, concatenate,
//! minify — and it produces a cached derivative addressed by a stable
//! identifier computed from the source content and the transformation
//! parameters. Change anything about the inputs or the parameters and you
//! get a new artifact; change nothing and you get a reference without any
//! pixel or subprocess work.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`geometry`] | Pure dimension math: `Size`, `SizeRequest`, aspect/intersect/constrain |
//! | [`strategy`] | Resize methods (proportional, exact, crop): display/sample geometry + pixel transform |
//! | [`source`] | `SourceAsset` contract and the file-backed implementation |
//! | [`derivative`] | The cacheable unit: identity / grouped / transformed, with `identifier` + `materialize` |
//! | [`dimensions`] | Process-wide memo of natural image sizes |
//! | [`store`] | `AssetStore` contract and the filesystem store with single-flight materialization |
//! | [`compiler`] | `ByteTransformer` seam and the external filter-process adapter |
//! | [`thumbnails`] | Thumbnail orchestrator and references |
//! | [`scripts`] | Script bundle orchestrator and references |
//! | [`error`] | `CacheError` taxonomy |
//!
//! # Design Decisions
//!
//! ## Content-Derived Identifiers
//!
//! Identifiers are SHA-256 over the constituent source identities and the
//! transformation parameters — never over output paths, timestamps, or
//! store state. Renames and re-deploys don't bust the cache; content or
//! parameter changes always do. Identifiers double as the idempotency key:
//! the store guarantees at most one materialization per identifier no
//! matter how many callers race.
//!
//! ## Display Size vs Sample Size
//!
//! Every request resolves to two sizes. The *display* size is what callers
//! report to layout; the *sample* size is what actually gets resampled and
//! stored, bounded by the source's natural size. The split is what lets an
//! upscale request serve original pixels under a larger logical size, and
//! lets crop decode less than its oversized intermediate.
//!
//! ## Closed Unions Over Virtual Dispatch
//!
//! The derivative kinds are a fixed set, so [`derivative::DerivativeAsset`]
//! is an enum with exhaustive matches rather than a trait hierarchy. The
//! open seams are exactly the two collaborator boundaries that need
//! swapping in tests and deployments: the store ([`store::AssetStore`]) and
//! the external compiler ([`compiler::ByteTransformer`]).
//!
//! ## No Hidden Globals
//!
//! The only shared mutable state, the dimension memo, is an explicit value
//! constructed at service start and passed by reference into orchestrators.
//! Everything else is a pure function of its arguments.

pub mod compiler;
pub mod derivative;
pub mod dimensions;
pub mod error;
pub mod geometry;
mod imaging;
pub mod scripts;
pub mod source;
pub mod store;
pub mod strategy;
pub mod thumbnails;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use compiler::{ByteTransformer, CommandTransformer, CompilerError};
pub use derivative::DerivativeAsset;
pub use dimensions::DimensionMemo;
pub use error::CacheError;
pub use geometry::{Size, SizeRequest};
pub use scripts::{BundleOptions, ScriptCache, ScriptRef};
pub use source::{FileAsset, SourceAsset};
pub use store::{AssetStore, FileStore, StoreOutcome};
pub use strategy::{METHOD_NAMES, ResizeMethod};
pub use thumbnails::{Thumbnail, ThumbnailCache, ThumbnailInfo, ThumbnailPlan, plan_thumbnail};
