//! Resize methods: how a requested size becomes real geometry and pixels.
//!
//! Each method answers three questions, kept deliberately separate:
//!
//! - **display size** — the logical dimensions reported to callers and UI.
//! - **sample size** — the dimensions actually resampled from the source.
//!   Bounded by the natural size, so the cache never stores upscaled pixels;
//!   an upscale request stores original pixels while the display size says
//!   how large to lay them out.
//! - **apply** — the pixel transform producing exactly the sample size.
//!
//! The split lets crop decode less than its oversized intermediate and lets
//! callers report consistent logical dimensions without recomputing them
//! after the pixel work.
//!
//! Methods are chosen by string name at call time; an unknown name fails
//! with a parameter error listing the valid names.

use image::DynamicImage;
use image::imageops::FilterType;

use crate::error::CacheError;
use crate::geometry::{Size, SizeRequest};

/// Valid method names accepted by [`ResizeMethod::from_name`].
pub const METHOD_NAMES: &[&str] = &["proportional", "exact", "crop"];

/// A named resize policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeMethod {
    /// Fit inside the requested box, preserving the source aspect ratio.
    /// Unset axes are unbounded; a fully unset request passes the natural
    /// size through unchanged.
    Proportional,
    /// Stretch to the requested size exactly, ignoring aspect ratio. Unset
    /// axes are filled from the natural size.
    Exact,
    /// Fill the requested box and center-crop to it exactly. Unset axes are
    /// filled from the natural size.
    Crop,
}

impl ResizeMethod {
    pub fn from_name(name: &str) -> Result<Self, CacheError> {
        match name {
            "proportional" => Ok(Self::Proportional),
            "exact" => Ok(Self::Exact),
            "crop" => Ok(Self::Crop),
            other => Err(CacheError::InvalidParameter(format!(
                "'{other}' is not a valid resize method; expected one of: {}",
                METHOD_NAMES.join(", ")
            ))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Proportional => "proportional",
            Self::Exact => "exact",
            Self::Crop => "crop",
        }
    }

    /// Stable fragment mixed into derivative identifiers. Distinct per
    /// method so switching methods always produces a new artifact.
    pub fn key_fragment(self) -> &'static str {
        self.name()
    }

    /// Logical dimensions reported for the derivative.
    pub fn display_size(self, natural: Size, requested: SizeRequest) -> Result<Size, CacheError> {
        match self {
            Self::Proportional => {
                if requested.is_unset() {
                    return Ok(natural);
                }
                requested.unbounded_box().constrain(natural)
            }
            Self::Exact | Self::Crop => Ok(requested.fill_from(natural)),
        }
    }

    /// Dimensions to actually resample from the source. Never exceeds the
    /// natural size on either axis.
    pub fn sample_size(self, display: Size, natural: Size) -> Result<Size, CacheError> {
        let bounded = display.intersect(natural);
        match self {
            Self::Proportional | Self::Exact => Ok(bounded),
            // Largest box with the display's aspect that fits what the
            // source can provide.
            Self::Crop => bounded.constrain(display),
        }
    }

    /// Run the pixel transform. The output is exactly `sample`-sized.
    pub fn apply(self, img: DynamicImage, sample: Size) -> Result<DynamicImage, CacheError> {
        match self {
            Self::Proportional | Self::Exact => {
                Ok(img.resize_exact(sample.width, sample.height, FilterType::Lanczos3))
            }
            Self::Crop => apply_cropped(img, sample),
        }
    }
}

/// Resize to cover the target box preserving the source aspect, then
/// center-crop to the exact target.
///
/// The oversized step only grows the axis the source is long on; the short
/// axis matches the target exactly, so crop offsets are never negative. The
/// grown axis rounds to nearest and clamps up to the target, keeping the
/// exact-output guarantee under rounding.
fn apply_cropped(img: DynamicImage, target: Size) -> Result<DynamicImage, CacheError> {
    let source = Size::new(img.width(), img.height());
    let source_aspect = source.aspect()?;
    let target_aspect = target.aspect()?;

    let (cover_width, cover_height) = if source_aspect > target_aspect {
        // Source is wider: height matches, width grows
        let height = target.height;
        let width = ((f64::from(height) * source_aspect).round() as u32).max(target.width);
        (width, height)
    } else {
        // Source is taller: width matches, height grows
        let width = target.width;
        let height = ((f64::from(width) / source_aspect).round() as u32).max(target.height);
        (width, height)
    };

    let covered = img.resize_exact(cover_width, cover_height, FilterType::Lanczos3);
    let x = (cover_width - target.width) / 2;
    let y = (cover_height - target.height) / 2;
    Ok(covered.crop_imm(x, y, target.width, target.height))
}
