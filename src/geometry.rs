//! Pure dimension arithmetic.
//!
//! Two types with a deliberate split:
//!
//! - [`SizeRequest`] is what callers hand in — either axis may be unset, and
//!   a zero axis is rejected up front as a parameter error.
//! - [`Size`] is resolved geometry — both axes concrete. Everything past the
//!   request-validation boundary works in `Size`.
//!
//! All functions here are pure and testable without any I/O or images.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Resolved dimensions of an image or a derivative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width over height. A zero axis makes the ratio undefined and fails
    /// fast rather than producing infinity or NaN.
    pub fn aspect(self) -> Result<f64, CacheError> {
        if self.width == 0 || self.height == 0 {
            return Err(CacheError::InvalidGeometry(format!(
                "aspect ratio undefined for {self}"
            )));
        }
        Ok(f64::from(self.width) / f64::from(self.height))
    }

    /// Componentwise minimum. Used to bound sampling at the natural size so
    /// the cache never stores upscaled pixels.
    pub fn intersect(self, other: Size) -> Size {
        Size::new(self.width.min(other.width), self.height.min(other.height))
    }

    /// The largest size with `reference`'s aspect ratio that fits inside
    /// `self`. Each axis is derived from the other via the reference aspect,
    /// rounded to nearest, clamped by `self`'s own bound, and kept at least 1
    /// so extreme aspect ratios cannot collapse an axis to zero.
    pub fn constrain(self, reference: Size) -> Result<Size, CacheError> {
        let aspect = reference.aspect()?;
        let width = ((f64::from(self.height) * aspect).round() as u32)
            .min(self.width)
            .max(1);
        let height = ((f64::from(self.width) / aspect).round() as u32)
            .min(self.height)
            .max(1);
        Ok(Size::new(width, height))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A requested thumbnail size. Unset axes are filled in by the chosen resize
/// method (from the natural size, or treated as unbounded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeRequest {
    width: Option<u32>,
    height: Option<u32>,
}

impl SizeRequest {
    /// Build a request, rejecting zero axes.
    pub fn new(width: Option<u32>, height: Option<u32>) -> Result<Self, CacheError> {
        if width == Some(0) || height == Some(0) {
            return Err(CacheError::InvalidParameter(
                "requested dimensions must be positive".into(),
            ));
        }
        Ok(Self { width, height })
    }

    pub fn width(self) -> Option<u32> {
        self.width
    }

    pub fn height(self) -> Option<u32> {
        self.height
    }

    /// True when neither axis was given.
    pub fn is_unset(self) -> bool {
        self.width.is_none() && self.height.is_none()
    }

    /// Concrete size with unset axes taken from `natural`.
    pub(crate) fn fill_from(self, natural: Size) -> Size {
        Size::new(
            self.width.unwrap_or(natural.width),
            self.height.unwrap_or(natural.height),
        )
    }

    /// Concrete bounding box with unset axes treated as unbounded.
    pub(crate) fn unbounded_box(self) -> Size {
        Size::new(
            self.width.unwrap_or(u32::MAX),
            self.height.unwrap_or(u32::MAX),
        )
    }
}
