//! Decode, probe, and encode helpers around the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Probe dimensions | `image::image_dimensions` (header only, no decode) |
//! | Decode | `image::ImageReader` |
//! | Fast pre-scale | `resize_exact` with `Triangle` |
//! | Encode | `JpegEncoder` (quality-aware) / `save_with_format` |
//!
//! The decode handle is a plain [`DynamicImage`]: acquired once per
//! materialization, moved through the transform steps, and dropped on every
//! exit path.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};

use crate::error::CacheError;
use crate::geometry::Size;

const JPEG_QUALITY: u8 = 90;

/// Read intrinsic dimensions from the file header without decoding pixels.
pub(crate) fn probe_dimensions(path: &Path) -> Result<Size, CacheError> {
    let (width, height) = image::image_dimensions(path).map_err(|e| {
        CacheError::Transformation(format!(
            "failed to read dimensions of {}: {e}",
            path.display()
        ))
    })?;
    Ok(Size::new(width, height))
}

/// Decode an image from disk.
pub(crate) fn open(path: &Path) -> Result<DynamicImage, CacheError> {
    ImageReader::open(path)?
        .decode()
        .map_err(|e| CacheError::Transformation(format!("failed to decode {}: {e}", path.display())))
}

/// Cheap pre-scale for decodes much larger than the target.
///
/// When the image is at least twice the sample size on both axes, shrink it
/// with a fast filter to cover twice the sample box, preserving aspect. The
/// final strategy pass still runs Lanczos3, so quality is unaffected while
/// the expensive resample works on far fewer pixels. Smaller images pass
/// through untouched.
pub(crate) fn draft(img: DynamicImage, sample: Size) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    let min_width = sample.width.saturating_mul(2);
    let min_height = sample.height.saturating_mul(2);
    if width < min_width || height < min_height {
        return img;
    }
    let scale = f64::max(
        f64::from(min_width) / f64::from(width),
        f64::from(min_height) / f64::from(height),
    );
    let pre_width = ((f64::from(width) * scale).round() as u32).max(min_width);
    let pre_height = ((f64::from(height) * scale).round() as u32).max(min_height);
    img.resize_exact(pre_width, pre_height, FilterType::Triangle)
}

/// Encode `img` to `dest` in the given format.
///
/// The format is passed explicitly rather than inferred from `dest`, because
/// the store hands materializers a temp path whose extension is not the
/// artifact's. A failed encode removes whatever was partially written before
/// the error propagates.
pub(crate) fn save(img: &DynamicImage, dest: &Path, format: ImageFormat) -> Result<(), CacheError> {
    let result = encode(img, dest, format);
    if result.is_err() {
        let _ = fs::remove_file(dest);
    }
    result
}

fn encode(img: &DynamicImage, dest: &Path, format: ImageFormat) -> Result<(), CacheError> {
    match format {
        ImageFormat::Jpeg => {
            let file = File::create(dest)?;
            let writer = BufWriter::new(file);
            let encoder = JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
            img.write_with_encoder(encoder)
                .map_err(|e| CacheError::Transformation(format!("JPEG encode failed: {e}")))
        }
        other => img
            .save_with_format(dest, other)
            .map_err(|e| CacheError::Transformation(format!("{other:?} encode failed: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_test_png;
    use tempfile::TempDir;

    #[test]
    fn probe_reads_header_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("img.png");
        write_test_png(&path, 320, 240);

        assert_eq!(probe_dimensions(&path).unwrap(), Size::new(320, 240));
    }

    #[test]
    fn probe_non_image_is_transformation_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("not-an-image.png");
        std::fs::write(&path, b"plain text").unwrap();

        let err = probe_dimensions(&path).unwrap_err();
        assert!(matches!(err, CacheError::Transformation(_)));
    }

    #[test]
    fn draft_skips_small_images() {
        let img = DynamicImage::new_rgb8(100, 80);
        let drafted = draft(img, Size::new(60, 60));
        assert_eq!((drafted.width(), drafted.height()), (100, 80));
    }

    #[test]
    fn draft_covers_twice_the_sample_box() {
        let img = DynamicImage::new_rgb8(1000, 800);
        let drafted = draft(img, Size::new(100, 100));
        assert!(drafted.width() >= 200 && drafted.height() >= 200);
        assert!(drafted.width() < 1000);
        // aspect preserved within rounding
        let got = f64::from(drafted.width()) / f64::from(drafted.height());
        assert!((got - 1.25).abs() < 0.02);
    }

    #[test]
    fn save_removes_partial_output_on_encode_failure() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.bin");
        // JPEG encoder rejects RGBA input; the partial file must not survive
        let img = DynamicImage::new_rgba8(10, 10);
        let err = save(&img, &dest, ImageFormat::Jpeg).unwrap_err();
        assert!(matches!(err, CacheError::Transformation(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn save_and_reopen_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out.dat");
        let img = DynamicImage::new_rgb8(32, 16);
        save(&img, &dest, ImageFormat::Png).unwrap();

        let reopened = ImageReader::with_format(
            std::io::BufReader::new(File::open(&dest).unwrap()),
            ImageFormat::Png,
        )
        .decode()
        .unwrap();
        assert_eq!((reopened.width(), reopened.height()), (32, 16));
    }
}
