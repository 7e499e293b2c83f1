//! Aspect-ratio-preserving resampling. Pure, no I/O.

use ac_core::error::AppError;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

/// Fits `img` into a `max_w` x `max_h` bounding box.
///
/// `ratio = min(max_w/w, max_h/h)`, applied to both axes and floored, each
/// target dimension at least 1. The ratio may exceed 1, so small sources
/// are enlarged to fill the box. Resampling uses the Triangle (bilinear)
/// filter into a fresh canvas of the source's own pixel type, so RGBA
/// sources keep their alpha channel as-is, with no blending against a
/// background.
pub fn bounded(img: &DynamicImage, max_w: u32, max_h: u32) -> Result<DynamicImage, AppError> {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(AppError::ResampleFailure(
            "source image has a zero dimension".to_string(),
        ));
    }
    let ratio = f64::min(max_w as f64 / w as f64, max_h as f64 / h as f64);
    let target_w = ((w as f64 * ratio).floor() as u32).max(1);
    let target_h = ((h as f64 * ratio).floor() as u32).max(1);
    Ok(img.resize_exact(target_w, target_h, FilterType::Triangle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgba};

    fn rgba_image(w: u32, h: u32, pixel: [u8; 4]) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_pixel(w, h, Rgba(pixel)))
    }

    #[test]
    fn wide_source_is_bound_by_width() {
        let thumb = bounded(&rgba_image(800, 400, [9, 9, 9, 255]), 250, 250).unwrap();
        assert_eq!(thumb.dimensions(), (250, 125));
    }

    #[test]
    fn tall_source_is_bound_by_height() {
        let thumb = bounded(&rgba_image(400, 800, [9, 9, 9, 255]), 250, 250).unwrap();
        assert_eq!(thumb.dimensions(), (125, 250));
    }

    #[test]
    fn small_sources_are_enlarged() {
        let thumb = bounded(&rgba_image(10, 10, [9, 9, 9, 255]), 250, 250).unwrap();
        assert_eq!(thumb.dimensions(), (250, 250));
    }

    #[test]
    fn degenerate_ratio_still_yields_at_least_one_pixel() {
        let thumb = bounded(&rgba_image(10_000, 10, [9, 9, 9, 255]), 250, 250).unwrap();
        assert_eq!(thumb.dimensions().0, 250);
        assert!(thumb.dimensions().1 >= 1);
    }

    #[test]
    fn transparency_survives_the_resample() {
        let thumb = bounded(&rgba_image(8, 8, [200, 100, 50, 0]), 4, 4).unwrap();
        let rgba = thumb.to_rgba8();
        assert!(rgba.pixels().all(|p| p.0[3] == 0));
    }
}
