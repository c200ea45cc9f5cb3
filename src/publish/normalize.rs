//! Image normalization: downsample, flatten onto white, re-encode as JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, GenericImageView, Rgb, RgbImage};

use crate::error::{MailpostError, Result};

/// JPEG quality used when none is configured.
pub const DEFAULT_JPEG_QUALITY: u8 = 75;

/// Parameters for [`normalize`].
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Images wider than this are downsampled. Zero disables resizing.
    pub max_width: u32,
    /// JPEG quality (1-100).
    pub quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_width: 0,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Decode `data`, shrink it to `max_width`, flatten transparency onto white
/// and return the JPEG encoding.
///
/// `name` only labels errors.
pub fn normalize(name: &str, data: &[u8], options: NormalizeOptions) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(data).map_err(|e| MailpostError::Image {
        name: name.to_string(),
        reason: format!("decode failed: {e}"),
    })?;

    let (width, height) = decoded.dimensions();
    let (target_width, target_height) = target_size(width, height, options.max_width);

    let resized = if (target_width, target_height) == (width, height) {
        decoded
    } else {
        tracing::debug!(
            name,
            from = %format!("{width}x{height}"),
            to = %format!("{target_width}x{target_height}"),
            "Downsampling image"
        );
        decoded.resize_exact(target_width, target_height, FilterType::Lanczos3)
    };

    let flattened = flatten_onto_white(&resized.to_rgba8());

    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, options.quality)
        .encode(
            flattened.as_raw(),
            flattened.width(),
            flattened.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| MailpostError::Image {
            name: name.to_string(),
            reason: format!("JPEG encoding failed: {e}"),
        })?;
    Ok(jpeg)
}

/// Output dimensions for an image of `width` x `height`.
///
/// Only images strictly wider than `max_width` shrink; the height follows the
/// aspect ratio, rounded, never below one pixel.
pub fn target_size(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if max_width == 0 || width <= max_width {
        return (width, height);
    }
    let scaled_height =
        (f64::from(height) * f64::from(max_width) / f64::from(width)).round() as u32;
    (max_width, scaled_height.max(1))
}

/// Composite an RGBA buffer over an opaque white background.
fn flatten_onto_white(rgba: &image::RgbaImage) -> RgbImage {
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

    fn png_bytes(image: RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_target_size_wider_than_max() {
        assert_eq!(target_size(2000, 1000, 800), (800, 400));
        assert_eq!(target_size(1001, 333, 1000), (1000, 333));
    }

    #[test]
    fn test_target_size_at_or_below_max() {
        assert_eq!(target_size(800, 600, 800), (800, 600));
        assert_eq!(target_size(10, 600, 800), (10, 600));
    }

    #[test]
    fn test_target_size_disabled() {
        assert_eq!(target_size(5000, 100, 0), (5000, 100));
    }

    #[test]
    fn test_target_size_never_zero_height() {
        assert_eq!(target_size(4000, 1, 100), (100, 1));
    }

    #[test]
    fn test_normalize_downsamples_and_keeps_aspect() {
        let data = png_bytes(RgbaImage::from_pixel(300, 150, Rgba([10, 20, 30, 255])));
        let options = NormalizeOptions {
            max_width: 100,
            quality: 80,
        };
        let jpeg = normalize("wide.png", &data, options).unwrap();
        let out = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(out.width(), 100);
        assert_eq!(out.height(), 50);
        assert_eq!(
            image::guess_format(&jpeg).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn test_normalize_small_image_untouched() {
        let data = png_bytes(RgbaImage::from_pixel(40, 30, Rgba([0, 0, 0, 255])));
        let options = NormalizeOptions {
            max_width: 100,
            quality: 75,
        };
        let jpeg = normalize("small.png", &data, options).unwrap();
        let out = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((out.width(), out.height()), (40, 30));
    }

    #[test]
    fn test_normalize_flattens_transparency_to_white() {
        let data = png_bytes(RgbaImage::from_pixel(16, 16, Rgba([0, 0, 0, 0])));
        let jpeg = normalize("clear.png", &data, NormalizeOptions::default()).unwrap();
        let out = image::load_from_memory(&jpeg).unwrap().to_rgb8();
        let px = out.get_pixel(8, 8).0;
        assert!(px.iter().all(|&c| c > 245), "expected white, got {px:?}");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let err = normalize("junk.jpg", b"definitely not an image", NormalizeOptions::default())
            .unwrap_err();
        assert!(matches!(err, MailpostError::Image { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_flatten_blends_half_alpha() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let rgb = flatten_onto_white(&rgba);
        let [r, g, b] = rgb.get_pixel(0, 0).0;
        assert_eq!((r, g, b), (127, 127, 127));
    }
}
