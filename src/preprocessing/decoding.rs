//! # Payload Decoding Module
//!
//! Turns raw upload bytes into the grayscale and color representations the
//! pipeline needs. The container format is sniffed from the payload header, so
//! any raster format supported by the `image` crate is accepted. Decoding is
//! bounded by [`DecodeLimits`]; the header dimensions are checked before any
//! pixel buffer is allocated.

use std::io::Cursor;

use image::{GrayImage, ImageReader, Limits, RgbImage};
use tracing;

use super::types::DecodedImage;
use crate::pipeline_config::DecodeLimits;
use crate::prediction_errors::PredictionError;

/// Decodes an uploaded payload once and derives both representations from it.
///
/// # Arguments
///
/// * `bytes` - The raw payload exactly as received
/// * `limits` - Largest accepted dimensions and decoder allocation
///
/// # Returns
///
/// Returns the decoded grayscale and RGB images at native resolution, or
/// `PredictionError::Decode` when the bytes are empty, not a supported image,
/// or larger than `limits` allow.
///
/// # Examples
///
/// ```no_run
/// use blight_scan::pipeline_config::DecodeLimits;
/// use blight_scan::preprocessing::decode_image;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = std::fs::read("leaf.jpg")?;
/// let decoded = decode_image(&bytes, &DecodeLimits::default())?;
/// assert_eq!(decoded.grayscale.dimensions(), decoded.color.dimensions());
/// # Ok(())
/// # }
/// ```
pub fn decode_image(bytes: &[u8], limits: &DecodeLimits) -> Result<DecodedImage, PredictionError> {
    if bytes.is_empty() {
        return Err(PredictionError::Decode("payload is empty".to_string()));
    }

    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| PredictionError::Decode(e.to_string()))?;
    reader.limits(reader_limits(limits));
    let image = reader.decode()?;
    let color = image.to_rgb8();

    let (width, height) = color.dimensions();
    if width == 0 || height == 0 {
        return Err(PredictionError::Decode(format!(
            "image has no pixels ({}x{})",
            width, height
        )));
    }

    let grayscale = to_grayscale(&color);

    tracing::debug!(
        target: "blight_preprocessing",
        "Decoded payload: {} bytes, dimensions={}x{}",
        bytes.len(),
        width,
        height
    );

    Ok(DecodedImage { grayscale, color })
}

fn reader_limits(limits: &DecodeLimits) -> Limits {
    let mut reader_limits = Limits::default();
    reader_limits.max_image_width = Some(limits.max_dimension);
    reader_limits.max_image_height = Some(limits.max_dimension);
    reader_limits.max_alloc = Some(limits.max_alloc_bytes);
    reader_limits
}

/// Converts RGB to intensity with ITU-R BT.601 weights (0.299, 0.587, 0.114).
///
/// These are the weights the blur threshold was calibrated against.
pub fn to_grayscale(image: &RgbImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut gray = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
        gray.put_pixel(x, y, image::Luma([luma.round().clamp(0.0, 255.0) as u8]));
    }

    gray
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("PNG encoding should succeed");
        bytes
    }

    #[test]
    fn test_decode_png_produces_matching_representations() {
        let mut img = RgbImage::from_pixel(12, 7, image::Rgb([40, 80, 120]));
        img.put_pixel(3, 2, image::Rgb([255, 255, 255]));

        let decoded = decode_image(&encode_png(&img), &DecodeLimits::default())
            .expect("valid PNG should decode");

        assert_eq!(decoded.dimensions(), (12, 7));
        assert_eq!(decoded.grayscale.dimensions(), (12, 7));
        assert_eq!(decoded.color, img);
        assert_eq!(decoded.grayscale.get_pixel(3, 2)[0], 255);
    }

    #[test]
    fn test_decode_empty_payload() {
        let err = decode_image(&[], &DecodeLimits::default()).unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));
    }

    #[test]
    fn test_decode_random_bytes() {
        let garbage: Vec<u8> = (0..512u32).map(|i| (i.wrapping_mul(37) % 251) as u8).collect();
        let err = decode_image(&garbage, &DecodeLimits::default()).unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));
    }

    #[test]
    fn test_decode_truncated_png() {
        let img = RgbImage::from_pixel(32, 32, image::Rgb([10, 20, 30]));
        let bytes = encode_png(&img);
        let err =
            decode_image(&bytes[..bytes.len() / 2], &DecodeLimits::default()).unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_dimensions_over_limit() {
        let limits = DecodeLimits {
            max_dimension: 64,
            ..DecodeLimits::default()
        };

        let wide = RgbImage::from_pixel(100, 10, image::Rgb([128, 128, 128]));
        let err = decode_image(&encode_png(&wide), &limits).unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));

        let tall = RgbImage::from_pixel(10, 65, image::Rgb([128, 128, 128]));
        let err = decode_image(&encode_png(&tall), &limits).unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));

        let fits = RgbImage::from_pixel(64, 64, image::Rgb([128, 128, 128]));
        assert!(decode_image(&encode_png(&fits), &limits).is_ok());
    }

    #[test]
    fn test_decode_rejects_allocation_over_limit() {
        let limits = DecodeLimits {
            max_alloc_bytes: 1024,
            ..DecodeLimits::default()
        };

        let img = RgbImage::from_pixel(40, 40, image::Rgb([128, 128, 128]));
        let err = decode_image(&encode_png(&img), &limits).unwrap_err();
        assert!(matches!(err, PredictionError::Decode(_)));
    }

    #[test]
    fn test_grayscale_weights() {
        let img = RgbImage::from_fn(3, 1, |x, _| match x {
            0 => image::Rgb([255, 0, 0]),
            1 => image::Rgb([0, 255, 0]),
            _ => image::Rgb([90, 90, 90]),
        });
        let gray = to_grayscale(&img);

        assert_eq!(gray.get_pixel(0, 0)[0], 76);
        assert_eq!(gray.get_pixel(1, 0)[0], 150);
        assert_eq!(gray.get_pixel(2, 0)[0], 90);
    }
}
