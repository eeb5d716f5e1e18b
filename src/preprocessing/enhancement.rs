//! # Adaptive Enhancement Module
//!
//! This module repairs images judged blurry before they reach the classifier.
//! The transform is a 3x3 sharpening convolution followed by a linear
//! contrast/brightness correction. Sharp images pass through untouched.

use image::RgbImage;
use tracing;

use super::convolution::{convolve3x3_rgb, saturate_u8};
use super::types::EnhancementResult;
use crate::pipeline_config::EnhancementConfig;

/// Enhances an image only when its blur score falls below the threshold.
///
/// The caller passes the same threshold it used to flag the image as blurry,
/// so the flag and the transform can never disagree. When the image is sharp
/// it is returned as-is, without copying.
///
/// Applied in order when triggered:
/// 1. sharpening with `config.kernel` (reflect-101 borders, rounded, saturated)
/// 2. `clamp(v * contrast_factor + brightness_offset, 0, 255)` per channel
///
/// The transform is not idempotent: enhancing an already enhanced blurry image
/// changes it further.
///
/// # Arguments
///
/// * `image` - Color image at model input size
/// * `blur_score` - Score of the original, un-enhanced upload
/// * `threshold` - Blur threshold shared with the blurry decision
/// * `config` - Kernel and correction coefficients
///
/// # Returns
///
/// The image ready for classification, enhanced or original.
///
/// # Examples
///
/// ```
/// use blight_scan::pipeline_config::EnhancementConfig;
/// use blight_scan::preprocessing::enhance_if_blurry;
///
/// let flat = image::RgbImage::from_pixel(8, 8, image::Rgb([128, 128, 128]));
/// let result = enhance_if_blurry(flat, 0.0, 100.0, &EnhancementConfig::default());
/// assert!(result.applied);
/// assert_eq!(result.image.get_pixel(0, 0).0, [169, 169, 169]);
/// ```
pub fn enhance_if_blurry(
    image: RgbImage,
    blur_score: f64,
    threshold: f64,
    config: &EnhancementConfig,
) -> EnhancementResult {
    let start_time = std::time::Instant::now();

    if blur_score >= threshold {
        return EnhancementResult {
            image,
            applied: false,
            processing_time_ms: start_time.elapsed().as_millis() as u32,
        };
    }

    let sharpened = sharpen(&image, &config.kernel);
    let corrected = adjust_contrast_brightness(
        sharpened,
        config.contrast_factor,
        config.brightness_offset,
    );

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "blight_preprocessing",
        "Enhancement applied in {}ms: blur_score={:.3}, threshold={:.3}, contrast={:.2}, brightness={:.1}",
        processing_time.as_millis(),
        blur_score,
        threshold,
        config.contrast_factor,
        config.brightness_offset
    );

    EnhancementResult {
        image: corrected,
        applied: true,
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

/// Applies a 3x3 sharpening kernel to every channel.
pub fn sharpen(image: &RgbImage, kernel: &[f32; 9]) -> RgbImage {
    convolve3x3_rgb(image, kernel)
}

/// Applies `v * contrast_factor + brightness_offset` per channel, saturating to 0-255.
pub fn adjust_contrast_brightness(
    mut image: RgbImage,
    contrast_factor: f32,
    brightness_offset: f32,
) -> RgbImage {
    for pixel in image.pixels_mut() {
        for channel in pixel.0.iter_mut() {
            *channel = saturate_u8(*channel as f32 * contrast_factor + brightness_offset);
        }
    }
    image
}
