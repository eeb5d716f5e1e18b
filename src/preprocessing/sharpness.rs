//! # Sharpness Estimation Module
//!
//! This module scores how blurred an image is using the variance of the
//! Laplacian. Strong edges give a widely spread Laplacian response and a high
//! score; flat or defocused images concentrate the response near zero.

use image::GrayImage;
use tracing;

use super::convolution::laplacian_at;
use super::types::SharpnessResult;

/// Estimates the sharpness of a natively decoded grayscale image.
///
/// The Laplacian is evaluated at every pixel (reflect-101 borders) and the
/// population variance of the response map is returned as the blur score.
/// The image must be the un-enhanced decode of the upload; scoring an enhanced
/// or resized copy would shift the score away from the calibrated threshold.
///
/// # Arguments
///
/// * `image` - The grayscale image to score
///
/// # Returns
///
/// The blur score with timing metadata. The score is deterministic for a given
/// image and never negative.
///
/// # Examples
///
/// ```
/// use blight_scan::preprocessing::estimate_sharpness;
///
/// let flat = image::GrayImage::from_pixel(50, 50, image::Luma([128]));
/// let result = estimate_sharpness(&flat);
/// assert_eq!(result.blur_score, 0.0);
/// ```
pub fn estimate_sharpness(image: &GrayImage) -> SharpnessResult {
    let start_time = std::time::Instant::now();

    let blur_score = laplacian_variance(image);

    let processing_time = start_time.elapsed();

    tracing::debug!(
        target: "blight_preprocessing",
        "Sharpness estimation completed in {}ms: blur_score={:.3}, dimensions={}x{}",
        processing_time.as_millis(),
        blur_score,
        image.width(),
        image.height()
    );

    SharpnessResult {
        blur_score,
        dimensions: image.dimensions(),
        processing_time_ms: processing_time.as_millis() as u32,
    }
}

/// Population variance of the Laplacian response over every pixel.
///
/// Sums are accumulated as integers in row-major order, so repeated calls on
/// the same image return bit-identical results.
pub fn laplacian_variance(image: &GrayImage) -> f64 {
    let (width, height) = image.dimensions();
    let pixel_count = width as u64 * height as u64;
    if pixel_count == 0 {
        return 0.0;
    }

    let mut sum = 0i64;
    let mut sum_sq = 0i64;
    for y in 0..height {
        for x in 0..width {
            let response = laplacian_at(image, x, y) as i64;
            sum += response;
            sum_sq += response * response;
        }
    }

    let n = pixel_count as f64;
    let mean = sum as f64 / n;
    let variance = sum_sq as f64 / n - mean * mean;

    // Cancellation can leave a tiny negative residue for flat images.
    variance.max(0.0)
}
