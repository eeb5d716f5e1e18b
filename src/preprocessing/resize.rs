//! # Model Input Preparation Module
//!
//! Resizes color images to the classifier's square input and packs them into
//! a single-item NHWC batch tensor.

use image::RgbImage;
use tracing;

use super::types::ModelInput;
use crate::pipeline_config::InputScaling;

/// Resizes an image to `size` x `size` for the classifier.
///
/// The aspect ratio is not preserved, matching how the model was trained.
/// Uses cubic interpolation (Catmull-Rom).
pub fn resize_for_model(image: &RgbImage, size: u32) -> RgbImage {
    if image.dimensions() == (size, size) {
        return image.clone();
    }

    let resized = image::imageops::resize(
        image,
        size,
        size,
        image::imageops::FilterType::CatmullRom,
    );

    tracing::debug!(
        target: "blight_preprocessing",
        "Resized image for model: {}x{} -> {}x{}",
        image.width(),
        image.height(),
        size,
        size
    );

    resized
}

/// Packs an RGB image into a `[1, height, width, 3]` tensor.
pub fn to_model_input(image: &RgbImage, scaling: InputScaling) -> ModelInput {
    let (width, height) = image.dimensions();
    let factor = scaling.factor();
    let data = image
        .as_raw()
        .iter()
        .map(|&value| value as f32 * factor)
        .collect();

    ModelInput {
        shape: [1, height as usize, width as usize, 3],
        data,
    }
}
