//! # Shared Types for Image Preprocessing
//!
//! This module contains the shared types passed between the decoding,
//! sharpness, enhancement and resize stages.

use image::{GrayImage, RgbImage};

/// Both representations of one uploaded payload.
///
/// The two images come from a single decode of the same bytes, so they always
/// show identical content at native resolution.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Intensity image used only for sharpness scoring
    pub grayscale: GrayImage,
    /// 8-bit RGB image used for enhancement and classification
    pub color: RgbImage,
}

impl DecodedImage {
    /// Native (width, height) of the decoded payload
    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// Result of sharpness estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharpnessResult {
    /// Variance of the Laplacian response (higher is sharper, never negative)
    pub blur_score: f64,
    /// Dimensions of the scored image (width, height)
    pub dimensions: (u32, u32),
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Result of the adaptive enhancement stage.
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    /// The image ready for classification, enhanced or original
    pub image: RgbImage,
    /// Whether the sharpening and contrast transform ran
    pub applied: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u32,
}

/// Single-item batch tensor in NHWC layout, as consumed by the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInput {
    /// Tensor shape: [batch, height, width, channels]
    pub shape: [usize; 4],
    /// Row-major channel values
    pub data: Vec<f32>,
}

impl ModelInput {
    pub fn height(&self) -> usize {
        self.shape[1]
    }

    pub fn width(&self) -> usize {
        self.shape[2]
    }

    pub fn channels(&self) -> usize {
        self.shape[3]
    }

    /// Channel values of the pixel at (x, y) of the first batch item
    pub fn pixel(&self, x: usize, y: usize) -> &[f32] {
        let channels = self.channels();
        let start = (y * self.width() + x) * channels;
        &self.data[start..start + channels]
    }
}
