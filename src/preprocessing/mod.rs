//! # Image Preprocessing Module
//!
//! This module provides the quality-adaptive preprocessing used before
//! classification: decoding, blur scoring, conditional enhancement and
//! model input preparation.
//!
//! The module is organized into focused sub-modules:
//! - `decoding`: Payload decoding into grayscale and RGB representations
//! - `sharpness`: Laplacian-variance blur scoring
//! - `enhancement`: Sharpening and contrast/brightness correction for blurry images
//! - `resize`: Square resize and tensor packing for the classifier
//! - `convolution`: 3x3 kernels with reflect-101 borders
//! - `types`: Shared result types

pub mod convolution;
pub mod decoding;
pub mod enhancement;
pub mod resize;
pub mod sharpness;
pub mod types;

// Re-export commonly used types and functions for convenience
pub use types::{DecodedImage, EnhancementResult, ModelInput, SharpnessResult};

pub use decoding::decode_image;
pub use enhancement::enhance_if_blurry;
pub use resize::{resize_for_model, to_model_input};
pub use sharpness::estimate_sharpness;
