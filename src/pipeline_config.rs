//! # Pipeline Configuration Module
//!
//! This module defines the tuning parameters of the prediction pipeline:
//! model input size, blur threshold, enhancement coefficients and the
//! ordered class list the model was trained on.

use std::env;

use crate::errors::{AppError, AppResult};

// Constants for pipeline configuration
pub const DEFAULT_IMAGE_SIZE: u32 = 256;
pub const DEFAULT_BLUR_THRESHOLD: f64 = 100.0;
pub const DEFAULT_CONTRAST_FACTOR: f32 = 1.2;
pub const DEFAULT_BRIGHTNESS_OFFSET: f32 = 15.0;
pub const MAX_IMAGE_SIZE: u32 = 4096;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10MB limit for uploads
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 8192;
pub const DEFAULT_MAX_DECODE_ALLOC_BYTES: u64 = 256 * 1024 * 1024;

/// Unsharp-mask style kernel, row-major: centre 5, orthogonal neighbours -1, diagonals 0.
pub const DEFAULT_SHARPEN_KERNEL: [f32; 9] = [
    0.0, -1.0, 0.0, //
    -1.0, 5.0, -1.0, //
    0.0, -1.0, 0.0,
];

/// Class labels in the order of the model's output vector.
pub const DEFAULT_CLASS_NAMES: [&str; 3] = ["Early Blight", "Late Blight", "Healthy"];

/// Coefficients of the enhancement transform applied to blurry images
#[derive(Debug, Clone, PartialEq)]
pub struct EnhancementConfig {
    /// 3x3 sharpening kernel, row-major
    pub kernel: [f32; 9],
    /// Multiplier applied to every channel after sharpening
    pub contrast_factor: f32,
    /// Offset added to every channel after the contrast multiplier
    pub brightness_offset: f32,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            kernel: DEFAULT_SHARPEN_KERNEL,
            contrast_factor: DEFAULT_CONTRAST_FACTOR,
            brightness_offset: DEFAULT_BRIGHTNESS_OFFSET,
        }
    }
}

impl EnhancementConfig {
    /// Validate enhancement coefficients
    pub fn validate(&self) -> AppResult<()> {
        if self.kernel.iter().any(|k| !k.is_finite()) {
            return Err(AppError::Config(
                "sharpening kernel coefficients must be finite".to_string(),
            ));
        }
        if !self.contrast_factor.is_finite() || self.contrast_factor <= 0.0 {
            return Err(AppError::Config(format!(
                "contrast_factor must be a positive number, got {}",
                self.contrast_factor
            )));
        }
        if !self.brightness_offset.is_finite() {
            return Err(AppError::Config(
                "brightness_offset must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bounds applied while decoding an upload, before any pixel buffer exists.
///
/// A compressed upload can be far smaller than the image it expands to, so
/// the upload size limit alone does not bound decode work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest accepted width and height in pixels
    pub max_dimension: u32,
    /// Largest allocation the decoder may make in bytes
    pub max_alloc_bytes: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
            max_alloc_bytes: DEFAULT_MAX_DECODE_ALLOC_BYTES,
        }
    }
}

impl DecodeLimits {
    pub fn validate(&self) -> AppResult<()> {
        if self.max_dimension == 0 {
            return Err(AppError::Config(
                "max_image_dimension must be greater than 0".to_string(),
            ));
        }
        if self.max_alloc_bytes == 0 {
            return Err(AppError::Config(
                "max_decode_alloc_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// How resized pixels are scaled before they reach the model
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputScaling {
    /// Channel values stay in 0-255; the model rescales internally
    #[default]
    Raw,
    /// Channel values are divided by 255 into 0.0-1.0
    UnitRange,
}

impl InputScaling {
    /// Parse the `INPUT_SCALING` setting
    pub fn parse(value: &str) -> AppResult<Self> {
        match value.trim().to_lowercase().as_str() {
            "raw" => Ok(InputScaling::Raw),
            "unit" | "unit_range" => Ok(InputScaling::UnitRange),
            other => Err(AppError::Config(format!(
                "INPUT_SCALING must be 'raw' or 'unit', got '{}'",
                other
            ))),
        }
    }

    /// Factor applied to each 8-bit channel value
    pub fn factor(&self) -> f32 {
        match self {
            InputScaling::Raw => 1.0,
            InputScaling::UnitRange => 1.0 / 255.0,
        }
    }
}

/// Configuration of the prediction pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Edge length of the square model input
    pub image_size: u32,
    /// Blur scores strictly below this value mark the image as blurry
    pub blur_threshold: f64,
    /// Enhancement transform coefficients
    pub enhancement: EnhancementConfig,
    /// Ordered class names matching the model output vector
    pub class_names: Vec<String>,
    /// Scaling of pixel values in the model input tensor
    pub input_scaling: InputScaling,
    /// Largest accepted upload in bytes
    pub max_upload_bytes: usize,
    /// Dimension and allocation bounds for decoding
    pub decode_limits: DecodeLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            blur_threshold: DEFAULT_BLUR_THRESHOLD,
            enhancement: EnhancementConfig::default(),
            class_names: DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            input_scaling: InputScaling::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            decode_limits: DecodeLimits::default(),
        }
    }
}

impl PipelineConfig {
    /// Load pipeline configuration from environment variables, falling back to defaults
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(value) = env::var("IMAGE_SIZE") {
            config.image_size = value.trim().parse().map_err(|_| {
                AppError::Config("IMAGE_SIZE must be a valid number".to_string())
            })?;
        }
        if let Ok(value) = env::var("BLUR_THRESHOLD") {
            config.blur_threshold = value.trim().parse().map_err(|_| {
                AppError::Config("BLUR_THRESHOLD must be a valid number".to_string())
            })?;
        }
        if let Ok(value) = env::var("SHARPEN_KERNEL") {
            config.enhancement.kernel = parse_kernel(&value)?;
        }
        if let Ok(value) = env::var("CONTRAST_FACTOR") {
            config.enhancement.contrast_factor = value.trim().parse().map_err(|_| {
                AppError::Config("CONTRAST_FACTOR must be a valid number".to_string())
            })?;
        }
        if let Ok(value) = env::var("BRIGHTNESS_OFFSET") {
            config.enhancement.brightness_offset = value.trim().parse().map_err(|_| {
                AppError::Config("BRIGHTNESS_OFFSET must be a valid number".to_string())
            })?;
        }
        if let Ok(value) = env::var("CLASS_NAMES") {
            config.class_names = parse_class_names(&value);
        }
        if let Ok(value) = env::var("INPUT_SCALING") {
            config.input_scaling = InputScaling::parse(&value)?;
        }
        if let Ok(value) = env::var("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = value.trim().parse().map_err(|_| {
                AppError::Config("MAX_UPLOAD_BYTES must be a valid number".to_string())
            })?;
        }
        if let Ok(value) = env::var("MAX_IMAGE_DIMENSION") {
            config.decode_limits.max_dimension = value.trim().parse().map_err(|_| {
                AppError::Config("MAX_IMAGE_DIMENSION must be a valid number".to_string())
            })?;
        }
        if let Ok(value) = env::var("MAX_DECODE_ALLOC_BYTES") {
            config.decode_limits.max_alloc_bytes = value.trim().parse().map_err(|_| {
                AppError::Config("MAX_DECODE_ALLOC_BYTES must be a valid number".to_string())
            })?;
        }

        Ok(config)
    }

    /// Validate pipeline configuration parameters
    pub fn validate(&self) -> AppResult<()> {
        if self.image_size == 0 || self.image_size > MAX_IMAGE_SIZE {
            return Err(AppError::Config(format!(
                "image_size must be between 1 and {}, got {}",
                MAX_IMAGE_SIZE, self.image_size
            )));
        }
        if !self.blur_threshold.is_finite() || self.blur_threshold < 0.0 {
            return Err(AppError::Config(format!(
                "blur_threshold must be a finite non-negative number, got {}",
                self.blur_threshold
            )));
        }
        self.enhancement.validate()?;

        if self.class_names.is_empty() {
            return Err(AppError::Config(
                "class_names must contain at least one class".to_string(),
            ));
        }
        if self.class_names.iter().any(|name| name.trim().is_empty()) {
            return Err(AppError::Config(
                "class_names cannot contain empty entries".to_string(),
            ));
        }
        for (i, name) in self.class_names.iter().enumerate() {
            if self.class_names[..i].contains(name) {
                return Err(AppError::Config(format!(
                    "class_names contains duplicate entry '{}'",
                    name
                )));
            }
        }

        if self.max_upload_bytes == 0 {
            return Err(AppError::Config(
                "max_upload_bytes must be greater than 0".to_string(),
            ));
        }
        self.decode_limits.validate()

    }
}

/// Parse a comma-separated list of nine kernel coefficients (row-major)
pub fn parse_kernel(value: &str) -> AppResult<[f32; 9]> {
    let coefficients = value
        .split(',')
        .map(|part| part.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| {
            AppError::Config("SHARPEN_KERNEL must contain only numbers".to_string())
        })?;

    coefficients.try_into().map_err(|v: Vec<f32>| {
        AppError::Config(format!(
            "SHARPEN_KERNEL must contain exactly 9 coefficients, got {}",
            v.len()
        ))
    })
}

/// Parse a comma-separated list of class names, preserving order
pub fn parse_class_names(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.image_size, 256);
        assert_eq!(config.blur_threshold, 100.0);
        assert_eq!(config.enhancement.contrast_factor, 1.2);
        assert_eq!(config.enhancement.brightness_offset, 15.0);
        assert_eq!(config.enhancement.kernel[4], 5.0);
        assert_eq!(config.class_names.len(), 3);
        assert_eq!(config.input_scaling, InputScaling::Raw);
        assert_eq!(config.decode_limits.max_dimension, 8192);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_validation() {
        let mut config = PipelineConfig::default();

        config.image_size = 0;
        assert!(config.validate().is_err());
        config.image_size = MAX_IMAGE_SIZE + 1;
        assert!(config.validate().is_err());
        config.image_size = 256;

        config.blur_threshold = -1.0;
        assert!(config.validate().is_err());
        config.blur_threshold = f64::NAN;
        assert!(config.validate().is_err());
        config.blur_threshold = 0.0;
        assert!(config.validate().is_ok());

        config.class_names = vec![];
        assert!(config.validate().is_err());
        config.class_names = vec!["Healthy".to_string(), "Healthy".to_string()];
        assert!(config.validate().is_err());
        config.class_names = vec!["Healthy".to_string()];

        config.max_upload_bytes = 0;
        assert!(config.validate().is_err());
        config.max_upload_bytes = 1024;

        config.decode_limits.max_dimension = 0;
        assert!(config.validate().is_err());
        config.decode_limits.max_dimension = 512;
        config.decode_limits.max_alloc_bytes = 0;
        assert!(config.validate().is_err());
        config.decode_limits.max_alloc_bytes = 1 << 20;

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enhancement_config_validation() {
        let mut config = EnhancementConfig::default();
        assert!(config.validate().is_ok());

        config.contrast_factor = 0.0;
        assert!(config.validate().is_err());
        config.contrast_factor = 1.2;

        config.kernel[0] = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_kernel() {
        let kernel = parse_kernel("0,-1,0,-1,5,-1,0,-1,0").expect("valid kernel");
        assert_eq!(kernel, DEFAULT_SHARPEN_KERNEL);

        assert!(parse_kernel("1,2,3").is_err());
        assert!(parse_kernel("0,-1,0,-1,five,-1,0,-1,0").is_err());
    }

    #[test]
    fn test_parse_class_names_preserves_order() {
        let names = parse_class_names(" Late Blight, Healthy ,,Early Blight");
        assert_eq!(names, vec!["Late Blight", "Healthy", "Early Blight"]);
    }

    #[test]
    fn test_input_scaling() {
        assert_eq!(InputScaling::parse("raw").unwrap(), InputScaling::Raw);
        assert_eq!(InputScaling::parse("UNIT").unwrap(), InputScaling::UnitRange);
        assert!(InputScaling::parse("zscore").is_err());
        assert_eq!(InputScaling::Raw.factor(), 1.0);
    }
}
