//! # Prediction Error Types Module
//!
//! This module defines the error taxonomy of the prediction pipeline.
//! Every request either produces a report or exactly one of these errors.

/// Failures that can occur while turning an upload into a prediction
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionError {
    /// The payload is not a decodable image
    Decode(String),
    /// The classification model cannot be reached or loaded (fatal at startup)
    ClassificationUnavailable(String),
    /// Any other per-request failure while scoring, enhancing or classifying
    Processing(String),
}

impl PredictionError {
    /// Short machine-readable kind, used as a metrics label
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::Decode(_) => "decode",
            PredictionError::ClassificationUnavailable(_) => "classification_unavailable",
            PredictionError::Processing(_) => "processing",
        }
    }
}

impl std::fmt::Display for PredictionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionError::Decode(msg) => write!(f, "Unable to read image: {}", msg),
            PredictionError::ClassificationUnavailable(msg) => {
                write!(f, "Classification model unavailable: {}", msg)
            }
            PredictionError::Processing(msg) => write!(f, "Prediction failed: {}", msg),
        }
    }
}

impl std::error::Error for PredictionError {}

impl From<image::ImageError> for PredictionError {
    fn from(err: image::ImageError) -> Self {
        PredictionError::Decode(err.to_string())
    }
}
