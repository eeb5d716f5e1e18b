//! # Prediction Report Types
//!
//! The externally visible result of one prediction request. A request yields
//! either a full [`PredictionReport`] or a single error description, never both.

use serde::Serialize;

use crate::classifier::ClassificationResult;
use crate::prediction_errors::PredictionError;

/// Status message for images that were enhanced before prediction
pub const BLURRY_MESSAGE: &str = "Image was blurry and has been enhanced before prediction.";
/// Status message for images classified as uploaded
pub const SHARP_MESSAGE: &str = "Image is sharp, predicted directly.";

/// Successful prediction record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionReport {
    /// Predicted class name
    #[serde(rename = "class")]
    pub class_name: String,
    /// Probability of the predicted class (0.0-1.0)
    pub confidence: f32,
    /// Blur score of the original upload
    pub sharpness: f64,
    /// Whether the blur score fell below the threshold
    pub is_blurry: bool,
    /// One of [`BLURRY_MESSAGE`] or [`SHARP_MESSAGE`]
    pub message: String,
}

impl PredictionReport {
    pub fn new(classification: ClassificationResult, sharpness: f64, is_blurry: bool) -> Self {
        Self {
            class_name: classification.label,
            confidence: classification.confidence,
            sharpness,
            is_blurry,
            message: status_message(is_blurry).to_string(),
        }
    }
}

/// Failed prediction record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    pub error: String,
}

/// Outcome of one request: a report or an error description.
///
/// Serializes untagged, so the JSON carries either the report fields or a
/// single `error` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredictionOutcome {
    Success(PredictionReport),
    Failure(ErrorReport),
}

impl PredictionOutcome {
    pub fn failure(error: &PredictionError) -> Self {
        PredictionOutcome::Failure(ErrorReport {
            error: error.to_string(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PredictionOutcome::Success(_))
    }

    pub fn report(&self) -> Option<&PredictionReport> {
        match self {
            PredictionOutcome::Success(report) => Some(report),
            PredictionOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            PredictionOutcome::Success(_) => None,
            PredictionOutcome::Failure(report) => Some(&report.error),
        }
    }
}

impl From<Result<PredictionReport, PredictionError>> for PredictionOutcome {
    fn from(result: Result<PredictionReport, PredictionError>) -> Self {
        match result {
            Ok(report) => PredictionOutcome::Success(report),
            Err(e) => PredictionOutcome::failure(&e),
        }
    }
}

/// Fixed status message for the blur decision
pub fn status_message(is_blurry: bool) -> &'static str {
    if is_blurry {
        BLURRY_MESSAGE
    } else {
        SHARP_MESSAGE
    }
}
