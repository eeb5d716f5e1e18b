//! # Classification Adapter Module
//!
//! The trained model is an external collaborator. This module defines the
//! contract the pipeline needs from it and the label selection performed on
//! its output.
//!
//! ## Contract
//!
//! - `check_ready` proves the model can serve before any request is accepted.
//!   A failure is fatal at startup.
//! - `classify` maps one `[1, size, size, 3]` tensor to a probability vector
//!   ordered like the configured class names.
//!
//! Adapters are shared read-only by every concurrent request, so they take
//! `&self` and must be `Send + Sync`.

use async_trait::async_trait;
use serde::Serialize;

use crate::preprocessing::ModelInput;
use crate::prediction_errors::PredictionError;

/// Opaque image-to-probabilities model
#[async_trait]
pub trait ClassificationAdapter: Send + Sync {
    /// Verify that the model is loaded and able to serve predictions
    async fn check_ready(&self) -> Result<(), PredictionError>;

    /// Class probabilities for a single-item batch
    async fn classify(&self, input: &ModelInput) -> Result<Vec<f32>, PredictionError>;
}

/// Label and confidence chosen from a probability vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    /// One of the configured class names
    pub label: String,
    /// Probability of the chosen class (0.0-1.0)
    pub confidence: f32,
    /// Index of the chosen class in the model output
    pub class_index: usize,
}

/// Selects the most probable class (argmax).
///
/// Ties resolve to the lowest index. The vector must have exactly one entry per
/// class name and contain only finite values; anything else means the model and
/// the configured class list disagree.
pub fn select_top_class(
    probabilities: &[f32],
    class_names: &[String],
) -> Result<ClassificationResult, PredictionError> {
    if probabilities.len() != class_names.len() {
        return Err(PredictionError::Processing(format!(
            "model returned {} probabilities for {} classes",
            probabilities.len(),
            class_names.len()
        )));
    }
    if probabilities.iter().any(|p| !p.is_finite()) {
        return Err(PredictionError::Processing(
            "model returned non-finite probabilities".to_string(),
        ));
    }

    let (class_index, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
            Some((_, best_p)) if best_p >= p => best,
            _ => Some((i, p)),
        })
        .ok_or_else(|| {
            PredictionError::Processing("model returned an empty probability vector".to_string())
        })?;

    Ok(ClassificationResult {
        label: class_names[class_index].clone(),
        confidence: confidence.clamp(0.0, 1.0),
        class_index,
    })
}
