//! # Prediction Pipeline
//!
//! Sequences one request through the quality-adaptive preprocessing and the
//! classifier:
//!
//! ```text
//! bytes ─► decode ─► score ─► decide ─► resize ─► enhance ─► normalize ─► classify ─► report
//!           │                                                                 │
//!           └──────────── any failure ─► PredictionOutcome::Failure ◄─────────┘
//! ```
//!
//! The pipeline keeps no state between requests. Its configuration and
//! classifier are read-only and may be shared by concurrent requests.
//! Decoding, scoring and enhancement are CPU-bound and run on tokio's blocking
//! pool so a large upload never stalls the async workers.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, Span};

use crate::classifier::{select_top_class, ClassificationAdapter};
use crate::errors::{error_logging, AppResult};
use crate::observability;
use crate::pipeline_config::PipelineConfig;
use crate::prediction_errors::PredictionError;
use crate::preprocessing::{
    decode_image, enhance_if_blurry, estimate_sharpness, resize_for_model, to_model_input,
    ModelInput, SharpnessResult,
};
use crate::report::{PredictionOutcome, PredictionReport};

/// Everything computed before the classifier is called
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Score of the original, un-enhanced upload
    pub sharpness: SharpnessResult,
    /// `sharpness.blur_score < blur_threshold`
    pub is_blurry: bool,
    /// Whether the enhancement transform ran
    pub enhanced: bool,
    /// Model input tensor built from the resized (and possibly enhanced) image
    pub input: ModelInput,
}

/// Blur-aware classification pipeline
#[derive(Debug)]
pub struct PredictionPipeline<C> {
    config: Arc<PipelineConfig>,
    classifier: C,
}

impl<C: ClassificationAdapter> PredictionPipeline<C> {
    /// Create a pipeline after validating its configuration
    pub fn new(config: PipelineConfig, classifier: C) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            classifier,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Prove the classifier can serve this pipeline.
    ///
    /// Runs the adapter's readiness check, then a warm-up prediction on a blank
    /// input to confirm the model accepts the configured input size and returns
    /// one probability per class. Any failure is `ClassificationUnavailable`.
    pub async fn ensure_ready(&self) -> Result<(), PredictionError> {
        self.classifier.check_ready().await.map_err(into_unavailable)?;

        let size = self.config.image_size as usize;
        let warmup = ModelInput {
            shape: [1, size, size, 3],
            data: vec![0.0; size * size * 3],
        };
        let probabilities = self
            .classifier
            .classify(&warmup)
            .await
            .map_err(into_unavailable)?;

        if probabilities.len() != self.config.class_names.len() {
            return Err(PredictionError::ClassificationUnavailable(format!(
                "model outputs {} classes but {} class names are configured",
                probabilities.len(),
                self.config.class_names.len()
            )));
        }

        info!(
            image_size = %self.config.image_size,
            classes = %self.config.class_names.len(),
            "Classifier is ready"
        );
        Ok(())
    }

    /// Decode, score and enhance an upload on the calling thread.
    ///
    /// Blocks for as long as the image takes to process; async callers go
    /// through [`run`](Self::run), which moves this work to the blocking pool.
    pub fn prepare(&self, bytes: &[u8]) -> Result<PreparedImage, PredictionError> {
        prepare_image(&self.config, bytes)
    }

    /// Run the full pipeline, returning the report or the first error.
    pub async fn run(&self, bytes: &[u8]) -> Result<PredictionReport, PredictionError> {
        let config = Arc::clone(&self.config);
        let payload = bytes.to_vec();
        let span = Span::current();
        let prepared =
            tokio::task::spawn_blocking(move || span.in_scope(|| prepare_image(&config, &payload)))
                .await
                .map_err(|e| {
                    PredictionError::Processing(format!("preprocessing task failed: {}", e))
                })??;

        let classify_start = Instant::now();
        let probabilities = match self.classifier.classify(&prepared.input).await {
            Ok(probabilities) => probabilities,
            Err(e) => {
                observability::record_classifier_metrics(false, classify_start.elapsed());
                error_logging::log_classification_error(
                    &e,
                    "classify",
                    Some(classify_start.elapsed()),
                );
                return Err(e);
            }
        };
        observability::record_classifier_metrics(true, classify_start.elapsed());

        let classification = select_top_class(&probabilities, &self.config.class_names)
            .map_err(|e| {
                error_logging::log_classification_error(&e, "select_top_class", None);
                e
            })?;

        Ok(PredictionReport::new(
            classification,
            prepared.sharpness.blur_score,
            prepared.is_blurry,
        ))
    }

    /// Run the pipeline and convert the result into the wire outcome.
    ///
    /// Never fails: every error becomes `PredictionOutcome::Failure`, is
    /// logged and counted. Nothing is retried.
    pub async fn predict(&self, bytes: &[u8]) -> PredictionOutcome {
        let start_time = Instant::now();
        let result = self.run(bytes).await;
        let duration = start_time.elapsed();

        match &result {
            Ok(report) => {
                observability::record_prediction_metrics(
                    "success",
                    Some(report.is_blurry),
                    duration,
                );
                observability::record_blur_score(report.sharpness);
                info!(
                    class = %report.class_name,
                    confidence = %report.confidence,
                    sharpness = %report.sharpness,
                    is_blurry = %report.is_blurry,
                    duration_ms = %duration.as_millis(),
                    "Prediction completed"
                );
            }
            Err(e) => {
                if let PredictionError::Decode(_) = e {
                    error_logging::log_decode_error(e, bytes.len());
                }
                observability::record_prediction_metrics(e.kind(), None, duration);
            }
        }

        result.into()
    }
}

/// Scoring always uses the grayscale decode at native resolution; the
/// enhancer only ever sees the resized color copy.
fn prepare_image(
    config: &PipelineConfig,
    bytes: &[u8],
) -> Result<PreparedImage, PredictionError> {
    let decoded = decode_image(bytes, &config.decode_limits)?;

    let sharpness = estimate_sharpness(&decoded.grayscale);
    let threshold = config.blur_threshold;
    let is_blurry = sharpness.blur_score < threshold;

    let resized = resize_for_model(&decoded.color, config.image_size);
    let enhancement =
        enhance_if_blurry(resized, sharpness.blur_score, threshold, &config.enhancement);

    let input = to_model_input(&enhancement.image, config.input_scaling);

    debug!(
        blur_score = %sharpness.blur_score,
        is_blurry = %is_blurry,
        enhanced = %enhancement.applied,
        native_width = %sharpness.dimensions.0,
        native_height = %sharpness.dimensions.1,
        "Image prepared for classification"
    );

    Ok(PreparedImage {
        sharpness,
        is_blurry,
        enhanced: enhancement.applied,
        input,
    })
}

fn into_unavailable(error: PredictionError) -> PredictionError {
    match error {
        PredictionError::ClassificationUnavailable(_) => error,
        other => PredictionError::ClassificationUnavailable(other.to_string()),
    }
}
