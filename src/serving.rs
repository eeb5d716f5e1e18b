//! # TensorFlow Serving Adapter
//!
//! Implements [`ClassificationAdapter`] against the TensorFlow Serving REST API.
//!
//! - Readiness: `GET {base}/v1/models/{name}`; the model is ready when at
//!   least one version reports state `AVAILABLE`.
//! - Prediction: `POST {base}/v1/models/{name}:predict` with
//!   `{"instances": [[[[r, g, b], ...], ...]]}`, reading `predictions[0]`.
//!
//! Calls are never retried; a timeout or transport failure becomes a
//! per-request error.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, Instrument};

use crate::classifier::ClassificationAdapter;
use crate::config::ModelConfig;
use crate::errors::{AppError, AppResult};
use crate::observability;
use crate::prediction_errors::PredictionError;
use crate::preprocessing::ModelInput;

/// Request body of the `:predict` endpoint (row format)
#[derive(Debug, Serialize)]
pub struct PredictRequest {
    /// One `[height][width][channels]` array per batch item
    pub instances: Vec<Vec<Vec<Vec<f32>>>>,
}

/// Response body of the `:predict` endpoint
#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<Vec<f32>>,
}

/// Response body of the model status endpoint
#[derive(Debug, Deserialize)]
pub struct ModelStatusResponse {
    #[serde(default)]
    pub model_version_status: Vec<ModelVersionStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ModelVersionStatus {
    #[serde(default)]
    pub version: String,
    pub state: String,
}

/// Classification adapter backed by a TensorFlow Serving instance
#[derive(Debug, Clone)]
pub struct TfServingClassifier {
    client: reqwest::Client,
    status_url: String,
    predict_url: String,
}

impl TfServingClassifier {
    /// Build an adapter for the configured serving endpoint
    pub fn new(config: &ModelConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let base = config.serving_url.trim_end_matches('/');
        let status_url = format!("{}/v1/models/{}", base, config.model_name);
        let predict_url = format!("{}:predict", status_url);

        info!(
            status_url = %status_url,
            timeout_secs = %config.timeout_secs,
            "TensorFlow Serving classifier configured"
        );

        Ok(Self {
            client,
            status_url,
            predict_url,
        })
    }

    pub fn status_url(&self) -> &str {
        &self.status_url
    }

    pub fn predict_url(&self) -> &str {
        &self.predict_url
    }

    async fn fetch_status(&self) -> Result<(), PredictionError> {
        let response = self
            .client
            .get(&self.status_url)
            .send()
            .await
            .map_err(|e| PredictionError::ClassificationUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictionError::ClassificationUnavailable(format!(
                "model status endpoint returned HTTP {}",
                status
            )));
        }

        let body: ModelStatusResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::ClassificationUnavailable(e.to_string()))?;

        ensure_model_available(&body)?;
        debug!("Model status check passed");
        Ok(())
    }

    async fn request_prediction(&self, input: &ModelInput) -> Result<Vec<f32>, PredictionError> {
        let request = build_predict_request(input);

        let response = self
            .client
            .post(&self.predict_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PredictionError::Processing(format!("model request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(PredictionError::Processing(format!(
                "model returned HTTP {}: {}",
                status,
                detail.trim()
            )));
        }

        let body: PredictResponse = response
            .json()
            .await
            .map_err(|e| PredictionError::Processing(format!("invalid model response: {}", e)))?;

        first_prediction(body)
    }
}

#[async_trait]
impl ClassificationAdapter for TfServingClassifier {
    async fn check_ready(&self) -> Result<(), PredictionError> {
        self.fetch_status()
            .instrument(observability::classifier_span("check_ready"))
            .await
    }

    async fn classify(&self, input: &ModelInput) -> Result<Vec<f32>, PredictionError> {
        self.request_prediction(input)
            .instrument(observability::classifier_span("predict"))
            .await
    }
}

/// Converts a batch tensor into the nested row format TF Serving expects
pub fn build_predict_request(input: &ModelInput) -> PredictRequest {
    let [batch, height, width, channels] = input.shape;
    let item_len = height * width * channels;

    let instances = (0..batch)
        .map(|b| {
            let item = &input.data[b * item_len..(b + 1) * item_len];
            item.chunks(width * channels)
                .map(|row| row.chunks(channels).map(|px| px.to_vec()).collect())
                .collect()
        })
        .collect();

    PredictRequest { instances }
}

/// Extracts the probability vector of the single batch item
pub fn first_prediction(response: PredictResponse) -> Result<Vec<f32>, PredictionError> {
    response
        .predictions
        .into_iter()
        .next()
        .ok_or_else(|| PredictionError::Processing("model returned no predictions".to_string()))
}

/// Fails unless some model version is in the `AVAILABLE` state
pub fn ensure_model_available(status: &ModelStatusResponse) -> Result<(), PredictionError> {
    if status
        .model_version_status
        .iter()
        .any(|v| v.state.eq_ignore_ascii_case("AVAILABLE"))
    {
        return Ok(());
    }

    let states: Vec<String> = status
        .model_version_status
        .iter()
        .map(|v| format!("{}={}", v.version, v.state))
        .collect();
    Err(PredictionError::ClassificationUnavailable(format!(
        "no model version is AVAILABLE (versions: [{}])",
        states.join(", ")
    )))
}
