//! Observability module for centralized metrics, tracing, and logging setup.
//!
//! This module provides:
//! - Metrics collection and Prometheus export
//! - Structured logging with configurable levels and formats
//! - Span helpers for prediction and classifier calls
//! - Readiness checks and a background health metrics recorder

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::prelude::*;

use crate::classifier::ClassificationAdapter;
use crate::observability_config::{LogFormat, ObservabilityConfig};
use crate::pipeline::PredictionPipeline;

/// Initialize logging and metrics.
///
/// Returns the Prometheus handle used to render `/metrics`, or `None` when
/// metrics export is disabled.
pub fn init_observability_with_config(
    config: &ObservabilityConfig,
) -> Result<Option<PrometheusHandle>> {
    // Validate configuration
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid observability configuration: {}", e))?;

    // Initialize tracing first
    init_tracing_with_config(config)?;

    // Initialize metrics
    let metrics_handle = init_metrics_with_config(config)?;

    tracing::info!(
        environment = %config.environment,
        log_format = ?config.log_format,
        metrics_export = %config.enable_metrics_export,
        "Observability stack initialized successfully"
    );
    Ok(metrics_handle)
}

/// Initialize structured logging with tracing and configuration
pub fn init_tracing_with_config(config: &ObservabilityConfig) -> Result<()> {
    // Create the filter based on configuration
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(config.filter_directive().parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    match config.log_format {
        LogFormat::Pretty => {
            // Pretty formatting for development
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_thread_names(false),
                )
                .try_init()?;
        }
        LogFormat::Json => {
            // JSON formatting for production
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_thread_names(true),
                )
                .try_init()?;
        }
    }

    tracing::info!(
        environment = %config.environment,
        log_level = %config.log_level,
        "Tracing initialized with structured logging"
    );
    Ok(())
}

/// Initialize metrics collection with Prometheus exporter and configuration
pub fn init_metrics_with_config(config: &ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    if !config.enable_metrics_export {
        tracing::info!("Metrics export disabled");
        return Ok(None);
    }

    // Create Prometheus recorder
    let builder = PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    tracing::info!("Metrics collection initialized");
    Ok(Some(handle))
}

/// Create a span for one prediction request
pub fn prediction_span(request_id: u64) -> tracing::Span {
    tracing::info_span!(
        "prediction_request",
        request_id = request_id,
        component = "pipeline"
    )
}

/// Create a span for classifier calls
pub fn classifier_span(operation: &str) -> tracing::Span {
    tracing::info_span!(
        "classifier_operation",
        operation = operation,
        component = "classifier"
    )
}

/// Record the outcome of one pipeline run
pub fn record_prediction_metrics(outcome: &str, is_blurry: Option<bool>, duration: Duration) {
    let outcome = outcome.to_string();
    let blurry = match is_blurry {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    };
    metrics::counter!("predictions_total", "outcome" => outcome, "blurry" => blurry).increment(1);
    metrics::histogram!("prediction_duration_seconds").record(duration.as_secs_f64());
}

/// Record the blur score of a scored upload
pub fn record_blur_score(blur_score: f64) {
    metrics::histogram!("blur_score").record(blur_score);
}

/// Record classifier call metrics
pub fn record_classifier_metrics(success: bool, duration: Duration) {
    metrics::counter!("classifier_calls_total", "result" => if success { "success" } else { "failure" }).increment(1);
    metrics::histogram!("classifier_duration_seconds").record(duration.as_secs_f64());
}

/// Record request metrics. `method` and `route` must come from a fixed set.
pub fn record_request_metrics(
    method: &'static str,
    route: &'static str,
    status: u16,
    duration: Duration,
) {
    let status = status.to_string();
    metrics::counter!("http_requests_total", "method" => method, "path" => route, "status" => status)
        .increment(1);
    metrics::histogram!("http_request_duration_seconds").record(duration.as_secs_f64());
}

/// Record health check metrics
pub fn record_health_check_metrics(check_type: &str, success: bool, duration: Duration) {
    let check_type = check_type.to_string();
    metrics::counter!("health_checks_total", "type" => check_type.clone(), "result" => if success { "success" } else { "failure" }).increment(1);
    metrics::histogram!("health_check_duration_seconds", "type" => check_type.clone())
        .record(duration.as_secs_f64());

    // Update health status gauge
    metrics::gauge!("health_check_status", "type" => check_type).set(if success {
        1.0
    } else {
        0.0
    });
}

/// Perform readiness checks against the classifier
pub async fn perform_readiness_checks<C: ClassificationAdapter>(classifier: &C) -> Result<()> {
    let check_start = Instant::now();
    let result = classifier.check_ready().await;
    record_health_check_metrics("classifier", result.is_ok(), check_start.elapsed());

    result.map_err(|e| anyhow::anyhow!("Classifier health check failed: {}", e))?;
    tracing::debug!("Classifier health check passed");
    Ok(())
}

/// Start a background task to periodically record health check metrics
pub fn start_health_metrics_recorder<C>(
    pipeline: Arc<PredictionPipeline<C>>,
    interval: Duration,
) -> tokio::task::JoinHandle<()>
where
    C: ClassificationAdapter + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);

        loop {
            interval.tick().await;

            if let Err(e) = perform_readiness_checks(pipeline.classifier()).await {
                tracing::warn!(error = %e, "Periodic health check failed");
            }
        }
    })
}
