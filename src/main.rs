use anyhow::Result;
use blight_scan::config::AppConfig;
use blight_scan::errors::{error_logging, AppError};
use blight_scan::observability;
use blight_scan::pipeline::PredictionPipeline;
use blight_scan::server::{self, AppState};
use blight_scan::serving::TfServingClassifier;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    // Load and validate configuration before anything else starts
    let config = AppConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Configuration loading failed: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;

    // Initialize observability stack (tracing, logging, metrics)
    let metrics_handle = observability::init_observability_with_config(&config.observability)?;
    info!("{}", config.summary());

    // Build the model adapter and pipeline
    let classifier = TfServingClassifier::new(&config.model).map_err(|e| {
        error_logging::log_config_error(&e, "MODEL_SERVING_URL", "create_classifier");
        anyhow::anyhow!("{}", e)
    })?;
    let pipeline = Arc::new(
        PredictionPipeline::new(config.pipeline.clone(), classifier)
            .map_err(|e| anyhow::anyhow!("{}", e))?,
    );

    // Refuse to serve until the model answers
    if let Err(e) = pipeline.ensure_ready().await.map_err(AppError::from) {
        error!(error = %e, "Classification model is not ready, refusing to start");
        return Err(anyhow::anyhow!("{}", e));
    }

    // Start background health metrics recording
    let _health_metrics_handle = if metrics_handle.is_some() {
        Some(observability::start_health_metrics_recorder(
            Arc::clone(&pipeline),
            Duration::from_secs(config.observability.health_metrics_interval_secs),
        ))
    } else {
        None
    };

    let state = Arc::new(AppState::new(pipeline, config.server.clone(), metrics_handle));

    tokio::select! {
        result = server::run(state) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received, stopping server");
        }
    }

    Ok(())
}
