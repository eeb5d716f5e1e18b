//! # Observability Configuration
//!
//! Environment-specific configuration for logging and metrics
//! in production deployments.

use std::env;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse a `LOG_FORMAT` value
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "pretty" | "text" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Observability configuration for different environments
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Environment name (development, staging, production)
    pub environment: String,
    /// Log level for the service's own targets
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Whether to install the Prometheus recorder and serve `/metrics`
    pub enable_metrics_export: bool,
    /// Interval of the background health metrics recorder in seconds
    pub health_metrics_interval_secs: u64,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            enable_metrics_export: true,
            health_metrics_interval_secs: 60,
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl ObservabilityConfig {
    /// Load configuration from environment variables.
    ///
    /// `ENVIRONMENT` selects the preset; the other variables override it.
    pub fn from_env() -> Self {
        let environment =
            env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let mut config = presets::for_environment(&environment);

        if let Ok(level) = env::var("LOG_LEVEL") {
            config.log_level = level.to_lowercase();
        }
        if let Some(format) = env::var("LOG_FORMAT").ok().and_then(|v| LogFormat::parse(&v)) {
            config.log_format = format;
        }
        if let Ok(value) = env::var("ENABLE_METRICS_EXPORT") {
            config.enable_metrics_export = value.parse().unwrap_or(true);
        }
        if let Ok(value) = env::var("HEALTH_METRICS_INTERVAL_SECS") {
            config.health_metrics_interval_secs = value.parse().unwrap_or(60);
        }

        config
    }

    /// `EnvFilter` directive for the service's targets
    pub fn filter_directive(&self) -> String {
        format!("blight_scan={}", self.log_level)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !VALID_LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(format!("Invalid log level: {}", self.log_level));
        }

        if self.environment.trim().is_empty() {
            return Err("Environment name cannot be empty".to_string());
        }

        if self.health_metrics_interval_secs == 0 {
            return Err(format!(
                "Invalid health metrics interval: {}",
                self.health_metrics_interval_secs
            ));
        }

        Ok(())
    }
}

/// Environment-specific configuration presets
pub mod presets {
    use super::{LogFormat, ObservabilityConfig};

    /// Development configuration with verbose pretty logs
    pub fn development() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "development".to_string(),
            log_level: "debug".to_string(),
            log_format: LogFormat::Pretty,
            enable_metrics_export: true,
            ..Default::default()
        }
    }

    /// Production configuration with JSON logs
    pub fn production() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "production".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            enable_metrics_export: true,
            ..Default::default()
        }
    }

    /// Preset for an environment name: `development` and `minimal` map to
    /// their presets, any other name (staging, production) to `production`.
    pub fn for_environment(environment: &str) -> ObservabilityConfig {
        let mut config = match environment {
            "development" => development(),
            "minimal" => minimal(),
            _ => production(),
        };
        config.environment = environment.to_string();
        config
    }

    /// Minimal configuration for resource-constrained environments
    pub fn minimal() -> ObservabilityConfig {
        ObservabilityConfig {
            environment: "minimal".to_string(),
            log_level: "error".to_string(),
            log_format: LogFormat::Json,
            enable_metrics_export: false, // Disable metrics export
            ..Default::default()
        }
    }
}
