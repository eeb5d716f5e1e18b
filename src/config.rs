//! # Unified Application Configuration
//!
//! This module provides a centralized configuration system that consolidates
//! all service settings into a single, structured configuration object.
//! It supports loading from environment variables and validation, and is built
//! once at startup then passed to the components that need it.

use crate::errors::{AppError, AppResult};
use crate::observability_config::ObservabilityConfig;
use crate::pipeline_config::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::env;

pub const DEFAULT_MODEL_NAME: &str = "potato_disease";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost", "http://localhost:3000"];

/// Model serving configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base URL of the TensorFlow Serving REST API
    pub serving_url: String,
    /// Name the model is published under
    pub model_name: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            serving_url: String::new(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            timeout_secs: 30,
        }
    }
}

impl ModelConfig {
    /// Validate model configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.serving_url.trim().is_empty() {
            return Err(AppError::Config(
                "Model serving URL cannot be empty".to_string(),
            ));
        }

        if !self.serving_url.starts_with("http://") && !self.serving_url.starts_with("https://") {
            return Err(AppError::Config(
                "Model serving URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        if self.model_name.trim().is_empty() {
            return Err(AppError::Config("Model name cannot be empty".to_string()));
        }

        if self.model_name.contains('/') || self.model_name.contains(':') {
            return Err(AppError::Config(format!(
                "Model name '{}' cannot contain '/' or ':'",
                self.model_name
            )));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::Config("Model timeout cannot be 0".to_string()));
        }

        if self.timeout_secs > 300 {
            return Err(AppError::Config(
                "Model timeout cannot be greater than 300 seconds".to_string(),
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Whether to allow privileged ports (< 1024)
    pub allow_privileged_ports: bool,
    /// Origins allowed to make credentialed cross-origin requests
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allow_privileged_ports: false,
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.host.trim().is_empty() {
            return Err(AppError::Config("Server host cannot be empty".to_string()));
        }

        if self.port == 0 {
            return Err(AppError::Config("Server port cannot be 0".to_string()));
        }

        if !self.allow_privileged_ports && self.port < 1024 {
            return Err(AppError::Config(format!(
                "Port {} is privileged. Set allow_privileged_ports=true or use port >= 1024",
                self.port
            )));
        }

        if let Some(origin) = self.cors_allowed_origins.iter().find(|o| o.as_str() == "*") {
            return Err(AppError::Config(format!(
                "CORS origin '{}' cannot be combined with credentialed requests",
                origin
            )));
        }

        Ok(())
    }

    /// Socket address string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the given `Origin` header value is allow-listed
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.cors_allowed_origins.iter().any(|o| o == origin)
    }
}

/// Unified application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Image pipeline configuration
    pub pipeline: PipelineConfig,
    /// Model serving configuration
    pub model: ModelConfig,
    /// Server configuration
    pub server: ServerConfig,
    /// Observability configuration
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();

        // Load pipeline configuration
        config.pipeline = PipelineConfig::from_env()?;

        // Load model configuration
        config.model.serving_url = env::var("MODEL_SERVING_URL").map_err(|_| {
            AppError::Config("MODEL_SERVING_URL environment variable is required".to_string())
        })?;
        config.model.model_name =
            env::var("MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string());
        config.model.timeout_secs = env::var("MODEL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| {
                AppError::Config("MODEL_TIMEOUT_SECS must be a valid number".to_string())
            })?;

        // Load server configuration
        config.server.host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        config.server.port = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse()
            .map_err(|_| AppError::Config("PORT must be a valid port number".to_string()))?;
        config.server.allow_privileged_ports = env::var("ALLOW_PRIVILEGED_PORTS")
            .unwrap_or_else(|_| "false".to_string())
            .to_lowercase()
            == "true";
        if let Ok(origins) = env::var("CORS_ALLOWED_ORIGINS") {
            config.server.cors_allowed_origins = parse_origins(&origins);
        }

        // Load observability configuration
        config.observability = ObservabilityConfig::from_env();

        Ok(config)
    }

    /// Validate all configuration sections
    pub fn validate(&self) -> AppResult<()> {
        self.pipeline.validate()?;
        self.model.validate()?;
        self.server.validate()?;
        self.observability.validate().map_err(AppError::Config)?;
        Ok(())
    }

    /// Get a summary of the current configuration for logging
    pub fn summary(&self) -> String {
        format!(
            "Configuration: model_url={}, model_name={}, bind={}, image_size={}, blur_threshold={}, classes=[{}], environment={}, metrics_export={}",
            self.model.serving_url,
            self.model.model_name,
            self.server.bind_address(),
            self.pipeline.image_size,
            self.pipeline.blur_threshold,
            self.pipeline.class_names.join(", "),
            self.observability.environment,
            self.observability.enable_metrics_export
        )
    }
}

/// Parse a comma separated origin list, dropping blanks and trailing slashes
pub fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
