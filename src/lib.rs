//! # blight-scan
//!
//! A potato leaf disease classification service that measures the sharpness
//! of each upload, enhances blurry images before prediction, and reports the
//! predicted class together with the quality decision.

pub mod classifier;
pub mod config;
pub mod errors;
pub mod observability;
pub mod observability_config;
pub mod pipeline;
pub mod pipeline_config;
pub mod prediction_errors;
pub mod preprocessing;
pub mod report;
pub mod server;
pub mod serving;
pub mod upload;

// Re-export types for easier access
pub use classifier::{ClassificationAdapter, ClassificationResult};
pub use pipeline::PredictionPipeline;
pub use pipeline_config::PipelineConfig;
pub use prediction_errors::PredictionError;
pub use report::{PredictionOutcome, PredictionReport};
