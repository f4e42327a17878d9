use std::sync::Arc;

use lm_core::{Error, InferenceModel, Result};

use crate::Config;

pub mod dummy;
pub mod gemini;

pub use dummy::DummyModel;
pub use gemini::GeminiModel;

pub const AVAILABLE_MODELS: &[&str] = &["gemini", "dummy"];

/// Build the invoker named on the command line.
pub fn create_model(name: &str, config: &Config) -> Result<Arc<dyn InferenceModel>> {
    match name.trim().to_lowercase().as_str() {
        "gemini" => Ok(Arc::new(GeminiModel::new(config.clone())?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Configuration(format!(
            "Unknown model backend '{}'. Available: {}",
            other,
            AVAILABLE_MODELS.join(", ")
        ))),
    }
}
