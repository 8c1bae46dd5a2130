//! Error type for the simulation harness.

use crate::scene::SceneError;
use collider_core::{ConfigError, CoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Worker failed: {0}")]
    Core(#[from] CoreError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Scene setup failed: {0}")]
    Scene(#[from] SceneError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A worker task panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Worker(String),
}
