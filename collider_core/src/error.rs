//! Error type for the collider core.

use crate::config::ConfigError;
use crate::wire::WireError;
use collider_env::EnvError;
use thiserror::Error;

/// Anything that ends a worker's run.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Transport error: {0}")]
    Transport(#[from] EnvError),

    #[error("Wire error: {0}")]
    Wire(#[from] WireError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
