//! Error types for the collider messaging substrate.

use crate::types::Rank;
use thiserror::Error;

/// Errors that can occur while moving messages between workers.
///
/// The fault model is crash-stop: none of these are retried, the caller
/// ends its run and the rest of the cluster is torn down.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Send failed (peer endpoint closed, acknowledgement dropped, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Target rank is this worker or outside the run
    #[error("Invalid peer rank {0}")]
    InvalidPeer(Rank),

    /// Every other endpoint has been dropped while waiting for a message
    #[error("Disconnected while waiting for rank {0}")]
    Disconnected(Rank),
}

impl EnvError {
    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }
}
