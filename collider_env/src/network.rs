//! Transport abstraction between collider workers.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{MessageTag, Rank};

/// Point-to-point messaging between the workers of one run.
///
/// # Implementations
///
/// - **In-process**: `LocalTransport`, tokio channels between tasks
///
/// # Delivery
///
/// Delivery between two directly-communicating workers is reliable,
/// ordered per `(source, tag)` and exactly-once. Messages that do not
/// match a pending `probe`/`recv` are held until asked for, never dropped.
///
/// ```text
/// Worker A                   Transport                  Worker B
///   |                           |                          |
///   |-- send_sync(B, bytes) --->|                          |
///   |        (blocked)          |<-------- probe(A) -------|
///   |                           |<-------- recv(A) --------|
///   |<---------- ack -----------|------- bytes ----------->|
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Returns this worker's rank.
    fn rank(&self) -> Rank;

    /// Returns the number of workers in the run.
    fn size(&self) -> usize;

    /// Buffered send: returns once the message is queued for `target`.
    ///
    /// # Returns
    /// * `Ok(())` - Message queued
    /// * `Err(EnvError::InvalidPeer)` - `target` is this worker or out of range
    /// * `Err(EnvError::NetworkError)` - The peer endpoint is gone
    async fn send(&self, target: Rank, tag: MessageTag, payload: Vec<u8>) -> Result<(), EnvError>;

    /// Synchronous send: returns only after `target` has received the message.
    ///
    /// Two workers that both `send_sync` to each other before receiving
    /// block forever; callers must order their sends and receives.
    async fn send_sync(
        &self,
        target: Rank,
        tag: MessageTag,
        payload: Vec<u8>,
    ) -> Result<(), EnvError>;

    /// Waits for the next message from `source` with `tag` and returns its
    /// size in bytes without consuming it.
    async fn probe(&self, source: Rank, tag: MessageTag) -> Result<usize, EnvError>;

    /// Receives the next message from `source` with `tag`.
    async fn recv(&self, source: Rank, tag: MessageTag) -> Result<Vec<u8>, EnvError>;
}
