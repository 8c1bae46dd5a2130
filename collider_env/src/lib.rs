//! Collider Messaging Substrate
//!
//! This crate provides the point-to-point messaging layer that strip
//! workers use to exchange boundary bodies and stop votes.
//!
//! # Core Concept: Rendezvous vs Buffered Sends
//!
//! - `send_sync` completes only once the peer has received the message,
//!   which gives each neighbor pair an implicit per-step barrier
//! - `send` only queues, and is used where blocking would form a cycle
//! - `probe` reports the size of the next matching message before it is
//!   received, so receivers can size their buffers
//!
//! # Example
//!
//! ```ignore
//! use collider_env::{LocalNetwork, MessageTag, Rank, Transport};
//!
//! let mut nets = LocalNetwork::new(2);
//! let right = nets.pop().unwrap();
//! let left = nets.pop().unwrap();
//!
//! tokio::join!(
//!     left.send_sync(Rank(1), MessageTag::BufferZone, bytes),
//!     right.recv(Rank(0), MessageTag::BufferZone),
//! );
//! ```

mod network;
mod types;
mod error;
mod tokio_impl;

pub use network::Transport;
pub use types::{Envelope, MessageTag, Rank};
pub use error::EnvError;
pub use tokio_impl::{LocalNetwork, LocalTransport};
