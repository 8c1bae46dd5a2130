//! Common types for the collider messaging substrate.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

/// Position of a worker in the strip chain.
///
/// Ranks are dense: a run with `n` workers uses ranks `0..n`, and rank
/// order is the left-to-right order of the strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub u32);

impl Rank {
    /// Returns the rank as an index into per-worker tables.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Returns true for ranks 0, 2, 4, ...
    pub fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }

    /// Rank immediately to the left, if any.
    pub fn left(&self) -> Option<Rank> {
        self.0.checked_sub(1).map(Rank)
    }

    /// Rank immediately to the right, if it exists in a run of `size` workers.
    pub fn right(&self, size: usize) -> Option<Rank> {
        let next = self.0 + 1;
        ((next as usize) < size).then_some(Rank(next))
    }
}

impl From<usize> for Rank {
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

impl std::fmt::Display for Rank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message-kind tag; receives and probes filter on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageTag {
    /// Serialized transfer-zone bodies.
    BufferZone = 1,

    /// Keep-going flag exchanged at the end of every step.
    Terminate = 2,
}

/// A message in flight between two workers.
///
/// The payload is opaque bytes; the receiving engine decodes it.
/// Synchronous sends carry an acknowledgement channel that the receiver
/// fires once the envelope has been consumed.
#[derive(Debug)]
pub struct Envelope {
    /// Sending worker
    pub source: Rank,

    /// Message kind
    pub tag: MessageTag,

    /// The raw payload bytes
    pub payload: Vec<u8>,

    /// Fired on consumption for synchronous sends
    pub(crate) ack: Option<oneshot::Sender<()>>,
}

impl Envelope {
    /// Creates a buffered (unacknowledged) envelope.
    pub fn new(source: Rank, tag: MessageTag, payload: Vec<u8>) -> Self {
        Self {
            source,
            tag,
            payload,
            ack: None,
        }
    }

    /// Returns the payload size in bytes.
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if this envelope came from `source` with `tag`.
    pub fn matches(&self, source: Rank, tag: MessageTag) -> bool {
        self.source == source && self.tag == tag
    }

    /// Consumes the envelope, releasing a synchronous sender if one waits.
    pub fn into_payload(mut self) -> Vec<u8> {
        if let Some(ack) = self.ack.take() {
            // The sender may have given up already; nothing to release then.
            let _ = ack.send(());
        }
        self.payload
    }
}
