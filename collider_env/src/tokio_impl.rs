//! In-process implementation of `Transport` using Tokio channels.

use crate::error::EnvError;
use crate::network::Transport;
use crate::types::{Envelope, MessageTag, Rank};
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot, Mutex};

/// Factory for a fully connected set of in-process endpoints.
///
/// Every worker of a run lives in the same process as a tokio task; each
/// gets one `LocalTransport` holding a sender to every other worker and
/// its own inbox.
pub struct LocalNetwork;

impl LocalNetwork {
    /// Creates `size` connected endpoints, indexed by rank.
    pub fn new(size: usize) -> Vec<LocalTransport> {
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..size).map(|_| mpsc::unbounded_channel::<Envelope>()).unzip();

        receivers
            .into_iter()
            .enumerate()
            .map(|(index, rx)| {
                // No sender to ourselves: the inbox closes once every peer is gone.
                let peers = senders
                    .iter()
                    .enumerate()
                    .map(|(peer, tx)| (peer != index).then(|| tx.clone()))
                    .collect();

                LocalTransport {
                    rank: Rank::from(index),
                    peers,
                    inbox: Mutex::new(Inbox {
                        rx,
                        pending: VecDeque::new(),
                    }),
                }
            })
            .collect()
    }
}

/// Incoming side of an endpoint.
struct Inbox {
    rx: mpsc::UnboundedReceiver<Envelope>,

    /// Arrived messages nobody has asked for yet, in arrival order
    pending: VecDeque<Envelope>,
}

impl Inbox {
    /// Returns the index in `pending` of the oldest message from `source` with `tag`.
    async fn wait_for(&mut self, source: Rank, tag: MessageTag) -> Result<usize, EnvError> {
        loop {
            if let Some(index) = self.pending.iter().position(|e| e.matches(source, tag)) {
                return Ok(index);
            }

            match self.rx.recv().await {
                Some(envelope) => self.pending.push_back(envelope),
                None => return Err(EnvError::Disconnected(source)),
            }
        }
    }
}

/// One worker's endpoint on a `LocalNetwork`.
pub struct LocalTransport {
    /// This worker's rank
    rank: Rank,

    /// Senders indexed by rank (`None` at our own index)
    peers: Vec<Option<mpsc::UnboundedSender<Envelope>>>,

    /// Receiver and stash (behind tokio mutex for async)
    inbox: Mutex<Inbox>,
}

impl LocalTransport {
    fn peer(&self, target: Rank) -> Result<&mpsc::UnboundedSender<Envelope>, EnvError> {
        self.peers
            .get(target.index())
            .and_then(Option::as_ref)
            .ok_or(EnvError::InvalidPeer(target))
    }
}

#[async_trait]
impl Transport for LocalTransport {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    async fn send(&self, target: Rank, tag: MessageTag, payload: Vec<u8>) -> Result<(), EnvError> {
        self.peer(target)?
            .send(Envelope::new(self.rank, tag, payload))
            .map_err(|_| EnvError::network(format!("rank {} endpoint closed", target)))
    }

    async fn send_sync(
        &self,
        target: Rank,
        tag: MessageTag,
        payload: Vec<u8>,
    ) -> Result<(), EnvError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload,
            ack: Some(ack_tx),
        };

        self.peer(target)?
            .send(envelope)
            .map_err(|_| EnvError::network(format!("rank {} endpoint closed", target)))?;

        ack_rx.await.map_err(|_| {
            EnvError::network(format!("rank {} dropped a synchronous message unread", target))
        })
    }

    async fn probe(&self, source: Rank, tag: MessageTag) -> Result<usize, EnvError> {
        let mut inbox = self.inbox.lock().await;
        let index = inbox.wait_for(source, tag).await?;
        Ok(inbox.pending[index].size())
    }

    async fn recv(&self, source: Rank, tag: MessageTag) -> Result<Vec<u8>, EnvError> {
        let mut inbox = self.inbox.lock().await;
        let index = inbox.wait_for(source, tag).await?;
        inbox
            .pending
            .remove(index)
            .map(Envelope::into_payload)
            .ok_or(EnvError::Disconnected(source))
    }
}
