//! Boundary exchange between neighboring strips.
//!
//! Every step, each worker snapshots the bodies in its transfer zones,
//! swaps the snapshots with the neighbors across those zones, adopts the
//! received bodies that have moved into its strip, drops the sent bodies
//! that have moved out, and resolves contacts that straddle an edge.
//!
//! # Step sequence
//!
//! ```text
//!  select_transfer ──► exchange ──► adopt ──► abandon ──► (local pass) ──► resolve_boundary_collisions
//!        │                 │
//!   per linked side   send_sync / probe / recv in exchange_schedule order
//! ```
//!
//! Ownership moves without global coordination: the losing worker drops
//! the body and the gaining worker adopts it in the same step, each
//! deciding from the same post-advance position.

use crate::body::{overlaps, resolve_collision, Body, BodyId};
use crate::config::WorldConfig;
use crate::error::CoreError;
use crate::partition::{exchange_schedule, sends_first, Side, Strip};
use crate::wire::{self, WireError};
use collider_env::{MessageTag, Rank, Transport};
use std::collections::HashSet;
use std::f64::consts::PI;
use tracing::{debug, warn};

/// Owned, growable storage for one neighbor's ghost bodies.
///
/// Capacity is tracked here rather than left to the caller, so growth
/// after an oversized message is visible to every later step.
#[derive(Debug, Clone)]
pub struct RecvBuffer {
    bodies: Vec<Body>,
    capacity: usize,
    growths: u32,
}

impl RecvBuffer {
    /// Creates a buffer for `capacity` bodies.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bodies: Vec::with_capacity(capacity),
            capacity,
            growths: 0,
        }
    }

    /// Sizes a buffer for a transfer band densely packed with bodies.
    ///
    /// The band is `margin` deep on each side of the edge and spans the
    /// world height; the estimate is its area over one body's area.
    pub fn estimated(radius: f64, height: f64, margin: f64) -> Self {
        let band_area = 2.0 * margin * height;
        let body_area = PI * radius * radius;
        Self::with_capacity((band_area / body_area) as usize)
    }

    /// Bodies the buffer can hold without growing.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of times an incoming message forced the buffer to grow.
    pub fn growths(&self) -> u32 {
        self.growths
    }

    pub fn as_slice(&self) -> &[Body] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Receives the next boundary message from `peer`, replacing the contents.
    ///
    /// The message size is probed first; a size that is not a whole number
    /// of records is rejected before anything is consumed.
    pub async fn receive_from<Net>(&mut self, net: &Net, peer: Rank) -> Result<usize, CoreError>
    where
        Net: Transport + ?Sized,
    {
        let probed = net.probe(peer, MessageTag::BufferZone).await?;
        let count = wire::record_count(probed)?;

        self.bodies.clear();
        if count > self.capacity {
            debug!(
                rank = %net.rank(),
                peer = %peer,
                from = self.capacity,
                to = count,
                "growing receive buffer"
            );
            self.bodies.reserve_exact(count);
            self.capacity = count;
            self.growths += 1;
        }

        let payload = net.recv(peer, MessageTag::BufferZone).await?;
        if payload.len() != probed {
            return Err(WireError::SizeMismatch {
                probed,
                received: payload.len(),
            }
            .into());
        }

        wire::decode_into(&payload, &mut self.bodies)?;
        Ok(count)
    }
}

/// State shared with the neighbor across one strip edge.
#[derive(Debug, Clone)]
pub struct Link {
    side: Side,
    peer: Rank,
    buffer_line: f64,

    /// This step's snapshot of our bodies beyond the buffer line
    transfer: Vec<Body>,

    /// The neighbor's snapshot, received this step
    ghosts: RecvBuffer,

    /// Ghosts taken into the local set this step
    adopted: HashSet<BodyId>,
}

impl Link {
    pub fn side(&self) -> Side {
        self.side
    }

    pub fn peer(&self) -> Rank {
        self.peer
    }

    pub fn buffer_line(&self) -> f64 {
        self.buffer_line
    }

    pub fn transfer(&self) -> &[Body] {
        &self.transfer
    }

    pub fn ghosts(&self) -> &RecvBuffer {
        &self.ghosts
    }

    pub fn was_adopted(&self, id: &BodyId) -> bool {
        self.adopted.contains(id)
    }
}

/// Per-worker boundary protocol state.
#[derive(Debug, Clone)]
pub struct BoundaryExchange {
    strip: Strip,
    margin: f64,

    /// One link per existing neighbor, in exchange order
    links: Vec<Link>,
}

impl BoundaryExchange {
    /// Creates the links for every neighbor of `strip`.
    pub fn new(strip: Strip, config: &WorldConfig) -> Self {
        let margin = config.margin();
        let links = exchange_schedule(strip.rank())
            .into_iter()
            .filter_map(|side| {
                strip.neighbor(side).map(|peer| Link {
                    side,
                    peer,
                    buffer_line: strip.buffer_line(side, margin),
                    transfer: Vec::new(),
                    ghosts: RecvBuffer::estimated(config.radius, config.height, margin),
                    adopted: HashSet::new(),
                })
            })
            .collect();

        Self {
            strip,
            margin,
            links,
        }
    }

    pub fn strip(&self) -> &Strip {
        &self.strip
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Rebuilds every link's transfer set from `local`.
    ///
    /// Returns the total number of bodies selected.
    pub fn select_transfer(&mut self, local: &[Body]) -> usize {
        let strip = self.strip;
        let margin = self.margin;

        self.links
            .iter_mut()
            .map(|link| {
                link.transfer.clear();
                link.transfer.extend(
                    local
                        .iter()
                        .filter(|b| strip.in_transfer_zone(link.side, margin, b.position.x)),
                );
                link.transfer.len()
            })
            .sum()
    }

    /// Swaps transfer sets with every neighbor.
    ///
    /// Toward the right the send is posted first, toward the left the
    /// receive is, and links are served in `exchange_schedule` order; with
    /// synchronous sends any other ordering can leave two neighbors each
    /// blocked in a send the other never receives.
    ///
    /// Returns the total number of ghosts received.
    pub async fn exchange<Net>(&mut self, net: &Net) -> Result<usize, CoreError>
    where
        Net: Transport + ?Sized,
    {
        let mut received = 0;

        for link in &mut self.links {
            let payload = wire::encode_bodies(&link.transfer);

            if sends_first(link.side) {
                net.send_sync(link.peer, MessageTag::BufferZone, payload).await?;
                received += link.ghosts.receive_from(net, link.peer).await?;
            } else {
                received += link.ghosts.receive_from(net, link.peer).await?;
                net.send_sync(link.peer, MessageTag::BufferZone, payload).await?;
            }

            link.adopted.clear();
        }

        Ok(received)
    }

    /// Copies every ghost that is now inside our strip into `local`.
    ///
    /// Returns the number of bodies adopted.
    pub fn adopt(&mut self, local: &mut Vec<Body>) -> usize {
        let strip = self.strip;
        let mut adopted = 0;

        for link in &mut self.links {
            for ghost in link.ghosts.as_slice() {
                if !strip.contains(ghost.position.x) {
                    continue;
                }

                if local.iter().any(|b| b.id == ghost.id) {
                    warn!(
                        rank = %strip.rank(),
                        id = %ghost.id,
                        from = %link.peer,
                        "ghost already owned locally, not adopting twice"
                    );
                    continue;
                }

                debug!(rank = %strip.rank(), from = %link.peer, body = %ghost, "adopted body");
                local.push(*ghost);
                link.adopted.insert(ghost.id);
                adopted += 1;
            }
        }

        adopted
    }

    /// Removes from `local` every transferred body that has left our strip.
    ///
    /// Returns the number of bodies abandoned.
    pub fn abandon(&self, local: &mut Vec<Body>) -> usize {
        let strip = self.strip;
        let leaving: HashSet<BodyId> = self
            .links
            .iter()
            .flat_map(|link| link.transfer.iter())
            .filter(|b| !strip.contains(b.position.x))
            .map(|b| b.id)
            .collect();

        if leaving.is_empty() {
            return 0;
        }

        let before = local.len();
        local.retain(|b| {
            let keep = !leaving.contains(&b.id);
            if !keep {
                debug!(rank = %strip.rank(), body = %b, "abandoned body");
            }
            keep
        });
        before - local.len()
    }

    /// Resolves contacts between our transferred bodies and the neighbors' ghosts.
    ///
    /// Only our side of each contact is updated: the owned body, found in
    /// `local` by id, is resolved against a scratch copy of the ghost. The
    /// neighbor resolves its own body independently from the same
    /// snapshot. Ghosts adopted this step are skipped since the local pass
    /// already covered them, and so are transferred bodies that were just
    /// abandoned.
    ///
    /// Returns the number of contacts resolved.
    pub fn resolve_boundary_collisions(&self, local: &mut [Body], radius: f64) -> usize {
        let mut resolved = 0;

        for link in &self.links {
            for mine in &link.transfer {
                for ghost in link.ghosts.as_slice() {
                    if link.was_adopted(&ghost.id) || !overlaps(mine, ghost, radius) {
                        continue;
                    }

                    let Some(owned) = local.iter_mut().find(|b| b.id == mine.id) else {
                        continue;
                    };

                    debug!(
                        rank = %self.strip.rank(),
                        local = %owned,
                        foreign = %ghost,
                        "buffer collision"
                    );

                    let mut scratch = *ghost;
                    resolve_collision(owned, &mut scratch);
                    resolved += 1;
                }
            }
        }

        resolved
    }
}
