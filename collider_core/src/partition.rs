//! Strip geometry of the 1-D worker chain.
//!
//! Worker `r` of `n` owns `[offset, end)` along x. Interior edges are
//! computed from the same expression on both sides so neighboring strips
//! meet exactly, and the last strip ends at the world width, so the strips
//! tile `[0, world_width)` with no gap or overlap.

use crate::config::ConfigError;
use collider_env::Rank;
use serde::{Deserialize, Serialize};

/// Which edge of a strip faces a neighbor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Order in which a worker exchanges with its two neighbors each step.
///
/// Toward the right a worker sends first, toward the left it receives
/// first, so the lower rank of every neighbor pair is the sender. Even
/// ranks serve their right pair first and odd ranks their left pair, which
/// pairs (0,1), (2,3), ... in the first phase and (1,2), (3,4), ... in the
/// second. Every wait therefore points at a strictly lower phase or rank
/// and no cycle can form, whatever the worker count.
pub fn exchange_schedule(rank: Rank) -> [Side; 2] {
    if rank.is_even() {
        [Side::Right, Side::Left]
    } else {
        [Side::Left, Side::Right]
    }
}

/// Returns true if the worker posts its send before its receive toward `side`.
pub fn sends_first(side: Side) -> bool {
    side == Side::Right
}

/// One worker's slice of the world.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Strip {
    rank: Rank,
    workers: usize,
    offset: f64,
    end: f64,
}

impl Strip {
    /// Computes the strip of `rank` in a run of `workers` workers.
    pub fn for_rank(rank: Rank, workers: usize, world_width: f64) -> Result<Self, ConfigError> {
        if workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if rank.index() >= workers {
            return Err(ConfigError::RankOutOfRange {
                rank: rank.0,
                workers,
            });
        }

        let nominal = world_width / workers as f64;
        let offset = nominal * rank.index() as f64;
        let end = if rank.index() + 1 == workers {
            world_width
        } else {
            nominal * (rank.index() + 1) as f64
        };

        Ok(Self {
            rank,
            workers,
            offset,
            end,
        })
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Lowest x owned (inclusive).
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Highest x owned (exclusive).
    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn width(&self) -> f64 {
        self.end - self.offset
    }

    /// Returns true if `x` falls in `[offset, end)`.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.offset && x < self.end
    }

    /// Rank of the neighbor across `side`, if there is one.
    pub fn neighbor(&self, side: Side) -> Option<Rank> {
        match side {
            Side::Left => self.rank.left(),
            Side::Right => self.rank.right(self.workers),
        }
    }

    /// Sides that face a neighbor, in exchange order.
    pub fn linked_sides(&self) -> impl Iterator<Item = Side> + '_ {
        exchange_schedule(self.rank)
            .into_iter()
            .filter(move |side| self.neighbor(*side).is_some())
    }

    /// x position of the buffer line `margin` inside the edge on `side`.
    pub fn buffer_line(&self, side: Side, margin: f64) -> f64 {
        match side {
            Side::Left => self.offset + margin,
            Side::Right => self.end - margin,
        }
    }

    /// Returns true if `x` lies beyond the buffer line on `side`.
    ///
    /// Bodies past the strip edge itself also count, so a body that has
    /// just left the strip is still shared with the neighbor it moved to.
    pub fn in_transfer_zone(&self, side: Side, margin: f64, x: f64) -> bool {
        let line = self.buffer_line(side, margin);
        match side {
            Side::Left => x < line,
            Side::Right => x > line,
        }
    }
}
