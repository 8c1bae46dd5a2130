//! One worker's strip of the world and its step sequence.

use crate::body::{overlaps, reflect_off_walls, resolve_collision, Body};
use crate::config::WorldConfig;
use crate::error::CoreError;
use crate::exchange::BoundaryExchange;
use crate::partition::Strip;
use collider_env::{Rank, Transport};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::sync::Arc;

/// What happened during one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    /// Bodies sent to neighbors (summed over both sides)
    pub transferred: usize,

    /// Ghosts received from neighbors
    pub received: usize,

    /// Ghosts that became local
    pub adopted: usize,

    /// Local bodies handed to a neighbor
    pub abandoned: usize,

    /// Contacts between two local bodies
    pub local_collisions: usize,

    /// Contacts between a local body and a ghost
    pub boundary_collisions: usize,
}

impl AddAssign for StepReport {
    fn add_assign(&mut self, other: Self) {
        self.transferred += other.transferred;
        self.received += other.received;
        self.adopted += other.adopted;
        self.abandoned += other.abandoned;
        self.local_collisions += other.local_collisions;
        self.boundary_collisions += other.boundary_collisions;
    }
}

/// Owner of the bodies in one strip.
///
/// Each call to [`step`](StripWorker::step) runs, in order: advance,
/// select transfer, exchange, adopt, abandon, local collisions, boundary
/// collisions, wall reflection. Every worker of a run must call `step` the
/// same number of times, since the exchange pairs up with the neighbors'
/// exchanges of the same step.
pub struct StripWorker<Net: Transport> {
    net: Arc<Net>,
    config: WorldConfig,
    strip: Strip,
    bodies: Vec<Body>,
    exchange: BoundaryExchange,
    steps: u64,
}

impl<Net: Transport> StripWorker<Net> {
    /// Creates an empty worker for the strip of `net.rank()`.
    pub fn new(net: Arc<Net>, config: WorldConfig) -> Result<Self, CoreError> {
        config.validate(net.size())?;
        let strip = Strip::for_rank(net.rank(), net.size(), config.world_width)?;
        let exchange = BoundaryExchange::new(strip, &config);

        Ok(Self {
            net,
            config,
            strip,
            bodies: Vec::new(),
            exchange,
            steps: 0,
        })
    }

    /// Replaces the local body set.
    pub fn with_bodies(mut self, bodies: Vec<Body>) -> Self {
        self.bodies = bodies;
        self
    }

    pub fn rank(&self) -> Rank {
        self.strip.rank()
    }

    pub fn strip(&self) -> &Strip {
        &self.strip
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn exchange(&self) -> &BoundaryExchange {
        &self.exchange
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Runs one full step.
    pub async fn step(&mut self) -> Result<StepReport, CoreError> {
        let mut report = StepReport::default();

        self.advance();

        report.transferred = self.exchange.select_transfer(&self.bodies);
        report.received = self.exchange.exchange(self.net.as_ref()).await?;
        report.adopted = self.exchange.adopt(&mut self.bodies);
        report.abandoned = self.exchange.abandon(&mut self.bodies);

        report.local_collisions = self.collide_local();
        report.boundary_collisions = self
            .exchange
            .resolve_boundary_collisions(&mut self.bodies, self.config.radius);

        self.reflect();

        self.steps += 1;
        Ok(report)
    }

    /// Explicit Euler.
    fn advance(&mut self) {
        let dt = self.config.dt;
        for body in &mut self.bodies {
            body.position += body.velocity * dt;
        }
    }

    /// Resolves every touching pair of local bodies.
    fn collide_local(&mut self) -> usize {
        let radius = self.config.radius;
        let mut resolved = 0;

        for i in 0..self.bodies.len() {
            let (head, tail) = self.bodies.split_at_mut(i + 1);
            let a = &mut head[i];
            for b in tail {
                if overlaps(a, b, radius) {
                    resolve_collision(a, b);
                    resolved += 1;
                }
            }
        }

        resolved
    }

    fn reflect(&mut self) {
        let (width, height) = (self.config.world_width, self.config.height);
        for body in &mut self.bodies {
            reflect_off_walls(body, width, height);
        }
    }
}
