//! Initial body populations.
//!
//! Every worker builds the same full population from the same seed and
//! keeps only the bodies inside its own strip, so no setup messages are
//! needed and the union over all workers is the whole population exactly
//! once.

use crate::scenarios::ScenarioId;
use collider_core::body::{overlaps, Body, IdAllocator};
use collider_core::{Strip, WorldConfig};
use collider_env::Rank;
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::debug;

/// Distance kept between seeded bodies and the world walls
const WALL_INSET: f64 = 5.0;

/// Candidates drawn per requested body before giving up
const ATTEMPTS_PER_BODY: usize = 100;

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("placed only {placed} of {requested} bodies without overlap in {attempts} attempts")]
    Crowded {
        placed: usize,
        requested: usize,
        attempts: usize,
    },

    #[error("invalid velocity spread: {0}")]
    InvalidSpread(String),
}

/// A body before it has an id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub color: Vector3<f64>,
}

/// Recipe for a run's initial population.
#[derive(Debug, Clone)]
pub struct Scene {
    kind: ScenarioId,
    seed: u64,
    body_count: usize,
    world: WorldConfig,

    /// Standard deviation of each thermal velocity component
    temperature: f64,
}

impl Scene {
    pub fn new(kind: ScenarioId, seed: u64, body_count: usize, world: &WorldConfig) -> Self {
        Self {
            kind,
            seed,
            body_count,
            world: world.clone(),
            temperature: 1.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Builds the full population for a run of `workers` workers.
    pub fn population(&self, workers: usize) -> Result<Vec<Placement>, SceneError> {
        match self.kind {
            ScenarioId::HeadOn => Ok(self.head_on()),
            ScenarioId::Drift => Ok(self.drift(workers)),
            ScenarioId::Random => {
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                self.scatter(&mut rng, |rng| {
                    Vector3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), 0.0)
                })
            }
            ScenarioId::Thermal => {
                if !(self.temperature.is_finite() && self.temperature >= 0.0) {
                    return Err(SceneError::InvalidSpread(format!(
                        "temperature must be finite and non-negative, got {}",
                        self.temperature
                    )));
                }
                let normal = Normal::new(0.0, self.temperature)
                    .map_err(|e| SceneError::InvalidSpread(e.to_string()))?;
                let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
                self.scatter(&mut rng, |rng| {
                    Vector3::new(normal.sample(rng), normal.sample(rng), 0.0)
                })
            }
        }
    }

    /// Creates the bodies of the population that start inside `strip`.
    pub fn spawn_in(&self, strip: &Strip, ids: &mut IdAllocator) -> Result<Vec<Body>, SceneError> {
        let bodies: Vec<Body> = self
            .population(strip.workers())?
            .into_iter()
            .filter(|p| strip.contains(p.position.x))
            .map(|p| ids.spawn(p.position, p.velocity, p.color))
            .collect();

        for body in &bodies {
            debug!(rank = %strip.rank(), body = %body, "spawned");
        }

        Ok(bodies)
    }

    fn head_on(&self) -> Vec<Placement> {
        let y = self.world.height / 2.0;
        vec![
            Placement {
                position: Vector3::new(0.3 * self.world.world_width, y, 0.0),
                velocity: Vector3::new(1.0, 0.0, 0.0),
                color: Vector3::new(1.0, 0.0, 0.0),
            },
            Placement {
                position: Vector3::new(0.9 * self.world.world_width, y, 0.0),
                velocity: Vector3::new(-2.0, 0.0, 0.0),
                color: Vector3::new(0.0, 0.0, 1.0),
            },
        ]
    }

    fn drift(&self, workers: usize) -> Vec<Placement> {
        let width = self.world.strip_width(workers);
        (0..workers)
            .map(|r| {
                let x = width * r as f64 + width / 2.0;
                Placement {
                    position: Vector3::new(x, self.world.height / 2.0, 0.0),
                    velocity: Vector3::new((width - x) / 12.0, 0.0, 0.0),
                    color: Vector3::new(1.0, 1.0, 1.0),
                }
            })
            .collect()
    }

    /// Draws uniform positions until `body_count` non-overlapping bodies are placed.
    fn scatter<F>(
        &self,
        rng: &mut ChaCha8Rng,
        mut velocity: F,
    ) -> Result<Vec<Placement>, SceneError>
    where
        F: FnMut(&mut ChaCha8Rng) -> Vector3<f64>,
    {
        let (width, height) = (self.world.world_width, self.world.height);
        let x_inset = WALL_INSET.min(width / 4.0);
        let y_inset = WALL_INSET.min(height / 4.0);
        let attempts = self.body_count * ATTEMPTS_PER_BODY;

        // Overlap tests need ids; placements use a throwaway allocator
        let mut scratch = IdAllocator::new(Rank(0));
        let mut placed: Vec<Body> = Vec::with_capacity(self.body_count);

        for _ in 0..attempts {
            if placed.len() == self.body_count {
                break;
            }

            let position = Vector3::new(
                rng.gen_range(x_inset..width - x_inset),
                rng.gen_range(y_inset..height - y_inset),
                0.0,
            );
            let candidate = scratch.spawn(
                position,
                velocity(rng),
                Vector3::new(rng.gen(), rng.gen(), rng.gen()),
            );

            if !placed
                .iter()
                .any(|b| overlaps(b, &candidate, self.world.radius))
            {
                placed.push(candidate);
            }
        }

        if placed.len() < self.body_count {
            return Err(SceneError::Crowded {
                placed: placed.len(),
                requested: self.body_count,
                attempts,
            });
        }

        Ok(placed
            .into_iter()
            .map(|b| Placement {
                position: b.position,
                velocity: b.velocity,
                color: b.color,
            })
            .collect())
    }
}
