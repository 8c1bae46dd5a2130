//! SimWorld - launches one task per worker and collects their results.

use crate::control::{QuitHandle, QuitVote};
use crate::error::SimError;
use crate::exporter::{FrameRecorder, SimFrame};
use crate::scenarios::ScenarioId;
use crate::scene::Scene;
use collider_core::{
    Body, BodyId, IdAllocator, RunSummary, SimulationLoop, StripWorker, WorldConfig,
};
use collider_env::LocalNetwork;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for seeded scenes
    pub seed: u64,

    /// Number of workers (strips)
    pub workers: usize,

    /// Initial population
    pub scene: ScenarioId,

    /// Bodies requested by seeded scenes
    pub body_count: usize,

    /// Standard deviation of thermal velocity components
    pub temperature: f64,

    pub world: WorldConfig,

    /// Record every k-th frame for export (0 = no recording)
    pub export_every: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            workers: 2,
            scene: ScenarioId::default(),
            body_count: 20,
            temperature: 1.0,
            world: WorldConfig::default(),
            export_every: 0,
        }
    }
}

impl SimConfig {
    /// Loads a configuration from a JSON file; missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<(), SimError> {
        self.world.validate(self.workers)?;
        Ok(())
    }
}

/// What one worker ended with.
#[derive(Debug, Clone)]
pub struct WorkerOutcome {
    pub summary: RunSummary,
    pub bodies: Vec<Body>,
    pub frames: Vec<SimFrame>,
}

/// Ids missing or owned more than once at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conservation {
    pub missing: Vec<BodyId>,
    pub duplicated: Vec<BodyId>,
    pub unexpected: Vec<BodyId>,
}

impl Conservation {
    pub fn holds(&self) -> bool {
        self.missing.is_empty() && self.duplicated.is_empty() && self.unexpected.is_empty()
    }
}

/// Results of every worker of a run, by rank.
#[derive(Debug, Clone)]
pub struct WorldOutcome {
    /// Ids created at setup
    pub initial: Vec<BodyId>,
    pub workers: Vec<WorkerOutcome>,
}

impl WorldOutcome {
    /// Compares the final ownership against the setup population.
    pub fn conservation(&self) -> Conservation {
        let mut owners: BTreeMap<BodyId, usize> = self.initial.iter().map(|id| (*id, 0)).collect();
        let mut unexpected = Vec::new();

        for body in self.workers.iter().flat_map(|w| w.bodies.iter()) {
            match owners.get_mut(&body.id) {
                Some(count) => *count += 1,
                None => unexpected.push(body.id),
            }
        }

        Conservation {
            missing: owners.iter().filter(|(_, n)| **n == 0).map(|(id, _)| *id).collect(),
            duplicated: owners.iter().filter(|(_, n)| **n > 1).map(|(id, _)| *id).collect(),
            unexpected,
        }
    }

    /// Steps run by each worker (all equal in a healthy run).
    pub fn steps(&self) -> Vec<u64> {
        self.workers.iter().map(|w| w.summary.steps).collect()
    }

    pub fn final_bodies(&self) -> usize {
        self.workers.iter().map(|w| w.bodies.len()).sum()
    }
}

/// The SimWorld - container for a multi-worker run.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Stop flag shared by every worker's vote
    quit: QuitHandle,
}

impl SimWorld {
    /// Creates a new SimWorld with the given configuration.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            quit: QuitHandle::new(),
        }
    }

    /// Handle that ends the run at the next step boundary.
    pub fn quit_handle(&self) -> QuitHandle {
        self.quit.clone()
    }

    /// Runs every worker to completion.
    ///
    /// The first worker error aborts the others: with a peer gone they
    /// would block forever in the exchange.
    pub async fn run(&self) -> Result<WorldOutcome, SimError> {
        self.config.validate()?;

        let world = &self.config.world;
        // Scene seed derived separately from the master seed
        let scene = Scene::new(
            self.config.scene,
            self.config.seed.wrapping_mul(0x9e3779b97f4a7c15),
            self.config.body_count,
            world,
        )
        .with_temperature(self.config.temperature);

        info!(
            scene = %self.config.scene,
            workers = self.config.workers,
            seed = self.config.seed,
            "starting run"
        );

        let mut initial = Vec::new();
        let mut tasks = JoinSet::new();

        for net in LocalNetwork::new(self.config.workers) {
            let net = Arc::new(net);
            let worker = StripWorker::new(Arc::clone(&net), world.clone())?;

            let mut ids = IdAllocator::new(worker.rank());
            let bodies = scene.spawn_in(worker.strip(), &mut ids)?;
            initial.extend(bodies.iter().map(|b| b.id));

            let mut worker = worker.with_bodies(bodies);
            let mut vote = QuitVote::new(net, self.quit.clone());
            let mut recorder = FrameRecorder::new(self.config.export_every);
            let mut sim = SimulationLoop::new(world);

            tasks.spawn(async move {
                let summary = sim.run(&mut worker, &mut recorder, &mut vote).await?;
                Ok::<_, SimError>(WorkerOutcome {
                    summary,
                    bodies: worker.bodies().to_vec(),
                    frames: recorder.into_frames(),
                })
            });
        }

        let mut workers = Vec::with_capacity(self.config.workers);
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(SimError::Worker(e.to_string())),
            };

            match outcome {
                Ok(outcome) => workers.push(outcome),
                Err(e) => {
                    error!("worker failed, aborting run: {}", e);
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        workers.sort_by_key(|w| w.summary.rank);
        initial.sort();

        Ok(WorldOutcome { initial, workers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneError;
    use collider_core::{ConfigError, Vec3};

    fn config(scene: ScenarioId, workers: usize, t_max: f64) -> SimConfig {
        SimConfig {
            scene,
            workers,
            world: WorldConfig {
                t_max,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_partial_json_config() {
        let json = r#"{ "workers": 4, "scene": "thermal", "world": { "dt": 0.05 } }"#;
        let parsed: SimConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.workers, 4);
        assert_eq!(parsed.scene, ScenarioId::Thermal);
        assert_eq!(parsed.world.dt, 0.05);
        assert_eq!(parsed.world.world_width, 100.0);
        assert_eq!(parsed.seed, 42);
        assert_eq!(parsed.temperature, 1.0);
    }

    #[test]
    fn test_config_from_file() {
        let path =
            std::env::temp_dir().join(format!("collider_config_{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "seed": 7, "body_count": 5 }"#).unwrap();
        let loaded = SimConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.seed, 7);
        assert_eq!(loaded.body_count, 5);
        assert!(matches!(
            SimConfig::from_json_file(&path),
            Err(SimError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_head_on_run_conserves_bodies() {
        let outcome = SimWorld::new(config(ScenarioId::HeadOn, 2, 25.0))
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.initial.len(), 2);
        assert!(outcome.conservation().holds());
        assert_eq!(outcome.steps(), vec![251, 251]);

        // The contact happens across the edge: one boundary collision per side
        for worker in &outcome.workers {
            assert!(worker.summary.totals.boundary_collisions >= 1);
        }
    }

    #[tokio::test]
    async fn test_random_run_four_workers() {
        let mut cfg = config(ScenarioId::Random, 4, 20.0);
        cfg.body_count = 30;
        cfg.export_every = 50;

        let outcome = SimWorld::new(cfg).run().await.unwrap();

        assert_eq!(outcome.initial.len(), 30);
        assert_eq!(outcome.final_bodies(), 30);
        assert!(outcome.conservation().holds());
        assert!(outcome.workers.iter().all(|w| w.frames.len() == 4));
    }

    #[tokio::test]
    async fn test_quit_before_start_stops_after_first_step() {
        let world = SimWorld::new(config(ScenarioId::Drift, 3, 100.0));
        world.quit_handle().request_quit();

        let outcome = world.run().await.unwrap();
        assert_eq!(outcome.steps(), vec![1, 1, 1]);
        assert!(outcome.workers.iter().all(|w| w.summary.stopped_early));
    }

    #[tokio::test]
    async fn test_invalid_world_is_rejected() {
        let err = SimWorld::new(config(ScenarioId::Random, 60, 1.0))
            .run()
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Config(ConfigError::StripTooNarrow { .. })));
    }

    #[tokio::test]
    async fn test_temperature_reaches_the_scene() {
        let mut cfg = config(ScenarioId::Thermal, 2, 1.0);
        cfg.temperature = -0.5;
        let err = SimWorld::new(cfg.clone()).run().await.unwrap_err();
        assert!(matches!(err, SimError::Scene(SceneError::InvalidSpread(_))));

        // Bodies that start at rest never move or meet
        cfg.temperature = 0.0;
        let outcome = SimWorld::new(cfg).run().await.unwrap();
        assert!(outcome.conservation().holds());
        assert!(outcome
            .workers
            .iter()
            .all(|w| w.summary.totals.adopted == 0 && w.summary.totals.local_collisions == 0));
    }

    #[test]
    fn test_conservation_reports_problems() {
        let mut ids = IdAllocator::new(collider_env::Rank(0));
        let mut spawn = || ids.spawn(Vec3::zeros(), Vec3::zeros(), Vec3::zeros());
        let (a, b, stray) = (spawn(), spawn(), spawn());

        let outcome = |bodies: Vec<Body>| WorkerOutcome {
            summary: RunSummary {
                rank: collider_env::Rank(0),
                steps: 0,
                final_time: 0.0,
                totals: Default::default(),
                bodies: bodies.len(),
                stopped_early: false,
            },
            bodies,
            frames: Vec::new(),
        };

        let world = WorldOutcome {
            initial: vec![a.id, b.id],
            workers: vec![outcome(vec![a, stray]), outcome(vec![a])],
        };
        let report = world.conservation();
        assert_eq!(report.missing, vec![b.id]);
        assert_eq!(report.duplicated, vec![a.id]);
        assert_eq!(report.unexpected, vec![stray.id]);
        assert!(!report.holds());
    }
}
