//! Scenario runner - executes a configured run and checks its invariants.

use crate::error::SimError;
use crate::exporter::SimExport;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld, WorldOutcome};
use collider_core::StepReport;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    pub workers: usize,

    /// Whether the run passed all checks
    pub passed: bool,

    /// Steps executed (by every worker)
    pub total_steps: u64,

    /// Final simulation time
    pub final_time: f64,

    /// Bodies created at setup
    pub initial_bodies: usize,

    /// Bodies owned at the end, summed over workers
    pub final_bodies: usize,

    /// Step reports summed over all workers
    pub totals: StepReport,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// Runs scenarios.
pub struct ScenarioRunner {
    config: SimConfig,

    /// Write an export here after the run
    export_path: Option<PathBuf>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            export_path: None,
        }
    }

    /// Records frames and writes them to `path` after the run.
    pub fn with_export(mut self, path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(path.into());
        if self.config.export_every == 0 {
            self.config.export_every = 10;
        }
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Runs the configured scenario and returns the result.
    ///
    /// An `Err` means the run could not complete (bad configuration, scene
    /// setup or a worker failure); a completed run that breaks an
    /// invariant is reported as a failed `ScenarioResult`.
    pub async fn run(&self) -> Result<ScenarioResult, SimError> {
        info!(
            "Starting scenario: {} (seed={}, workers={})",
            self.config.scene, self.config.seed, self.config.workers
        );

        let world = SimWorld::new(self.config.clone());
        let outcome = world.run().await?;
        let result = self.evaluate(&outcome);

        if let Some(path) = &self.export_path {
            let mut export = SimExport::new(
                self.config.scene.name(),
                self.config.seed,
                self.config.workers,
                &self.config.world,
            );
            for worker in &outcome.workers {
                export.add_frames(worker.frames.iter().cloned());
            }
            export.finalize(result.passed, result.failure_reason.clone());
            export.write_to_file(path)?;
            info!("Exported {} frames to {}", export.frames.len(), path.display());
        }

        Ok(result)
    }

    fn evaluate(&self, outcome: &WorldOutcome) -> ScenarioResult {
        let mut failures = Vec::new();

        let steps = outcome.steps();
        let total_steps = steps.first().copied().unwrap_or(0);
        if steps.iter().any(|s| *s != total_steps) {
            failures.push(format!("workers stopped at different steps: {:?}", steps));
        }

        let conservation = outcome.conservation();
        if !conservation.missing.is_empty() {
            failures.push(format!("{} bodies lost", conservation.missing.len()));
        }
        if !conservation.duplicated.is_empty() {
            failures.push(format!("{} bodies owned twice", conservation.duplicated.len()));
        }
        if !conservation.unexpected.is_empty() {
            failures.push(format!("{} unknown bodies", conservation.unexpected.len()));
        }

        let mut totals = StepReport::default();
        for worker in &outcome.workers {
            totals += worker.summary.totals;
        }

        // Every hand-off is one abandon on one side and one adopt on the other
        if totals.adopted != totals.abandoned {
            failures.push(format!(
                "{} adoptions but {} abandons",
                totals.adopted, totals.abandoned
            ));
        }

        let failure_reason = (!failures.is_empty()).then(|| failures.join("; "));
        if let Some(reason) = &failure_reason {
            warn!("Scenario {} failed: {}", self.config.scene, reason);
        }

        ScenarioResult {
            scenario: self.config.scene,
            seed: self.config.seed,
            workers: self.config.workers,
            passed: failure_reason.is_none(),
            total_steps,
            final_time: outcome
                .workers
                .first()
                .map_or(0.0, |w| w.summary.final_time),
            initial_bodies: outcome.initial.len(),
            final_bodies: outcome.final_bodies(),
            totals,
            failure_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collider_core::WorldConfig;

    fn runner(scene: ScenarioId, workers: usize) -> ScenarioRunner {
        ScenarioRunner::new(SimConfig {
            scene,
            workers,
            body_count: 25,
            world: WorldConfig {
                t_max: 30.0,
                ..Default::default()
            },
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_every_scenario_passes() {
        for scenario in ScenarioId::all() {
            let result = runner(scenario, 3).run().await.unwrap();
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            assert_eq!(result.initial_bodies, result.final_bodies);
            assert_eq!(result.total_steps, 301);
        }
    }

    #[tokio::test]
    async fn test_drift_hands_bodies_across_edges() {
        let result = runner(ScenarioId::Drift, 2).run().await.unwrap();
        assert!(result.passed);
        assert!(result.totals.boundary_collisions > 0 || result.totals.adopted > 0);
    }

    #[tokio::test]
    async fn test_export_is_written() {
        let path = std::env::temp_dir().join(format!("collider_run_{}.json", std::process::id()));
        let result = runner(ScenarioId::HeadOn, 2)
            .with_export(&path)
            .run()
            .await
            .unwrap();
        assert!(result.passed);

        let text = std::fs::read_to_string(&path).unwrap();
        let export: SimExport = serde_json::from_str(&text).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(export.scenario, "head_on");
        assert!(export.passed);
        // Steps 10, 20, ..., 300 on both workers
        assert_eq!(export.frames.len(), 60);
    }

    #[tokio::test]
    async fn test_scene_failure_is_an_error() {
        let mut runner = runner(ScenarioId::Random, 2);
        runner.config.body_count = 200;
        runner.config.world.world_width = 20.0;
        runner.config.world.height = 20.0;
        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, SimError::Scene(_)));
    }
}
