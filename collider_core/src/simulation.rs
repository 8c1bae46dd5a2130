//! Fixed-step driver for one worker.
//!
//! The loop owns the clock; rendering and the decision to stop are
//! injected through [`FrameSink`] and [`StopPolicy`].

use crate::body::Body;
use crate::config::WorldConfig;
use crate::error::CoreError;
use crate::partition::Strip;
use crate::worker::{StepReport, StripWorker};
use async_trait::async_trait;
use collider_env::{Rank, Transport};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Simulated time, derived from the step count.
///
/// `t` is recomputed as `steps * dt` on every tick instead of being
/// accumulated, so it does not drift over long runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    dt: f64,
    t_max: f64,
    steps: u64,
    t: f64,
}

impl Clock {
    pub fn new(dt: f64, t_max: f64) -> Self {
        Self {
            dt,
            t_max,
            steps: 0,
            t: 0.0,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.dt, config.t_max)
    }

    /// Returns true while simulated time is below `t_max`.
    pub fn running(&self) -> bool {
        self.t < self.t_max
    }

    /// Starts the next step; `time()` reports the start of that step.
    pub fn tick(&mut self) {
        self.t = self.steps as f64 * self.dt;
        self.steps += 1;
    }

    pub fn time(&self) -> f64 {
        self.t
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}

/// A worker's state after one step.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub step: u64,
    pub time: f64,
    pub strip: &'a Strip,
    pub margin: f64,
    pub bodies: &'a [Body],
    pub report: StepReport,
}

/// Receives every frame (rendering, recording).
pub trait FrameSink: Send {
    fn draw(&mut self, frame: &Frame<'_>);
}

/// Decides after each step whether the run continues.
///
/// Policies that coordinate across workers must return the same answer on
/// every worker for the same step, or the workers' exchanges fall out of
/// step.
#[async_trait]
pub trait StopPolicy: Send {
    async fn keep_going(&mut self, step: u64) -> Result<bool, CoreError>;
}

/// Discards every frame.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn draw(&mut self, _frame: &Frame<'_>) {}
}

/// Never asks to stop; the run ends at `t_max`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunToCompletion;

#[async_trait]
impl StopPolicy for RunToCompletion {
    async fn keep_going(&mut self, _step: u64) -> Result<bool, CoreError> {
        Ok(true)
    }
}

/// Outcome of a worker's run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub rank: Rank,
    pub steps: u64,
    pub final_time: f64,

    /// Step reports summed over the run
    pub totals: StepReport,

    /// Bodies owned at the end
    pub bodies: usize,

    /// True if the stop policy ended the run before `t_max`
    pub stopped_early: bool,
}

/// Drives a worker until `t_max` or until the stop policy says no.
#[derive(Debug, Clone)]
pub struct SimulationLoop {
    clock: Clock,
}

impl SimulationLoop {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            clock: Clock::from_config(config),
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub async fn run<Net, S, P>(
        &mut self,
        worker: &mut StripWorker<Net>,
        sink: &mut S,
        stop: &mut P,
    ) -> Result<RunSummary, CoreError>
    where
        Net: Transport,
        S: FrameSink + ?Sized,
        P: StopPolicy + ?Sized,
    {
        let strip = *worker.strip();
        info!(
            rank = %strip.rank(),
            offset = strip.offset(),
            end = strip.end(),
            bodies = worker.bodies().len(),
            "worker starting"
        );

        let mut totals = StepReport::default();
        let mut keep_going = true;

        while keep_going && self.clock.running() {
            self.clock.tick();

            let report = worker.step().await?;
            totals += report;

            sink.draw(&Frame {
                step: self.clock.steps(),
                time: self.clock.time(),
                strip: &strip,
                margin: worker.exchange().margin(),
                bodies: worker.bodies(),
                report,
            });

            keep_going = stop.keep_going(self.clock.steps()).await?;
        }

        let summary = RunSummary {
            rank: strip.rank(),
            steps: self.clock.steps(),
            final_time: self.clock.time(),
            totals,
            bodies: worker.bodies().len(),
            stopped_early: !keep_going,
        };

        info!(
            rank = %summary.rank,
            steps = summary.steps,
            time = summary.final_time,
            bodies = summary.bodies,
            adopted = totals.adopted,
            abandoned = totals.abandoned,
            "worker finished"
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::IdAllocator;
    use crate::vector::Vec3;
    use approx::assert_relative_eq;
    use collider_env::{LocalNetwork, LocalTransport};
    use std::sync::Arc;

    fn single_worker(config: &WorldConfig) -> StripWorker<LocalTransport> {
        let net = LocalNetwork::new(1).remove(0);
        StripWorker::new(Arc::new(net), config.clone()).unwrap()
    }

    #[derive(Default)]
    struct Recorder {
        steps: Vec<u64>,
        times: Vec<f64>,
    }

    impl FrameSink for Recorder {
        fn draw(&mut self, frame: &Frame<'_>) {
            self.steps.push(frame.step);
            self.times.push(frame.time);
        }
    }

    struct StopAt(u64);

    #[async_trait]
    impl StopPolicy for StopAt {
        async fn keep_going(&mut self, step: u64) -> Result<bool, CoreError> {
            Ok(step < self.0)
        }
    }

    #[test]
    fn test_clock_recomputes_time() {
        let mut clock = Clock::new(0.1, 0.25);
        assert!(clock.running());

        // The first step starts at t = 0
        clock.tick();
        assert_eq!(clock.time(), 0.0);
        assert_eq!(clock.steps(), 1);

        let mut ticks = 1;
        while clock.running() {
            clock.tick();
            ticks += 1;
        }
        assert_eq!(ticks, 4);
        assert_relative_eq!(clock.time(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_duration_never_runs() {
        assert!(!Clock::new(0.1, 0.0).running());
    }

    #[tokio::test]
    async fn test_run_to_t_max() {
        let config = WorldConfig {
            t_max: 1.0,
            ..Default::default()
        };
        let mut ids = IdAllocator::new(Rank(0));
        let body = ids.spawn(Vec3::new(10.0, 10.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::zeros());
        let mut worker = single_worker(&config).with_bodies(vec![body]);

        let mut sink = Recorder::default();
        let summary = SimulationLoop::new(&config)
            .run(&mut worker, &mut sink, &mut RunToCompletion)
            .await
            .unwrap();

        // Steps start at t = 0.0, 0.1, ..., 1.0
        assert_eq!(summary.steps, 11);
        assert!(!summary.stopped_early);
        assert_eq!(summary.bodies, 1);
        assert_eq!(sink.steps, (1..=11).collect::<Vec<_>>());
        assert_eq!(worker.steps(), 11);
        assert_relative_eq!(worker.bodies()[0].position.x, 11.1, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_stop_policy_ends_run_early() {
        let config = WorldConfig::default();
        let mut worker = single_worker(&config);

        let summary = SimulationLoop::new(&config)
            .run(&mut worker, &mut NullSink, &mut StopAt(5))
            .await
            .unwrap();

        assert_eq!(summary.steps, 5);
        assert!(summary.stopped_early);
        assert_eq!(summary.totals, StepReport::default());
    }
}
