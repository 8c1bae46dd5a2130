//! JSON exporter for offline visualization.
//!
//! Each worker records its own frames; the run merges them into one
//! `SimExport` ordered by step and rank.

use crate::error::SimError;
use collider_core::{Body, Frame, FrameSink, StepReport, WorldConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single worker's frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimFrame {
    pub step: u64,

    /// Simulation time at the start of the step
    pub time_sec: f64,

    pub rank: u32,

    /// Owned interval along x
    pub offset: f64,
    pub end: f64,

    /// Buffer lines facing a neighbor
    pub buffer_lines: Vec<f64>,

    pub bodies: Vec<BodyPosition>,

    pub report: StepReport,
}

/// Position and velocity of one owned body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    /// `origin:serial`
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    pub color: [f64; 3],
}

impl From<&Body> for BodyPosition {
    fn from(body: &Body) -> Self {
        Self {
            id: body.id.to_string(),
            x: body.position.x,
            y: body.position.y,
            vx: body.velocity.x,
            vy: body.velocity.y,
            color: [body.color.x, body.color.y, body.color.z],
        }
    }
}

impl SimFrame {
    pub fn from_frame(frame: &Frame<'_>) -> Self {
        let strip = frame.strip;
        Self {
            step: frame.step,
            time_sec: frame.time,
            rank: strip.rank().0,
            offset: strip.offset(),
            end: strip.end(),
            buffer_lines: strip
                .linked_sides()
                .map(|side| strip.buffer_line(side, frame.margin))
                .collect(),
            bodies: frame.bodies.iter().map(BodyPosition::from).collect(),
            report: frame.report,
        }
    }
}

/// Frame sink that keeps every `every`-th frame.
#[derive(Debug, Clone)]
pub struct FrameRecorder {
    every: u64,
    frames: Vec<SimFrame>,
}

impl FrameRecorder {
    /// Records frames whose step is a multiple of `every` (0 records nothing).
    pub fn new(every: u64) -> Self {
        Self {
            every,
            frames: Vec::new(),
        }
    }

    pub fn frames(&self) -> &[SimFrame] {
        &self.frames
    }

    pub fn into_frames(self) -> Vec<SimFrame> {
        self.frames
    }
}

impl FrameSink for FrameRecorder {
    fn draw(&mut self, frame: &Frame<'_>) {
        if self.every != 0 && frame.step % self.every == 0 {
            self.frames.push(SimFrame::from_frame(frame));
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub workers: usize,

    pub world: WorldConfig,

    /// Time of the last recorded frame
    pub duration_sec: f64,

    /// All frames, by step then rank
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64, workers: usize, world: &WorldConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            workers,
            world: world.clone(),
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Merges one worker's frames.
    pub fn add_frames(&mut self, frames: impl IntoIterator<Item = SimFrame>) {
        self.frames.extend(frames);
        self.frames.sort_by_key(|f| (f.step, f.rank));
        self.duration_sec = self.frames.last().map_or(0.0, |f| f.time_sec);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collider_core::{IdAllocator, Strip, Vec3};
    use collider_env::Rank;

    fn frame_at<'a>(step: u64, strip: &'a Strip, bodies: &'a [Body]) -> Frame<'a> {
        Frame {
            step,
            time: (step - 1) as f64 * 0.1,
            strip,
            margin: 2.0,
            bodies,
            report: StepReport::default(),
        }
    }

    #[test]
    fn test_recorder_keeps_every_kth_frame() {
        let strip = Strip::for_rank(Rank(1), 3, 90.0).unwrap();
        let mut recorder = FrameRecorder::new(5);
        for step in 1..=12 {
            recorder.draw(&frame_at(step, &strip, &[]));
        }

        let steps: Vec<u64> = recorder.frames().iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![5, 10]);
        assert_eq!(recorder.frames()[0].buffer_lines, vec![32.0, 58.0]);

        let mut silent = FrameRecorder::new(0);
        silent.draw(&frame_at(1, &strip, &[]));
        assert!(silent.frames().is_empty());
    }

    #[test]
    fn test_frame_captures_bodies() {
        let strip = Strip::for_rank(Rank(0), 2, 100.0).unwrap();
        let mut ids = IdAllocator::new(Rank(0));
        let body = ids.spawn(
            Vec3::new(10.0, 20.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.5, 0.5, 0.5),
        );

        let frame = SimFrame::from_frame(&frame_at(3, &strip, &[body]));
        assert_eq!(frame.rank, 0);
        assert_eq!((frame.offset, frame.end), (0.0, 50.0));
        assert_eq!(frame.buffer_lines, vec![48.0]);
        assert_eq!(frame.bodies[0].id, "0:0");
        assert_eq!((frame.bodies[0].vx, frame.bodies[0].vy), (1.0, -1.0));
    }

    #[test]
    fn test_export_merges_and_writes() {
        let world = WorldConfig::default();
        let left = Strip::for_rank(Rank(0), 2, 100.0).unwrap();
        let right = Strip::for_rank(Rank(1), 2, 100.0).unwrap();

        let mut export = SimExport::new("drift", 42, 2, &world);
        export.add_frames([2, 1].map(|s| SimFrame::from_frame(&frame_at(s, &right, &[]))));
        export.add_frames([1, 2].map(|s| SimFrame::from_frame(&frame_at(s, &left, &[]))));
        export.finalize(true, None);

        let order: Vec<(u64, u32)> = export.frames.iter().map(|f| (f.step, f.rank)).collect();
        assert_eq!(order, vec![(1, 0), (1, 1), (2, 0), (2, 1)]);
        assert!((export.duration_sec - 0.1).abs() < 1e-12);

        let path =
            std::env::temp_dir().join(format!("collider_export_{}.json", std::process::id()));
        export.write_to_file(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: SimExport = serde_json::from_str(&text).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(parsed.frames, export.frames);
        assert!(parsed.passed);
        assert_eq!(parsed.world, world);
    }
}
