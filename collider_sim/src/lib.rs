//! Collider simulation harness
//!
//! Runs a strip-partitioned collider with one tokio task per worker, all in
//! one process, connected by an in-process `LocalNetwork`.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          SimWorld                            │
//! │                                                              │
//! │   Scene ──spawn_in──►  ┌──────────┐       ┌──────────┐       │
//! │   (same seed           │ Worker 0 │◄─────►│ Worker 1 │ ...   │
//! │    on every rank)      │ [0, w)   │ ghost │ [w, 2w)  │       │
//! │                        └────┬─────┘ swap  └────┬─────┘       │
//! │                             │                  │             │
//! │                        QuitVote ◄── Terminate ──► QuitVote   │
//! │                             │                  │             │
//! │                        FrameRecorder       FrameRecorder     │
//! │                             └───────┬──────────┘             │
//! │                                  SimExport                   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use collider_sim::{ScenarioRunner, SimConfig};
//!
//! let config = SimConfig {
//!     workers: 4,
//!     ..Default::default()
//! };
//!
//! let result = ScenarioRunner::new(config).run().await?;
//! assert!(result.passed);
//! ```

mod control;
mod error;
mod exporter;
mod runner;
mod scene;
mod world;
pub mod scenarios;

pub use control::{QuitHandle, QuitVote};
pub use error::SimError;
pub use exporter::{BodyPosition, FrameRecorder, SimExport, SimFrame};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scene::{Placement, Scene, SceneError};
pub use world::{Conservation, SimConfig, SimWorld, WorkerOutcome, WorldOutcome};
