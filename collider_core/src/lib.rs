//! Collider Core - strip-partitioned circle collider
//!
//! The world is cut into vertical strips, one per worker. Each worker
//! advances only the bodies it owns and, every step, swaps the bodies near
//! its edges with its neighbors:
//! 1. **Ghost exchange**: bodies within one transfer margin of a shared edge
//!    are sent across so contacts that straddle the edge are seen on both sides
//! 2. **Ownership transfer**: a body that crosses an edge is dropped by one
//!    worker and adopted by the other in the same step
//! 3. **Deadlock-free ordering**: synchronous sends follow a parity schedule
//!    so no chain of workers can wait on itself

pub mod body;
pub mod config;
pub mod error;
pub mod exchange;
pub mod partition;
pub mod simulation;
pub mod vector;
pub mod wire;
pub mod worker;

// Re-export key types for convenience
pub use body::{Body, BodyId, IdAllocator};
pub use config::{ConfigError, WorldConfig};
pub use error::CoreError;
pub use exchange::{BoundaryExchange, Link, RecvBuffer};
pub use partition::{exchange_schedule, Side, Strip};
pub use simulation::{
    Clock, Frame, FrameSink, NullSink, RunSummary, RunToCompletion, SimulationLoop, StopPolicy,
};
pub use vector::{Vec3, Vector};
pub use wire::WireError;
pub use worker::{StepReport, StripWorker};
