//! Continuous generation.
//!
//! The worker loop that turns control state into frames, and the
//! supervisor that restarts the texture connections on request.

mod supervisor;
mod worker;

pub use supervisor::ConnectionSupervisor;
pub use worker::{CycleOutcome, GenerationWorker, LoopPhase};
