//! Pointer motion: the smooth-scroll model and the fixed-tick worker

mod physics;
mod worker;

pub use physics::ScrollPhysics;
pub use worker::{MovementWorker, PointerCommand, WorkerHandle};
