//! Process lifecycle: waiting for the reason to stop

mod shutdown;

pub use shutdown::{ShutdownReason, ShutdownSignal};
