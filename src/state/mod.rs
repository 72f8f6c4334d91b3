//! Shared engine state
//!
//! - `ModeMachine`: Normal / MouseControl / RegionSelect plus the hook-pause flag
//! - `ControlState`: keyboard-held buttons, sticky click, speed modifiers
//! - `DirectionKeys` / `ScrollStack`: keys currently held for motion
//!
//! Everything here is written by the hook thread and read by the movement
//! worker every tick, so it is all lock-free apart from the per-button latch.

mod control;
mod held;
mod machine;

pub use control::ControlState;
pub use held::{Direction, DirectionKeys, ScrollDirection, ScrollStack};
pub use machine::{AppMode, ModeMachine};

use tokio::sync::broadcast;

use crate::events::ModeEvent;

/// Everything the hook thread and the movement worker share
pub struct SharedState {
    pub mode: ModeMachine,
    pub control: ControlState,
    pub directions: DirectionKeys,
    pub scroll: ScrollStack,
}

impl SharedState {
    pub fn new(event_tx: broadcast::Sender<ModeEvent>) -> Self {
        Self {
            mode: ModeMachine::new(event_tx),
            control: ControlState::new(),
            directions: DirectionKeys::new(),
            scroll: ScrollStack::new(),
        }
    }
}
