//! Operating-mode state machine
//!
//! Handles transitions between Normal, MouseControl and RegionSelect plus
//! the orthogonal hook-pause flag. All fields are atomics: the hook thread
//! writes them, the movement worker and the region selector read and write
//! them, and nobody ever waits on a lock.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::events::ModeEvent;

/// The three operating modes of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AppMode {
    /// Keys pass through; only the global hotkey is watched
    #[default]
    Normal = 0,
    /// Bound keys drive the pointer and are swallowed
    MouseControl = 1,
    /// The region selector overlay owns the keyboard
    RegionSelect = 2,
}

impl AppMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => AppMode::MouseControl,
            2 => AppMode::RegionSelect,
            _ => AppMode::Normal,
        }
    }
}

impl std::fmt::Display for AppMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppMode::Normal => write!(f, "Normal"),
            AppMode::MouseControl => write!(f, "MouseControl"),
            AppMode::RegionSelect => write!(f, "RegionSelect"),
        }
    }
}

/// The state machine that manages mode transitions
pub struct ModeMachine {
    /// Current mode
    mode: AtomicU8,
    /// Mode to restore when region selection ends
    previous: AtomicU8,
    /// While set, the dispatcher passes every event through
    hook_paused: AtomicBool,
    /// Channel for emitting mode events
    event_tx: broadcast::Sender<ModeEvent>,
}

impl ModeMachine {
    /// Create a new mode machine in Normal mode
    pub fn new(event_tx: broadcast::Sender<ModeEvent>) -> Self {
        Self {
            mode: AtomicU8::new(AppMode::Normal as u8),
            previous: AtomicU8::new(AppMode::Normal as u8),
            hook_paused: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Get the current mode
    pub fn mode(&self) -> AppMode {
        AppMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn is_mouse_control(&self) -> bool {
        self.mode() == AppMode::MouseControl
    }

    /// Mode that will be restored after region selection
    pub fn previous_before_region_select(&self) -> AppMode {
        AppMode::from_u8(self.previous.load(Ordering::Acquire))
    }

    /// Register a new observer of mode events
    pub fn subscribe(&self) -> broadcast::Receiver<ModeEvent> {
        self.event_tx.subscribe()
    }

    /// Normal <-> MouseControl; no-op while in RegionSelect
    ///
    /// Returns the mode after the call.
    pub fn toggle_mouse_control(&self) -> AppMode {
        let result = self
            .mode
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
                match AppMode::from_u8(raw) {
                    AppMode::Normal => Some(AppMode::MouseControl as u8),
                    AppMode::MouseControl => Some(AppMode::Normal as u8),
                    AppMode::RegionSelect => None,
                }
            });

        match result {
            Ok(old) => {
                let from = AppMode::from_u8(old);
                let to = match from {
                    AppMode::Normal => AppMode::MouseControl,
                    _ => AppMode::Normal,
                };
                self.notify_transition(from, to);
                to
            }
            Err(current) => AppMode::from_u8(current),
        }
    }

    /// Enter RegionSelect, remembering the mode being left
    ///
    /// Returns false when already in RegionSelect; the remembered mode is
    /// left untouched in that case.
    pub fn enter_region_select(&self) -> bool {
        loop {
            let current = self.mode.load(Ordering::Acquire);
            if AppMode::from_u8(current) == AppMode::RegionSelect {
                debug!("already in region select");
                return false;
            }

            self.previous.store(current, Ordering::Release);
            if self
                .mode
                .compare_exchange(
                    current,
                    AppMode::RegionSelect as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok()
            {
                self.notify_transition(AppMode::from_u8(current), AppMode::RegionSelect);
                return true;
            }
        }
    }

    /// Leave RegionSelect for the remembered mode; no-op in any other mode
    pub fn return_from_region_select(&self) -> AppMode {
        let previous = self.previous.load(Ordering::Acquire);
        match self.mode.compare_exchange(
            AppMode::RegionSelect as u8,
            previous,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                let to = AppMode::from_u8(previous);
                self.notify_transition(AppMode::RegionSelect, to);
                to
            }
            Err(current) => AppMode::from_u8(current),
        }
    }

    pub fn is_hook_paused(&self) -> bool {
        self.hook_paused.load(Ordering::Acquire)
    }

    pub fn pause_hook(&self) {
        if !self.hook_paused.swap(true, Ordering::AcqRel) {
            debug!("keyboard hook paused");
            let _ = self.event_tx.send(ModeEvent::HookPaused);
        }
    }

    pub fn resume_hook(&self) {
        if self.hook_paused.swap(false, Ordering::AcqRel) {
            debug!("keyboard hook resumed");
            let _ = self.event_tx.send(ModeEvent::HookResumed);
        }
    }

    /// Fire-and-forget notification; a missing subscriber is not an error
    fn notify_transition(&self, from: AppMode, to: AppMode) {
        debug!(from = %from, to = %to, "mode transition");
        let _ = self.event_tx.send(ModeEvent::ModeChanged { from, to });
    }
}
