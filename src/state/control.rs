//! Per-button and speed-modifier control state
//!
//! A button's `held` flag is true exactly while the keyboard holds that
//! button down. Each flag flip and the matching OS injection happen under a
//! per-button latch, so the hook thread and the movement worker can never
//! interleave a press with a release or inject the same edge twice. Readers
//! only ever touch the atomics. Writers on the hook thread may briefly wait
//! on a button's latch while the worker injects that same button.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::platform::{MouseButton, PointerOutput};

#[derive(Default)]
struct ButtonLatch {
    held: AtomicBool,
    io: Mutex<()>,
}

/// Button, sticky-click and speed flags shared by the hook and the worker
#[derive(Default)]
pub struct ControlState {
    buttons: [ButtonLatch; 3],
    sticky_left: AtomicBool,
    speed_shift: AtomicBool,
    speed_caps: AtomicBool,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_held(&self, button: MouseButton) -> bool {
        self.buttons[button.index()].held.load(Ordering::Acquire)
    }

    /// Press `button` unless the keyboard already holds it
    ///
    /// Returns true when a press was injected.
    pub fn press(&self, button: MouseButton, out: &dyn PointerOutput) -> bool {
        self.press_if(button, out, || true)
    }

    /// Release `button` if the keyboard holds it
    ///
    /// Returns true when a release was injected.
    pub fn release(&self, button: MouseButton, out: &dyn PointerOutput) -> bool {
        let latch = &self.buttons[button.index()];
        let _io = latch.io.lock().unwrap_or_else(PoisonError::into_inner);

        if !latch.held.load(Ordering::Acquire) {
            return false;
        }
        latch.held.store(false, Ordering::Release);
        if let Err(e) = out.release(button) {
            warn!(%button, ?e, "failed to release mouse button");
        }
        debug!(%button, "mouse button released");
        true
    }

    fn press_if(
        &self,
        button: MouseButton,
        out: &dyn PointerOutput,
        still_wanted: impl Fn() -> bool,
    ) -> bool {
        let latch = &self.buttons[button.index()];
        let _io = latch.io.lock().unwrap_or_else(PoisonError::into_inner);

        if latch.held.load(Ordering::Acquire) || !still_wanted() {
            return false;
        }
        match out.press(button) {
            Ok(()) => {
                latch.held.store(true, Ordering::Release);
                debug!(%button, "mouse button pressed");
                true
            }
            Err(e) => {
                warn!(%button, ?e, "failed to press mouse button");
                false
            }
        }
    }

    pub fn sticky_active(&self) -> bool {
        self.sticky_left.load(Ordering::Acquire)
    }

    /// Flip sticky click; switching it off releases the left button
    ///
    /// Returns the new sticky state. Switching on never presses here; the
    /// movement worker does that on its next tick.
    pub fn toggle_sticky(&self, out: &dyn PointerOutput) -> bool {
        let active = !self.sticky_left.fetch_xor(true, Ordering::AcqRel);
        if !active {
            self.release(MouseButton::Left, out);
        }
        debug!(active, "sticky click toggled");
        active
    }

    /// Switch sticky click off and release the left button it held
    ///
    /// Returns true when sticky click was active.
    pub fn cancel_sticky(&self, out: &dyn PointerOutput) -> bool {
        if !self.sticky_left.swap(false, Ordering::AcqRel) {
            return false;
        }
        self.release(MouseButton::Left, out);
        debug!("sticky click cancelled");
        true
    }

    /// Press the left button on behalf of an active sticky click
    ///
    /// The sticky flag is re-read under the button latch, so a cancel that
    /// lands concurrently either sees the press and releases it, or the
    /// press never happens.
    pub fn apply_sticky(&self, out: &dyn PointerOutput) -> bool {
        if !self.sticky_active() {
            return false;
        }
        self.press_if(MouseButton::Left, out, || self.sticky_active())
    }

    pub fn speed_shift(&self) -> bool {
        self.speed_shift.load(Ordering::Acquire)
    }

    pub fn set_speed_shift(&self, active: bool) {
        self.speed_shift.store(active, Ordering::Release);
    }

    pub fn speed_caps(&self) -> bool {
        self.speed_caps.load(Ordering::Acquire)
    }

    /// Caps is a toggle; returns the new state
    pub fn toggle_speed_caps(&self) -> bool {
        !self.speed_caps.fetch_xor(true, Ordering::AcqRel)
    }

    /// Drop sticky click and release every keyboard-held button
    pub fn release_all(&self, out: &dyn PointerOutput) {
        self.sticky_left.store(false, Ordering::Release);
        for button in MouseButton::ALL {
            self.release(button, out);
        }
    }
}
