//! Fixed-tick pointer movement and scroll loop
//!
//! Runs on its own thread. Every tick it drains absolute-move commands,
//! advances the scroll physics by the measured time since the last tick,
//! applies a pending sticky click and turns held direction keys into a
//! relative move. The mode is re-read every tick, never cached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::physics::ScrollPhysics;
use crate::config::{MovementConfig, ScrollConfig};
use crate::platform::PointerOutput;
use crate::state::SharedState;

/// Commands delivered to the worker from other threads
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerCommand {
    /// Warp the pointer to an absolute screen position
    MoveTo { x: f64, y: f64 },
}

pub struct MovementWorker {
    state: Arc<SharedState>,
    output: Arc<dyn PointerOutput>,
    movement: MovementConfig,
    physics: ScrollPhysics,
    commands: Receiver<PointerCommand>,
}

impl MovementWorker {
    pub fn new(
        state: Arc<SharedState>,
        output: Arc<dyn PointerOutput>,
        movement: MovementConfig,
        scrolling: &ScrollConfig,
        commands: Receiver<PointerCommand>,
    ) -> Self {
        Self {
            state,
            output,
            movement,
            physics: ScrollPhysics::new(scrolling),
            commands,
        }
    }

    /// Run one tick covering `delta` of wall-clock time
    pub fn tick(&mut self, delta: Duration) {
        let warped = self.drain_commands();

        let mouse_control = self.state.mode.is_mouse_control();

        let pixels = self.physics.advance(self.state.scroll.top(), delta);
        if pixels != 0 && mouse_control {
            if let Err(e) = self.output.scroll(pixels) {
                warn!(pixels, ?e, "scroll injection failed");
            }
        }

        if !mouse_control {
            return;
        }

        if self.state.control.apply_sticky(self.output.as_ref()) {
            debug!("sticky click engaged");
        }

        // A warp is this tick's motion.
        if warped {
            return;
        }

        let (dx, dy) = self.motion();
        if dx != 0 || dy != 0 {
            if let Err(e) = self.output.move_relative(dx, dy) {
                warn!(dx, dy, ?e, "pointer move failed");
            }
        }
    }

    /// Relative motion for this tick from the held keys and speed modifiers
    fn motion(&self) -> (i32, i32) {
        let (ax, ay) = self.state.directions.axis();
        if ax == 0 && ay == 0 {
            return (0, 0);
        }

        let mut multiplier = 1.0;
        if self.state.control.speed_shift() {
            multiplier *= self.movement.shift_multiplier;
        }
        if self.state.control.speed_caps() {
            multiplier *= self.movement.caps_multiplier;
        }

        let speed = f64::from(self.movement.speed);
        (
            (f64::from(ax) * speed * multiplier) as i32,
            (f64::from(ay) * speed * multiplier) as i32,
        )
    }

    /// Apply queued warps; returns true if any were applied
    fn drain_commands(&mut self) -> bool {
        let mut warped = false;
        while let Ok(command) = self.commands.try_recv() {
            warped = true;
            match command {
                PointerCommand::MoveTo { x, y } => {
                    info!(x, y, "warping pointer");
                    if let Err(e) = self.output.move_to(x, y) {
                        warn!(x, y, ?e, "pointer warp failed");
                    }
                }
            }
        }
        warped
    }

    /// Start the tick loop on a dedicated thread
    pub fn spawn(mut self) -> std::io::Result<WorkerHandle> {
        let running = Arc::new(AtomicBool::new(true));
        let interval = self.movement.tick_interval();

        let thread = thread::Builder::new()
            .name("movement-worker".to_string())
            .spawn({
                let running = Arc::clone(&running);
                move || {
                    info!(interval_ms = interval.as_millis() as u64, "movement worker started");
                    let mut last = Instant::now();
                    while running.load(Ordering::Acquire) {
                        let now = Instant::now();
                        self.tick(now - last);
                        last = now;
                        thread::sleep(interval);
                    }
                    info!("movement worker stopped");
                }
            })?;

        Ok(WorkerHandle { running, thread })
    }
}

/// Handle to a running movement worker
pub struct WorkerHandle {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop the loop and wait for the current tick to finish
    pub fn stop(self) {
        self.running.store(false, Ordering::Release);
        if self.thread.join().is_err() {
            warn!("movement worker panicked");
        }
    }
}
