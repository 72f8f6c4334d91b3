//! Smooth-scroll velocity model
//!
//! `velocity = min(max, initial + acceleration * hold_duration)`, integrated
//! over the measured tick delta. Fractional pixels are carried across ticks
//! in an accumulator so slow scrolling still moves smoothly.

use std::time::Duration;

use crate::config::ScrollConfig;
use crate::state::ScrollDirection;

#[derive(Debug)]
pub struct ScrollPhysics {
    initial_velocity: f64,
    max_velocity: f64,
    acceleration: f64,
    /// Seconds the stack has been non-empty
    hold_duration: f64,
    /// Signed sub-pixel remainder carried to the next tick
    accumulator: f64,
}

impl ScrollPhysics {
    pub fn new(config: &ScrollConfig) -> Self {
        Self {
            initial_velocity: config.initial_velocity,
            max_velocity: config.max_velocity,
            acceleration: config.acceleration,
            hold_duration: 0.0,
            accumulator: 0.0,
        }
    }

    /// Current speed in pixels per second
    pub fn velocity(&self) -> f64 {
        (self.initial_velocity + self.acceleration * self.hold_duration).min(self.max_velocity)
    }

    pub fn hold_duration(&self) -> f64 {
        self.hold_duration
    }

    /// Advance by `delta` with `direction` on top of the stack
    ///
    /// Returns the whole pixels to scroll this tick; positive scrolls up.
    pub fn advance(&mut self, direction: Option<ScrollDirection>, delta: Duration) -> i32 {
        let Some(direction) = direction else {
            self.hold_duration = 0.0;
            self.accumulator = 0.0;
            return 0;
        };

        let dt = delta.as_secs_f64();
        self.hold_duration += dt;
        self.accumulator += self.velocity() * dt * direction.sign();

        let pixels = self.accumulator.trunc();
        self.accumulator -= pixels;
        pixels as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn physics() -> ScrollPhysics {
        ScrollPhysics::new(&ScrollConfig {
            initial_velocity: 100.0,
            max_velocity: 400.0,
            acceleration: 200.0,
        })
    }

    #[test]
    fn test_zero_hold_uses_initial_velocity() {
        let physics = physics();
        assert_eq!(physics.hold_duration(), 0.0);
        assert_eq!(physics.velocity(), 100.0);
    }

    #[test]
    fn test_velocity_is_capped() {
        let mut physics = physics();
        for _ in 0..1000 {
            physics.advance(Some(ScrollDirection::Up), Duration::from_millis(10));
            assert!(physics.velocity() <= 400.0);
        }
        assert_eq!(physics.velocity(), 400.0);
    }

    #[test]
    fn test_direction_sign() {
        let mut rising = physics();
        let mut falling = physics();

        assert!(rising.advance(Some(ScrollDirection::Up), Duration::from_millis(100)) > 0);
        assert!(falling.advance(Some(ScrollDirection::Down), Duration::from_millis(100)) < 0);
    }

    #[test]
    fn test_fractions_carry_across_ticks() {
        let mut physics = ScrollPhysics::new(&ScrollConfig {
            initial_velocity: 50.0,
            max_velocity: 50.0,
            acceleration: 0.0,
        });

        // 50 px/s at 10ms ticks is half a pixel per tick.
        let emitted: Vec<i32> = (0..10)
            .map(|_| physics.advance(Some(ScrollDirection::Up), Duration::from_millis(10)))
            .collect();
        let total: i32 = emitted.iter().sum();
        assert!((4..=5).contains(&total), "total = {total}");
        assert!(emitted.iter().all(|p| *p == 0 || *p == 1));
    }

    #[test]
    fn test_release_resets_state() {
        let mut physics = physics();
        physics.advance(Some(ScrollDirection::Down), Duration::from_millis(500));
        assert!(physics.hold_duration() > 0.0);
        assert!(physics.velocity() > 100.0);

        assert_eq!(physics.advance(None, Duration::from_millis(10)), 0);
        assert_eq!(physics.hold_duration(), 0.0);
        assert_eq!(physics.velocity(), 100.0);
    }

    #[test]
    fn test_distance_matches_integrated_velocity() {
        let mut physics = ScrollPhysics::new(&ScrollConfig {
            initial_velocity: 300.0,
            max_velocity: 300.0,
            acceleration: 0.0,
        });

        let total: i32 = (0..100)
            .map(|_| physics.advance(Some(ScrollDirection::Down), Duration::from_millis(10)))
            .sum();
        assert!((-301..=-299).contains(&total), "total = {total}");
    }
}
