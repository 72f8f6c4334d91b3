//! Held direction keys and the scroll direction stack
//!
//! Both are packed into a single `AtomicU8` each: the hook thread flips bits
//! on key-down/key-up and the movement worker reads a snapshot every tick.

use std::sync::atomic::{AtomicU8, Ordering};

/// Logical pointer movement directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    fn bit(self) -> u8 {
        match self {
            Direction::Up => 0b0001,
            Direction::Down => 0b0010,
            Direction::Left => 0b0100,
            Direction::Right => 0b1000,
        }
    }
}

/// Set of currently held direction keys
#[derive(Debug, Default)]
pub struct DirectionKeys(AtomicU8);

impl DirectionKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the direction was already held (key repeat)
    pub fn insert(&self, direction: Direction) -> bool {
        let bit = direction.bit();
        self.0.fetch_or(bit, Ordering::AcqRel) & bit == 0
    }

    pub fn remove(&self, direction: Direction) -> bool {
        let bit = direction.bit();
        self.0.fetch_and(!bit, Ordering::AcqRel) & bit != 0
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.0.load(Ordering::Acquire) & direction.bit() != 0
    }

    /// Unit vector sum of the held keys; opposing keys cancel out
    pub fn axis(&self) -> (i32, i32) {
        let held = self.0.load(Ordering::Acquire);
        let has = |d: Direction| i32::from(held & d.bit() != 0);
        (
            has(Direction::Right) - has(Direction::Left),
            has(Direction::Down) - has(Direction::Up),
        )
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}

/// Vertical scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    fn code(self) -> u8 {
        match self {
            ScrollDirection::Up => 1,
            ScrollDirection::Down => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ScrollDirection::Up),
            2 => Some(ScrollDirection::Down),
            _ => None,
        }
    }

    /// Wheel sign: up scrolls away from the user (positive)
    pub fn sign(self) -> f64 {
        match self {
            ScrollDirection::Up => 1.0,
            ScrollDirection::Down => -1.0,
        }
    }
}

/// Stack of pressed scroll directions; the latest press wins
///
/// Bits 0-1 hold the bottom slot and bits 2-3 the top slot. With only two
/// directions and no duplicates the stack is never deeper than two.
#[derive(Debug, Default)]
pub struct ScrollStack(AtomicU8);

const SLOT: u8 = 0b11;

impl ScrollStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `direction` unless it is already on the stack
    pub fn push(&self, direction: ScrollDirection) -> bool {
        let code = direction.code();
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
                let (bottom, top) = (packed & SLOT, (packed >> 2) & SLOT);
                if bottom == code || top == code {
                    None
                } else if bottom == 0 {
                    Some(code)
                } else {
                    Some(bottom | (code << 2))
                }
            })
            .is_ok()
    }

    /// Remove `direction` wherever it sits in the stack
    pub fn remove(&self, direction: ScrollDirection) -> bool {
        let code = direction.code();
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |packed| {
                let (bottom, top) = (packed & SLOT, (packed >> 2) & SLOT);
                if top == code {
                    Some(bottom)
                } else if bottom == code {
                    Some(top)
                } else {
                    None
                }
            })
            .is_ok()
    }

    /// Most recently pressed direction still held
    pub fn top(&self) -> Option<ScrollDirection> {
        let packed = self.0.load(Ordering::Acquire);
        let top = (packed >> 2) & SLOT;
        ScrollDirection::from_code(if top != 0 { top } else { packed & SLOT })
    }

    pub fn is_empty(&self) -> bool {
        self.0.load(Ordering::Acquire) == 0
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Release);
    }
}
