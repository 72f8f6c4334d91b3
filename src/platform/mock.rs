//! Recording platform backend for unit tests
//!
//! Every injected pointer event is pushed onto a shared log so tests can
//! assert exactly what reached the "OS" and in which order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{Modifier, ModifierProbe, MouseButton, OutputError, PointerOutput};

/// One injected pointer event
#[derive(Debug, Clone, PartialEq)]
pub enum Injected {
    Move(i32, i32),
    MoveTo(f64, f64),
    Scroll(i32),
    Press(MouseButton),
    Release(MouseButton),
}

#[derive(Default)]
pub struct MockPointer {
    pub log: Mutex<Vec<Injected>>,
}

impl MockPointer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Injected> {
        self.log.lock().expect("lock poisoned").clone()
    }

    pub fn clear(&self) {
        self.log.lock().expect("lock poisoned").clear();
    }

    /// Sum of all relative moves
    pub fn total_motion(&self) -> (i32, i32) {
        self.events().iter().fold((0, 0), |(x, y), e| match e {
            Injected::Move(dx, dy) => (x + dx, y + dy),
            _ => (x, y),
        })
    }

    /// Sum of all scrolled pixels
    pub fn total_scroll(&self) -> i32 {
        self.events()
            .iter()
            .map(|e| match e {
                Injected::Scroll(p) => *p,
                _ => 0,
            })
            .sum()
    }

    pub fn presses(&self, button: MouseButton) -> usize {
        self.count(|e| *e == Injected::Press(button))
    }

    pub fn releases(&self, button: MouseButton) -> usize {
        self.count(|e| *e == Injected::Release(button))
    }

    fn count(&self, f: impl Fn(&Injected) -> bool) -> usize {
        self.events().iter().filter(|e| f(e)).count()
    }

    fn push(&self, event: Injected) -> Result<(), OutputError> {
        self.log.lock().expect("lock poisoned").push(event);
        Ok(())
    }
}

impl PointerOutput for MockPointer {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), OutputError> {
        self.push(Injected::Move(dx, dy))
    }

    fn move_to(&self, x: f64, y: f64) -> Result<(), OutputError> {
        self.push(Injected::MoveTo(x, y))
    }

    fn scroll(&self, pixels: i32) -> Result<(), OutputError> {
        self.push(Injected::Scroll(pixels))
    }

    fn press(&self, button: MouseButton) -> Result<(), OutputError> {
        self.push(Injected::Press(button))
    }

    fn release(&self, button: MouseButton) -> Result<(), OutputError> {
        self.push(Injected::Release(button))
    }
}

/// Modifier probe whose Alt state tests flip by hand
#[derive(Default)]
pub struct MockModifiers {
    pub alt: AtomicBool,
}

impl MockModifiers {
    pub fn set_alt(&self, held: bool) {
        self.alt.store(held, Ordering::SeqCst);
    }
}

impl ModifierProbe for MockModifiers {
    fn is_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Alt => self.alt.load(Ordering::SeqCst),
            _ => false,
        }
    }
}
