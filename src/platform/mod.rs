//! Platform seam for pointer injection and live modifier queries
//!
//! The dispatcher and the movement worker only ever talk to the OS through
//! [`PointerOutput`] and [`ModifierProbe`], so tests can drive them with the
//! recording mock in [`mock`].

use std::sync::Arc;

#[cfg(test)]
pub mod mock;

#[cfg(windows)]
mod win32;

/// Mouse buttons the keyboard can hold down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub const ALL: [MouseButton; 3] = [MouseButton::Left, MouseButton::Right, MouseButton::Middle];

    pub(crate) fn index(self) -> usize {
        match self {
            MouseButton::Left => 0,
            MouseButton::Right => 1,
            MouseButton::Middle => 2,
        }
    }
}

impl std::fmt::Display for MouseButton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MouseButton::Left => write!(f, "left"),
            MouseButton::Right => write!(f, "right"),
            MouseButton::Middle => write!(f, "middle"),
        }
    }
}

/// Modifier keys usable in the global toggle hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Alt,
    Ctrl,
    Shift,
    Win,
}

/// Errors reported by a pointer injection backend
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("the OS rejected the injected {0} event")]
    Rejected(&'static str),

    #[error("failed to warp cursor to ({x}, {y})")]
    Warp { x: i32, y: i32 },

    #[error("pointer injection is not supported on this platform")]
    Unsupported,
}

/// Pixel-granular pointer and wheel injection
pub trait PointerOutput: Send + Sync {
    /// Move the pointer by a relative offset in pixels
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), OutputError>;

    /// Warp the pointer to an absolute screen position
    fn move_to(&self, x: f64, y: f64) -> Result<(), OutputError>;

    /// Scroll vertically; positive scrolls away from the user (up)
    fn scroll(&self, pixels: i32) -> Result<(), OutputError>;

    fn press(&self, button: MouseButton) -> Result<(), OutputError>;

    fn release(&self, button: MouseButton) -> Result<(), OutputError>;
}

/// Live query of the OS modifier-key state
pub trait ModifierProbe: Send + Sync {
    fn is_held(&self, modifier: Modifier) -> bool;
}

/// Pointer backend for the current OS
pub fn system_output() -> Arc<dyn PointerOutput> {
    #[cfg(windows)]
    {
        Arc::new(win32::SendInputPointer)
    }
    #[cfg(not(windows))]
    {
        Arc::new(Unsupported)
    }
}

/// Modifier probe for the current OS
pub fn system_modifiers() -> Arc<dyn ModifierProbe> {
    #[cfg(windows)]
    {
        Arc::new(win32::AsyncKeyState)
    }
    #[cfg(not(windows))]
    {
        Arc::new(Unsupported)
    }
}

/// Stand-in backend on platforms without an injection primitive
#[cfg(not(windows))]
struct Unsupported;

#[cfg(not(windows))]
impl PointerOutput for Unsupported {
    fn move_relative(&self, _dx: i32, _dy: i32) -> Result<(), OutputError> {
        Err(OutputError::Unsupported)
    }

    fn move_to(&self, _x: f64, _y: f64) -> Result<(), OutputError> {
        Err(OutputError::Unsupported)
    }

    fn scroll(&self, _pixels: i32) -> Result<(), OutputError> {
        Err(OutputError::Unsupported)
    }

    fn press(&self, _button: MouseButton) -> Result<(), OutputError> {
        Err(OutputError::Unsupported)
    }

    fn release(&self, _button: MouseButton) -> Result<(), OutputError> {
        Err(OutputError::Unsupported)
    }
}

#[cfg(not(windows))]
impl ModifierProbe for Unsupported {
    fn is_held(&self, _modifier: Modifier) -> bool {
        false
    }
}
