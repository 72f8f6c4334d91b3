//! Virtual-key definitions and the key → action lookup table
//!
//! Key names in the config file are mapped to Windows virtual-key codes,
//! which is what the low-level keyboard hook reports.

use crate::platform::Modifier;

/// Windows virtual-key code as reported by the keyboard hook
pub type VkCode = u32;

/// Well-known virtual-key codes
pub mod vk {
    use super::VkCode;

    pub const BACKSPACE: VkCode = 0x08;
    pub const TAB: VkCode = 0x09;
    pub const ENTER: VkCode = 0x0D;
    pub const SHIFT: VkCode = 0x10;
    pub const CTRL: VkCode = 0x11;
    pub const ALT: VkCode = 0x12;
    pub const CAPS_LOCK: VkCode = 0x14;
    pub const ESC: VkCode = 0x1B;
    pub const SPACE: VkCode = 0x20;
    pub const LEFT: VkCode = 0x25;
    pub const UP: VkCode = 0x26;
    pub const RIGHT: VkCode = 0x27;
    pub const DOWN: VkCode = 0x28;
    pub const F1: VkCode = 0x70;
    pub const LSHIFT: VkCode = 0xA0;
    pub const RSHIFT: VkCode = 0xA1;
    pub const LCTRL: VkCode = 0xA2;
    pub const RCTRL: VkCode = 0xA3;
    pub const LALT: VkCode = 0xA4;
    pub const RALT: VkCode = 0xA5;
    pub const SEMICOLON: VkCode = 0xBA;
    pub const COMMA: VkCode = 0xBC;
    pub const PERIOD: VkCode = 0xBE;
    pub const SLASH: VkCode = 0xBF;
    pub const APOSTROPHE: VkCode = 0xDE;
}

/// Resolve a config key name (`"w"`, `"space"`, `"f5"`, ...) to its code
pub fn vk_from_name(name: &str) -> Option<VkCode> {
    let name = name.trim().to_ascii_lowercase();

    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return match c {
            'a'..='z' => Some(c.to_ascii_uppercase() as VkCode),
            '0'..='9' => Some(c as VkCode),
            ';' => Some(vk::SEMICOLON),
            '\'' => Some(vk::APOSTROPHE),
            ',' => Some(vk::COMMA),
            '.' => Some(vk::PERIOD),
            '/' => Some(vk::SLASH),
            _ => None,
        };
    }

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
        return (1..=12).contains(&n).then(|| vk::F1 + n - 1);
    }

    let code = match name.as_str() {
        "semicolon" => vk::SEMICOLON,
        "apostrophe" => vk::APOSTROPHE,
        "comma" => vk::COMMA,
        "period" => vk::PERIOD,
        "slash" => vk::SLASH,
        "backspace" => vk::BACKSPACE,
        "space" => vk::SPACE,
        "enter" => vk::ENTER,
        "tab" => vk::TAB,
        "esc" | "escape" => vk::ESC,
        "shift" => vk::SHIFT,
        "lshift" | "shift_l" => vk::LSHIFT,
        "rshift" | "shift_r" => vk::RSHIFT,
        "ctrl" => vk::CTRL,
        "lctrl" => vk::LCTRL,
        "rctrl" => vk::RCTRL,
        "alt" => vk::ALT,
        "lalt" => vk::LALT,
        "ralt" => vk::RALT,
        "caps_lock" | "capslock" => vk::CAPS_LOCK,
        "up" => vk::UP,
        "down" => vk::DOWN,
        "left" => vk::LEFT,
        "right" => vk::RIGHT,
        _ => return None,
    };
    Some(code)
}

/// The global mode-toggle chord: one modifier plus one trigger key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hotkey {
    pub modifier: Modifier,
    pub trigger: VkCode,
}

impl Hotkey {
    /// Parse `"<alt>+a"` style chords; angle brackets are optional
    pub fn parse(s: &str) -> Option<Self> {
        let cleaned = s.replace(['<', '>'], "").to_ascii_lowercase();
        let (modifier, trigger) = cleaned.split_once('+')?;

        let modifier = match modifier.trim() {
            "alt" => Modifier::Alt,
            "ctrl" => Modifier::Ctrl,
            "shift" => Modifier::Shift,
            "win" | "cmd" => Modifier::Win,
            _ => return None,
        };

        if trigger.contains('+') {
            return None;
        }

        Some(Self {
            modifier,
            trigger: vk_from_name(trigger)?,
        })
    }
}

/// Logical actions a key can be bound to while mouse control is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ScrollUp,
    ScrollDown,
    LeftClick,
    RightClick,
    MiddleClick,
    StickyLeftClick,
    ToggleModeInternal,
    EnterRegionSelect,
    ExitProgram,
    SpeedShift,
    SpeedCaps,
}

impl Action {
    /// Keys that never cancel an active sticky click
    pub fn keeps_sticky_click(self) -> bool {
        matches!(
            self,
            Action::MoveUp
                | Action::MoveDown
                | Action::MoveLeft
                | Action::MoveRight
                | Action::StickyLeftClick
                | Action::SpeedShift
                | Action::SpeedCaps
        )
    }

    /// Speed modifiers are observed and passed through, never swallowed
    pub fn is_observed_only(self) -> bool {
        matches!(self, Action::SpeedShift | Action::SpeedCaps)
    }
}

/// Why a key could not be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    OutOfRange(VkCode),
    Taken(Action),
}

/// Resolved bindings: a flat table indexed by virtual-key code
#[derive(Debug, Clone)]
pub struct KeyBindings {
    pub hotkey: Hotkey,
    table: [Option<Action>; 256],
}

impl KeyBindings {
    pub fn new(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            table: [None; 256],
        }
    }

    pub fn bind(&mut self, code: VkCode, action: Action) -> Result<(), BindError> {
        let slot = self
            .table
            .get_mut(code as usize)
            .ok_or(BindError::OutOfRange(code))?;
        match *slot {
            Some(existing) if existing != action => Err(BindError::Taken(existing)),
            _ => {
                *slot = Some(action);
                Ok(())
            }
        }
    }

    pub fn action_for(&self, code: VkCode) -> Option<Action> {
        self.table.get(code as usize).copied().flatten()
    }

    /// First key bound to `action`, if any
    pub fn key_for(&self, action: Action) -> Option<VkCode> {
        self.table
            .iter()
            .position(|slot| *slot == Some(action))
            .map(|i| i as VkCode)
    }
}
