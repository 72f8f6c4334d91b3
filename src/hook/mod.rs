//! System-wide keyboard hook
//!
//! - `keys`: config key names, virtual-key codes and the binding table
//! - `listener`: the OS low-level hook thread feeding the dispatcher

mod keys;
mod listener;

pub use keys::{vk, vk_from_name, Action, BindError, Hotkey, KeyBindings, VkCode};
pub use listener::{HookError, HookListener};
