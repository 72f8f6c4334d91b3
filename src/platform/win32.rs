//! Win32 pointer injection via SendInput
//!
//! Relative motion, buttons and the wheel go through `SendInput`; absolute
//! warps use `SetCursorPos` so the coordinates stay in screen pixels.

use windows::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE,
    MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS,
    VIRTUAL_KEY, VK_CONTROL, VK_LWIN, VK_MENU, VK_RWIN, VK_SHIFT,
};
use windows::Win32::UI::WindowsAndMessaging::SetCursorPos;

use super::{Modifier, ModifierProbe, MouseButton, OutputError, PointerOutput};

/// [`PointerOutput`] backed by `SendInput`
pub struct SendInputPointer;

impl PointerOutput for SendInputPointer {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), OutputError> {
        send_mouse(dx, dy, 0, MOUSEEVENTF_MOVE, "move")
    }

    fn move_to(&self, x: f64, y: f64) -> Result<(), OutputError> {
        let (x, y) = (x.round() as i32, y.round() as i32);
        // SAFETY: SetCursorPos takes plain integers and has no pointer arguments.
        unsafe { SetCursorPos(x, y) }.map_err(|_| OutputError::Warp { x, y })
    }

    fn scroll(&self, pixels: i32) -> Result<(), OutputError> {
        // mouseData carries the signed wheel distance reinterpreted as a DWORD.
        send_mouse(0, 0, pixels as u32, MOUSEEVENTF_WHEEL, "wheel")
    }

    fn press(&self, button: MouseButton) -> Result<(), OutputError> {
        let flags = match button {
            MouseButton::Left => MOUSEEVENTF_LEFTDOWN,
            MouseButton::Right => MOUSEEVENTF_RIGHTDOWN,
            MouseButton::Middle => MOUSEEVENTF_MIDDLEDOWN,
        };
        send_mouse(0, 0, 0, flags, "button down")
    }

    fn release(&self, button: MouseButton) -> Result<(), OutputError> {
        let flags = match button {
            MouseButton::Left => MOUSEEVENTF_LEFTUP,
            MouseButton::Right => MOUSEEVENTF_RIGHTUP,
            MouseButton::Middle => MOUSEEVENTF_MIDDLEUP,
        };
        send_mouse(0, 0, 0, flags, "button up")
    }
}

/// [`ModifierProbe`] backed by `GetAsyncKeyState`
pub struct AsyncKeyState;

impl ModifierProbe for AsyncKeyState {
    fn is_held(&self, modifier: Modifier) -> bool {
        match modifier {
            Modifier::Alt => key_down(VK_MENU),
            Modifier::Ctrl => key_down(VK_CONTROL),
            Modifier::Shift => key_down(VK_SHIFT),
            Modifier::Win => key_down(VK_LWIN) || key_down(VK_RWIN),
        }
    }
}

fn key_down(vk: VIRTUAL_KEY) -> bool {
    // SAFETY: GetAsyncKeyState only reads global keyboard state.
    // The high bit (sign) is set while the key is down.
    unsafe { GetAsyncKeyState(vk.0 as i32) } < 0
}

fn send_mouse(
    dx: i32,
    dy: i32,
    data: u32,
    flags: MOUSE_EVENT_FLAGS,
    what: &'static str,
) -> Result<(), OutputError> {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    // SAFETY: input is a fully initialised MOUSEINPUT on the stack.
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent == 0 {
        Err(OutputError::Rejected(what))
    } else {
        Ok(())
    }
}
