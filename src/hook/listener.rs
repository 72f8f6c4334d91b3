//! Global keyboard hook using a Windows low-level keyboard hook
//!
//! The hook lives on a dedicated thread running a message loop, as Windows
//! requires. Every key event is handed synchronously to the installed
//! [`InputDispatcher`]; a `false` answer swallows the event.

use std::sync::Arc;

use crate::dispatch::InputDispatcher;

/// Errors that can occur while installing the keyboard hook
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("a keyboard hook is already installed in this process")]
    AlreadyInstalled,

    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(#[source] std::io::Error),

    #[error("failed to install keyboard hook: {0}")]
    Install(String),

    #[error("hook thread did not signal readiness")]
    NotReady,

    #[error("global keyboard hooks are not supported on this platform")]
    UnsupportedPlatform,
}

/// Handle to the installed hook; dropping it uninstalls the hook
pub struct HookListener {
    #[cfg(windows)]
    thread: Option<win32::HookThread>,
}

impl HookListener {
    /// Install the hook and route every key event to `dispatcher`
    pub fn start(dispatcher: Arc<InputDispatcher>) -> Result<Self, HookError> {
        #[cfg(windows)]
        {
            let thread = win32::HookThread::spawn(dispatcher)?;
            tracing::info!("keyboard hook installed");
            Ok(Self {
                thread: Some(thread),
            })
        }
        #[cfg(not(windows))]
        {
            drop(dispatcher);
            Err(HookError::UnsupportedPlatform)
        }
    }

    /// Uninstall the hook and join its thread
    pub fn stop(&mut self) {
        #[cfg(windows)]
        if let Some(thread) = self.thread.take() {
            thread.stop();
            tracing::info!("keyboard hook removed");
        }
    }
}

impl Drop for HookListener {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(windows)]
mod win32 {
    use std::sync::{Arc, OnceLock};
    use std::thread::JoinHandle;
    use std::time::Duration;

    use tracing::warn;
    use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
    use windows::Win32::System::LibraryLoader::GetModuleHandleW;
    use windows::Win32::System::Threading::GetCurrentThreadId;
    use windows::Win32::UI::WindowsAndMessaging::{
        CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
        SetWindowsHookExW, TranslateMessage, UnhookWindowsHookEx, HC_ACTION, HHOOK,
        KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE, WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT,
        WM_SYSKEYDOWN, WM_SYSKEYUP,
    };

    use super::HookError;
    use crate::dispatch::InputDispatcher;

    /// Dispatcher reached from the hook procedure; one hook per process
    static DISPATCHER: OnceLock<Arc<InputDispatcher>> = OnceLock::new();

    pub struct HookThread {
        thread_id: u32,
        join: JoinHandle<()>,
    }

    impl HookThread {
        pub fn spawn(dispatcher: Arc<InputDispatcher>) -> Result<Self, HookError> {
            DISPATCHER
                .set(dispatcher)
                .map_err(|_| HookError::AlreadyInstalled)?;

            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<u32, HookError>>(1);

            let join = std::thread::Builder::new()
                .name("keyboard-hook".to_string())
                .spawn(move || {
                    let mut msg = MSG::default();
                    // Force creation of this thread's message queue before
                    // anyone can post WM_QUIT to it.
                    unsafe {
                        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                    }

                    let thread_id = unsafe { GetCurrentThreadId() };
                    let hmodule = match unsafe { GetModuleHandleW(None) } {
                        Ok(h) => h,
                        Err(err) => {
                            let _ = ready_tx.send(Err(HookError::Install(err.to_string())));
                            return;
                        }
                    };

                    let hook = match unsafe {
                        SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_proc), hmodule, 0)
                    } {
                        Ok(h) if !h.0.is_null() => h,
                        Ok(_) => {
                            let err = windows::core::Error::from_win32();
                            let _ = ready_tx.send(Err(HookError::Install(err.to_string())));
                            return;
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(HookError::Install(err.to_string())));
                            return;
                        }
                    };

                    let _ = ready_tx.send(Ok(thread_id));

                    loop {
                        let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                        if r.0 <= 0 {
                            break;
                        }
                        unsafe {
                            let _ = TranslateMessage(&msg);
                            DispatchMessageW(&msg);
                        }
                    }

                    unsafe {
                        let _ = UnhookWindowsHookEx(hook);
                    }
                })
                .map_err(HookError::ThreadSpawn)?;

            let thread_id = ready_rx
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| HookError::NotReady)??;

            Ok(Self { thread_id, join })
        }

        pub fn stop(self) {
            unsafe {
                let _ = PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
            }
            if self.join.join().is_err() {
                warn!("keyboard hook thread panicked");
            }
        }
    }

    unsafe extern "system" fn keyboard_proc(n_code: i32, w_param: WPARAM, l_param: LPARAM) -> LRESULT {
        if n_code == HC_ACTION as i32 {
            if let Some(dispatcher) = DISPATCHER.get() {
                let msg = w_param.0 as u32;
                let is_key_down = msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN;
                let is_key_up = msg == WM_KEYUP || msg == WM_SYSKEYUP;

                if is_key_down || is_key_up {
                    // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
                    let info = unsafe { &*(l_param.0 as *const KBDLLHOOKSTRUCT) };
                    if !dispatcher.handle(info.vkCode, is_key_down) {
                        return LRESULT(1);
                    }
                }
            }
        }

        unsafe { CallNextHookEx(HHOOK(std::ptr::null_mut()), n_code, w_param, l_param) }
    }
}
