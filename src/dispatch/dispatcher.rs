//! Classification of raw keyboard events
//!
//! [`InputDispatcher::handle`] runs on the OS hook thread for every key event
//! in the system. It touches only atomics, the per-button latches and
//! non-blocking channel sends, and it never performs I/O itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, warn};

use crate::hook::{Action, KeyBindings, VkCode};
use crate::platform::{ModifierProbe, MouseButton, PointerOutput};
use crate::region::RegionRequest;
use crate::state::{AppMode, Direction, ScrollDirection, SharedState};

/// Let the OS deliver the event as usual
const PASS: bool = true;
/// Swallow the event
const SUPPRESS: bool = false;

pub struct InputDispatcher {
    state: Arc<SharedState>,
    bindings: KeyBindings,
    output: Arc<dyn PointerOutput>,
    modifiers: Arc<dyn ModifierProbe>,
    region_tx: mpsc::UnboundedSender<RegionRequest>,
    exit: Arc<Notify>,
    /// Caps is a toggle; key repeats must not flip it again
    caps_down: AtomicBool,
    /// Same for the sticky key
    sticky_down: AtomicBool,
    /// The hotkey toggles once per physical press of its trigger
    hotkey_down: AtomicBool,
}

impl InputDispatcher {
    pub fn new(
        state: Arc<SharedState>,
        bindings: KeyBindings,
        output: Arc<dyn PointerOutput>,
        modifiers: Arc<dyn ModifierProbe>,
        region_tx: mpsc::UnboundedSender<RegionRequest>,
        exit: Arc<Notify>,
    ) -> Self {
        Self {
            state,
            bindings,
            output,
            modifiers,
            region_tx,
            exit,
            caps_down: AtomicBool::new(false),
            sticky_down: AtomicBool::new(false),
            hotkey_down: AtomicBool::new(false),
        }
    }

    /// Handle one key event; returns false when the event must be swallowed
    pub fn handle(&self, vk: VkCode, is_key_down: bool) -> bool {
        let action = self.bindings.action_for(vk);
        let mode = &self.state.mode;

        // Releases of the speed, sticky and trigger keys are tracked in every
        // mode so a release that lands outside mouse control is never lost.
        if !is_key_down {
            match action {
                Some(Action::SpeedShift) => self.state.control.set_speed_shift(false),
                Some(Action::SpeedCaps) => self.caps_down.store(false, Ordering::Release),
                Some(Action::StickyLeftClick) => self.sticky_down.store(false, Ordering::Release),
                _ => {}
            }
            if vk == self.bindings.hotkey.trigger {
                self.hotkey_down.store(false, Ordering::Release);
            }
        }

        if mode.is_hook_paused() {
            return PASS;
        }

        if is_key_down {
            let hotkey = self.bindings.hotkey;
            if vk == hotkey.trigger && self.modifiers.is_held(hotkey.modifier) {
                if !self.hotkey_down.swap(true, Ordering::AcqRel) {
                    self.toggle_mode();
                }
                return SUPPRESS;
            }
            if action == Some(Action::EnterRegionSelect) && mode.is_mouse_control() {
                self.begin_region_select();
                return SUPPRESS;
            }
        }

        if !mode.is_mouse_control() {
            return PASS;
        }
        let Some(action) = action else {
            return PASS;
        };

        if is_key_down && !action.keeps_sticky_click() {
            self.state.control.cancel_sticky(self.output.as_ref());
        }

        self.apply(action, is_key_down);

        if action.is_observed_only() {
            PASS
        } else {
            SUPPRESS
        }
    }

    fn apply(&self, action: Action, is_key_down: bool) {
        let control = &self.state.control;
        let out = self.output.as_ref();

        match action {
            Action::MoveUp => self.direction(Direction::Up, is_key_down),
            Action::MoveDown => self.direction(Direction::Down, is_key_down),
            Action::MoveLeft => self.direction(Direction::Left, is_key_down),
            Action::MoveRight => self.direction(Direction::Right, is_key_down),
            Action::ScrollUp => self.scroll(ScrollDirection::Up, is_key_down),
            Action::ScrollDown => self.scroll(ScrollDirection::Down, is_key_down),
            Action::LeftClick => self.button(MouseButton::Left, is_key_down),
            Action::RightClick => self.button(MouseButton::Right, is_key_down),
            Action::MiddleClick => self.button(MouseButton::Middle, is_key_down),
            Action::StickyLeftClick => {
                if is_key_down && !self.sticky_down.swap(true, Ordering::AcqRel) {
                    control.toggle_sticky(out);
                }
            }
            Action::ToggleModeInternal => {
                if is_key_down {
                    self.toggle_mode();
                }
            }
            // Key-down was consumed before mode filtering; only its release lands here.
            Action::EnterRegionSelect => {}
            Action::ExitProgram => {
                if is_key_down {
                    debug!("exit key pressed");
                    self.exit.notify_one();
                }
            }
            Action::SpeedShift => {
                if is_key_down {
                    control.set_speed_shift(true);
                }
            }
            Action::SpeedCaps => {
                if is_key_down && !self.caps_down.swap(true, Ordering::AcqRel) {
                    let active = control.toggle_speed_caps();
                    debug!(active, "caps speed toggled");
                }
            }
        }
    }

    fn direction(&self, direction: Direction, is_key_down: bool) {
        let keys = &self.state.directions;
        if is_key_down {
            keys.insert(direction);
        } else {
            keys.remove(direction);
        }
    }

    fn scroll(&self, direction: ScrollDirection, is_key_down: bool) {
        let stack = &self.state.scroll;
        if is_key_down {
            stack.push(direction);
        } else {
            stack.remove(direction);
        }
    }

    fn button(&self, button: MouseButton, is_key_down: bool) {
        let control = &self.state.control;
        if is_key_down {
            control.press(button, self.output.as_ref());
        } else {
            control.release(button, self.output.as_ref());
        }
    }

    fn toggle_mode(&self) {
        if self.state.mode.toggle_mouse_control() == AppMode::Normal {
            self.forget_held_keys();
        }
    }

    /// Releases that arrive while keys pass through never reach the sets
    fn forget_held_keys(&self) {
        self.state.directions.clear();
        self.state.scroll.clear();
    }

    fn begin_region_select(&self) {
        let mode = &self.state.mode;
        mode.pause_hook();
        mode.enter_region_select();
        self.forget_held_keys();

        if self.region_tx.send(RegionRequest).is_err() {
            warn!("region selector is not running");
            mode.return_from_region_select();
            mode.resume_hook();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use tokio::sync::broadcast;

    use super::*;
    use crate::config::Config;
    use crate::hook::vk;
    use crate::platform::mock::{MockModifiers, MockPointer};

    const W: VkCode = b'W' as VkCode;
    const S: VkCode = b'S' as VkCode;
    const A: VkCode = b'A' as VkCode;
    const D: VkCode = b'D' as VkCode;
    const E: VkCode = b'E' as VkCode;
    const F: VkCode = b'F' as VkCode;
    const G: VkCode = b'G' as VkCode;
    const J: VkCode = b'J' as VkCode;
    const K: VkCode = b'K' as VkCode;
    const X: VkCode = b'X' as VkCode;
    const F12: VkCode = vk::F1 + 11;

    struct Fixture {
        dispatcher: InputDispatcher,
        state: Arc<SharedState>,
        out: Arc<MockPointer>,
        alt: Arc<MockModifiers>,
        region_rx: mpsc::UnboundedReceiver<RegionRequest>,
        exit: Arc<Notify>,
    }

    fn fixture() -> Fixture {
        let config = Config::parse(
            include_str!("../../config.example.toml"),
            Path::new("/opt/keymouse"),
        )
        .unwrap();
        let (event_tx, _) = broadcast::channel(16);
        let state = Arc::new(SharedState::new(event_tx));
        let out = Arc::new(MockPointer::new());
        let alt = Arc::new(MockModifiers::default());
        let (region_tx, region_rx) = mpsc::unbounded_channel();
        let exit = Arc::new(Notify::new());

        let dispatcher = InputDispatcher::new(
            Arc::clone(&state),
            config.bindings,
            out.clone(),
            alt.clone(),
            region_tx,
            Arc::clone(&exit),
        );
        Fixture {
            dispatcher,
            state,
            out,
            alt,
            region_rx,
            exit,
        }
    }

    impl Fixture {
        fn down(&self, vk: VkCode) -> bool {
            self.dispatcher.handle(vk, true)
        }

        fn up(&self, vk: VkCode) -> bool {
            self.dispatcher.handle(vk, false)
        }

        fn tap(&self, vk: VkCode) -> bool {
            let passed = self.down(vk);
            self.up(vk);
            passed
        }

        fn enter_mouse_control(&self) {
            self.alt.set_alt(true);
            assert!(!self.down(A));
            self.alt.set_alt(false);
            self.up(A);
            assert_eq!(self.state.mode.mode(), AppMode::MouseControl);
        }
    }

    #[test]
    fn test_normal_mode_passes_everything() {
        let f = fixture();
        for vk in [W, A, E, F, G, K, vk::SPACE, vk::ESC, X] {
            assert!(f.tap(vk));
        }
        assert_eq!(f.state.mode.mode(), AppMode::Normal);
        assert!(f.out.events().is_empty());
        assert_eq!(f.state.directions.axis(), (0, 0));
    }

    #[test]
    fn test_hotkey_requires_live_modifier() {
        let f = fixture();
        assert!(f.down(A));
        assert_eq!(f.state.mode.mode(), AppMode::Normal);

        f.enter_mouse_control();

        f.alt.set_alt(true);
        assert!(!f.down(A));
        assert_eq!(f.state.mode.mode(), AppMode::Normal);
    }

    #[test]
    fn test_hotkey_repeat_toggles_once() {
        let f = fixture();
        f.alt.set_alt(true);

        for _ in 0..3 {
            assert!(!f.down(A));
        }
        assert_eq!(f.state.mode.mode(), AppMode::MouseControl);

        f.up(A);
        assert!(!f.down(A));
        assert_eq!(f.state.mode.mode(), AppMode::Normal);
    }

    #[test]
    fn test_paused_hook_passes_everything() {
        let f = fixture();
        f.enter_mouse_control();
        f.state.mode.pause_hook();

        f.alt.set_alt(true);
        assert!(f.down(A));
        assert!(f.down(W));
        assert_eq!(f.state.mode.mode(), AppMode::MouseControl);
        assert_eq!(f.state.directions.axis(), (0, 0));
    }

    #[test]
    fn test_movement_keys_update_direction_set() {
        let f = fixture();
        f.enter_mouse_control();

        assert!(!f.down(D));
        assert!(!f.down(D));
        assert!(!f.down(W));
        assert_eq!(f.state.directions.axis(), (1, -1));

        assert!(!f.up(D));
        assert_eq!(f.state.directions.axis(), (0, -1));
        assert!(f.state.directions.contains(Direction::Up));
    }

    #[test]
    fn test_click_keys_never_double_press() {
        let f = fixture();
        f.enter_mouse_control();

        f.down(E);
        f.down(E);
        f.down(E);
        assert!(f.state.control.is_held(MouseButton::Right));
        f.up(E);
        f.up(E);

        assert_eq!(f.out.presses(MouseButton::Right), 1);
        assert_eq!(f.out.releases(MouseButton::Right), 1);
        assert!(!f.state.control.is_held(MouseButton::Right));
    }

    #[test]
    fn test_sticky_survives_movement_and_cancels_on_other_actions() {
        let f = fixture();
        f.enter_mouse_control();

        assert!(!f.tap(F));
        assert!(f.state.control.sticky_active());
        // The worker performs the actual press.
        f.state.control.apply_sticky(f.out.as_ref());

        f.tap(W);
        f.tap(vk::LSHIFT);
        assert!(f.state.control.sticky_active());
        assert!(f.state.control.is_held(MouseButton::Left));

        f.down(E);
        assert!(!f.state.control.sticky_active());
        assert!(!f.state.control.is_held(MouseButton::Left));
        assert_eq!(f.out.releases(MouseButton::Left), 1);
        assert!(f.state.control.is_held(MouseButton::Right));
    }

    #[test]
    fn test_sticky_key_toggles_off_and_releases() {
        let f = fixture();
        f.enter_mouse_control();

        f.tap(F);
        f.state.control.apply_sticky(f.out.as_ref());
        f.tap(F);

        assert!(!f.state.control.sticky_active());
        assert!(!f.state.control.is_held(MouseButton::Left));
        assert_eq!(f.out.presses(MouseButton::Left), 1);
        assert_eq!(f.out.releases(MouseButton::Left), 1);
    }

    #[test]
    fn test_sticky_repeat_toggles_once() {
        let f = fixture();
        f.enter_mouse_control();

        for _ in 0..4 {
            assert!(!f.down(F));
            f.state.control.apply_sticky(f.out.as_ref());
        }
        assert!(f.state.control.sticky_active());
        assert_eq!(f.out.presses(MouseButton::Left), 1);
        assert_eq!(f.out.releases(MouseButton::Left), 0);

        f.up(F);
        f.tap(F);
        assert!(!f.state.control.sticky_active());
        assert_eq!(f.out.releases(MouseButton::Left), 1);
    }

    #[test]
    fn test_unbound_keys_pass_and_keep_sticky() {
        let f = fixture();
        f.enter_mouse_control();
        f.tap(F);

        assert!(f.tap(X));
        assert!(f.state.control.sticky_active());
    }

    #[test]
    fn test_scroll_keys_form_a_stack() {
        let f = fixture();
        f.enter_mouse_control();

        f.down(K);
        f.down(J);
        assert_eq!(f.state.scroll.top(), Some(ScrollDirection::Down));
        f.up(J);
        assert_eq!(f.state.scroll.top(), Some(ScrollDirection::Up));
        f.up(K);
        assert!(f.state.scroll.is_empty());
    }

    #[test]
    fn test_internal_toggle_leaves_mouse_control_and_forgets_keys() {
        let f = fixture();
        f.enter_mouse_control();
        f.down(S);
        f.down(K);

        assert!(!f.down(vk::ESC));
        assert_eq!(f.state.mode.mode(), AppMode::Normal);
        assert_eq!(f.state.directions.axis(), (0, 0));
        assert!(f.state.scroll.is_empty());

        // Back in Normal the same key passes through.
        assert!(f.up(vk::ESC));
        assert!(f.tap(vk::ESC));
    }

    #[test]
    fn test_region_select_pauses_and_requests() {
        let mut f = fixture();
        assert!(f.tap(G));
        assert!(f.region_rx.try_recv().is_err());

        f.enter_mouse_control();
        assert!(!f.down(G));

        assert_eq!(f.state.mode.mode(), AppMode::RegionSelect);
        assert_eq!(
            f.state.mode.previous_before_region_select(),
            AppMode::MouseControl
        );
        assert!(f.state.mode.is_hook_paused());
        assert_eq!(f.region_rx.try_recv().unwrap(), RegionRequest);

        // The overlay gets the keyboard while paused.
        assert!(f.up(G));
        assert!(f.tap(W));
    }

    #[test]
    fn test_region_select_without_manager_restores_mode() {
        let f = fixture();
        let Fixture {
            dispatcher,
            state,
            alt,
            region_rx,
            ..
        } = f;
        drop(region_rx);

        alt.set_alt(true);
        dispatcher.handle(A, true);
        alt.set_alt(false);

        assert!(!dispatcher.handle(G, true));
        assert_eq!(state.mode.mode(), AppMode::MouseControl);
        assert!(!state.mode.is_hook_paused());
    }

    #[test]
    fn test_speed_keys_are_observed_not_swallowed() {
        let f = fixture();

        assert!(f.down(vk::LSHIFT));
        assert!(!f.state.control.speed_shift());

        f.enter_mouse_control();
        assert!(f.down(vk::LSHIFT));
        assert!(f.state.control.speed_shift());

        f.alt.set_alt(true);
        f.down(A);
        assert_eq!(f.state.mode.mode(), AppMode::Normal);
        assert!(f.up(vk::LSHIFT));
        assert!(!f.state.control.speed_shift());
    }

    #[test]
    fn test_caps_repeat_toggles_once() {
        let f = fixture();
        f.enter_mouse_control();

        assert!(f.down(vk::CAPS_LOCK));
        assert!(f.down(vk::CAPS_LOCK));
        assert!(f.down(vk::CAPS_LOCK));
        assert!(f.state.control.speed_caps());
        f.up(vk::CAPS_LOCK);

        f.tap(vk::CAPS_LOCK);
        assert!(!f.state.control.speed_caps());
    }

    #[tokio::test]
    async fn test_exit_key_requests_shutdown() {
        let f = fixture();
        assert!(f.tap(F12));

        f.enter_mouse_control();
        assert!(!f.down(F12));

        let notified = tokio::time::timeout(Duration::from_secs(1), f.exit.notified()).await;
        assert!(notified.is_ok());
    }
}
