//! Per-event handling core of the capture loop.
//!
//! The engine is platform-neutral: the OS adapter translates native events
//! into [`RawEvent`]s at the boundary and feeds them in here, one at a time,
//! on the capture thread. Handling must stay fast — no blocking I/O — because
//! it runs synchronously between input events.
//!
//! Window resolution is the expensive path (it enumerates every on-screen
//! window), so it is throttled: at most once per [`FORCE_SCREEN_CHANGE`]
//! unless a click or a modifier-driven app switch demands a fresh look.

use std::time::{Duration, Instant};

use tracing::trace;

use crate::sniffer::keymap;
use crate::sniffer::types::{Hooks, KeyEvent, RawEvent, RawEventKind};
use crate::sniffer::window::{resolve, WindowQuery};

/// Minimum interval between time-driven window resolutions.
pub const FORCE_SCREEN_CHANGE: Duration = Duration::from_secs(10);

/// How long the OS needs to settle window animations after an app switch.
pub const WAIT_ANIMATION: Duration = Duration::from_secs(1);

/// The single deferred hook invocation an event can produce.
enum Action {
    None,
    Key(KeyEvent),
    Button(u8),
    Move,
}

/// Event-classification and dispatch state for one capture session.
pub struct Engine<W: WindowQuery> {
    hooks: Hooks,
    windows: W,
    last_check_windows: Instant,
}

impl<W: WindowQuery> Engine<W> {
    pub fn new(hooks: Hooks, windows: W) -> Self {
        Self {
            hooks,
            windows,
            last_check_windows: Instant::now(),
        }
    }

    /// Handle one raw event at the current instant.
    pub fn handle(&mut self, event: &RawEvent) {
        self.handle_at(event, Instant::now());
    }

    /// Handle one raw event as of `now`.
    ///
    /// Split out from [`Engine::handle`] so the throttle policy is
    /// deterministic under test.
    pub fn handle_at(&mut self, event: &RawEvent, now: Instant) {
        let mut check_windows = false;
        if now.duration_since(self.last_check_windows) > FORCE_SCREEN_CHANGE
            && event.kind != RawEventKind::KeyUp
        {
            self.last_check_windows = now;
            check_windows = true;
        }

        let loc = event.location;
        let mut action = Action::None;
        match &event.kind {
            RawEventKind::LeftMouseDown => {
                check_windows = true;
                action = Action::Button(1);
            }
            RawEventKind::RightMouseDown => {
                check_windows = true;
                action = Action::Button(3);
            }
            RawEventKind::ScrollWheel { delta_x, delta_y } => {
                // One action slot only: a horizontal delta overwrites a
                // vertical one when both are non-zero in the same event.
                if *delta_y > 0.0 {
                    action = Action::Button(4);
                } else if *delta_y < 0.0 {
                    action = Action::Button(5);
                }
                if *delta_x > 0.0 {
                    action = Action::Button(6);
                } else if *delta_x < 0.0 {
                    action = Action::Button(7);
                }
            }
            RawEventKind::KeyDown {
                keycode,
                flags,
                character,
                is_repeat,
            } => {
                action = Action::Key(keymap::translate(*keycode, *flags, character, *is_repeat));
            }
            RawEventKind::MouseMoved => {
                action = Action::Move;
            }
            RawEventKind::FlagsChanged => {
                // A modifier chord usually precedes an app switch. Rewind the
                // throttle so the next event after the switch animation
                // settles re-resolves the window.
                if let Some(t) = now.checked_sub(FORCE_SCREEN_CHANGE - WAIT_ANIMATION) {
                    self.last_check_windows = t;
                }
                check_windows = true;
            }
            RawEventKind::KeyUp
            | RawEventKind::LeftMouseUp
            | RawEventKind::RightMouseUp => {}
        }

        if check_windows {
            self.resolve_active_window();
        }

        match action {
            Action::None => {}
            Action::Key(key) => (self.hooks.key_hook)(&key),
            Action::Button(code) => (self.hooks.mouse_button_hook)(code, loc.x, loc.y),
            Action::Move => (self.hooks.mouse_move_hook)(loc.x, loc.y),
        }
    }

    /// Look up the active application's foreground window and report it.
    ///
    /// Only one application can be active at a time; if it has no matching
    /// window on screen the context simply stays stale.
    fn resolve_active_window(&mut self) {
        let Some(app_name) = self.windows.active_application() else {
            return;
        };
        if let Some(ctx) = resolve(&self.windows.list_windows(), &app_name) {
            trace!(owner = %ctx.owner_name, title = %ctx.title, "resolved active window");
            (self.hooks.screen_hook)(&ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sniffer::types::{Location, Modifier, WindowContext};
    use crate::sniffer::window::WindowRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    struct FakeWindows {
        active: Option<String>,
        windows: Vec<WindowRecord>,
        lookups: Arc<AtomicUsize>,
    }

    impl FakeWindows {
        fn new(active: &str) -> (Self, Arc<AtomicUsize>) {
            let lookups = Arc::new(AtomicUsize::new(0));
            let windows = vec![WindowRecord {
                owner_name: active.into(),
                title: "Main".into(),
                layer: 0,
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 100.0,
            }];
            (
                Self {
                    active: Some(active.into()),
                    windows,
                    lookups: lookups.clone(),
                },
                lookups,
            )
        }
    }

    impl WindowQuery for FakeWindows {
        fn active_application(&self) -> Option<String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.active.clone()
        }

        fn list_windows(&self) -> Vec<WindowRecord> {
            self.windows.clone()
        }
    }

    fn at(x: f64, y: f64) -> Location {
        Location { x, y }
    }

    fn raw(kind: RawEventKind) -> RawEvent {
        RawEvent::new(kind, at(5.0, 6.0))
    }

    fn buttons_hook(seen: &Arc<Mutex<Vec<(u8, f64, f64)>>>) -> Box<dyn FnMut(u8, f64, f64) + Send> {
        let seen = seen.clone();
        Box::new(move |b, x, y| seen.lock().unwrap().push((b, x, y)))
    }

    #[test]
    fn test_mouse_move_stream_resolves_at_most_once_per_interval() {
        let (windows, lookups) = FakeWindows::new("Safari");
        let mut engine = Engine::new(Hooks::default(), windows);

        let t0 = Instant::now();
        for i in 0..30 {
            let now = t0 + Duration::from_millis(500 * i);
            engine.handle_at(&raw(RawEventKind::MouseMoved), now);
        }
        // 15 seconds of steady movement: exactly one throttle expiry.
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_key_up_never_triggers_resolution() {
        let (windows, lookups) = FakeWindows::new("Safari");
        let mut engine = Engine::new(Hooks::default(), windows);

        let t0 = Instant::now();
        engine.handle_at(&raw(RawEventKind::KeyUp), t0 + Duration::from_secs(60));
        assert_eq!(lookups.load(Ordering::SeqCst), 0);

        // The pending expiry is picked up by the next non-key-up event.
        engine.handle_at(&raw(RawEventKind::MouseMoved), t0 + Duration::from_secs(61));
        assert_eq!(lookups.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clicks_always_resolve_and_report_button_codes() {
        let (windows, lookups) = FakeWindows::new("Safari");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks {
            mouse_button_hook: buttons_hook(&seen),
            ..Hooks::default()
        };
        let mut engine = Engine::new(hooks, windows);

        let t0 = Instant::now();
        engine.handle_at(&raw(RawEventKind::LeftMouseDown), t0 + Duration::from_secs(1));
        engine.handle_at(&raw(RawEventKind::RightMouseDown), t0 + Duration::from_secs(2));

        assert_eq!(lookups.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 5.0, 6.0), (3, 5.0, 6.0)]);
    }

    #[test]
    fn test_vertical_scroll_reports_exactly_one_button() {
        let (windows, _) = FakeWindows::new("Safari");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks {
            mouse_button_hook: buttons_hook(&seen),
            ..Hooks::default()
        };
        let mut engine = Engine::new(hooks, windows);

        let t0 = Instant::now();
        engine.handle_at(
            &raw(RawEventKind::ScrollWheel { delta_x: 0.0, delta_y: 3.0 }),
            t0,
        );
        assert_eq!(*seen.lock().unwrap(), vec![(4, 5.0, 6.0)]);

        engine.handle_at(
            &raw(RawEventKind::ScrollWheel { delta_x: 0.0, delta_y: -1.0 }),
            t0 + Duration::from_secs(1),
        );
        assert_eq!(seen.lock().unwrap().last().unwrap().0, 5);
    }

    #[test]
    fn test_horizontal_scroll_overwrites_vertical() {
        let (windows, _) = FakeWindows::new("Safari");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let hooks = Hooks {
            mouse_button_hook: buttons_hook(&seen),
            ..Hooks::default()
        };
        let mut engine = Engine::new(hooks, windows);

        engine.handle_at(
            &raw(RawEventKind::ScrollWheel { delta_x: 2.0, delta_y: 3.0 }),
            Instant::now(),
        );
        // Last write wins: only the horizontal code fires.
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(seen.lock().unwrap()[0].0, 6);

        engine.handle_at(
            &raw(RawEventKind::ScrollWheel { delta_x: -2.0, delta_y: 3.0 }),
            Instant::now(),
        );
        assert_eq!(seen.lock().unwrap().last().unwrap().0, 7);
    }

    #[test]
    fn test_flags_changed_forces_next_event_to_resolve() {
        let (windows, lookups) = FakeWindows::new("Safari");
        let mut engine = Engine::new(Hooks::default(), windows);

        let t0 = Instant::now();
        // Modifier chord well inside the throttle interval.
        engine.handle_at(&raw(RawEventKind::FlagsChanged), t0 + Duration::from_secs(2));
        let after_flags = lookups.load(Ordering::SeqCst);
        assert_eq!(after_flags, 1);

        // Two seconds later (animation settled) a plain move re-resolves,
        // even though nowhere near 10s have elapsed since the last check.
        engine.handle_at(&raw(RawEventKind::MouseMoved), t0 + Duration::from_secs(4));
        assert_eq!(lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_flags_changed_produces_no_hook_action() {
        let (windows, _) = FakeWindows::new("Safari");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let moves = Arc::new(Mutex::new(Vec::new()));
        let moves_in = moves.clone();
        let hooks = Hooks {
            mouse_button_hook: buttons_hook(&seen),
            mouse_move_hook: Box::new(move |x, y| moves_in.lock().unwrap().push((x, y))),
            ..Hooks::default()
        };
        let mut engine = Engine::new(hooks, windows);
        engine.handle_at(&raw(RawEventKind::FlagsChanged), Instant::now());
        assert!(seen.lock().unwrap().is_empty());
        assert!(moves.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_normalization_scenario() {
        let (windows, _) = FakeWindows::new("Safari");
        let keys: Arc<Mutex<Vec<KeyEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let keys_in = keys.clone();
        let hooks = Hooks {
            key_hook: Box::new(move |k| keys_in.lock().unwrap().push(k.clone())),
            ..Hooks::default()
        };
        let mut engine = Engine::new(hooks, windows);

        let t0 = Instant::now();
        engine.handle_at(
            &raw(RawEventKind::KeyDown {
                keycode: 0,
                flags: 0,
                character: "a".into(),
                is_repeat: false,
            }),
            t0,
        );
        engine.handle_at(
            &raw(RawEventKind::KeyDown {
                keycode: 36,
                flags: 0,
                character: "\r".into(),
                is_repeat: false,
            }),
            t0 + Duration::from_millis(50),
        );

        let keys = keys.lock().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].keycode, 0);
        assert_eq!(keys[0].symbol, "a");
        assert!(keys[0].modifiers.is_empty());
        assert!(!keys[0].is_repeat);
        assert_eq!(keys[1].keycode, 36);
        assert_eq!(keys[1].symbol, "Enter");
    }

    #[test]
    fn test_screen_hook_receives_resolved_context() {
        let (windows, _) = FakeWindows::new("Safari");
        let contexts: Arc<Mutex<Vec<WindowContext>>> = Arc::new(Mutex::new(Vec::new()));
        let contexts_in = contexts.clone();
        let hooks = Hooks {
            screen_hook: Box::new(move |ctx| contexts_in.lock().unwrap().push(ctx.clone())),
            ..Hooks::default()
        };
        let mut engine = Engine::new(hooks, windows);

        engine.handle_at(&raw(RawEventKind::LeftMouseDown), Instant::now());
        let contexts = contexts.lock().unwrap();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].owner_name, "Safari");
        assert_eq!(contexts[0].title, "Main");
    }

    #[test]
    fn test_modified_key_reports_canonical_modifiers() {
        use crate::sniffer::keymap::{FLAG_COMMAND, FLAG_SHIFT};

        let (windows, _) = FakeWindows::new("Safari");
        let keys: Arc<Mutex<Vec<KeyEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let keys_in = keys.clone();
        let hooks = Hooks {
            key_hook: Box::new(move |k| keys_in.lock().unwrap().push(k.clone())),
            ..Hooks::default()
        };
        let mut engine = Engine::new(hooks, windows);

        engine.handle_at(
            &raw(RawEventKind::KeyDown {
                keycode: 1,
                flags: FLAG_SHIFT | FLAG_COMMAND,
                character: "S".into(),
                is_repeat: false,
            }),
            Instant::now(),
        );
        assert_eq!(
            keys.lock().unwrap()[0].modifiers,
            vec![Modifier::Cmd, Modifier::Shift]
        );
    }
}
