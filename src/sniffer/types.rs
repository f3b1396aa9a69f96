//! Platform-neutral event model for the capture engine.
//!
//! Raw events are ephemeral: one is built per monitor invocation and dropped
//! after dispatch. Normalized events and window contexts are what consumers
//! see through the hook set.

use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Cursor location at the time an event was observed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

/// What kind of input event the platform reported.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEventKind {
    KeyDown {
        /// Platform virtual key code
        keycode: u16,
        /// Raw modifier bitmask as reported by the platform
        flags: u64,
        /// Candidate character, ignoring modifiers; may be empty for dead keys
        character: String,
        is_repeat: bool,
    },
    KeyUp,
    /// Modifier state changed (a modifier key went down or up)
    FlagsChanged,
    LeftMouseDown,
    LeftMouseUp,
    RightMouseDown,
    RightMouseUp,
    MouseMoved,
    ScrollWheel { delta_x: f64, delta_y: f64 },
}

/// A raw platform event, translated at the OS boundary.
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub kind: RawEventKind,
    /// Monotonic timestamp used by the resolution throttle
    pub at: Instant,
    pub location: Location,
}

impl RawEvent {
    pub fn new(kind: RawEventKind, location: Location) -> Self {
        Self {
            kind,
            at: Instant::now(),
            location,
        }
    }
}

/// Modifier keys, in the canonical reporting order.
///
/// The platform does not distinguish left from right variants, so neither do
/// we. `Shift` covers both the plain shift bit and the alpha-shift (caps
/// lock) bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modifier {
    Ctrl,
    Alt,
    Cmd,
    Shift,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Ctrl => "Ctrl",
            Modifier::Alt => "Alt",
            Modifier::Cmd => "Cmd",
            Modifier::Shift => "Shift",
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized key press.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Platform virtual key code
    pub keycode: u16,
    /// Canonically ordered, duplicate-free modifier set
    pub modifiers: Vec<Modifier>,
    /// Printable character or a symbolic name ("Enter", "Tab", "F1", ...)
    pub symbol: String,
    pub is_repeat: bool,
}

/// The window judged to be active at the moment of resolution.
///
/// May be stale between resolutions; the throttle in the capture loop trades
/// freshness for input-path latency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowContext {
    pub owner_name: String,
    /// Possibly empty; not every window publishes a title
    pub title: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Consumer hook slots invoked synchronously from the capture thread.
///
/// Each slot defaults to a no-op until a consumer installs real behavior.
/// Swapping hooks is expected only before `run()`; consumers must not block
/// inside a hook.
pub struct Hooks {
    pub key_hook: Box<dyn FnMut(&KeyEvent) + Send>,
    /// `button` codes: 1 left, 3 right, 4/5 vertical scroll, 6/7 horizontal
    pub mouse_button_hook: Box<dyn FnMut(u8, f64, f64) + Send>,
    pub mouse_move_hook: Box<dyn FnMut(f64, f64) + Send>,
    pub screen_hook: Box<dyn FnMut(&WindowContext) + Send>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            key_hook: Box::new(|_| {}),
            mouse_button_hook: Box::new(|_, _, _| {}),
            mouse_move_hook: Box::new(|_, _| {}),
            screen_hook: Box::new(|_| {}),
        }
    }
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Hooks { .. }")
    }
}
