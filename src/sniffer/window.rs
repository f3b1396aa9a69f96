//! Foreground window resolution.
//!
//! Given the name of the active application, pick the window record that most
//! plausibly is its real foreground window. Some applications expose several
//! window records (overlays, status items, panels); preferring titled windows
//! on the normal layer reduces false matches.

use crate::sniffer::types::WindowContext;

/// One window as reported by the platform's window-list enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowRecord {
    pub owner_name: String,
    /// Empty when the window publishes no title
    pub title: String,
    /// 0 is the normal layer; anything else is an overlay or system element
    pub layer: i32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl WindowRecord {
    fn to_context(&self) -> WindowContext {
        WindowContext {
            owner_name: self.owner_name.clone(),
            title: self.title.clone(),
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    fn is_standard(&self) -> bool {
        self.layer == 0 && !self.title.is_empty()
    }
}

/// Platform view of application activation and on-screen windows.
///
/// Exactly one application is flagged active by the OS at any time; the
/// resolver does not decide activation state itself.
pub trait WindowQuery {
    /// Name of the single currently active application, if any.
    fn active_application(&self) -> Option<String>;

    /// All on-screen windows, desktop elements excluded, in z-order.
    fn list_windows(&self) -> Vec<WindowRecord>;
}

/// Find the foreground window owned by `owner`.
///
/// Titled, normal-layer windows are searched first, everything else second,
/// each partition in original enumeration order. Absence of a match is not an
/// error; the owner may simply have no window on screen.
pub fn resolve(windows: &[WindowRecord], owner: &str) -> Option<WindowContext> {
    let standard = windows.iter().filter(|w| w.is_standard());
    let low_priority = windows.iter().filter(|w| !w.is_standard());
    standard
        .chain(low_priority)
        .find(|w| w.owner_name == owner)
        .map(WindowRecord::to_context)
}
