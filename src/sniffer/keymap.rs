//! Virtual key code and modifier translation.
//!
//! Maps the platform's raw (keycode, modifier bitmask, character) triples to
//! the normalized [`KeyEvent`] model. The platform does not provide a usable
//! name for every key, so non-printable code points are resolved through a
//! static table.

use crate::sniffer::types::{KeyEvent, Modifier};

// Modifier bitmask layout shared by NSEvent modifier flags and CGEvent flags.
pub const FLAG_ALPHA_SHIFT: u64 = 1 << 16;
pub const FLAG_SHIFT: u64 = 1 << 17;
pub const FLAG_CONTROL: u64 = 1 << 18;
pub const FLAG_ALTERNATE: u64 = 1 << 19;
pub const FLAG_COMMAND: u64 = 1 << 20;

/// Key codes whose character representation is unreliable across layouts.
const KEYCODE_RETURN: u16 = 36;
const KEYCODE_DELETE: u16 = 51;

/// Extract the modifier set from a raw bitmask.
///
/// Each bit is tested independently; the result is duplicate-free and always
/// in the order Ctrl, Alt, Cmd, Shift. Shift and alpha-shift (caps lock)
/// collapse into a single `Shift` entry because consumers do not care which
/// variant produced the uppercase.
pub fn modifiers_from_flags(flags: u64) -> Vec<Modifier> {
    let mut modifiers = Vec::new();
    if flags & FLAG_CONTROL != 0 {
        modifiers.push(Modifier::Ctrl);
    }
    if flags & FLAG_ALTERNATE != 0 {
        modifiers.push(Modifier::Alt);
    }
    if flags & FLAG_COMMAND != 0 {
        modifiers.push(Modifier::Cmd);
    }
    if flags & (FLAG_SHIFT | FLAG_ALPHA_SHIFT) != 0 {
        modifiers.push(Modifier::Shift);
    }
    modifiers
}

/// Translate a raw key-down event into a normalized [`KeyEvent`].
///
/// Key codes 36 and 51 are special-cased to "Enter" and "Backspace" before
/// any table lookup; everything else goes through [`symbol_for`]. There is no
/// fallback beyond that: an unmapped character is emitted verbatim.
pub fn translate(keycode: u16, flags: u64, character: &str, is_repeat: bool) -> KeyEvent {
    let symbol = match keycode {
        KEYCODE_RETURN => "Enter".to_string(),
        KEYCODE_DELETE => "Backspace".to_string(),
        _ => symbol_for(character),
    };
    KeyEvent {
        keycode,
        modifiers: modifiers_from_flags(flags),
        symbol,
        is_repeat,
    }
}

/// Resolve a character to its symbolic name, or pass it through unchanged.
pub fn symbol_for(character: &str) -> String {
    let mut chars = character.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => symbol_name(c)
            .map(str::to_string)
            .unwrap_or_else(|| character.to_string()),
        _ => character.to_string(),
    }
}

/// The platform-defined set of non-printable code points.
///
/// The OS reports these keys as characters in the function-key unicode range;
/// it does not offer an API to name them, so the mapping is ours.
fn symbol_name(c: char) -> Option<&'static str> {
    let name = match c {
        '\u{0009}' => "Tab",
        '\u{001b}' => "Escape",
        '\u{f700}' => "Up",
        '\u{f701}' => "Down",
        '\u{f702}' => "Left",
        '\u{f703}' => "Right",
        '\u{f704}' => "F1",
        '\u{f705}' => "F2",
        '\u{f706}' => "F3",
        '\u{f707}' => "F4",
        '\u{f708}' => "F5",
        '\u{f709}' => "F6",
        '\u{f70a}' => "F7",
        '\u{f70b}' => "F8",
        '\u{f70c}' => "F9",
        '\u{f70d}' => "F10",
        '\u{f70e}' => "F11",
        '\u{f70f}' => "F12",
        '\u{f710}' => "F13",
        '\u{f711}' => "F14",
        '\u{f712}' => "F15",
        '\u{f713}' => "F16",
        '\u{f714}' => "F17",
        '\u{f715}' => "F18",
        '\u{f716}' => "F19",
        '\u{f717}' => "F20",
        '\u{f718}' => "F21",
        '\u{f719}' => "F22",
        '\u{f71a}' => "F23",
        '\u{f71b}' => "F24",
        '\u{f71c}' => "F25",
        '\u{f71d}' => "F26",
        '\u{f71e}' => "F27",
        '\u{f71f}' => "F28",
        '\u{f720}' => "F29",
        '\u{f721}' => "F30",
        '\u{f722}' => "F31",
        '\u{f723}' => "F32",
        '\u{f724}' => "F33",
        '\u{f725}' => "F34",
        '\u{f726}' => "F35",
        '\u{f727}' => "Insert",
        '\u{f728}' => "Delete",
        '\u{f729}' => "Home",
        '\u{f72a}' => "Begin",
        '\u{f72b}' => "End",
        '\u{f72c}' => "PageUp",
        '\u{f72d}' => "PageDown",
        '\u{f72e}' => "PrintScreen",
        '\u{f72f}' => "ScrollLock",
        '\u{f730}' => "Pause",
        '\u{f731}' => "SysReq",
        '\u{f732}' => "Break",
        '\u{f733}' => "Reset",
        '\u{f734}' => "Stop",
        '\u{f735}' => "Menu",
        '\u{f736}' => "User",
        '\u{f737}' => "System",
        '\u{f738}' => "Print",
        '\u{f739}' => "ClearLine",
        '\u{f73a}' => "ClearDisplay",
        '\u{f73b}' => "InsertLine",
        '\u{f73c}' => "DeleteLine",
        '\u{f73d}' => "InsertChar",
        '\u{f73e}' => "DeleteChar",
        '\u{f73f}' => "Prev",
        '\u{f740}' => "Next",
        '\u{f741}' => "Select",
        '\u{f742}' => "Execute",
        '\u{f743}' => "Undo",
        '\u{f744}' => "Redo",
        '\u{f745}' => "Find",
        '\u{f746}' => "Help",
        '\u{f747}' => "ModeSwitch",
        _ => return None,
    };
    Some(name)
}
