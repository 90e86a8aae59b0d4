// ── Logical key name -> Android keycode table ──
//
// The device end consumes raw Android keycodes and meta-state masks.
// This table is the only place that knows them.

use super::KeyModifiers;

// Android meta-state masks.
const META_SHIFT_ON: u32 = 0x1;
const META_ALT_ON: u32 = 0x2;
const META_CTRL_ON: u32 = 0x1000;
const META_META_ON: u32 = 0x1_0000;

// Keycodes referenced outside the table.
pub(crate) const KEYCODE_VOLUME_UP: u16 = 24;
pub(crate) const KEYCODE_VOLUME_DOWN: u16 = 25;
pub(crate) const KEYCODE_POWER: u16 = 26;

/// A resolved key: the Android keycode plus whether the symbol itself
/// needs shift (uppercase letters).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResolvedKey {
    pub code: u16,
    pub shifted: bool,
}

impl ResolvedKey {
    fn plain(code: u16) -> Self {
        Self {
            code,
            shifted: false,
        }
    }
}

/// Resolve a symbolic key name to its keycode.
///
/// Names are either a fixed symbolic set (`"Enter"`, `"ArrowUp"`,
/// `"VolumeDown"`, ...) or a single printable character. Anything else
/// is unsupported.
pub(crate) fn resolve(name: &str) -> Option<ResolvedKey> {
    let code = match name {
        // Navigation
        "Back" => 4,
        "Home" => 3,
        "AppSwitch" => 187,
        // Arrows map to the d-pad
        "ArrowUp" => 19,
        "ArrowDown" => 20,
        "ArrowLeft" => 21,
        "ArrowRight" => 22,
        // Editing
        "Enter" => 66,
        "Tab" => 61,
        "Escape" => 111,
        "Backspace" => 67,
        "Space" | " " => 62,
        // System keys, dispatchable even while streaming is paused
        "VolumeUp" => KEYCODE_VOLUME_UP,
        "VolumeDown" => KEYCODE_VOLUME_DOWN,
        "Power" => KEYCODE_POWER,
        _ => return resolve_char(name),
    };
    Some(ResolvedKey::plain(code))
}

/// Single printable characters: digits and latin letters.
fn resolve_char(name: &str) -> Option<ResolvedKey> {
    let mut chars = name.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    match c {
        '0'..='9' => Some(ResolvedKey::plain(7 + (c as u16 - '0' as u16))),
        'a'..='z' => Some(ResolvedKey::plain(29 + (c as u16 - 'a' as u16))),
        'A'..='Z' => Some(ResolvedKey {
            code: 29 + (c as u16 - 'A' as u16),
            shifted: true,
        }),
        _ => None,
    }
}

/// Build the Android meta-state mask for a key press.
pub(crate) fn meta_mask(modifiers: KeyModifiers, shifted: bool) -> u32 {
    let mut meta = 0;
    if modifiers.shift || shifted {
        meta |= META_SHIFT_ON;
    }
    if modifiers.alt {
        meta |= META_ALT_ON;
    }
    if modifiers.ctrl {
        meta |= META_CTRL_ON;
    }
    if modifiers.meta {
        meta |= META_META_ON;
    }
    meta
}

/// Keys a device honors regardless of streaming state.
pub(crate) fn is_system_code(code: u16) -> bool {
    matches!(code, KEYCODE_VOLUME_UP | KEYCODE_VOLUME_DOWN | KEYCODE_POWER)
}
