// ── Input intents ──
//
// What a consumer wants to do on the device, before wire encoding.
// Intents are pure data; `encode` turns them into payloads and is the
// only place that reads settings.

mod encode;
pub(crate) mod keymap;

use serde::{Deserialize, Serialize};

pub use encode::encode;
pub(crate) use encode::is_system_payload;

/// Modifier keys held during a key press.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct KeyModifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyModifiers {
    pub const NONE: Self = Self {
        shift: false,
        alt: false,
        ctrl: false,
        meta: false,
    };
}

/// The fixed gesture shapes the session can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureKind {
    SwipeUp,
    SwipeDown,
    PinchIn,
    PinchOut,
}

/// One user input, expressed against the mirrored surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputIntent {
    /// Tap at normalized coordinates, percent of the mirrored surface
    /// on each axis (0-100).
    Touch { x: f32, y: f32 },

    /// Press a symbolic key: `"Enter"`, `"ArrowUp"`, `"VolumeDown"`,
    /// or a single character like `"a"` or `"7"`.
    Key {
        name: String,
        modifiers: KeyModifiers,
    },

    /// One of the fixed gestures.
    Gesture(GestureKind),

    /// Type a text string into the focused field.
    Text(String),
}

impl InputIntent {
    /// Tap at `(x, y)` percent coordinates.
    pub fn tap(x: f32, y: f32) -> Self {
        Self::Touch { x, y }
    }

    /// Press a key with no modifiers.
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key {
            name: name.into(),
            modifiers: KeyModifiers::NONE,
        }
    }
}
