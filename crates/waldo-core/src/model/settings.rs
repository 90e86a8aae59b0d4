// ── Session settings ──
//
// Session-local knobs that shape how input intents are encoded. Values
// outside a setting's bounds are rejected, never clamped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// The five adjustable settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    /// Stream quality, 0-100.
    Quality,
    /// Camera zoom, 100-800 (percent of base focal length).
    Zoom,
    /// Media volume, 0-100.
    Volume,
    /// Pinch gesture sensitivity, 0-100.
    TouchSensitivity,
    /// Swipe gesture speed, 0-100.
    ScrollSpeed,
}

impl SettingKind {
    /// Inclusive bounds for this setting.
    pub fn bounds(self) -> (u16, u16) {
        match self {
            Self::Zoom => (100, 800),
            Self::Quality | Self::Volume | Self::TouchSensitivity | Self::ScrollSpeed => (0, 100),
        }
    }
}

impl fmt::Display for SettingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quality => f.write_str("quality"),
            Self::Zoom => f.write_str("zoom"),
            Self::Volume => f.write_str("volume"),
            Self::TouchSensitivity => f.write_str("touch sensitivity"),
            Self::ScrollSpeed => f.write_str("scroll speed"),
        }
    }
}

/// Current values of all session settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub quality: u16,
    pub zoom: u16,
    pub volume: u16,
    pub touch_sensitivity: u16,
    pub scroll_speed: u16,
}

impl SessionSettings {
    pub fn get(&self, kind: SettingKind) -> u16 {
        match kind {
            SettingKind::Quality => self.quality,
            SettingKind::Zoom => self.zoom,
            SettingKind::Volume => self.volume,
            SettingKind::TouchSensitivity => self.touch_sensitivity,
            SettingKind::ScrollSpeed => self.scroll_speed,
        }
    }

    /// Set one value, rejecting anything outside the setting's bounds.
    pub fn set(&mut self, kind: SettingKind, value: u16) -> Result<(), SessionError> {
        let (min, max) = kind.bounds();
        if value < min || value > max {
            return Err(SessionError::OutOfRange {
                setting: kind,
                value,
                min,
                max,
            });
        }
        match kind {
            SettingKind::Quality => self.quality = value,
            SettingKind::Zoom => self.zoom = value,
            SettingKind::Volume => self.volume = value,
            SettingKind::TouchSensitivity => self.touch_sensitivity = value,
            SettingKind::ScrollSpeed => self.scroll_speed = value,
        }
        Ok(())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            quality: 75,
            zoom: 100,
            volume: 50,
            touch_sensitivity: 50,
            scroll_speed: 30,
        }
    }
}
