// ── Intent -> payload encoding ──
//
// Pure translation from `InputIntent` to `CommandPayload`. Never touches
// the transport: every failure here means nothing was sent.

use waldo_transport::CommandPayload;

use super::keymap;
use super::{GestureKind, InputIntent};
use crate::error::EncodeError;
use crate::model::SessionSettings;

/// Swipe travel as percent of the mirrored surface.
const SWIPE_TRAVEL_PERCENT: f32 = 60.0;

/// Setting value at which gesture scaling is 1.0 (the defaults).
const SCROLL_SPEED_BASELINE: f32 = 30.0;
const SENSITIVITY_BASELINE: f32 = 50.0;

/// Encode one intent against the current settings.
///
/// Touch coordinates are percent of the mirrored surface on each axis,
/// so payloads are independent of whatever pixel size the consumer
/// renders at. Gesture magnitudes scale with the scroll-speed and
/// touch-sensitivity settings.
pub fn encode(
    intent: &InputIntent,
    settings: &SessionSettings,
) -> Result<CommandPayload, EncodeError> {
    match intent {
        InputIntent::Touch { x, y } => {
            check_axis("x", *x)?;
            check_axis("y", *y)?;
            Ok(CommandPayload::Tap { x: *x, y: *y })
        }

        InputIntent::Key { name, modifiers } => {
            let key = keymap::resolve(name).ok_or_else(|| EncodeError::UnsupportedKey {
                name: name.clone(),
            })?;
            Ok(CommandPayload::Key {
                code: key.code,
                meta: keymap::meta_mask(*modifiers, key.shifted),
            })
        }

        InputIntent::Gesture(kind) => Ok(encode_gesture(*kind, settings)),

        InputIntent::Text(text) => {
            if text.trim().is_empty() {
                return Err(EncodeError::EmptyText);
            }
            Ok(CommandPayload::TypeText { text: text.clone() })
        }
    }
}

/// `true` when a payload may be dispatched while streaming is paused.
///
/// Only system-level keys qualify: power and the volume pair act on the
/// device itself, not on the mirrored surface.
pub(crate) fn is_system_payload(payload: &CommandPayload) -> bool {
    matches!(payload, CommandPayload::Key { code, .. } if keymap::is_system_code(*code))
}

fn check_axis(axis: &'static str, value: f32) -> Result<(), EncodeError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(EncodeError::CoordinateOutOfRange { axis, value })
    }
}

fn encode_gesture(kind: GestureKind, settings: &SessionSettings) -> CommandPayload {
    match kind {
        GestureKind::SwipeUp | GestureKind::SwipeDown => {
            let speed = f32::from(settings.scroll_speed) / SCROLL_SPEED_BASELINE;
            let dy = match kind {
                GestureKind::SwipeUp => -SWIPE_TRAVEL_PERCENT,
                _ => SWIPE_TRAVEL_PERCENT,
            };
            CommandPayload::Swipe { dx: 0.0, dy, speed }
        }
        GestureKind::PinchIn | GestureKind::PinchOut => {
            let magnitude = f32::from(settings.touch_sensitivity) / SENSITIVITY_BASELINE;
            let scale = match kind {
                GestureKind::PinchIn => -magnitude,
                _ => magnitude,
            };
            CommandPayload::Pinch { scale }
        }
    }
}
