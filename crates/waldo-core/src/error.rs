// ── Session error types ──
//
// User-facing errors from waldo-core. Consumers never see channel or
// wire failures directly -- the `From<TransportError>` impl translates
// transport faults into domain-appropriate variants.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::model::SettingKind;
use waldo_transport::TransportError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum SessionError {
    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Operation {operation} not valid while {state}")]
    InvalidState { operation: String, state: String },

    #[error("No device connected")]
    NotConnected,

    #[error("Streaming is paused")]
    NotStreaming,

    #[error("Connection attempt timed out after {}s", after.as_secs_f32())]
    Timeout { after: Duration },

    // ── Lookup errors ────────────────────────────────────────────────
    #[error("Unknown device: {id}")]
    UnknownDevice { id: String },

    #[error("Unknown app: {package}")]
    UnknownApp { package: String },

    #[error("Unknown notification: {id}")]
    UnknownNotification { id: String },

    #[error("Unknown transfer: {id}")]
    UnknownTransfer { id: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Setting {setting} out of range: {value} (allowed {min}-{max})")]
    OutOfRange {
        setting: SettingKind,
        value: u16,
        min: u16,
        max: u16,
    },

    #[error("An uninstall is already pending for {package}")]
    PendingAction { package: String },

    #[error("Operation not supported: {operation} ({reason})")]
    Unsupported { operation: String, reason: String },

    #[error("Validation failed: {message}")]
    Validation { message: String },

    /// Input intent could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    // ── Transport errors (wrapped, not exposed raw) ──────────────────
    #[error("Transport error: {0}")]
    Transport(TransportError),
}

impl SessionError {
    pub(crate) fn invalid_state(operation: &str, state: impl fmt::Display) -> Self {
        Self::InvalidState {
            operation: operation.into(),
            state: state.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout { after } => Self::Timeout { after },
            other => Self::Transport(other),
        }
    }
}

/// Errors from translating an input intent into a wire payload.
///
/// Pure validation failures: nothing has been sent when one of these
/// comes back.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("Unsupported key: {name:?}")]
    UnsupportedKey { name: String },

    #[error("Coordinate out of range: {axis} = {value} (expected 0-100)")]
    CoordinateOutOfRange { axis: &'static str, value: f32 },

    #[error("Refusing to send empty text")]
    EmptyText,
}
