//! Commands a session sends to the device end of the link.
//!
//! Every payload is fire-and-forget: the device answers through
//! [`TransportEvent`](crate::event::TransportEvent) pushes, never through
//! a response channel.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Transfer identity ────────────────────────────────────────────────

/// Opaque handle for a file transfer, minted by the session when the
/// transfer starts and echoed by the device in progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(Uuid);

impl TransferId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransferId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Which way the bytes move, from the session's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    /// Session -> device.
    Upload,
    /// Device -> session.
    Download,
}

/// The file a transfer moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub name: String,
    /// Total size if known up front. Downloads may learn it later from
    /// the first progress event.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

impl FileRef {
    pub fn new(name: impl Into<String>, size_bytes: Option<u64>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
        }
    }
}

// ── Capture ──────────────────────────────────────────────────────────

/// Screen capture operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureRequest {
    Screenshot,
    RecordStart,
    RecordStop,
}

// ── CommandPayload ───────────────────────────────────────────────────

/// Everything a session can ask a device to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    // ── Input ────────────────────────────────────────────────────────
    /// Tap at normalized screen coordinates, percent of the mirrored
    /// surface on each axis.
    Tap { x: f32, y: f32 },

    /// Press a key. `code` is an Android keycode, `meta` the matching
    /// meta-state mask.
    Key { code: u16, meta: u32 },

    /// Swipe along a vector. `dx`/`dy` are percent of the mirrored
    /// surface; `speed` is an execution-speed factor where 1.0 is the
    /// device default.
    Swipe { dx: f32, dy: f32, speed: f32 },

    /// Pinch gesture. Positive `scale` zooms in, negative zooms out.
    Pinch { scale: f32 },

    /// Type a text string into the focused field.
    TypeText { text: String },

    // ── Capture ──────────────────────────────────────────────────────
    Capture(CaptureRequest),

    // ── Apps ─────────────────────────────────────────────────────────
    LaunchApp { package: String },
    StopApp { package: String },
    UninstallApp { package: String },
    /// Ask the device for a full app inventory. Answered by an
    /// `AppStateChange::Inventory` event.
    RequestAppInventory,

    // ── Notifications ────────────────────────────────────────────────
    DismissNotification { id: String },
    MarkNotificationRead { id: String },
    ReplyNotification { id: String, text: String },
    MarkAllNotificationsRead,
    ClearAllNotifications,

    // ── Transfers ────────────────────────────────────────────────────
    TransferStart {
        id: TransferId,
        direction: TransferDirection,
        file: FileRef,
    },
    TransferAbort { id: TransferId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_ids_are_unique() {
        assert_ne!(TransferId::new(), TransferId::new());
    }

    #[test]
    fn payload_roundtrips_through_serde() {
        let payload = CommandPayload::TransferStart {
            id: TransferId::new(),
            direction: TransferDirection::Download,
            file: FileRef::new("photo.jpg", Some(2_400_000)),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: CommandPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payload);
    }
}
