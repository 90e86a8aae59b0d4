//! Events the device end of the link pushes to the session.
//!
//! Events are authoritative: wherever a session has made an optimistic
//! local edit, the matching event overwrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::device::TelemetryFrame;
use crate::payload::TransferId;

// ── App state ────────────────────────────────────────────────────────

/// Run state of an installed app as the device reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppRunState {
    Running,
    Stopped,
    Background,
}

/// One installed app, as listed in a device inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Package identifier, unique on the device.
    pub package: String,
    /// Display label, e.g. `"Maps"`.
    pub label: String,
    pub version: String,
    pub state: AppRunState,
    pub size_bytes: u64,
}

/// App registry changes pushed by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AppStateChange {
    /// A single app changed run state.
    Status { package: String, state: AppRunState },
    /// Full authoritative inventory. Replaces local app state wholesale.
    Inventory { apps: Vec<AppInfo> },
    /// An app is gone from the device (uninstall acknowledged or
    /// removed on-device).
    Removed { package: String },
}

// ── Notifications ────────────────────────────────────────────────────

/// Coarse notification category. Drives which actions apply: only
/// `Message` notifications accept replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationClass {
    Message,
    Email,
    Call,
    Calendar,
    Other,
}

/// A notification as the device posts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationInfo {
    /// Identifier unique within the device's notification shade.
    pub id: String,
    /// Posting app's display name.
    pub app: String,
    pub title: String,
    pub body: String,
    pub class: NotificationClass,
    pub unread: bool,
    pub posted_at: DateTime<Utc>,
}

/// Notification shade changes pushed by the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NotificationPush {
    /// A notification was posted or re-posted. A repeated id overwrites.
    Posted(NotificationInfo),
    /// A notification left the shade on the device side.
    Dismissed { id: String },
}

// ── Transfers ────────────────────────────────────────────────────────

/// How a transfer ended on the device side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferOutcome {
    Completed,
    Failed { reason: String },
}

// ── TransportEvent ───────────────────────────────────────────────────

/// Everything a device can push to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransportEvent {
    /// Periodic health report.
    Telemetry(TelemetryFrame),

    /// App registry change.
    AppStateChanged(AppStateChange),

    /// Notification shade change.
    NotificationPushed(NotificationPush),

    /// Bytes moved on a transfer. The first progress event also marks
    /// the transfer as started on the device.
    TransferProgress {
        id: TransferId,
        transferred: u64,
        total: Option<u64>,
    },

    /// A transfer reached a terminal state on the device.
    TransferTerminal {
        id: TransferId,
        outcome: TransferOutcome,
    },

    /// The device dropped the link. No further events will arrive.
    Disconnected { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_run_state_uses_lowercase_wire_names() {
        let json = serde_json::to_string(&AppRunState::Background).unwrap();
        assert_eq!(json, "\"background\"");
    }

    #[test]
    fn posted_notification_roundtrips() {
        let event = TransportEvent::NotificationPushed(NotificationPush::Posted(
            NotificationInfo {
                id: "n-1".into(),
                app: "Messages".into(),
                title: "Sarah".into(),
                body: "See you at 6?".into(),
                class: NotificationClass::Message,
                unread: true,
                posted_at: Utc::now(),
            },
        ));
        let json = serde_json::to_string(&event).unwrap();
        let back: TransportEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
