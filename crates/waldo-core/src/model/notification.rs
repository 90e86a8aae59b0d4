// ── Notification domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse notification category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationCategory {
    Message,
    Email,
    Call,
    Calendar,
    Other,
}

impl NotificationCategory {
    /// Only conversation-style notifications accept inline replies.
    pub fn is_repliable(self) -> bool {
        matches!(self, Self::Message)
    }
}

/// A notification in the session's mirror of the device shade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEntry {
    /// Identifier unique within the shade. Registry key.
    pub id: String,
    /// Posting app's display name.
    pub app: String,
    pub title: String,
    pub body: String,
    pub category: NotificationCategory,
    pub unread: bool,
    pub posted_at: DateTime<Utc>,
}
