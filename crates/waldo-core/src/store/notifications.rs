// ── Notification registry reconciliation ──
//
// Same rule as apps: local actions apply optimistically, device pushes
// are authoritative. A re-posted id overwrites whatever the session
// believed about that notification.

use tracing::debug;

use waldo_transport::NotificationPush;

use super::SessionStore;
use crate::error::SessionError;
use crate::model::NotificationEntry;

impl SessionStore {
    // ── Optimistic local actions ─────────────────────────────────────

    /// Remove a notification locally. The device confirms (or
    /// re-posts) through the event stream.
    pub(crate) fn dismiss_local(&self, id: &str) -> Result<(), SessionError> {
        self.notifications
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| unknown(id))
    }

    /// Clear the unread flag locally.
    pub(crate) fn mark_read_local(&self, id: &str) -> Result<(), SessionError> {
        self.notifications
            .update(id, |n| n.unread = false)
            .map(|_| ())
            .ok_or_else(|| unknown(id))
    }

    /// Validate a reply and mark the entry read.
    ///
    /// Only conversation-style notifications accept replies, and the
    /// reply text must not be blank.
    pub(crate) fn reply_local(&self, id: &str, text: &str) -> Result<(), SessionError> {
        let entry = self.notifications.get(id).ok_or_else(|| unknown(id))?;
        if !entry.category.is_repliable() {
            return Err(SessionError::Unsupported {
                operation: "reply".into(),
                reason: format!("{:?} notifications are not repliable", entry.category),
            });
        }
        if text.trim().is_empty() {
            return Err(SessionError::validation("reply text must not be blank"));
        }
        self.notifications.update(id, |n| n.unread = false);
        Ok(())
    }

    pub(crate) fn mark_all_read_local(&self) {
        for id in self.notifications.keys() {
            self.notifications.update(&id, |n| n.unread = false);
        }
    }

    pub(crate) fn clear_notifications_local(&self) {
        self.notifications.clear();
    }

    // ── Authoritative device pushes ──────────────────────────────────

    pub(crate) fn apply_notification_push(&self, push: NotificationPush) {
        match push {
            NotificationPush::Posted(info) => {
                self.notifications.upsert(NotificationEntry::from(info));
            }
            NotificationPush::Dismissed { id } => {
                if self.notifications.remove(&id).is_none() {
                    debug!(id, "dismissal for unknown notification ignored");
                }
            }
        }
    }
}

fn unknown(id: &str) -> SessionError {
    SessionError::UnknownNotification { id: id.to_owned() }
}
