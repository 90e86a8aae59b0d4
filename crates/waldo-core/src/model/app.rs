// ── App registry domain types ──

use std::fmt;

use serde::{Deserialize, Serialize};

/// Run state of an installed app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppStatus {
    Stopped,
    Running,
    Background,
}

impl AppStatus {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running | Self::Background)
    }

    /// Whether a single-status change from `self` to `next` is a legal
    /// lifecycle step. An app only reaches the background through the
    /// foreground, so `Stopped -> Background` is not.
    pub(crate) fn may_become(self, next: Self) -> bool {
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Self::Stopped, Self::Running)
                | (Self::Running, Self::Background)
                | (Self::Running, Self::Stopped)
                | (Self::Background, Self::Running)
                | (Self::Background, Self::Stopped)
        )
    }
}

impl fmt::Display for AppStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Running => f.write_str("running"),
            Self::Background => f.write_str("background"),
        }
    }
}

/// An installed app as the session tracks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppEntry {
    /// Package identifier, unique per device. Registry key.
    pub package: String,
    /// Display label, e.g. `"Maps"`.
    pub name: String,
    pub version: String,
    pub size_bytes: u64,
    pub status: AppStatus,
    /// An uninstall has been requested locally and not yet acknowledged
    /// by the device. Entries in this state refuse further actions.
    pub pending_removal: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn background_is_only_reachable_from_running() {
        assert!(AppStatus::Running.may_become(AppStatus::Background));
        assert!(!AppStatus::Stopped.may_become(AppStatus::Background));
    }

    #[test]
    fn same_status_is_a_legal_noop() {
        assert!(AppStatus::Stopped.may_become(AppStatus::Stopped));
    }
}
