// ── Transfer domain types ──

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use waldo_transport::{FileRef, TransferDirection, TransferId};

/// Lifecycle state of a transfer.
///
/// `Queued -> Active` on the first progress event; every other move is
/// into one of the three terminal states, which are never left again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Started locally, no progress from the device yet.
    Queued,
    /// The device has reported progress.
    Active,
    Completed,
    Failed { reason: String },
    Cancelled,
}

impl TransferStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed { .. } | Self::Cancelled)
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Queued => f.write_str("queued"),
            Self::Active => f.write_str("active"),
            Self::Completed => f.write_str("completed"),
            Self::Failed { .. } => f.write_str("failed"),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// One file transfer, live or archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub file: FileRef,
    pub direction: TransferDirection,
    pub status: TransferStatus,
    pub transferred_bytes: u64,
    /// Total size once known, from the file ref or the device's
    /// progress events.
    pub total_bytes: Option<u64>,
    pub started_at: DateTime<Utc>,
}

impl Transfer {
    /// Progress as a whole percentage, 0-100.
    ///
    /// Completed transfers always report 100. Transfers with an unknown
    /// total report 0 until they settle.
    pub fn progress_percent(&self) -> u8 {
        if matches!(self.status, TransferStatus::Completed) {
            return 100;
        }
        match self.total_bytes {
            Some(total) if total > 0 => {
                let percent = self.transferred_bytes.saturating_mul(100) / total;
                u8::try_from(percent.min(100)).unwrap_or(100)
            }
            _ => 0,
        }
    }
}
