// ── Transfer coordination ──
//
// Bookkeeping for concurrent file transfers: monotonic progress,
// cooperative cancellation, and stall detection. The coordinator never
// talks to the transport itself — it hands back the payloads the
// session should send.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, warn};

use waldo_transport::{CommandPayload, FileRef, TransferDirection, TransferId, TransferOutcome};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::model::{Transfer, TransferStatus};
use crate::store::SessionStore;

/// Reason recorded when the stall sweeper fails a transfer.
const STALL_REASON: &str = "transfer stalled";

/// Tracks every transfer of a session, live and archived.
///
/// Transfers are independent: each progresses (or fails) on its own,
/// sharing nothing with its siblings beyond the registry they live in.
pub(crate) struct TransferCoordinator {
    store: Arc<SessionStore>,

    /// Last progress activity per live transfer, for stall detection.
    activity: DashMap<TransferId, Instant>,
}

impl TransferCoordinator {
    pub(crate) fn new(store: Arc<SessionStore>) -> Self {
        Self {
            store,
            activity: DashMap::new(),
        }
    }

    // ── Operator-initiated operations ────────────────────────────────

    /// Register a fresh queued transfer and build its start payload.
    pub(crate) fn start(
        &self,
        direction: TransferDirection,
        file: FileRef,
    ) -> (TransferId, CommandPayload) {
        let id = TransferId::new();
        let total_bytes = file.size_bytes;

        self.store.transfers.upsert(Transfer {
            id,
            file: file.clone(),
            direction,
            status: TransferStatus::Queued,
            transferred_bytes: 0,
            total_bytes,
            started_at: Utc::now(),
        });
        self.activity.insert(id, Instant::now());

        debug!(transfer = %id, ?direction, file = %file.name, "transfer queued");
        (id, CommandPayload::TransferStart { id, direction, file })
    }

    /// Cancel a live transfer, returning the abort payload to send.
    ///
    /// Cancelling a terminal transfer is an error: the handle never
    /// re-enters a live state, so there is nothing to cancel.
    pub(crate) fn cancel(&self, id: TransferId) -> Result<CommandPayload, SessionError> {
        let transfer = self.require(id)?;
        if transfer.status.is_terminal() {
            return Err(SessionError::invalid_state("cancel", &transfer.status));
        }

        self.store
            .transfers
            .update(&id.to_string(), |t| t.status = TransferStatus::Cancelled);
        self.activity.remove(&id);

        debug!(transfer = %id, "transfer cancelled");
        Ok(CommandPayload::TransferAbort { id })
    }

    /// Forget a transfer whose start payload never left the session.
    /// The handle is void: it never existed as far as the device or
    /// the archive are concerned.
    pub(crate) fn discard(&self, id: TransferId) {
        self.store.transfers.remove(&id.to_string());
        self.activity.remove(&id);
        debug!(transfer = %id, "unstarted transfer discarded");
    }

    /// Progress as a whole percentage, 0-100.
    pub(crate) fn progress_percent(&self, id: TransferId) -> Result<u8, SessionError> {
        Ok(self.require(id)?.progress_percent())
    }

    // ── Device-driven events ─────────────────────────────────────────

    /// Apply a progress event. Activates queued transfers; events for
    /// terminal handles or that would regress progress are dropped.
    pub(crate) fn apply_progress(&self, id: TransferId, transferred: u64, total: Option<u64>) {
        let key = id.to_string();
        let Some(transfer) = self.store.transfers.get(&key) else {
            debug!(transfer = %id, "progress for unknown transfer ignored");
            return;
        };
        if transfer.status.is_terminal() {
            debug!(transfer = %id, status = %transfer.status, "late progress ignored");
            return;
        }
        if transferred < transfer.transferred_bytes {
            debug!(
                transfer = %id,
                have = transfer.transferred_bytes,
                got = transferred,
                "regressing progress ignored"
            );
            return;
        }

        self.store.transfers.update(&key, |t| {
            t.status = TransferStatus::Active;
            t.transferred_bytes = transferred;
            if t.total_bytes.is_none() {
                t.total_bytes = total;
            }
        });
        self.activity.insert(id, Instant::now());
    }

    /// Apply a terminal event. Ignored for handles the session already
    /// settled (a cancelled transfer stays cancelled).
    pub(crate) fn apply_terminal(&self, id: TransferId, outcome: TransferOutcome) {
        let key = id.to_string();
        let Some(transfer) = self.store.transfers.get(&key) else {
            debug!(transfer = %id, "terminal event for unknown transfer ignored");
            return;
        };
        if transfer.status.is_terminal() {
            debug!(transfer = %id, status = %transfer.status, "late terminal event ignored");
            return;
        }

        self.store.transfers.update(&key, |t| match &outcome {
            TransferOutcome::Completed => {
                t.status = TransferStatus::Completed;
                if let Some(total) = t.total_bytes {
                    t.transferred_bytes = total;
                }
            }
            TransferOutcome::Failed { reason } => {
                t.status = TransferStatus::Failed {
                    reason: reason.clone(),
                };
            }
        });
        self.activity.remove(&id);
    }

    // ── Session-driven bookkeeping ───────────────────────────────────

    /// Fail every live transfer, e.g. when the connection goes away.
    pub(crate) fn fail_all_live(&self, reason: &str) {
        for key in self.store.transfers.keys() {
            let Some(transfer) = self.store.transfers.get(&key) else {
                continue;
            };
            if transfer.status.is_terminal() {
                continue;
            }
            self.store.transfers.update(&key, |t| {
                t.status = TransferStatus::Failed {
                    reason: reason.to_owned(),
                };
            });
            self.activity.remove(&transfer.id);
            warn!(transfer = %transfer.id, reason, "live transfer failed");
        }
    }

    /// Fail active transfers with no progress inside the inactivity
    /// window, returning the abort payloads to send cooperatively.
    pub(crate) fn sweep_stalled(&self, config: &SessionConfig) -> Vec<CommandPayload> {
        let deadline = config.transfer_inactivity_timeout;
        let now = Instant::now();

        let stalled: Vec<TransferId> = self
            .activity
            .iter()
            .filter(|entry| now.duration_since(*entry.value()) >= deadline)
            .map(|entry| *entry.key())
            .collect();

        let mut aborts = Vec::new();
        for id in stalled {
            let key = id.to_string();
            let is_active = self
                .store
                .transfers
                .get(&key)
                .is_some_and(|t| t.status == TransferStatus::Active);
            if !is_active {
                // Queued transfers have not started on the device;
                // leave them to the operator.
                continue;
            }
            self.store.transfers.update(&key, |t| {
                t.status = TransferStatus::Failed {
                    reason: STALL_REASON.to_owned(),
                };
            });
            self.activity.remove(&id);
            warn!(transfer = %id, "transfer stalled, failing");
            aborts.push(CommandPayload::TransferAbort { id });
        }
        aborts
    }

    fn require(&self, id: TransferId) -> Result<Arc<Transfer>, SessionError> {
        self.store
            .transfers
            .get(&id.to_string())
            .ok_or_else(|| SessionError::UnknownTransfer { id: id.to_string() })
    }
}
