// ── App registry reconciliation ──
//
// Local operator actions apply optimistically; device-pushed state is
// authoritative and overwrites on conflict. The `pending_removal` flag
// is the one piece of purely local state an authoritative inventory
// must not clobber: it marks an in-flight uninstall, not device state.

use std::collections::HashSet;

use tracing::{debug, warn};

use waldo_transport::{AppInfo, AppStateChange};

use super::SessionStore;
use crate::error::SessionError;
use crate::model::{AppEntry, AppStatus};

impl SessionStore {
    // ── Optimistic local actions ─────────────────────────────────────

    /// Apply a launch optimistically: `Stopped|Background -> Running`.
    pub(crate) fn launch_local(&self, package: &str) -> Result<(), SessionError> {
        self.transition_local("launch", package, AppStatus::Running)
    }

    /// Apply a stop optimistically: `Running|Background -> Stopped`.
    pub(crate) fn stop_local(&self, package: &str) -> Result<(), SessionError> {
        self.transition_local("stop", package, AppStatus::Stopped)
    }

    fn transition_local(
        &self,
        operation: &str,
        package: &str,
        target: AppStatus,
    ) -> Result<(), SessionError> {
        let entry = self.require_actionable(package)?;
        if !entry.status.may_become(target) {
            return Err(SessionError::invalid_state(operation, entry.status));
        }
        self.apps.update(package, |app| app.status = target);
        Ok(())
    }

    /// Mark an entry pending removal. The entry stays listed and refuses
    /// further actions until the device acknowledges the uninstall.
    pub(crate) fn begin_uninstall(&self, package: &str) -> Result<(), SessionError> {
        self.require_actionable(package)?;
        self.apps.update(package, |app| app.pending_removal = true);
        Ok(())
    }

    fn require_actionable(&self, package: &str) -> Result<std::sync::Arc<AppEntry>, SessionError> {
        let entry = self
            .apps
            .get(package)
            .ok_or_else(|| SessionError::UnknownApp {
                package: package.to_owned(),
            })?;
        if entry.pending_removal {
            return Err(SessionError::PendingAction {
                package: package.to_owned(),
            });
        }
        Ok(entry)
    }

    // ── Authoritative device pushes ──────────────────────────────────

    pub(crate) fn apply_app_change(&self, change: AppStateChange) {
        match change {
            AppStateChange::Status { package, state } => {
                self.apply_app_status(&package, state.into());
            }
            AppStateChange::Inventory { apps } => self.apply_app_inventory(apps),
            AppStateChange::Removed { package } => {
                if self.apps.remove(&package).is_some() {
                    debug!(package, "app removed by device");
                }
            }
        }
    }

    /// Single-status push. Overwrites any optimistic value, but a push
    /// that would skip a lifecycle step (e.g. `Stopped -> Background`)
    /// is ignored as out-of-order noise.
    fn apply_app_status(&self, package: &str, status: AppStatus) {
        let Some(entry) = self.apps.get(package) else {
            debug!(package, "status for unknown app ignored");
            return;
        };
        if !entry.status.may_become(status) {
            warn!(
                package,
                from = %entry.status,
                to = %status,
                "illegal app status push ignored"
            );
            return;
        }
        self.apps.update(package, |app| app.status = status);
    }

    /// Full inventory push: replaces app state wholesale. A snapshot is
    /// not a transition, so the lifecycle-step check does not apply.
    /// Packages absent from the inventory are removed, which doubles as
    /// the uninstall acknowledgement.
    fn apply_app_inventory(&self, apps: Vec<AppInfo>) {
        let listed: HashSet<String> = apps.iter().map(|a| a.package.clone()).collect();

        for info in apps {
            let pending = self
                .apps
                .get(&info.package)
                .is_some_and(|existing| existing.pending_removal);
            let mut entry = AppEntry::from(info);
            entry.pending_removal = pending;
            self.apps.upsert(entry);
        }

        for package in self.apps.keys() {
            if !listed.contains(&package) {
                self.apps.remove(&package);
            }
        }
    }
}
