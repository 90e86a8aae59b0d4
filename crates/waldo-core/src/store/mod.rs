// ── Reactive session store ──
//
// Thread-safe storage for everything the session mirrors from the
// device: discovered devices, installed apps, the notification shade,
// and file transfers. Mutations are broadcast to subscribers via
// `watch` channels.

mod apps;
mod notifications;
mod registry;

use std::sync::Arc;

use tracing::debug;

use waldo_transport::{DeviceDescriptor, DeviceId, TelemetryFrame};

use crate::model::{AppEntry, Device, NotificationEntry, Transfer};
use crate::stream::{Snapshot, Subscription};
pub use registry::Keyed;
pub(crate) use registry::Registry;

// ── Registry keys ────────────────────────────────────────────────────

impl Keyed for Device {
    fn key(&self) -> String {
        self.id.as_str().to_owned()
    }
}

impl Keyed for AppEntry {
    fn key(&self) -> String {
        self.package.clone()
    }
}

impl Keyed for NotificationEntry {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Keyed for Transfer {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Central reactive store for one session's mirrored device state.
///
/// All reads are lock-free snapshots; writes go through per-registry
/// `DashMap`s. Only the session mutates it — consumers get the snapshot
/// and subscription accessors.
pub struct SessionStore {
    pub(crate) devices: Registry<Device>,
    pub(crate) apps: Registry<AppEntry>,
    pub(crate) notifications: Registry<NotificationEntry>,
    pub(crate) transfers: Registry<Transfer>,
}

impl SessionStore {
    pub(crate) fn new() -> Self {
        Self {
            devices: Registry::new(),
            apps: Registry::new(),
            notifications: Registry::new(),
            transfers: Registry::new(),
        }
    }

    // ── Devices ──────────────────────────────────────────────────────

    /// Record a discovery result. Repeated ids update in place.
    pub(crate) fn upsert_discovered(&self, descriptor: DeviceDescriptor) {
        self.devices.upsert(Device::from(descriptor));
    }

    /// Apply a telemetry frame to the active device.
    pub(crate) fn apply_telemetry(&self, device: &DeviceId, frame: &TelemetryFrame) {
        let updated = self.devices.update(device.as_str(), |d| {
            d.battery_percent = Some(frame.battery_percent);
            d.signal_bars = frame.signal_bars;
        });
        if updated.is_none() {
            debug!(device = %device, "telemetry for unknown device ignored");
        }
    }

    pub(crate) fn device(&self, id: &DeviceId) -> Option<Arc<Device>> {
        self.devices.get(id.as_str())
    }

    /// Drop everything scoped to the connection. The transfer archive
    /// survives so terminal transfers stay inspectable.
    pub(crate) fn clear_session_scoped(&self) {
        self.devices.clear();
        self.apps.clear();
        self.notifications.clear();
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn devices_snapshot(&self) -> Snapshot<Device> {
        self.devices.snapshot()
    }

    pub fn apps_snapshot(&self) -> Snapshot<AppEntry> {
        self.apps.snapshot()
    }

    pub fn notifications_snapshot(&self) -> Snapshot<NotificationEntry> {
        self.notifications.snapshot()
    }

    pub fn transfers_snapshot(&self) -> Snapshot<Transfer> {
        self.transfers.snapshot()
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_devices(&self) -> Subscription<Device> {
        Subscription::new(self.devices.subscribe())
    }

    pub fn subscribe_apps(&self) -> Subscription<AppEntry> {
        Subscription::new(self.apps.subscribe())
    }

    pub fn subscribe_notifications(&self) -> Subscription<NotificationEntry> {
        Subscription::new(self.notifications.subscribe())
    }

    pub fn subscribe_transfers(&self) -> Subscription<Transfer> {
        Subscription::new(self.transfers.subscribe())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
