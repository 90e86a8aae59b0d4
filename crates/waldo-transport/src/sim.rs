//! Scriptable in-memory device, the reference [`DeviceTransport`].
//!
//! `SimDevice` answers discovery with a fixed device list, honors
//! per-device connect scripts (accept, delay, reject, stall), records
//! every command the session sends, and lets tests inject arbitrary
//! [`TransportEvent`]s through a [`SimHandle`]. With auto-transfers
//! enabled it also answers `TransferStart` with a scripted progress run
//! to completion, cooperatively honoring `TransferAbort`.
//!
//! One connection at a time: a second `connect` replaces the injection
//! target of the first.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, mpsc};

use crate::device::{ConnectionMethod, DeviceDescriptor, DeviceId};
use crate::error::TransportError;
use crate::event::{TransferOutcome, TransportEvent};
use crate::handle::{
    ConnectionHandle, DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY, TransportLink,
};
use crate::payload::{CommandPayload, TransferId};
use crate::{DeviceStream, DeviceTransport};

// ── Scripted timing ──────────────────────────────────────────────────

/// Pause between discovery yields, mimicking scan cadence.
const SCAN_YIELD_DELAY: Duration = Duration::from_millis(10);

/// Auto-transfer script: ten progress steps, one tick apart.
const TRANSFER_SCRIPT_STEPS: u64 = 10;
const TRANSFER_SCRIPT_TICK: Duration = Duration::from_millis(5);

/// Byte total assumed when the session starts a transfer without a size.
const DEFAULT_TRANSFER_TOTAL: u64 = 1_000_000;

// ── Connect scripting ────────────────────────────────────────────────

/// What the simulated device does when the session connects to it.
#[derive(Debug, Clone)]
pub enum ConnectBehavior {
    /// Accept immediately. The default for unscripted devices.
    Accept,
    /// Accept after a delay. Delays past the caller's deadline turn
    /// into a timeout, same as [`Stall`](Self::Stall).
    AcceptAfter(Duration),
    /// Refuse the connection.
    Reject { reason: String },
    /// Never answer. The connect attempt runs into its deadline.
    Stall,
}

// ── SimDevice ────────────────────────────────────────────────────────

struct SimInner {
    devices: Vec<DeviceDescriptor>,
    behaviors: DashMap<DeviceId, ConnectBehavior>,
    auto_transfers: AtomicBool,
    sent: Mutex<Vec<CommandPayload>>,
    aborted: DashMap<TransferId, ()>,
    event_tx: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

/// Scriptable in-memory transport for tests and demos.
pub struct SimDevice {
    inner: Arc<SimInner>,
}

impl SimDevice {
    /// A simulated network holding the given devices.
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            inner: Arc::new(SimInner {
                devices,
                behaviors: DashMap::new(),
                auto_transfers: AtomicBool::new(false),
                sent: Mutex::new(Vec::new()),
                aborted: DashMap::new(),
                event_tx: Mutex::new(None),
            }),
        }
    }

    /// Script what happens when the session connects to `device`.
    pub fn on_connect(&self, device: impl Into<DeviceId>, behavior: ConnectBehavior) {
        self.inner.behaviors.insert(device.into(), behavior);
    }

    /// Answer `TransferStart` commands with a scripted progress run.
    pub fn set_auto_transfers(&self, enabled: bool) {
        self.inner.auto_transfers.store(enabled, Ordering::Relaxed);
    }

    /// Control handle for recording assertions and event injection.
    pub fn handle(&self) -> SimHandle {
        SimHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait::async_trait]
impl DeviceTransport for SimDevice {
    async fn discover(&self) -> Result<DeviceStream, TransportError> {
        let devices = self.inner.devices.clone();
        Ok(Box::pin(async_stream::stream! {
            for device in devices {
                tokio::time::sleep(SCAN_YIELD_DELAY).await;
                yield device;
            }
        }))
    }

    async fn connect(
        &self,
        device: &DeviceId,
        timeout: Duration,
    ) -> Result<ConnectionHandle, TransportError> {
        if !self.inner.devices.iter().any(|d| d.id == *device) {
            return Err(TransportError::Unreachable {
                device: device.to_string(),
            });
        }

        let behavior = self
            .inner
            .behaviors
            .get(device)
            .map(|entry| entry.value().clone())
            .unwrap_or(ConnectBehavior::Accept);

        match behavior {
            ConnectBehavior::Accept => {}
            ConnectBehavior::AcceptAfter(delay) => {
                if tokio::time::timeout(timeout, tokio::time::sleep(delay))
                    .await
                    .is_err()
                {
                    return Err(TransportError::Timeout { after: timeout });
                }
            }
            ConnectBehavior::Reject { reason } => {
                return Err(TransportError::Rejected {
                    device: device.to_string(),
                    reason,
                });
            }
            ConnectBehavior::Stall => {
                // A stalled device never answers; surface the deadline.
                tokio::time::sleep(timeout).await;
                return Err(TransportError::Timeout { after: timeout });
            }
        }

        let (handle, link) =
            ConnectionHandle::channel(DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY);
        *self.inner.event_tx.lock().await = Some(link.events.clone());

        let inner = Arc::clone(&self.inner);
        tokio::spawn(drive_link(inner, link));

        tracing::debug!(device = %device, "sim device connected");
        Ok(handle)
    }
}

// ── SimHandle ────────────────────────────────────────────────────────

/// Test-side control surface for a [`SimDevice`].
#[derive(Clone)]
pub struct SimHandle {
    inner: Arc<SimInner>,
}

impl SimHandle {
    /// Everything the session has sent over the current link, in order.
    pub async fn sent(&self) -> Vec<CommandPayload> {
        self.inner.sent.lock().await.clone()
    }

    /// Forget recorded commands.
    pub async fn clear_sent(&self) {
        self.inner.sent.lock().await.clear();
    }

    /// Push an event to the connected session, as the device would.
    ///
    /// Fails with [`TransportError::ChannelClosed`] when no link is up.
    pub async fn inject(&self, event: TransportEvent) -> Result<(), TransportError> {
        let guard = self.inner.event_tx.lock().await;
        let Some(tx) = guard.as_ref() else {
            return Err(TransportError::ChannelClosed);
        };
        tx.send(event)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

// ── Link driver ──────────────────────────────────────────────────────

/// Per-connection task: record commands, run transfer scripts, exit on
/// cancellation.
async fn drive_link(inner: Arc<SimInner>, mut link: TransportLink) {
    loop {
        tokio::select! {
            biased;
            _ = link.cancel.cancelled() => break,
            command = link.commands.recv() => {
                let Some(command) = command else { break };
                handle_command(&inner, &link.events, command).await;
            }
        }
    }
    tracing::debug!("sim link driver exiting");
}

async fn handle_command(
    inner: &Arc<SimInner>,
    events: &mpsc::Sender<TransportEvent>,
    command: CommandPayload,
) {
    match &command {
        CommandPayload::TransferStart { id, file, .. }
            if inner.auto_transfers.load(Ordering::Relaxed) =>
        {
            let total = file.size_bytes.unwrap_or(DEFAULT_TRANSFER_TOTAL);
            tokio::spawn(run_transfer_script(
                Arc::clone(inner),
                events.clone(),
                *id,
                total,
            ));
        }
        CommandPayload::TransferAbort { id } => {
            inner.aborted.insert(*id, ());
        }
        _ => {}
    }
    inner.sent.lock().await.push(command);
}

/// Drive one transfer from first progress to completion, stopping early
/// if the session aborts it.
async fn run_transfer_script(
    inner: Arc<SimInner>,
    events: mpsc::Sender<TransportEvent>,
    id: TransferId,
    total: u64,
) {
    for step in 1..=TRANSFER_SCRIPT_STEPS {
        tokio::time::sleep(TRANSFER_SCRIPT_TICK).await;
        if inner.aborted.contains_key(&id) {
            tracing::debug!(transfer = %id, "sim transfer aborted mid-script");
            return;
        }
        let progress = TransportEvent::TransferProgress {
            id,
            transferred: total * step / TRANSFER_SCRIPT_STEPS,
            total: Some(total),
        };
        if events.send(progress).await.is_err() {
            return;
        }
    }
    let _ = events
        .send(TransportEvent::TransferTerminal {
            id,
            outcome: TransferOutcome::Completed,
        })
        .await;
}

// ── Sample data ──────────────────────────────────────────────────────

/// A small device fleet for demos and tests.
pub fn sample_devices() -> Vec<DeviceDescriptor> {
    vec![
        DeviceDescriptor {
            id: DeviceId::from("galaxy-s23"),
            name: "Samsung Galaxy S23".into(),
            os: "Android 14".into(),
            method: ConnectionMethod::Wifi,
            signal_bars: 4,
        },
        DeviceDescriptor {
            id: DeviceId::from("pixel-7-pro"),
            name: "Pixel 7 Pro".into(),
            os: "Android 13".into(),
            method: ConnectionMethod::Bluetooth,
            signal_bars: 3,
        },
        DeviceDescriptor {
            id: DeviceId::from("oneplus-12"),
            name: "OnePlus 12".into(),
            os: "Android 14".into(),
            method: ConnectionMethod::Usb,
            // Wired link: signal strength is moot, reported full.
            signal_bars: 4,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TelemetryFrame;
    use tokio_stream::StreamExt;

    const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn discover_yields_the_scripted_fleet() {
        let sim = SimDevice::new(sample_devices());

        let mut stream = sim.discover().await.unwrap();
        let mut seen = Vec::new();
        while let Some(device) = stream.next().await {
            seen.push(device.id.to_string());
        }

        assert_eq!(seen, ["galaxy-s23", "pixel-7-pro", "oneplus-12"]);
    }

    #[tokio::test]
    async fn unknown_device_is_unreachable() {
        let sim = SimDevice::new(sample_devices());

        let err = sim
            .connect(&DeviceId::from("nope"), CONNECT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn scripted_rejection_surfaces_as_rejected() {
        let sim = SimDevice::new(sample_devices());
        sim.on_connect(
            "galaxy-s23",
            ConnectBehavior::Reject {
                reason: "pairing declined".into(),
            },
        );

        let err = sim
            .connect(&DeviceId::from("galaxy-s23"), CONNECT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Rejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_device_times_out() {
        let sim = SimDevice::new(sample_devices());
        sim.on_connect("galaxy-s23", ConnectBehavior::Stall);

        let err = sim
            .connect(&DeviceId::from("galaxy-s23"), CONNECT_TIMEOUT)
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn commands_are_recorded_in_order() {
        let sim = SimDevice::new(sample_devices());
        let control = sim.handle();

        let handle = sim
            .connect(&DeviceId::from("galaxy-s23"), CONNECT_TIMEOUT)
            .await
            .unwrap();

        handle.send(CommandPayload::Tap { x: 25.0, y: 75.0 }).unwrap();
        handle.send(CommandPayload::RequestAppInventory).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let sent = control.sent().await;
        assert_eq!(
            sent,
            [
                CommandPayload::Tap { x: 25.0, y: 75.0 },
                CommandPayload::RequestAppInventory,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn injected_events_reach_the_session_end() {
        let sim = SimDevice::new(sample_devices());
        let control = sim.handle();

        let mut handle = sim
            .connect(&DeviceId::from("galaxy-s23"), CONNECT_TIMEOUT)
            .await
            .unwrap();
        let mut events = handle.take_events().unwrap();

        control
            .inject(TransportEvent::Telemetry(TelemetryFrame {
                battery_percent: 85,
                signal_bars: 4,
                storage: None,
            }))
            .await
            .unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event, TransportEvent::Telemetry(ref frame) if frame.battery_percent == 85));
    }

    #[tokio::test]
    async fn inject_without_a_link_fails() {
        let sim = SimDevice::new(sample_devices());
        let control = sim.handle();

        let err = control
            .inject(TransportEvent::Disconnected {
                reason: "gone".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ChannelClosed));
    }

    #[tokio::test(start_paused = true)]
    async fn auto_transfer_script_runs_to_completion() {
        let sim = SimDevice::new(sample_devices());
        sim.set_auto_transfers(true);

        let mut handle = sim
            .connect(&DeviceId::from("galaxy-s23"), CONNECT_TIMEOUT)
            .await
            .unwrap();
        let mut events = handle.take_events().unwrap();

        let id = TransferId::new();
        handle
            .send(CommandPayload::TransferStart {
                id,
                direction: crate::payload::TransferDirection::Download,
                file: crate::payload::FileRef::new("clip.mp4", Some(1_000)),
            })
            .unwrap();

        let mut last_transferred = 0;
        loop {
            match events.recv().await.unwrap() {
                TransportEvent::TransferProgress { transferred, .. } => {
                    assert!(transferred >= last_transferred, "progress regressed");
                    last_transferred = transferred;
                }
                TransportEvent::TransferTerminal { id: done, outcome } => {
                    assert_eq!(done, id);
                    assert_eq!(outcome, TransferOutcome::Completed);
                    break;
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        assert_eq!(last_transferred, 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn abort_stops_the_auto_script() {
        let sim = SimDevice::new(sample_devices());
        sim.set_auto_transfers(true);

        let mut handle = sim
            .connect(&DeviceId::from("galaxy-s23"), CONNECT_TIMEOUT)
            .await
            .unwrap();
        let mut events = handle.take_events().unwrap();

        let id = TransferId::new();
        handle
            .send(CommandPayload::TransferStart {
                id,
                direction: crate::payload::TransferDirection::Upload,
                file: crate::payload::FileRef::new("backup.zip", Some(10_000)),
            })
            .unwrap();

        // Let a couple of progress steps through, then abort.
        let first = events.recv().await.unwrap();
        assert!(matches!(first, TransportEvent::TransferProgress { .. }));
        handle.send(CommandPayload::TransferAbort { id }).unwrap();

        // Drain whatever was already in flight; the script must stop
        // without ever reaching a terminal event.
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut saw_terminal = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TransportEvent::TransferTerminal { .. }) {
                saw_terminal = true;
            }
        }
        assert!(!saw_terminal, "aborted script still completed");
    }
}
