// ── Remote device session ──
//
// Full lifecycle management for one device connection. Owns the state
// machine, routes operator intents through the encoder and transfer
// coordinator, and reconciles device events into the session store.
// All mutation funnels through here; consumers only read.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use futures_util::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use waldo_transport::{
    CaptureRequest, CommandPayload, ConnectionHandle, DeviceId, DeviceTransport, FileRef,
    TelemetryFrame, TransferDirection, TransferId, TransportError, TransportEvent,
};

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::input::{self, InputIntent};
use crate::model::{AppEntry, Device, NotificationEntry, SessionSettings, SettingKind, Transfer};
use crate::store::SessionStore;
use crate::stream::{Snapshot, Subscription};
use crate::transfer::TransferCoordinator;

// ── SessionState ─────────────────────────────────────────────────────

/// Connection state observable by consumers.
///
/// `Streaming` and `Paused` are the two connected substates; everything
/// else means there is no usable link. `Error` is terminal until an
/// explicit [`disconnect`](RemoteSession::disconnect).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Discovering,
    Connecting,
    Streaming,
    Paused,
    Error { reason: String },
}

impl SessionState {
    /// `true` while a device link is up, streaming or paused.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Streaming | Self::Paused)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Discovering => f.write_str("discovering"),
            Self::Connecting => f.write_str("connecting"),
            Self::Streaming => f.write_str("streaming"),
            Self::Paused => f.write_str("paused"),
            Self::Error { reason } => write!(f, "error ({reason})"),
        }
    }
}

// ── RemoteSession ────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Manages the full device
/// lifecycle: discovery, connection, input dispatch, transfers, and
/// reactive registry streaming.
#[derive(Clone)]
pub struct RemoteSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    transport: Arc<dyn DeviceTransport>,
    store: Arc<SessionStore>,
    transfers: TransferCoordinator,
    state: watch::Sender<SessionState>,
    settings: Mutex<SessionSettings>,
    recording: AtomicBool,
    active_device: Mutex<Option<DeviceId>>,
    /// Live link, swapped lock-free so input dispatch never contends.
    link: ArcSwapOption<ConnectionHandle>,
    telemetry: watch::Sender<Option<TelemetryFrame>>,
    discovery_cancel: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl RemoteSession {
    /// Create a session over the given transport. Does NOT connect --
    /// call [`start_discovery`](Self::start_discovery) and
    /// [`connect`](Self::connect).
    pub fn new(transport: Arc<dyn DeviceTransport>, config: SessionConfig) -> Self {
        let store = Arc::new(SessionStore::new());
        let (state, _) = watch::channel(SessionState::Disconnected);
        let (telemetry, _) = watch::channel(None);
        let settings = config.initial_settings;

        Self {
            inner: Arc::new(SessionInner {
                config,
                transport,
                transfers: TransferCoordinator::new(Arc::clone(&store)),
                store,
                state,
                settings: Mutex::new(settings),
                recording: AtomicBool::new(false),
                active_device: Mutex::new(None),
                link: ArcSwapOption::const_empty(),
                telemetry,
                discovery_cancel: Mutex::new(CancellationToken::new()),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Access the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Access the underlying store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Start a discovery scan.
    ///
    /// Valid only from `Disconnected`. Clears previously discovered
    /// devices, then pumps descriptors into the device registry as the
    /// transport yields them; when the scan completes the session
    /// returns to `Disconnected` with the devices retained.
    pub async fn start_discovery(&self) -> Result<(), SessionError> {
        self.inner.try_transition(
            "start_discovery",
            |s| *s == SessionState::Disconnected,
            SessionState::Discovering,
        )?;
        self.inner.store.devices.clear();

        let stream = match self.inner.transport.discover().await {
            Ok(stream) => stream,
            Err(e) => {
                self.inner.fault(&format!("discovery failed: {e}"));
                return Err(e.into());
            }
        };

        let cancel = lock(&self.inner.discovery_cancel).clone();
        let session = self.clone();
        let handle = tokio::spawn(discovery_pump(session, stream, cancel));
        lock(&self.inner.task_handles).push(handle);

        debug!("discovery started");
        Ok(())
    }

    /// Connect to a discovered device.
    ///
    /// Valid from `Disconnected` or `Discovering` with a known device
    /// id. On transport acknowledgement the session lands in
    /// `Streaming`; on timeout or rejection it lands in `Error`.
    pub async fn connect(&self, device: &DeviceId) -> Result<(), SessionError> {
        if !self.inner.store.devices.contains(device.as_str()) {
            return Err(SessionError::UnknownDevice {
                id: device.to_string(),
            });
        }
        self.inner.try_transition(
            "connect",
            |s| matches!(s, SessionState::Disconnected | SessionState::Discovering),
            SessionState::Connecting,
        )?;

        let result = self
            .inner
            .transport
            .connect(device, self.inner.config.connect_timeout)
            .await;

        let mut handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                // A disconnect during the attempt wins; otherwise the
                // failure is a transport fault.
                let state = self.state();
                if state != SessionState::Connecting {
                    return Err(SessionError::invalid_state("connect", state));
                }
                self.inner.fault(&e.to_string());
                return Err(e.into());
            }
        };

        let Some(events) = handle.take_events() else {
            self.inner.fault("transport returned a spent handle");
            return Err(TransportError::Protocol {
                message: "connection handle without an event stream".into(),
            }
            .into());
        };

        // Recheck: a concurrent disconnect abandons the completion.
        let cancel = handle.cancellation();
        let link = Arc::new(handle);
        let installed = self.inner.state.send_if_modified(|s| {
            if *s == SessionState::Connecting {
                *s = SessionState::Streaming;
                true
            } else {
                false
            }
        });
        if !installed {
            link.close();
            return Err(SessionError::invalid_state("connect", self.state()));
        }

        self.inner.link.store(Some(link));
        *lock(&self.inner.active_device) = Some(device.clone());

        let mut handles = lock(&self.inner.task_handles);
        handles.push(tokio::spawn(event_pump(self.clone(), events, cancel.clone())));
        handles.push(tokio::spawn(stall_sweeper(self.clone(), cancel)));
        drop(handles);

        info!(device = %device, "connected");
        Ok(())
    }

    /// Pause the mirrored stream without touching the link.
    ///
    /// Idempotent: pausing while already paused is an Ok no-op.
    pub fn pause_streaming(&self) -> Result<(), SessionError> {
        self.inner.try_transition(
            "pause_streaming",
            SessionState::is_connected,
            SessionState::Paused,
        )
    }

    /// Resume the mirrored stream. Idempotent like pausing.
    pub fn resume_streaming(&self) -> Result<(), SessionError> {
        self.inner.try_transition(
            "resume_streaming",
            SessionState::is_connected,
            SessionState::Streaming,
        )
    }

    /// Tear down the session. Valid from any state, always succeeds.
    ///
    /// Cancels background tasks, drops the link, clears everything
    /// scoped to the connection, and restores the initial settings.
    /// Live transfers fail; the terminal archive survives. This is also
    /// the only way out of the `Error` state.
    pub async fn disconnect(&self) {
        let inner = &self.inner;

        {
            let mut guard = lock(&inner.discovery_cancel);
            guard.cancel();
            *guard = CancellationToken::new();
        }
        if let Some(link) = inner.link.swap(None) {
            link.close();
        }

        let handles: Vec<JoinHandle<()>> = lock(&inner.task_handles).drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        inner.state.send_replace(SessionState::Disconnected);
        *lock(&inner.active_device) = None;
        inner.store.clear_session_scoped();
        *lock(&inner.settings) = inner.config.initial_settings;
        inner.recording.store(false, Ordering::Relaxed);
        inner.transfers.fail_all_live("connection closed");
        inner.telemetry.send_replace(None);

        debug!("disconnected");
    }

    // ── Input ────────────────────────────────────────────────────────

    /// Encode an intent and fire it at the device without waiting.
    ///
    /// Requires `Streaming`, except for system-level keys (power and
    /// volume), which also go through while `Paused`.
    pub fn dispatch_input(&self, intent: &InputIntent) -> Result<(), SessionError> {
        let state = self.state();
        if !state.is_connected() {
            return Err(SessionError::NotConnected);
        }

        let settings = *lock(&self.inner.settings);
        let payload = input::encode(intent, &settings)?;

        if state == SessionState::Paused && !input::is_system_payload(&payload) {
            return Err(SessionError::NotStreaming);
        }
        self.inner.send(payload)
    }

    /// Change one session setting. Out-of-range values are rejected
    /// with the documented bounds, never clamped.
    pub fn update_setting(&self, kind: SettingKind, value: u16) -> Result<(), SessionError> {
        lock(&self.inner.settings).set(kind, value)
    }

    // ── Capture ──────────────────────────────────────────────────────

    /// Ask the device for a screenshot. Valid while connected, paused
    /// or not.
    pub fn take_screenshot(&self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner
            .send(CommandPayload::Capture(CaptureRequest::Screenshot))
    }

    /// Start screen recording. The recording flag flips optimistically
    /// and resets on disconnect.
    pub fn start_recording(&self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner
            .send(CommandPayload::Capture(CaptureRequest::RecordStart))?;
        self.inner.recording.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Stop screen recording.
    pub fn stop_recording(&self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner
            .send(CommandPayload::Capture(CaptureRequest::RecordStop))?;
        self.inner.recording.store(false, Ordering::Relaxed);
        Ok(())
    }

    // ── Apps ─────────────────────────────────────────────────────────

    /// Launch an app: optimistic `Stopped -> Running` plus the device
    /// command. The next authoritative push settles any disagreement.
    pub fn launch_app(&self, package: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.launch_local(package)?;
        self.inner.send(CommandPayload::LaunchApp {
            package: package.to_owned(),
        })
    }

    /// Stop a running or backgrounded app.
    pub fn stop_app(&self, package: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.stop_local(package)?;
        self.inner.send(CommandPayload::StopApp {
            package: package.to_owned(),
        })
    }

    /// Request an uninstall. The entry stays listed as pending until
    /// the device acknowledges; repeated requests fail.
    pub fn uninstall_app(&self, package: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.begin_uninstall(package)?;
        self.inner.send(CommandPayload::UninstallApp {
            package: package.to_owned(),
        })
    }

    /// Ask the device for a fresh app inventory.
    pub fn refresh_apps(&self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.send(CommandPayload::RequestAppInventory)
    }

    // ── Notifications ────────────────────────────────────────────────

    /// Dismiss a notification, locally first.
    pub fn dismiss_notification(&self, id: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.dismiss_local(id)?;
        self.inner
            .send(CommandPayload::DismissNotification { id: id.to_owned() })
    }

    /// Mark a notification read, locally first.
    pub fn mark_notification_read(&self, id: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.mark_read_local(id)?;
        self.inner
            .send(CommandPayload::MarkNotificationRead { id: id.to_owned() })
    }

    /// Reply to a message notification. Non-message categories and
    /// blank text are rejected before anything is sent.
    pub fn reply_to_notification(&self, id: &str, text: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.reply_local(id, text)?;
        self.inner.send(CommandPayload::ReplyNotification {
            id: id.to_owned(),
            text: text.to_owned(),
        })
    }

    /// Mark the whole shade read.
    pub fn mark_all_notifications_read(&self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.mark_all_read_local();
        self.inner.send(CommandPayload::MarkAllNotificationsRead)
    }

    /// Clear the whole shade.
    pub fn clear_notifications(&self) -> Result<(), SessionError> {
        self.ensure_connected()?;
        self.inner.store.clear_notifications_local();
        self.inner.send(CommandPayload::ClearAllNotifications)
    }

    // ── Transfers ────────────────────────────────────────────────────

    /// Start a file transfer, returning its handle.
    ///
    /// Requires a connected session; `Paused` is fine. Transfers are
    /// never retried automatically — a retry is a fresh call with a
    /// fresh handle.
    pub fn start_transfer(
        &self,
        direction: TransferDirection,
        file: FileRef,
    ) -> Result<TransferId, SessionError> {
        self.ensure_connected()?;
        let (id, payload) = self.inner.transfers.start(direction, file);
        if let Err(e) = self.inner.send(payload) {
            // The device never heard about it; drop the phantom handle.
            self.inner.transfers.discard(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Cancel a live transfer cooperatively. Progress events arriving
    /// after this are ignored for the handle.
    pub fn cancel_transfer(&self, id: TransferId) -> Result<(), SessionError> {
        let payload = self.inner.transfers.cancel(id)?;
        // The cancellation is already local fact; tell the device if
        // the link is still up.
        if self.inner.link.load_full().is_some() {
            self.inner.send(payload)?;
        }
        Ok(())
    }

    /// Progress of a transfer as a whole percentage, 0-100.
    pub fn transfer_progress(&self, id: TransferId) -> Result<u8, SessionError> {
        self.inner.transfers.progress_percent(id)
    }

    // ── State observation ────────────────────────────────────────────

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Current settings values.
    pub fn settings(&self) -> SessionSettings {
        *lock(&self.inner.settings)
    }

    pub fn is_recording(&self) -> bool {
        self.inner.recording.load(Ordering::Relaxed)
    }

    /// The device this session is connected to, if any.
    pub fn active_device(&self) -> Option<Arc<Device>> {
        let id = lock(&self.inner.active_device).clone()?;
        self.inner.store.device(&id)
    }

    /// Most recent telemetry frame from the active device.
    pub fn last_telemetry(&self) -> Option<TelemetryFrame> {
        self.inner.telemetry.borrow().clone()
    }

    /// Subscribe to telemetry frames.
    pub fn watch_telemetry(&self) -> watch::Receiver<Option<TelemetryFrame>> {
        self.inner.telemetry.subscribe()
    }

    // ── Snapshot accessors (delegate to the store) ───────────────────

    pub fn devices_snapshot(&self) -> Snapshot<Device> {
        self.inner.store.devices_snapshot()
    }

    pub fn apps_snapshot(&self) -> Snapshot<AppEntry> {
        self.inner.store.apps_snapshot()
    }

    pub fn notifications_snapshot(&self) -> Snapshot<NotificationEntry> {
        self.inner.store.notifications_snapshot()
    }

    pub fn transfers_snapshot(&self) -> Snapshot<Transfer> {
        self.inner.store.transfers_snapshot()
    }

    // ── Subscription accessors (delegate to the store) ───────────────

    pub fn devices(&self) -> Subscription<Device> {
        self.inner.store.subscribe_devices()
    }

    pub fn apps(&self) -> Subscription<AppEntry> {
        self.inner.store.subscribe_apps()
    }

    pub fn notifications(&self) -> Subscription<NotificationEntry> {
        self.inner.store.subscribe_notifications()
    }

    pub fn transfers(&self) -> Subscription<Transfer> {
        self.inner.store.subscribe_transfers()
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.state().is_connected() {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn apply_event(&self, event: TransportEvent) {
        let inner = &self.inner;
        match event {
            TransportEvent::Telemetry(frame) => {
                if let Some(id) = lock(&inner.active_device).clone() {
                    inner.store.apply_telemetry(&id, &frame);
                }
                // `send_replace` stores the frame even with no
                // receivers, so `last_telemetry` always sees it.
                inner.telemetry.send_replace(Some(frame));
            }
            TransportEvent::AppStateChanged(change) => inner.store.apply_app_change(change),
            TransportEvent::NotificationPushed(push) => inner.store.apply_notification_push(push),
            TransportEvent::TransferProgress {
                id,
                transferred,
                total,
            } => inner.transfers.apply_progress(id, transferred, total),
            TransportEvent::TransferTerminal { id, outcome } => {
                inner.transfers.apply_terminal(id, outcome);
            }
            TransportEvent::Disconnected { reason } => {
                warn!(reason, "device dropped the link");
                inner.fault(&reason);
            }
        }
    }
}

impl SessionInner {
    /// Atomic check-and-transition through the state watch.
    fn try_transition(
        &self,
        operation: &str,
        allowed: impl Fn(&SessionState) -> bool,
        next: SessionState,
    ) -> Result<(), SessionError> {
        let mut rejected = None;
        self.state.send_if_modified(|state| {
            if allowed(state) {
                *state = next;
                true
            } else {
                rejected = Some(SessionError::invalid_state(operation, &*state));
                false
            }
        });
        match rejected {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Queue a payload on the live link, fire-and-forget.
    ///
    /// A closed channel means the link is dead: the session faults. A
    /// full queue is transient and surfaces without faulting.
    fn send(&self, payload: CommandPayload) -> Result<(), SessionError> {
        let Some(link) = self.link.load_full() else {
            return Err(SessionError::NotConnected);
        };
        match link.send(payload) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => {
                self.fault(&e.to_string());
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Transition to the terminal `Error` state on a transport fault.
    ///
    /// Registries are deliberately retained so consumers can show the
    /// last known world next to the error; only `disconnect` clears
    /// them.
    fn fault(&self, reason: &str) {
        warn!(reason, "transport fault, session entering error state");
        if let Some(link) = self.link.swap(None) {
            link.close();
        }
        lock(&self.discovery_cancel).cancel();
        self.state.send_replace(SessionState::Error {
            reason: reason.to_owned(),
        });
    }
}

/// Lock a mutex, riding through poisoning: session state is always
/// left consistent by the panicking holder's completed writes.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ── Background tasks ─────────────────────────────────────────────────

/// Pump discovery results into the device registry until the scan
/// completes or the session moves on.
async fn discovery_pump(
    session: RemoteSession,
    mut stream: waldo_transport::DeviceStream,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            descriptor = stream.next() => {
                let Some(descriptor) = descriptor else {
                    // Scan complete: back to Disconnected, devices kept.
                    session.inner.state.send_if_modified(|s| {
                        if *s == SessionState::Discovering {
                            *s = SessionState::Disconnected;
                            true
                        } else {
                            false
                        }
                    });
                    debug!("discovery scan complete");
                    break;
                };
                debug!(device = %descriptor.id, method = %descriptor.method, "device discovered");
                session.inner.store.upsert_discovered(descriptor);
            }
        }
    }
}

/// Apply device events to the session until the link goes away.
async fn event_pump(
    session: RemoteSession,
    mut events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => {
                let Some(event) = event else {
                    session.inner.fault("transport event channel closed");
                    break;
                };
                session.apply_event(event);
            }
        }
    }
    debug!("event pump exiting");
}

/// Periodically fail active transfers that stopped reporting progress.
async fn stall_sweeper(session: RemoteSession, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(session.inner.config.transfer_sweep_interval);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                for abort in session.inner.transfers.sweep_stalled(&session.inner.config) {
                    if let Err(e) = session.inner.send(abort) {
                        debug!(error = %e, "stall abort not delivered");
                    }
                }
            }
        }
    }
}
