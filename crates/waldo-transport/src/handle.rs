//! The two ends of an established device link.
//!
//! [`ConnectionHandle::channel`] mints a connected pair: the handle goes
//! to the session, the [`TransportLink`] stays with the transport driver.
//! Commands flow session -> driver through a bounded mpsc channel with
//! non-blocking sends; events flow driver -> session through a second
//! bounded channel. A shared [`CancellationToken`] tears both down.
//!
//! # Example
//!
//! ```rust,ignore
//! use waldo_transport::{CommandPayload, ConnectionHandle};
//!
//! let (mut handle, link) = ConnectionHandle::channel(64, 256);
//! tokio::spawn(drive_device(link));
//!
//! let events = handle.take_events().expect("fresh handle");
//! handle.send(CommandPayload::Tap { x: 50.0, y: 50.0 })?;
//! ```

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::event::TransportEvent;
use crate::payload::CommandPayload;

// ── Default channel capacities ───────────────────────────────────────

/// Command queue depth. Input dispatch never blocks; when the queue is
/// full the send fails with [`TransportError::CommandBacklog`] instead.
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;

/// Event queue depth. Sized for bursty pushes (full app inventories,
/// notification storms) without backpressuring the driver.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ── ConnectionHandle ─────────────────────────────────────────────────

/// The session end of an established link.
///
/// Sends are non-blocking. The event receiver is taken exactly once by
/// whoever pumps events; [`close`](Self::close) cancels the shared token
/// and ends the link for both sides.
#[derive(Debug)]
pub struct ConnectionHandle {
    commands: mpsc::Sender<CommandPayload>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    cancel: CancellationToken,
}

impl ConnectionHandle {
    /// Create a connected handle/link pair with the given channel
    /// capacities. Transport implementations call this from `connect`.
    pub fn channel(command_capacity: usize, event_capacity: usize) -> (Self, TransportLink) {
        let (command_tx, command_rx) = mpsc::channel(command_capacity);
        let (event_tx, event_rx) = mpsc::channel(event_capacity);
        let cancel = CancellationToken::new();

        let handle = Self {
            commands: command_tx,
            events: Some(event_rx),
            cancel: cancel.clone(),
        };
        let link = TransportLink {
            commands: command_rx,
            events: event_tx,
            cancel,
        };
        (handle, link)
    }

    /// Queue a payload for the device without waiting.
    ///
    /// Fails with [`TransportError::ChannelClosed`] once the driver is
    /// gone, or [`TransportError::CommandBacklog`] when the queue is
    /// full. Backlog is transient; a closed channel is fatal.
    pub fn send(&self, payload: CommandPayload) -> Result<(), TransportError> {
        self.commands.try_send(payload).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::CommandBacklog,
            mpsc::error::TrySendError::Closed(_) => TransportError::ChannelClosed,
        })
    }

    /// Take the event receiver. Returns `None` after the first call.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransportEvent>> {
        self.events.take()
    }

    /// Signal both ends of the link to shut down.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// `true` once [`close`](Self::close) has been called on either end.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Clone of the link's cancellation token, for tasks that should
    /// stop when the link does.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

// ── TransportLink ────────────────────────────────────────────────────

/// The driver end of an established link.
///
/// Owned by the transport implementation's per-connection task: read
/// commands from `commands`, push device events into `events`, exit when
/// `cancel` fires.
pub struct TransportLink {
    pub commands: mpsc::Receiver<CommandPayload>,
    pub events: mpsc::Sender<TransportEvent>,
    pub cancel: CancellationToken,
}
