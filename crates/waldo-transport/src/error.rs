use std::time::Duration;

use thiserror::Error;

/// Top-level error type for the `waldo-transport` crate.
///
/// Covers every failure mode of a device link: discovery, connection
/// establishment, and the command channel. `waldo-core` maps these into
/// session-level diagnostics.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    // ── Discovery / connection ──────────────────────────────────────
    /// The device is not reachable (unknown id, out of range, powered off).
    #[error("Device unreachable: {device}")]
    Unreachable { device: String },

    /// The device answered but refused the connection.
    #[error("Device {device} rejected the connection: {reason}")]
    Rejected { device: String, reason: String },

    /// The device did not answer within the deadline.
    #[error("Device did not answer within {}s", after.as_secs_f32())]
    Timeout { after: Duration },

    // ── Command channel ─────────────────────────────────────────────
    /// The command or event channel is gone. The link is dead.
    #[error("Transport channel closed")]
    ChannelClosed,

    /// The command queue is full. The link is alive but backlogged.
    #[error("Command queue full -- payload dropped")]
    CommandBacklog,

    // ── Wire ────────────────────────────────────────────────────────
    /// The peer violated the expected message discipline.
    #[error("Protocol error: {message}")]
    Protocol { message: String },
}

impl TransportError {
    /// Returns `true` if the link cannot recover and the session should
    /// tear it down.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ChannelClosed | Self::Protocol { .. })
    }

    /// Returns `true` for deadline-style failures.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
