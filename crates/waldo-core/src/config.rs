// ── Runtime session configuration ──
//
// Tuning knobs for a single session. Carries no credentials and never
// touches disk -- the embedding application constructs a `SessionConfig`
// and hands it in.

use std::time::Duration;

use crate::model::SessionSettings;

/// Configuration for a [`RemoteSession`](crate::session::RemoteSession).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a connection attempt may take before it fails with a
    /// timeout. Default: 10s.
    pub connect_timeout: Duration,

    /// An active transfer with no progress events for this long is
    /// failed as stalled. Default: 30s.
    pub transfer_inactivity_timeout: Duration,

    /// How often the stall sweeper checks transfer activity. Default: 1s.
    pub transfer_sweep_interval: Duration,

    /// Settings applied when the session starts and restored on every
    /// disconnect.
    pub initial_settings: SessionSettings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            transfer_inactivity_timeout: Duration::from_secs(30),
            transfer_sweep_interval: Duration::from_secs(1),
            initial_settings: SessionSettings::default(),
        }
    }
}
