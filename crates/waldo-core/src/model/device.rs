// ── Device domain types ──

use serde::{Deserialize, Serialize};

use waldo_transport::{ConnectionMethod, DeviceId};

/// A remote device known to the session.
///
/// Populated from discovery, then enriched in place as telemetry frames
/// arrive for the active device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Human-readable name, e.g. `"Pixel 7 Pro"`.
    pub name: String,
    /// OS name and version string, e.g. `"Android 14"`.
    pub os: String,
    pub method: ConnectionMethod,
    /// Signal strength, 0-4 bars. Discovery value until telemetry
    /// updates it.
    pub signal_bars: u8,
    /// Battery charge, 0-100. `None` until the first telemetry frame.
    pub battery_percent: Option<u8>,
}
