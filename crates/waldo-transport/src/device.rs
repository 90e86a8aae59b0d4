//! Device identity and telemetry wire types.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── DeviceId ─────────────────────────────────────────────────────────

/// Stable identifier a device advertises during discovery.
///
/// Opaque to this crate: transports may put a serial number, a MAC, or
/// anything else stable in here. Equality is exact string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ── DeviceDescriptor ─────────────────────────────────────────────────

/// How a device is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionMethod {
    Wifi,
    Usb,
    Bluetooth,
}

impl fmt::Display for ConnectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wifi => f.write_str("wifi"),
            Self::Usb => f.write_str("usb"),
            Self::Bluetooth => f.write_str("bluetooth"),
        }
    }
}

/// A device announced by a discovery scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    /// Human-readable device name, e.g. `"Pixel 7 Pro"`.
    pub name: String,
    /// OS name and version string, e.g. `"Android 14"`.
    pub os: String,
    pub method: ConnectionMethod,
    /// Signal strength at scan time, 0-4 bars.
    pub signal_bars: u8,
}

// ── Telemetry ────────────────────────────────────────────────────────

/// Storage usage reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub used_bytes: u64,
    pub total_bytes: u64,
}

/// Periodic health report pushed by a connected device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Battery charge, 0-100.
    pub battery_percent: u8,
    /// Signal strength, 0-4 bars.
    pub signal_bars: u8,
    /// Storage usage, if the device reports it.
    #[serde(default)]
    pub storage: Option<StorageInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_roundtrips_through_serde() {
        let id = DeviceId::from("pixel-7-pro");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"pixel-7-pro\"");
        let back: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn telemetry_storage_defaults_to_none() {
        let frame: TelemetryFrame =
            serde_json::from_str(r#"{"battery_percent": 85, "signal_bars": 4}"#).unwrap();
        assert_eq!(frame.battery_percent, 85);
        assert!(frame.storage.is_none());
    }
}
