// ── Wire-to-domain type conversions ──
//
// Bridges `waldo_transport` wire types into canonical `waldo_core::model`
// domain types. Wire shapes say what the device reported; domain shapes
// add the session-local fields (pending flags, battery enrichment).

use waldo_transport::{AppInfo, AppRunState, DeviceDescriptor, NotificationClass, NotificationInfo};

use crate::model::{AppEntry, AppStatus, Device, NotificationCategory, NotificationEntry};

impl From<DeviceDescriptor> for Device {
    fn from(d: DeviceDescriptor) -> Self {
        Device {
            id: d.id,
            name: d.name,
            os: d.os,
            method: d.method,
            signal_bars: d.signal_bars,
            // Discovery carries no battery reading; telemetry fills it in.
            battery_percent: None,
        }
    }
}

impl From<AppRunState> for AppStatus {
    fn from(state: AppRunState) -> Self {
        match state {
            AppRunState::Running => Self::Running,
            AppRunState::Stopped => Self::Stopped,
            AppRunState::Background => Self::Background,
        }
    }
}

impl From<AppInfo> for AppEntry {
    fn from(info: AppInfo) -> Self {
        AppEntry {
            package: info.package,
            name: info.label,
            version: info.version,
            size_bytes: info.size_bytes,
            status: info.state.into(),
            pending_removal: false,
        }
    }
}

impl From<NotificationClass> for NotificationCategory {
    fn from(class: NotificationClass) -> Self {
        match class {
            NotificationClass::Message => Self::Message,
            NotificationClass::Email => Self::Email,
            NotificationClass::Call => Self::Call,
            NotificationClass::Calendar => Self::Calendar,
            NotificationClass::Other => Self::Other,
        }
    }
}

impl From<NotificationInfo> for NotificationEntry {
    fn from(info: NotificationInfo) -> Self {
        NotificationEntry {
            id: info.id,
            app: info.app,
            title: info.title,
            body: info.body,
            category: info.class.into(),
            unread: info.unread,
            posted_at: info.posted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waldo_transport::{ConnectionMethod, DeviceId};

    #[test]
    fn discovered_device_starts_without_battery() {
        let device: Device = DeviceDescriptor {
            id: DeviceId::from("pixel-7-pro"),
            name: "Pixel 7 Pro".into(),
            os: "Android 14".into(),
            method: ConnectionMethod::Wifi,
            signal_bars: 3,
        }
        .into();

        assert_eq!(device.id.as_str(), "pixel-7-pro");
        assert_eq!(device.signal_bars, 3);
        assert!(device.battery_percent.is_none());
    }

    #[test]
    fn inventory_app_is_never_pending_removal() {
        let entry: AppEntry = AppInfo {
            package: "com.example.maps".into(),
            label: "Maps".into(),
            version: "11.2".into(),
            state: AppRunState::Background,
            size_bytes: 48_000_000,
        }
        .into();

        assert_eq!(entry.status, AppStatus::Background);
        assert!(!entry.pending_removal);
    }

    #[test]
    fn notification_class_maps_onto_category() {
        assert_eq!(
            NotificationCategory::from(NotificationClass::Message),
            NotificationCategory::Message
        );
        assert_eq!(
            NotificationCategory::from(NotificationClass::Other),
            NotificationCategory::Other
        );
    }
}
