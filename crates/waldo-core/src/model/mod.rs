// ── Session domain model ──
//
// Every type in this module is the canonical representation the session
// exposes to consumers. Wire-level shapes live in `waldo-transport`;
// `convert` translates between the two.

pub mod app;
pub mod device;
pub mod notification;
pub mod settings;
pub mod transfer;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use waldo_core::model::*` gives you everything.

pub use app::{AppEntry, AppStatus};
pub use device::Device;
pub use notification::{NotificationCategory, NotificationEntry};
pub use settings::{SessionSettings, SettingKind};
pub use transfer::{Transfer, TransferStatus};
