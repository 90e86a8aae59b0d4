// waldo-core: the remote device session between waldo-transport and consumers.

pub mod config;
pub mod convert;
pub mod error;
pub mod input;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

mod transfer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::SessionConfig;
pub use error::{EncodeError, SessionError};
pub use input::{GestureKind, InputIntent, KeyModifiers};
pub use session::{RemoteSession, SessionState};
pub use store::{Keyed, SessionStore};
pub use stream::{Snapshot, SnapshotStream, Subscription};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AppEntry, AppStatus, Device, NotificationCategory, NotificationEntry, SessionSettings,
    SettingKind, Transfer, TransferStatus,
};

// Transport types that appear in the public session API.
pub use waldo_transport::{
    ConnectionMethod, DeviceId, FileRef, TelemetryFrame, TransferDirection, TransferId,
};
