// waldo-transport: wire types and the connection seam for remote device sessions.

use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;

pub mod device;
pub mod error;
pub mod event;
pub mod handle;
pub mod payload;
pub mod sim;

pub use device::{ConnectionMethod, DeviceDescriptor, DeviceId, StorageInfo, TelemetryFrame};
pub use error::TransportError;
pub use event::{
    AppInfo, AppRunState, AppStateChange, NotificationClass, NotificationInfo, NotificationPush,
    TransferOutcome, TransportEvent,
};
pub use handle::{ConnectionHandle, TransportLink};
pub use payload::{CaptureRequest, CommandPayload, FileRef, TransferDirection, TransferId};

/// Stream of devices produced by a discovery scan.
///
/// The stream ending means the scan completed; errors only occur when
/// starting the scan.
pub type DeviceStream = Pin<Box<dyn Stream<Item = DeviceDescriptor> + Send>>;

/// The seam between a session and whatever carries its bytes.
///
/// Implementations own the wire: pairing, framing, retries. The session
/// only ever sees descriptors, a [`ConnectionHandle`], and events.
#[async_trait::async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Start a discovery scan.
    async fn discover(&self) -> Result<DeviceStream, TransportError>;

    /// Establish a link to a discovered device.
    ///
    /// Implementations must resolve within `timeout`, returning
    /// [`TransportError::Timeout`] when the device does not answer.
    async fn connect(
        &self,
        device: &DeviceId,
        timeout: Duration,
    ) -> Result<ConnectionHandle, TransportError>;
}
