//! Transport traits for the BLE stack underneath a session
//!
//! The session does not talk to an adapter directly. The host supplies a
//! [`DeviceResolver`] that turns an address into a [`DeviceHandle`], and the
//! handle opens a [`GattLink`]. Any BLE stack with notify and
//! write-without-response support can sit behind these traits.

use futures::stream::BoxStream;
use uuid::{Uuid, uuid};

/// Error raised by the underlying BLE stack.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Stream of notification payloads, one item per received buffer.
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// Nordic UART service advertised by the softener.
pub const UART_SERVICE_UUID: Uuid = uuid!("6e400001-b5a3-f393-e0a9-e50e24dcca9e");

/// UART RX characteristic: host-to-device writes.
pub const UART_RX_CHAR_UUID: Uuid = uuid!("6e400002-b5a3-f393-e0a9-e50e24dcca9e");

/// UART TX characteristic: device-to-host notifications.
pub const UART_TX_CHAR_UUID: Uuid = uuid!("6e400003-b5a3-f393-e0a9-e50e24dcca9e");

/// Whether a discovered device's advertised services include the UART service.
pub fn advertises_uart_service(service_uuids: &[Uuid]) -> bool {
    service_uuids.contains(&UART_SERVICE_UUID)
}

/// Resolves a configured address to something that can be connected.
pub trait DeviceResolver: Send + Sync + 'static {
    type Handle: DeviceHandle;

    /// Returns `None` when the stack has no reachable device at `address`.
    fn resolve(&self, address: &str) -> Option<Self::Handle>;
}

/// A resolved device that can open a link.
#[async_trait::async_trait]
pub trait DeviceHandle: Send + Sync + 'static {
    type Link: GattLink;

    async fn connect(&self) -> Result<Self::Link, TransportError>;
}

/// An open GATT connection.
///
/// Dropping the link is the only teardown the session performs.
#[async_trait::async_trait]
pub trait GattLink: Send + Sync + 'static {
    /// Enable notifications on `characteristic`.
    ///
    /// Each received buffer is yielded once, in arrival order. The stream
    /// ends when the link goes away.
    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, TransportError>;

    /// Write `data` to `characteristic`, waiting for a write response only
    /// when `ack_required` is set.
    async fn write(
        &self,
        characteristic: Uuid,
        data: &[u8],
        ack_required: bool,
    ) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}
