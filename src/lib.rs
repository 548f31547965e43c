//! Frame decoder and BLE session manager for UART-over-GATT water softeners.
//!
//! The softener streams binary frames over the Nordic UART service and accepts
//! short commands on the same service. This crate decodes those frames into a
//! merged [`Snapshot`](protocol::Snapshot) and keeps the link alive long enough
//! to feed the decoder and deliver commands.
//!
//! # Features
//!
//! - **Fail-closed decoding**: short, malformed and unknown frames are dropped;
//!   fields already known are never lost
//! - **Single-flight session**: connect and command sequences are serialized
//!   per session
//! - **Bounded retry**: one reconnect-and-retry per failed command write
//! - **Transport agnostic**: bring any BLE stack through the [`transport`] traits
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use softener_ble::{SessionConfig, SoftenerSession, UpdateRate};
//! use softener_ble::protocol::Field;
//! use futures::StreamExt;
//! # use softener_ble::transport::DeviceResolver;
//!
//! # async fn run<R: DeviceResolver>(resolver: R) -> softener_ble::Result<()> {
//! let session = SoftenerSession::new(resolver, SessionConfig::new("AA:BB:CC:DD:EE:FF"))?;
//! session.refresh().await?;
//!
//! let mut updates = session.subscribe(UpdateRate::Max(1));
//! while let Some(snapshot) = updates.next().await {
//!     if let Some(flow) = snapshot.get(Field::CurrentWaterFlow) {
//!         println!("flow: {} GPM", flow);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
pub mod protocol;
pub mod session;
pub mod stream;
#[cfg(test)]
mod test_utils;
pub mod transport;

pub use config::SessionConfig;
pub use error::*;
pub use session::{SessionState, SoftenerSession};
pub use stream::UpdateRate;
