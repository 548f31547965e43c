//! Error types for session and command handling.
//!
//! Only the session layer produces errors. Frames that are short, malformed or
//! carry an unknown tag are dropped inside the decoder and never surface here.
//!
//! ## Error Categories
//!
//! - **Device resolution**: the configured address does not resolve to a handle
//! - **Connection**: connecting to the link or subscribing to notifications failed
//! - **Command delivery**: a write failed even after the single reconnect-and-retry
//! - **Configuration**: invalid or unparsable session configuration
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use softener_ble::SoftenerError;
//!
//! let error = SoftenerError::device_not_found("AA:BB:CC:DD:EE:FF");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::transport::TransportError;

/// Result type alias for session operations.
pub type Result<T, E = SoftenerError> = std::result::Result<T, E>;

/// Main error type for session operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SoftenerError {
    #[error("Device not found: {address}")]
    DeviceNotFound { address: String },

    #[error("Failed to {operation} {address}")]
    ConnectionFailed {
        address: String,
        operation: &'static str,
        #[source]
        source: TransportError,
    },

    #[error("Failed to write command to characteristic {characteristic}")]
    CommandWriteFailed {
        characteristic: Uuid,
        #[source]
        source: TransportError,
    },

    #[error("Transport {operation} timed out after {duration:?}")]
    Timeout { operation: &'static str, duration: Duration },

    #[error("Invalid session configuration: {reason}")]
    Config { reason: String },
}

impl SoftenerError {
    /// Returns whether a later call may succeed where this one failed.
    ///
    /// The session never retries on its own beyond the single command retry;
    /// this is guidance for the polling caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            SoftenerError::DeviceNotFound { .. } => true,
            SoftenerError::ConnectionFailed { .. } => true,
            SoftenerError::CommandWriteFailed { .. } => true,
            SoftenerError::Timeout { .. } => true,
            SoftenerError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            SoftenerError::DeviceNotFound { .. } => vec![
                "Check the softener is powered and in radio range",
                "Verify the configured Bluetooth address",
                "Wait for the adapter to see an advertisement, then refresh again",
            ],
            SoftenerError::ConnectionFailed { .. } => vec![
                "Retry on the next polling cycle",
                "Make sure no other client holds the connection",
                "Move the adapter closer to the softener",
            ],
            SoftenerError::CommandWriteFailed { .. } => vec![
                "Send the command again once the link is stable",
                "Check the write characteristic matches the device",
            ],
            SoftenerError::Timeout { .. } => vec![
                "Increase the transport timeout",
                "Check the radio link quality",
            ],
            SoftenerError::Config { .. } => vec![
                "Fix the session configuration and reload it",
            ],
        }
    }

    /// Helper constructor for an unresolvable address.
    pub fn device_not_found(address: impl Into<String>) -> Self {
        SoftenerError::DeviceNotFound { address: address.into() }
    }

    /// Helper constructor for connect or subscribe failures.
    pub fn connection_failed(
        address: impl Into<String>,
        operation: &'static str,
        source: TransportError,
    ) -> Self {
        SoftenerError::ConnectionFailed { address: address.into(), operation, source }
    }

    /// Helper constructor for a command that could not be delivered.
    pub fn command_write_failed(characteristic: Uuid, source: TransportError) -> Self {
        SoftenerError::CommandWriteFailed { characteristic, source }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        SoftenerError::Config { reason: reason.into() }
    }
}

impl From<serde_yaml_ng::Error> for SoftenerError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        SoftenerError::Config { reason: err.to_string() }
    }
}
