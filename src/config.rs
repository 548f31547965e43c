//! Session configuration
//!
//! A session needs the device address and which characteristics carry
//! notifications and commands. The characteristics default to the Nordic
//! UART pair the softener uses.
//!
//! ```rust
//! use softener_ble::SessionConfig;
//!
//! let config = SessionConfig::from_yaml(
//!     "address: AA:BB:CC:DD:EE:FF\ntransport_timeout_ms: 10000\n",
//! )
//! .unwrap();
//! assert_eq!(config.address, "AA:BB:CC:DD:EE:FF");
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::transport::{UART_RX_CHAR_UUID, UART_TX_CHAR_UUID};
use crate::{Result, SoftenerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Bluetooth address (or platform identifier) of the softener.
    pub address: String,

    /// Characteristic the device notifies frames on.
    #[serde(default = "default_notify_characteristic")]
    pub notify_characteristic: Uuid,

    /// Characteristic commands are written to.
    #[serde(default = "default_write_characteristic")]
    pub write_characteristic: Uuid,

    /// Deadline applied to each connect, subscribe and write call.
    /// Unset means the transport's own timeout, if any, is the only one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_timeout_ms: Option<u64>,
}

fn default_notify_characteristic() -> Uuid {
    UART_TX_CHAR_UUID
}

fn default_write_characteristic() -> Uuid {
    UART_RX_CHAR_UUID
}

impl SessionConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            notify_characteristic: UART_TX_CHAR_UUID,
            write_characteristic: UART_RX_CHAR_UUID,
            transport_timeout_ms: None,
        }
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: SessionConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_notify_characteristic(mut self, characteristic: Uuid) -> Self {
        self.notify_characteristic = characteristic;
        self
    }

    pub fn with_write_characteristic(mut self, characteristic: Uuid) -> Self {
        self.write_characteristic = characteristic;
        self
    }

    /// Set the per-call transport deadline. The deadline has millisecond
    /// granularity; sub-millisecond remainders round up.
    pub fn with_transport_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.transport_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn transport_timeout(&self) -> Option<Duration> {
        self.transport_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.address.trim().is_empty() {
            return Err(SoftenerError::config("address must not be empty"));
        }

        if self.notify_characteristic == self.write_characteristic {
            return Err(SoftenerError::config(format!(
                "notify and write characteristics must differ (both {})",
                self.notify_characteristic
            )));
        }

        if self.transport_timeout_ms == Some(0) {
            return Err(SoftenerError::config("transport_timeout_ms must be greater than zero"));
        }

        Ok(())
    }
}
