//! Session manager for one softener link.
//!
//! A [`SoftenerSession`] owns at most one live [`GattLink`] at a time. Every
//! operation that may connect or write runs under a single async mutex, so
//! connect, refresh and command sequences never interleave. Incoming
//! notifications are decoded on a separate task and published through a
//! watch channel, so readers never wait on that mutex.
//!
//! ## Command delivery
//!
//! A command write that fails triggers exactly one reconnect followed by one
//! more write of the same bytes. If that write fails too the caller gets
//! [`SoftenerError::CommandWriteFailed`]; nothing is retried beyond that.
//! Retry cadence for everything else belongs to the caller's polling loop.
//!
//! ```rust,no_run
//! # use softener_ble::{SessionConfig, SoftenerSession, transport::DeviceResolver};
//! # async fn run<R: DeviceResolver>(resolver: R) -> softener_ble::Result<()> {
//! let session = SoftenerSession::new(resolver, SessionConfig::new("AA:BB:CC:DD:EE:FF"))?;
//!
//! let snapshot = session.refresh().await?;
//! println!("{} fields known", snapshot.len());
//!
//! session.set_salt_level(60).await?;
//! session.trigger_regeneration().await?;
//! # Ok(())
//! # }
//! ```

mod pump;

#[cfg(test)]
mod tests;

use futures::stream::{BoxStream, Stream, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::protocol::{Command, Snapshot};
use crate::stream::{ThrottleExt, UpdateRate};
use crate::transport::{DeviceHandle, DeviceResolver, GattLink, TransportError};
use crate::{Result, SoftenerError};
use pump::NotificationPump;

/// Connection state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

type LinkOf<R> = <<R as DeviceResolver>::Handle as DeviceHandle>::Link;

/// A connected link plus the pump reading its notifications.
struct ActiveLink<L> {
    link: L,
    pump: CancellationToken,
}

impl<L> Drop for ActiveLink<L> {
    fn drop(&mut self) {
        debug!("Dropping link");
        self.pump.cancel();
    }
}

/// Holds the session in `Connecting`; falls back to `Disconnected` when
/// dropped without [`connected`](Self::connected), including when the
/// caller's future is cancelled mid-connect.
struct ConnectingState<'a> {
    state: &'a watch::Sender<SessionState>,
    armed: bool,
}

impl<'a> ConnectingState<'a> {
    fn enter(state: &'a watch::Sender<SessionState>) -> Self {
        state.send_replace(SessionState::Connecting);
        Self { state, armed: true }
    }

    fn connected(mut self) {
        self.armed = false;
        self.state.send_replace(SessionState::Connected);
    }
}

impl Drop for ConnectingState<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.send_replace(SessionState::Disconnected);
        }
    }
}

/// Session manager for a single softener.
pub struct SoftenerSession<R: DeviceResolver> {
    resolver: R,
    config: SessionConfig,

    /// Exclusive region for connect and command sequences
    link: Mutex<Option<ActiveLink<LinkOf<R>>>>,

    /// Latest merged snapshot; written by the notification pump
    snapshots: Arc<watch::Sender<Arc<Snapshot>>>,

    state: watch::Sender<SessionState>,
}

impl<R: DeviceResolver> SoftenerSession<R> {
    /// Create a disconnected session. No I/O happens until the first
    /// [`refresh`](Self::refresh) or command.
    pub fn new(resolver: R, config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let (snapshots, _) = watch::channel(Arc::new(Snapshot::new()));
        let (state, _) = watch::channel(SessionState::Disconnected);

        Ok(Self {
            resolver,
            config,
            link: Mutex::new(None),
            snapshots: Arc::new(snapshots),
            state,
        })
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// State transitions as a stream, starting with the current state.
    pub fn state_updates(&self) -> impl Stream<Item = SessionState> + 'static {
        WatchStream::new(self.state.subscribe())
    }

    /// Latest merged snapshot, without touching the link.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// Every published snapshot, starting with the current one.
    pub fn snapshot_updates(&self) -> impl Stream<Item = Arc<Snapshot>> + 'static {
        WatchStream::new(self.snapshots.subscribe())
    }

    /// Snapshot updates limited to `rate`.
    ///
    /// Must be called from within a Tokio runtime when throttling.
    pub fn subscribe(&self, rate: UpdateRate) -> BoxStream<'static, Arc<Snapshot>> {
        let updates = self.snapshot_updates();
        match rate.throttle_interval() {
            None => updates.boxed(),
            Some(interval) => updates.throttle(interval).boxed(),
        }
    }

    /// Make sure the link is up and return the current snapshot.
    ///
    /// # Errors
    ///
    /// - [`SoftenerError::DeviceNotFound`] if the address does not resolve
    /// - [`SoftenerError::ConnectionFailed`] if connect or subscribe fails
    ///
    /// The session is left disconnected on error; calling again retries.
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let mut link = self.link.lock().await;
        self.ensure_connected(&mut link).await?;
        Ok(self.current_snapshot())
    }

    /// Write raw command bytes to the write characteristic.
    ///
    /// Connects first if needed. On a failed write the link is rebuilt once
    /// and the same bytes are written again.
    ///
    /// # Errors
    ///
    /// - [`SoftenerError::DeviceNotFound`] / [`SoftenerError::ConnectionFailed`]
    ///   if no link could be established, initially or for the retry
    /// - [`SoftenerError::CommandWriteFailed`] if the retried write fails
    pub async fn send_command(&self, payload: &[u8]) -> Result<()> {
        let mut link = self.link.lock().await;
        self.ensure_connected(&mut link).await?;

        let characteristic = self.config.write_characteristic;
        debug!("Writing {} to {}", hex::encode(payload), characteristic);

        let first = match self.write(&link, payload).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        warn!("Failed to write to {}: {}; reconnecting once", characteristic, first);
        self.connect(&mut link).await?;

        self.write(&link, payload).await.map_err(|e| {
            error!("Failed to write to {} after reconnect: {}", characteristic, e);
            SoftenerError::command_write_failed(characteristic, e)
        })
    }

    /// Start a regeneration cycle now.
    pub async fn trigger_regeneration(&self) -> Result<()> {
        self.execute(Command::RegenerateNow).await
    }

    /// Set the brine tank salt level.
    pub async fn set_salt_level(&self, level: u8) -> Result<()> {
        self.execute(Command::SetSaltLevel(level)).await
    }

    /// Drop the current link, if any. The snapshot is kept.
    pub async fn disconnect(&self) {
        let mut link = self.link.lock().await;
        if link.take().is_some() {
            info!("Disconnected from {}", self.config.address);
        }
        self.state.send_replace(SessionState::Disconnected);
    }

    async fn execute(&self, command: Command) -> Result<()> {
        info!("Sending {} command to {}", command.name(), self.config.address);
        self.send_command(&command.encode()).await
    }

    async fn ensure_connected(&self, link: &mut Option<ActiveLink<LinkOf<R>>>) -> Result<()> {
        if link.as_ref().is_some_and(|active| active.link.is_connected()) {
            return Ok(());
        }

        if link.take().is_some() {
            debug!("Link to {} is no longer connected", self.config.address);
        }

        self.connect(link).await
    }

    /// Replace whatever link is held with a freshly opened one.
    async fn connect(&self, link: &mut Option<ActiveLink<LinkOf<R>>>) -> Result<()> {
        *link = None;
        let connecting = ConnectingState::enter(&self.state);

        match self.open_link().await {
            Ok(active) => {
                *link = Some(active);
                connecting.connected();
                Ok(())
            }
            Err(e) => {
                warn!("Connection to {} failed: {}", self.config.address, e);
                Err(e)
            }
        }
    }

    async fn open_link(&self) -> Result<ActiveLink<LinkOf<R>>> {
        let address = &self.config.address;
        info!("Connecting to {}", address);

        let handle =
            self.resolver.resolve(address).ok_or_else(|| SoftenerError::device_not_found(address))?;

        let link = self
            .with_timeout("connect", handle.connect())
            .await
            .map_err(|e| SoftenerError::connection_failed(address, "connect to", e))?;

        let notifications = self
            .with_timeout("subscribe", link.subscribe(self.config.notify_characteristic))
            .await
            .map_err(|e| {
                SoftenerError::connection_failed(address, "subscribe to notifications from", e)
            })?;

        let pump = CancellationToken::new();
        NotificationPump::spawn(notifications, Arc::clone(&self.snapshots), pump.clone());

        info!("Connected to {} and subscribed to {}", address, self.config.notify_characteristic);
        Ok(ActiveLink { link, pump })
    }

    async fn write(
        &self,
        link: &Option<ActiveLink<LinkOf<R>>>,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let Some(active) = link.as_ref() else {
            return Err("no active link".into());
        };

        self.with_timeout(
            "write",
            active.link.write(self.config.write_characteristic, payload, false),
        )
        .await
    }

    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        match self.config.transport_timeout() {
            None => call.await,
            Some(duration) => tokio::time::timeout(duration, call).await.unwrap_or_else(|_| {
                Err(TransportError::from(SoftenerError::Timeout { operation, duration }))
            }),
        }
    }
}
