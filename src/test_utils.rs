//! Scripted in-memory transport for session tests
//!
//! [`MockTransport`] plays all three transport roles. Tests script failures
//! up front, push notifications into the current link, and inspect how many
//! connects and writes the session performed.

#![cfg(test)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use uuid::Uuid;

use crate::transport::{
    DeviceHandle, DeviceResolver, GattLink, NotificationStream, TransportError,
};

/// A write the mock link accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub characteristic: Uuid,
    pub data: Vec<u8>,
    pub ack_required: bool,
}

#[derive(Default)]
struct MockState {
    absent: bool,
    connects: usize,
    connect_failures: usize,
    connect_delay: Option<Duration>,
    subscribe_failures: usize,
    subscriptions: Vec<Uuid>,
    write_failures: VecDeque<&'static str>,
    write_attempts: usize,
    writes: Vec<RecordedWrite>,
    notifier: Option<mpsc::UnboundedSender<Vec<u8>>>,
    connected: Option<Arc<AtomicBool>>,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make address resolution fail (or succeed again).
    pub fn set_absent(&self, absent: bool) {
        self.state().absent = absent;
    }

    pub fn fail_next_connects(&self, count: usize) {
        self.state().connect_failures = count;
    }

    pub fn delay_connects(&self, delay: Duration) {
        self.state().connect_delay = Some(delay);
    }

    pub fn fail_next_subscribes(&self, count: usize) {
        self.state().subscribe_failures = count;
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.state().write_failures = std::iter::repeat_n("write not permitted", count).collect();
    }

    /// Push a notification into the current link. Returns false when no
    /// pump is listening.
    pub fn notify(&self, data: &[u8]) -> bool {
        self.state().notifier.as_ref().is_some_and(|tx| tx.send(data.to_vec()).is_ok())
    }

    /// Simulate the radio dropping the current link.
    pub fn drop_link(&self) {
        let mut state = self.state();
        if let Some(connected) = state.connected.take() {
            connected.store(false, Ordering::SeqCst);
        }
        state.notifier = None;
    }

    pub fn connect_count(&self) -> usize {
        self.state().connects
    }

    pub fn write_attempts(&self) -> usize {
        self.state().write_attempts
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state().writes.clone()
    }

    pub fn subscriptions(&self) -> Vec<Uuid> {
        self.state().subscriptions.clone()
    }
}

impl DeviceResolver for MockTransport {
    type Handle = MockHandle;

    fn resolve(&self, _address: &str) -> Option<MockHandle> {
        if self.state().absent { None } else { Some(MockHandle { transport: self.clone() }) }
    }
}

pub struct MockHandle {
    transport: MockTransport,
}

#[async_trait::async_trait]
impl DeviceHandle for MockHandle {
    type Link = MockLink;

    async fn connect(&self) -> Result<MockLink, TransportError> {
        let delay = {
            let mut state = self.transport.state();
            state.connects += 1;
            if state.connect_failures > 0 {
                state.connect_failures -= 1;
                return Err("connection refused".into());
            }
            state.connect_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let connected = Arc::new(AtomicBool::new(true));
        self.transport.state().connected = Some(Arc::clone(&connected));

        Ok(MockLink { transport: self.transport.clone(), connected })
    }
}

pub struct MockLink {
    transport: MockTransport,
    connected: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl GattLink for MockLink {
    async fn subscribe(&self, characteristic: Uuid) -> Result<NotificationStream, TransportError> {
        let mut state = self.transport.state();
        if state.subscribe_failures > 0 {
            state.subscribe_failures -= 1;
            return Err("notify not supported".into());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.notifier = Some(tx);
        state.subscriptions.push(characteristic);

        Ok(UnboundedReceiverStream::new(rx).boxed())
    }

    async fn write(
        &self,
        characteristic: Uuid,
        data: &[u8],
        ack_required: bool,
    ) -> Result<(), TransportError> {
        let mut state = self.transport.state();
        state.write_attempts += 1;

        if let Some(reason) = state.write_failures.pop_front() {
            return Err(reason.into());
        }

        state.writes.push(RecordedWrite { characteristic, data: data.to_vec(), ack_required });
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
