//! Session behaviour against the scripted mock transport

use super::*;
use crate::protocol::{Field, Value};
use crate::test_utils::MockTransport;
use crate::transport::{UART_RX_CHAR_UUID, UART_TX_CHAR_UUID};
use futures::StreamExt;
use std::time::Duration;

const ADDRESS: &str = "AA:BB:CC:DD:EE:FF";
const FIRMWARE: [u8; 7] = [0x74, 0x74, 0x00, 0x01, 0x00, 0x04, 0x03];
const SETTINGS: [u8; 5] = [0x76, 0x76, 0x01, 0x0A, 0x3C];

fn session(mock: &MockTransport) -> SoftenerSession<MockTransport> {
    let _ = tracing_subscriber::fmt::try_init();
    SoftenerSession::new(mock.clone(), SessionConfig::new(ADDRESS)).expect("valid config")
}

/// Wait until the published snapshot satisfies `predicate`.
async fn wait_for(
    session: &SoftenerSession<MockTransport>,
    predicate: impl Fn(&Snapshot) -> bool,
) -> Arc<Snapshot> {
    let mut updates = Box::pin(session.snapshot_updates());
    tokio::time::timeout(Duration::from_secs(1), async {
        while let Some(snapshot) = updates.next().await {
            if predicate(&snapshot) {
                return snapshot;
            }
        }
        panic!("snapshot stream ended");
    })
    .await
    .expect("timed out waiting for snapshot")
}

#[tokio::test]
async fn refresh_connects_once_and_subscribes() {
    let mock = MockTransport::new();
    let session = session(&mock);
    assert_eq!(session.state(), SessionState::Disconnected);

    let snapshot = session.refresh().await.unwrap();
    assert!(snapshot.is_empty());
    assert_eq!(session.state(), SessionState::Connected);

    session.refresh().await.unwrap();
    assert_eq!(mock.connect_count(), 1);
    assert_eq!(mock.subscriptions(), vec![UART_TX_CHAR_UUID]);
}

#[tokio::test]
async fn missing_device_is_reported_and_retryable() {
    let mock = MockTransport::new();
    mock.set_absent(true);
    let session = session(&mock);

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, SoftenerError::DeviceNotFound { ref address } if address == ADDRESS));
    assert!(err.is_retryable());
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(mock.connect_count(), 0);

    mock.set_absent(false);
    session.refresh().await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn connect_failure_leaves_session_disconnected() {
    let mock = MockTransport::new();
    mock.fail_next_connects(1);
    let session = session(&mock);

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(err, SoftenerError::ConnectionFailed { operation: "connect to", .. }));
    assert_eq!(session.state(), SessionState::Disconnected);

    session.refresh().await.unwrap();
    assert_eq!(mock.connect_count(), 2);
}

#[tokio::test]
async fn subscribe_failure_is_a_connection_failure() {
    let mock = MockTransport::new();
    mock.fail_next_subscribes(1);
    let session = session(&mock);

    let err = session.refresh().await.unwrap_err();
    assert!(matches!(
        err,
        SoftenerError::ConnectionFailed { operation: "subscribe to notifications from", .. }
    ));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn notifications_are_decoded_and_published() {
    let mock = MockTransport::new();
    let session = session(&mock);
    session.refresh().await.unwrap();

    assert!(mock.notify(&FIRMWARE));
    assert!(mock.notify(&[0x00, 0x01, 0x02])); // unknown, ignored
    assert!(mock.notify(&SETTINGS));

    let snapshot = wait_for(&session, |s| s.contains(Field::BrineTankLevel)).await;
    assert_eq!(snapshot.get(Field::FirmwareVersion).and_then(Value::as_str), Some("C4.3"));
    assert_eq!(snapshot.get(Field::BrineTankLevel), Some(&Value::Integer(60)));
    assert_eq!(snapshot.len(), 2);
    assert_eq!(session.current_snapshot(), snapshot);
}

#[tokio::test]
async fn snapshot_survives_reconnect() {
    let mock = MockTransport::new();
    let session = session(&mock);
    session.refresh().await.unwrap();

    mock.notify(&FIRMWARE);
    wait_for(&session, |s| s.contains(Field::FirmwareVersion)).await;

    mock.drop_link();
    let snapshot = session.refresh().await.unwrap();
    assert_eq!(mock.connect_count(), 2);
    assert!(snapshot.contains(Field::FirmwareVersion));

    mock.notify(&SETTINGS);
    let snapshot = wait_for(&session, |s| s.contains(Field::BrineTankLevel)).await;
    assert!(snapshot.contains(Field::FirmwareVersion));
}

#[tokio::test]
async fn command_on_fresh_session_connects_then_writes() {
    let mock = MockTransport::new();
    let session = session(&mock);

    session.send_command(&[0x01, 0x02]).await.unwrap();

    assert_eq!(mock.connect_count(), 1);
    let writes = mock.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].characteristic, UART_RX_CHAR_UUID);
    assert_eq!(writes[0].data, vec![0x01, 0x02]);
    assert!(!writes[0].ack_required);
}

#[tokio::test]
async fn failed_write_is_retried_once_after_reconnect() {
    let mock = MockTransport::new();
    let session = session(&mock);
    session.refresh().await.unwrap();
    mock.fail_next_writes(1);

    session.trigger_regeneration().await.unwrap();

    assert_eq!(mock.connect_count(), 2);
    assert_eq!(mock.write_attempts(), 2);
    assert_eq!(mock.writes()[0].data, vec![0x72, 0x72, 0x01]);
    assert_eq!(session.state(), SessionState::Connected);
}

#[tokio::test]
async fn second_write_failure_is_reported_without_more_retries() {
    let mock = MockTransport::new();
    let session = session(&mock);
    mock.fail_next_writes(2);

    let err = session.set_salt_level(60).await.unwrap_err();

    assert!(matches!(
        err,
        SoftenerError::CommandWriteFailed { characteristic, .. } if characteristic == UART_RX_CHAR_UUID
    ));
    assert_eq!(mock.connect_count(), 2);
    assert_eq!(mock.write_attempts(), 2);
    assert!(mock.writes().is_empty());
}

#[tokio::test]
async fn failed_reconnect_during_retry_stops_there() {
    let mock = MockTransport::new();
    let session = session(&mock);
    session.refresh().await.unwrap();

    mock.fail_next_writes(1);
    mock.set_absent(true);

    let err = session.trigger_regeneration().await.unwrap_err();
    assert!(matches!(err, SoftenerError::DeviceNotFound { .. }));
    assert_eq!(mock.write_attempts(), 1);
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn salt_level_command_bytes() {
    let mock = MockTransport::new();
    let session = session(&mock);

    session.set_salt_level(0x3C).await.unwrap();
    session.set_salt_level(255).await.unwrap();

    let payloads: Vec<_> = mock.writes().into_iter().map(|w| w.data).collect();
    assert_eq!(
        payloads,
        vec![vec![0x76, 0x76, 0x01, 0x0A, 0x3C], vec![0x76, 0x76, 0x01, 0x0A, 0xFF]]
    );
    assert_eq!(mock.connect_count(), 1);
}

#[tokio::test]
async fn concurrent_commands_share_one_connect() {
    let mock = MockTransport::new();
    let session = session(&mock);

    let (a, b, c) = tokio::join!(
        session.trigger_regeneration(),
        session.set_salt_level(10),
        session.refresh(),
    );
    a.unwrap();
    b.unwrap();
    c.unwrap();

    assert_eq!(mock.connect_count(), 1);
    assert_eq!(mock.writes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn transport_timeout_surfaces_as_connection_failure() {
    let mock = MockTransport::new();
    mock.delay_connects(Duration::from_secs(30));
    let config = SessionConfig::new(ADDRESS).with_transport_timeout(Duration::from_secs(5));
    let session = SoftenerSession::new(mock.clone(), config).unwrap();

    let err = session.refresh().await.unwrap_err();
    let SoftenerError::ConnectionFailed { source, .. } = &err else {
        panic!("expected ConnectionFailed, got {err:?}");
    };
    assert!(source.to_string().contains("timed out"));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn cancelled_connect_falls_back_to_disconnected() {
    let mock = MockTransport::new();
    mock.delay_connects(Duration::from_secs(30));
    let session = session(&mock);

    let cancelled = tokio::time::timeout(Duration::from_secs(1), session.refresh()).await;
    assert!(cancelled.is_err());
    assert_eq!(session.state(), SessionState::Disconnected);

    mock.delay_connects(Duration::ZERO);
    session.refresh().await.unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    assert_eq!(mock.connect_count(), 2);
}

#[tokio::test]
async fn subscribe_accepts_highest_update_rate() {
    let mock = MockTransport::new();
    let session = session(&mock);

    let mut updates = session.subscribe(UpdateRate::Max(u32::MAX));
    let first = updates.next().await.unwrap();
    assert!(first.is_empty());
}

#[tokio::test]
async fn disconnect_keeps_snapshot_and_stops_pump() {
    let mock = MockTransport::new();
    let session = session(&mock);
    session.refresh().await.unwrap();

    mock.notify(&FIRMWARE);
    wait_for(&session, |s| s.contains(Field::FirmwareVersion)).await;

    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.current_snapshot().contains(Field::FirmwareVersion));

    // The cancelled pump drops its receiver
    let stopped = tokio::time::timeout(Duration::from_secs(1), async {
        while mock.notify(&SETTINGS) {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(stopped.is_ok(), "pump kept running after disconnect");
    assert_eq!(mock.connect_count(), 1);
}

#[tokio::test]
async fn state_updates_follow_connect_sequence() {
    let mock = MockTransport::new();
    let session = session(&mock);
    let mut states = Box::pin(session.state_updates());

    assert_eq!(states.next().await, Some(SessionState::Disconnected));
    session.refresh().await.unwrap();
    // watch coalesces Connecting -> Connected for a reader that was not polling
    assert_eq!(states.next().await, Some(SessionState::Connected));
}

#[tokio::test]
async fn throttled_subscription_yields_latest() {
    let mock = MockTransport::new();
    let session = session(&mock);
    session.refresh().await.unwrap();

    let mut updates = session.subscribe(UpdateRate::Max(10));
    let first = updates.next().await.unwrap();
    assert!(first.is_empty());

    mock.notify(&FIRMWARE);
    mock.notify(&SETTINGS);
    let latest = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let snapshot = updates.next().await.unwrap();
            if snapshot.contains(Field::BrineTankLevel) {
                return snapshot;
            }
        }
    })
    .await
    .unwrap();
    assert!(latest.contains(Field::FirmwareVersion));
}

#[test]
fn invalid_config_is_rejected_up_front() {
    let result = SoftenerSession::new(MockTransport::new(), SessionConfig::new(""));
    assert!(matches!(result, Err(SoftenerError::Config { .. })));
}
