//! Notification pump: decodes incoming frames and publishes snapshots

use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::protocol::{Snapshot, decode_frame};
use crate::transport::NotificationStream;

/// Spawns the task that owns a link's notification stream.
///
/// One pump runs per live link. The snapshot channel outlives every pump,
/// so fields decoded before a reconnect stay visible after it.
pub(crate) struct NotificationPump;

impl NotificationPump {
    pub(crate) fn spawn(
        notifications: NotificationStream,
        snapshots: Arc<watch::Sender<Arc<Snapshot>>>,
        cancel: CancellationToken,
    ) {
        tokio::spawn(async move {
            Self::run(notifications, snapshots, cancel).await;
        });
    }

    async fn run(
        mut notifications: NotificationStream,
        snapshots: Arc<watch::Sender<Arc<Snapshot>>>,
        cancel: CancellationToken,
    ) {
        debug!("Notification pump started");
        let mut received = 0u64;
        let mut published = 0u64;

        loop {
            let buffer = tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Notification pump cancelled");
                    break;
                }
                next = notifications.next() => match next {
                    Some(buffer) => buffer,
                    None => {
                        warn!("Notification stream ended after {} buffers", received);
                        break;
                    }
                },
            };

            received += 1;
            debug!("Received notification: {}", hex::encode(&buffer));

            let Some(partial) = decode_frame(&buffer) else {
                continue;
            };

            trace!("Decoded {} fields", partial.len());
            snapshots.send_modify(|current| *current = Arc::new(current.merge(&partial)));
            published += 1;
        }

        info!("Notification pump ended ({} received, {} published)", received, published);
    }
}
