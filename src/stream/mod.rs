//! Snapshot update rate control

mod throttle;

pub use throttle::{Throttle, ThrottleExt};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest interval a timer accepts
const MIN_THROTTLE_INTERVAL: Duration = Duration::from_nanos(1);

/// Update rate for snapshot streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every published snapshot, as notifications arrive
    Native,

    /// At most this many snapshots per second, latest wins.
    /// `Max(0)` is treated as `Native`.
    Max(u32),
}

impl UpdateRate {
    /// Throttle interval, if this rate needs one
    pub fn throttle_interval(self) -> Option<Duration> {
        match self {
            UpdateRate::Native | UpdateRate::Max(0) => None,
            UpdateRate::Max(hz) => {
                Some(Duration::from_secs_f64(1.0 / hz as f64).max(MIN_THROTTLE_INTERVAL))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_interval_from_hz() {
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Max(0).throttle_interval(), None);
        assert_eq!(UpdateRate::Max(4).throttle_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn throttle_interval_is_never_zero() {
        for hz in [1_000_000_000, 2_000_000_001, u32::MAX] {
            let interval = UpdateRate::Max(hz).throttle_interval().unwrap();
            assert!(interval >= Duration::from_nanos(1), "{hz} Hz gave {interval:?}");
        }
    }
}
