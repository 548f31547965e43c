//! Frame classification by 2-byte header tag

/// Firmware frame tag (`tt`).
pub const FIRMWARE_TAG: [u8; 2] = *b"tt";
/// Sensor/dashboard frame tag (`uu`).
pub const SENSOR_TAG: [u8; 2] = *b"uu";
/// Settings frame tag (`vv`).
pub const SETTINGS_TAG: [u8; 2] = *b"vv";
/// History/totals frame tag (`ww`).
pub const HISTORY_TAG: [u8; 2] = *b"ww";

/// Frame kind derived from the first two bytes of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    Firmware,
    Sensor,
    Settings,
    History,
    /// Any other header, including buffers shorter than two bytes.
    Unknown,
}

impl FrameKind {
    /// Classify a raw buffer by exact match on its header tag.
    pub fn classify(raw: &[u8]) -> Self {
        let Some(tag) = raw.get(..2) else {
            return FrameKind::Unknown;
        };

        match [tag[0], tag[1]] {
            FIRMWARE_TAG => FrameKind::Firmware,
            SENSOR_TAG => FrameKind::Sensor,
            SETTINGS_TAG => FrameKind::Settings,
            HISTORY_TAG => FrameKind::History,
            _ => FrameKind::Unknown,
        }
    }

    /// Minimum total frame length (tag included) before any field is decoded.
    pub fn min_len(self) -> usize {
        match self {
            FrameKind::Firmware => 7,
            FrameKind::Sensor => 20,
            FrameKind::Settings => 5,
            FrameKind::History => 16,
            FrameKind::Unknown => usize::MAX,
        }
    }
}
