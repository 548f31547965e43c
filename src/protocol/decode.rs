//! Per-kind frame decoding and snapshot merge
//!
//! Decoding is pure: [`decode_frame`] turns one notification into the partial
//! snapshot it carries, and [`decode`] lays that partial over an existing
//! snapshot. Short, malformed or unknown frames produce nothing and the
//! previous snapshot comes back unchanged.
//!
//! ## Layouts
//!
//! All multi-byte fields are big-endian. Offsets are from the start of the frame.
//!
//! | Kind | Tag | Min len | Fields |
//! |------|-----|---------|--------|
//! | Firmware | `tt` | 7 | major @5, minor @6 |
//! | Sensor | `uu` | 20 | sub-type @2, record @2.. |
//! | Settings | `vv` | 5 | selector `01 0A` @2, brine tank level @4 |
//! | History | `ww` | 16 | 16-byte totals record @2.. |

use tracing::trace;

use super::frame::FrameKind;
use super::snapshot::{Field, Snapshot};
use super::wire::{Cursor, DecodeError};

/// Page/setting selector carried by the brine tank level settings frame.
pub const BRINE_LEVEL_SELECTOR: [u8; 2] = [0x01, 0x0A];

const SENSOR_DASHBOARD: u8 = 0;
const SENSOR_ADVANCED: u8 = 1;

// Sub-layout sizes from offset 2.
const DASHBOARD_RECORD_LEN: usize = 18;
const ADVANCED_RECORD_LEN: usize = 13;
const HISTORY_RECORD_LEN: usize = 16;

/// Decode one frame into the fields it carries.
///
/// Returns `None` when the frame is dropped: unknown tag, shorter than the
/// kind's minimum, wrong selector, or a truncated sub-layout.
pub fn decode_frame(raw: &[u8]) -> Option<Snapshot> {
    let kind = FrameKind::classify(raw);
    if kind == FrameKind::Unknown {
        trace!("Ignoring frame with unknown header ({} bytes)", raw.len());
        return None;
    }

    if raw.len() < kind.min_len() {
        trace!("Dropping short {:?} frame: {} < {} bytes", kind, raw.len(), kind.min_len());
        return None;
    }

    let result = match kind {
        FrameKind::Firmware => decode_firmware(raw),
        FrameKind::Sensor => decode_sensor(raw),
        FrameKind::Settings => decode_settings(raw),
        FrameKind::History => decode_history(raw),
        FrameKind::Unknown => return None,
    };

    match result {
        Ok(partial) => Some(partial),
        Err(e) => {
            trace!("Dropping malformed {:?} frame: {}", kind, e);
            None
        }
    }
}

/// Apply one frame to `snapshot`, returning the merged result.
///
/// A dropped frame yields a copy of `snapshot`.
pub fn decode(snapshot: &Snapshot, raw: &[u8]) -> Snapshot {
    match decode_frame(raw) {
        Some(partial) => snapshot.merge(&partial),
        None => snapshot.clone(),
    }
}

fn decode_firmware(raw: &[u8]) -> Result<Snapshot, DecodeError> {
    let mut cursor = Cursor::new(raw);
    cursor.skip(5);
    let major: u8 = cursor.read()?;
    let minor: u8 = cursor.read()?;

    Ok(Snapshot::new().with(Field::FirmwareVersion, format!("C{}.{}", major, minor)))
}

fn decode_sensor(raw: &[u8]) -> Result<Snapshot, DecodeError> {
    let record = &raw[2..];
    match record[0] {
        SENSOR_DASHBOARD => decode_dashboard(record),
        SENSOR_ADVANCED => decode_advanced(record),
        other => Err(DecodeError::SubType(other)),
    }
}

fn decode_dashboard(record: &[u8]) -> Result<Snapshot, DecodeError> {
    let mut cursor = Cursor::new(record);
    cursor.require(DASHBOARD_RECORD_LEN)?;
    cursor.skip(4);

    let flow: u16 = cursor.read()?;
    let remaining: i16 = cursor.read()?;
    let today_usage: u16 = cursor.read()?;
    let peak_flow: i16 = cursor.read()?;
    let hardness: u8 = cursor.read()?;
    let regen_hour: i8 = cursor.read()?;
    let regen_minute: i8 = cursor.read()?;

    Ok(Snapshot::new()
        .with(Field::CurrentWaterFlow, f64::from(flow) / 100.0)
        .with(Field::SoftWaterRemaining, remaining)
        .with(Field::TreatedWaterUsageToday, today_usage)
        .with(Field::PeakFlowToday, f64::from(peak_flow) / 100.0)
        .with(Field::WaterHardness, hardness)
        .with(Field::RegenerationTime, format!("{:02}:{:02}", regen_hour, regen_minute)))
}

// Field boundaries are provisional until checked against more captures.
fn decode_advanced(record: &[u8]) -> Result<Snapshot, DecodeError> {
    let mut cursor = Cursor::new(record);
    cursor.require(ADVANCED_RECORD_LEN)?;
    cursor.skip(2);

    let days_until_regen: u8 = cursor.read()?;
    let regen_day_override: u8 = cursor.read()?;
    let reserve_capacity: u16 = cursor.read()?;
    let resin_grains: u16 = cursor.read()?;
    let brine_soak: u32 = cursor.read()?;

    Ok(Snapshot::new()
        .with(Field::DaysUntilRegeneration, days_until_regen)
        .with(Field::RegenerationDayOverride, regen_day_override)
        .with(Field::ReserveCapacity, reserve_capacity)
        .with(Field::ResinGrainsCapacity, resin_grains)
        .with(Field::BrineSoakDuration, brine_soak))
}

fn decode_settings(raw: &[u8]) -> Result<Snapshot, DecodeError> {
    let mut cursor = Cursor::new(raw);
    cursor.skip(2);

    let selector: u16 = cursor.read()?;
    if selector != u16::from_be_bytes(BRINE_LEVEL_SELECTOR) {
        return Err(DecodeError::Selector { found: selector.to_be_bytes() });
    }

    let level: u8 = cursor.read()?;

    Ok(Snapshot::new().with(Field::BrineTankLevel, level))
}

fn decode_history(raw: &[u8]) -> Result<Snapshot, DecodeError> {
    let mut cursor = Cursor::new(&raw[2..]);
    cursor.require(HISTORY_RECORD_LEN)?;
    cursor.skip(4);

    let total_gallons: u32 = cursor.read()?;
    let gallons_since_reset: u32 = cursor.read()?;
    let total_regens: u16 = cursor.read()?;
    let regens_since_reset: u16 = cursor.read()?;

    Ok(Snapshot::new()
        .with(Field::TotalGallonsTreated, total_gallons)
        .with(Field::TotalGallonsTreatedSinceReset, gallons_since_reset)
        .with(Field::TotalRegenerations, total_regens)
        .with(Field::TotalRegenerationsSinceLastReset, regens_since_reset))
}
