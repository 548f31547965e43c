//! Wire protocol for the softener's UART-over-GATT link.
//!
//! The device pushes four kinds of frames, each tagged by a repeated ASCII
//! byte pair:
//!
//! - `tt` firmware version
//! - `uu` live dashboard values, or advanced settings (sub-type 1)
//! - `vv` a single setting; only brine tank level (page 1, setting 10) is decoded
//! - `ww` lifetime totals
//!
//! Frames are decoded into a [`Snapshot`], a flat map of [`Field`] to [`Value`]
//! merged across frame kinds. Commands travel the other way as [`Command`].
//!
//! ```rust
//! use softener_ble::protocol::{decode, Field, Snapshot};
//!
//! let firmware = [0x74, 0x74, 0x00, 0x01, 0x00, 0x04, 0x03];
//! let snapshot = decode(&Snapshot::new(), &firmware);
//! assert_eq!(snapshot.get(Field::FirmwareVersion).and_then(|v| v.as_str()), Some("C4.3"));
//! ```

mod command;
mod decode;
mod frame;
mod snapshot;
mod wire;

pub use command::{Command, REGENERATE_NOW, SET_SALT_LEVEL_PREFIX};
pub use decode::{BRINE_LEVEL_SELECTOR, decode, decode_frame};
pub use frame::{FIRMWARE_TAG, FrameKind, HISTORY_TAG, SENSOR_TAG, SETTINGS_TAG};
pub use snapshot::{Field, Snapshot, Value};
pub use wire::{Cursor, DecodeError, WireField};
