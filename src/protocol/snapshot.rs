//! Decoded field set and the snapshot value merged across frames

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Every field the decoder can produce.
///
/// The set is closed: a snapshot only ever holds keys from this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirmwareVersion,
    CurrentWaterFlow,
    SoftWaterRemaining,
    TreatedWaterUsageToday,
    PeakFlowToday,
    WaterHardness,
    RegenerationTime,
    DaysUntilRegeneration,
    RegenerationDayOverride,
    ReserveCapacity,
    ResinGrainsCapacity,
    BrineSoakDuration,
    BrineTankLevel,
    TotalGallonsTreated,
    TotalGallonsTreatedSinceReset,
    TotalRegenerations,
    TotalRegenerationsSinceLastReset,
}

impl Field {
    /// All fields in declaration order.
    pub const ALL: [Field; 17] = [
        Field::FirmwareVersion,
        Field::CurrentWaterFlow,
        Field::SoftWaterRemaining,
        Field::TreatedWaterUsageToday,
        Field::PeakFlowToday,
        Field::WaterHardness,
        Field::RegenerationTime,
        Field::DaysUntilRegeneration,
        Field::RegenerationDayOverride,
        Field::ReserveCapacity,
        Field::ResinGrainsCapacity,
        Field::BrineSoakDuration,
        Field::BrineTankLevel,
        Field::TotalGallonsTreated,
        Field::TotalGallonsTreatedSinceReset,
        Field::TotalRegenerations,
        Field::TotalRegenerationsSinceLastReset,
    ];

    /// Stable snake_case key, matching the serialized form.
    pub fn key(self) -> &'static str {
        match self {
            Field::FirmwareVersion => "firmware_version",
            Field::CurrentWaterFlow => "current_water_flow",
            Field::SoftWaterRemaining => "soft_water_remaining",
            Field::TreatedWaterUsageToday => "treated_water_usage_today",
            Field::PeakFlowToday => "peak_flow_today",
            Field::WaterHardness => "water_hardness",
            Field::RegenerationTime => "regeneration_time",
            Field::DaysUntilRegeneration => "days_until_regeneration",
            Field::RegenerationDayOverride => "regeneration_day_override",
            Field::ReserveCapacity => "reserve_capacity",
            Field::ResinGrainsCapacity => "resin_grains_capacity",
            Field::BrineSoakDuration => "brine_soak_duration",
            Field::BrineTankLevel => "brine_tank_level",
            Field::TotalGallonsTreated => "total_gallons_treated",
            Field::TotalGallonsTreatedSinceReset => "total_gallons_treated_since_reset",
            Field::TotalRegenerations => "total_regenerations",
            Field::TotalRegenerationsSinceLastReset => "total_regenerations_since_last_reset",
        }
    }

    /// Look a field up by its snake_case key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    /// Human-readable label for display surfaces.
    pub fn label(self) -> &'static str {
        match self {
            Field::FirmwareVersion => "Firmware Version",
            Field::CurrentWaterFlow => "Current Water Flow",
            Field::SoftWaterRemaining => "Soft Water Remaining",
            Field::TreatedWaterUsageToday => "Treated Water Usage Today",
            Field::PeakFlowToday => "Peak Flow Today",
            Field::WaterHardness => "Water Hardness",
            Field::RegenerationTime => "Regeneration Time",
            Field::DaysUntilRegeneration => "Days Until Regeneration",
            Field::RegenerationDayOverride => "Regeneration Day Override",
            Field::ReserveCapacity => "Reserve Capacity",
            Field::ResinGrainsCapacity => "Resin Grains Capacity",
            Field::BrineSoakDuration => "Brine Soak Duration",
            Field::BrineTankLevel => "Brine Tank Level",
            Field::TotalGallonsTreated => "Total Gallons Treated",
            Field::TotalGallonsTreatedSinceReset => "Total Gallons Treated Since Reset",
            Field::TotalRegenerations => "Total Regenerations",
            Field::TotalRegenerationsSinceLastReset => "Total Regenerations Since Last Reset",
        }
    }

    /// Unit of measurement as reported by the device, if any.
    ///
    /// Values are carried through unconverted; GPM and GPG stay as the
    /// softener reports them.
    pub fn unit(self) -> Option<&'static str> {
        match self {
            Field::CurrentWaterFlow | Field::PeakFlowToday => Some("GPM"),
            Field::SoftWaterRemaining
            | Field::TreatedWaterUsageToday
            | Field::TotalGallonsTreated
            | Field::TotalGallonsTreatedSinceReset => Some("gal"),
            Field::WaterHardness => Some("GPG"),
            Field::DaysUntilRegeneration => Some("days"),
            Field::BrineTankLevel => Some("lbs"),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            Value::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:.2}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Integer(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(v) => serializer.serialize_str(v),
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::Integer(v.into())
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Integer(v.into())
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Integer(v.into())
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Best-known field values, merged across every frame kind seen so far.
///
/// Snapshots are values: [`Snapshot::merge`] returns a new snapshot and
/// leaves both inputs untouched. Keys are only ever added or overwritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Snapshot {
    fields: BTreeMap<Field, Value>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, used when assembling the partial for one frame.
    pub fn with(mut self, field: Field, value: impl Into<Value>) -> Self {
        self.fields.insert(field, value.into());
        self
    }

    /// Return a new snapshot with every field of `partial` laid over `self`.
    pub fn merge(&self, partial: &Snapshot) -> Snapshot {
        let mut fields = self.fields.clone();
        fields.extend(partial.fields.iter().map(|(field, value)| (*field, value.clone())));
        Snapshot { fields }
    }

    pub fn get(&self, field: Field) -> Option<&Value> {
        self.fields.get(&field)
    }

    pub fn contains(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.fields.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &Value)> + '_ {
        self.fields.iter().map(|(field, value)| (*field, value))
    }
}
