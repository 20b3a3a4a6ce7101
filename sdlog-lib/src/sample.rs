use crate::constants::{DEFAULT_VALUES_PER_SAMPLE, FIELD_COUNT, SECTOR_SIZE};
use crate::error::SdlogError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use strum_macros::Display;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Column label for the 32-bit tick counter leading each sample.
pub const TICKS_LABEL: &str = "Ticks";

/// Labeled 16-bit channels trailing the tick counter, in wire order.
///
/// The labels correspond to fields 2..=15 of the firmware's sample struct;
/// the mapping is only defined for the fixed 16-value layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum SampleField {
    #[strum(to_string = "Reserved_1")]
    Reserved1 = 0,
    #[strum(to_string = "Reserved_2")]
    Reserved2,
    #[strum(to_string = "SS_FLAG")]
    SsFlag,
    #[strum(to_string = "Release_On")]
    ReleaseOn,
    #[strum(to_string = "Lamps_On")]
    LampsOn,
    #[strum(to_string = "Reserved_3")]
    Reserved3,
    #[strum(to_string = "Reserved_4")]
    Reserved4,
    #[strum(to_string = "Reserved_5")]
    Reserved5,
    #[strum(to_string = "Temperature")]
    Temperature,
    #[strum(to_string = "Reserved_6")]
    Reserved6,
    #[strum(to_string = "Pressure_Value")]
    PressureValue,
    #[strum(to_string = "Pressure_Status")]
    PressureStatus,
    #[strum(to_string = "Battery_Value")]
    BatteryValue,
    #[strum(to_string = "Camera_Record_Time")]
    CameraRecordTime,
}

impl SampleField {
    /// All channels in wire order.
    pub const ALL: [SampleField; FIELD_COUNT] = [
        SampleField::Reserved1,
        SampleField::Reserved2,
        SampleField::SsFlag,
        SampleField::ReleaseOn,
        SampleField::LampsOn,
        SampleField::Reserved3,
        SampleField::Reserved4,
        SampleField::Reserved5,
        SampleField::Temperature,
        SampleField::Reserved6,
        SampleField::PressureValue,
        SampleField::PressureStatus,
        SampleField::BatteryValue,
        SampleField::CameraRecordTime,
    ];

    /// Position of this channel within a sample's value block.
    pub fn index(self) -> usize {
        u8::from(self) as usize
    }
}

/// Raw sample as laid out in a sector (32 bytes).
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct SampleRaw {
    /// Tick counter at capture time.
    pub ticks: U32,
    /// The 14 labeled channels.
    pub values: [U16; FIELD_COUNT],
}

/// Decoded sample: one timestamped set of sensor channel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleRecord {
    pub ticks: u32,
    pub values: [u16; FIELD_COUNT],
}

impl From<&SampleRaw> for SampleRecord {
    fn from(raw: &SampleRaw) -> Self {
        Self {
            ticks: raw.ticks.get(),
            values: raw.values.map(|value| value.get()),
        }
    }
}

impl SampleRecord {
    /// Value of one labeled channel.
    pub fn value(&self, field: SampleField) -> u16 {
        self.values[field.index()]
    }
}

impl fmt::Display for SampleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ticks: {}, Temperature: {}, Pressure: {} ({}), Battery: {}",
            self.ticks,
            self.value(SampleField::Temperature),
            self.value(SampleField::PressureValue),
            self.value(SampleField::PressureStatus),
            self.value(SampleField::BatteryValue),
        )
    }
}

// Serialized as a labeled map so exports carry the wire column names.
impl Serialize for SampleRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1 + FIELD_COUNT))?;
        map.serialize_entry(TICKS_LABEL, &self.ticks)?;
        for field in SampleField::ALL {
            map.serialize_entry(&field.to_string(), &self.value(field))?;
        }
        map.end()
    }
}

/// Partition a validated 512-byte sector into decoded samples.
///
/// The payload must be exactly [`SECTOR_SIZE`] bytes and `values_per_sample`
/// must match the fixed channel schema; other widths would leave the label
/// mapping undefined and are rejected rather than truncated or padded.
pub fn decode_sector(
    payload: &[u8],
    values_per_sample: u16,
) -> Result<Vec<SampleRecord>, SdlogError> {
    if payload.len() != SECTOR_SIZE {
        return Err(SdlogError::InvalidSectorLength {
            expected: SECTOR_SIZE,
            actual: payload.len(),
        });
    }
    if values_per_sample != DEFAULT_VALUES_PER_SAMPLE {
        return Err(SdlogError::Configuration(format!(
            "values_per_sample must be {DEFAULT_VALUES_PER_SAMPLE} for the {FIELD_COUNT}-channel schema, got {values_per_sample}"
        )));
    }

    let sample_width = values_per_sample as usize * 2;
    let mut samples = Vec::with_capacity(SECTOR_SIZE / sample_width);
    for chunk in payload.chunks_exact(sample_width) {
        let raw = SampleRaw::ref_from_bytes(chunk).map_err(|_| {
            SdlogError::Configuration(format!(
                "sample width {sample_width} does not match the raw sample layout"
            ))
        })?;
        samples.push(SampleRecord::from(raw));
    }
    Ok(samples)
}
