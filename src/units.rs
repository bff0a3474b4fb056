//! Fixed-point unit scaling
//!
//! Stateless conversions between physical floating-point units and the scaled
//! integers carried on the wire. Scales are powers of ten chosen per quantity:
//!
//! | quantity           | wire unit     | scale      |
//! |--------------------|---------------|------------|
//! | latitude/longitude | micro-degrees | ×1,000,000 |
//! | speed              | cm/s          | ×100       |
//! | accuracy           | cm            | ×100       |
//! | acceleration       | mm/s²         | ×1,000     |
//! | rotation           | mrad/s        | ×1,000     |
//! | direction          | 0.01 µT       | ×100       |
//!
//! Acceleration and rotation carry a quantization error of up to ±0.001 of a
//! unit, direction up to ±0.01; consumers must tolerate that rather than
//! expect bit-exact floats.

use crate::error::CodecError;

/// Scale factor for latitude/longitude in micro-degrees
pub const COORDINATE_FACTOR: f64 = 1_000_000.0;
/// Scale factor for centimeter-resolution quantities (speed, accuracy)
pub const CENTI_FACTOR: f64 = 100.0;

/// Earliest decodable timestamp: 1970-01-01T00:00:00Z in epoch milliseconds
pub const MIN_TIMESTAMP_MS: i64 = 0;
/// Latest decodable timestamp: 2099-12-31T23:59:59.999Z in epoch milliseconds
pub const MAX_TIMESTAMP_MS: i64 = 4_102_444_799_999;

pub fn degrees_to_wire(degrees: f64) -> i64 {
    (degrees * COORDINATE_FACTOR).round() as i64
}

pub fn degrees_from_wire(value: i64) -> f64 {
    value as f64 / COORDINATE_FACTOR
}

/// Speed in m/s to cm/s
pub fn speed_to_wire(meters_per_second: f64) -> i64 {
    (meters_per_second * CENTI_FACTOR).round() as i64
}

pub fn speed_from_wire(value: i64) -> f64 {
    value as f64 / CENTI_FACTOR
}

/// Accuracy in meters to centimeters
pub fn accuracy_to_wire(meters: f64) -> i64 {
    (meters * CENTI_FACTOR).round() as i64
}

pub fn accuracy_from_wire(value: i64) -> f64 {
    value as f64 / CENTI_FACTOR
}

/// Bounds check applied to every timestamp read from the wire. A violation is
/// a fatal input-validation error.
pub fn validate_timestamp(timestamp_ms: i64) -> Result<i64, CodecError> {
    if !(MIN_TIMESTAMP_MS..=MAX_TIMESTAMP_MS).contains(&timestamp_ms) {
        return Err(CodecError::TimestampOutOfRange(timestamp_ms));
    }
    Ok(timestamp_ms)
}

/// The three tri-axial sensor streams, each with its own scaling constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorStream {
    /// m/s², scaled to mm/s²
    Acceleration,
    /// rad/s, scaled to mrad/s
    Rotation,
    /// µT, scaled to 0.01 µT units
    Direction,
}

impl SensorStream {
    pub fn scale(&self) -> f64 {
        match self {
            SensorStream::Acceleration | SensorStream::Rotation => 1_000.0,
            SensorStream::Direction => 100.0,
        }
    }

    /// Maximum round-trip error introduced by the fixed-point scaling.
    pub fn quantization_error(&self) -> f32 {
        match self {
            SensorStream::Acceleration | SensorStream::Rotation => 0.001,
            SensorStream::Direction => 0.01,
        }
    }

    pub fn to_wire(&self, value: f32) -> i64 {
        (f64::from(value) * self.scale()).round() as i64
    }

    pub fn from_wire(&self, value: i64) -> f32 {
        (value as f64 / self.scale()) as f32
    }
}
