//! Location stream codec

use crate::error::CodecError;
use crate::offset::{LocationDeOffsetter, LocationOffsetter};
use crate::types::GeoLocation;
use crate::units;
use crate::wire::LocationColumns;

/// Encodes a measurement's location stream into wire columns.
///
/// One instance per measurement: the delta state spans the whole flat
/// location list, not a single track.
#[derive(Debug, Default)]
pub struct LocationSerializer {
    offsetter: LocationOffsetter,
    columns: LocationColumns,
}

impl LocationSerializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one location, in timestamp order.
    pub fn push(&mut self, location: &GeoLocation) {
        let (timestamp, latitude, longitude, accuracy, speed) = self.offsetter.offset(
            location.timestamp_ms,
            units::degrees_to_wire(location.latitude),
            units::degrees_to_wire(location.longitude),
            units::accuracy_to_wire(location.accuracy),
            units::speed_to_wire(location.speed),
        );
        self.columns.timestamps.push(timestamp);
        self.columns.latitudes.push(latitude);
        self.columns.longitudes.push(longitude);
        self.columns.accuracies.push(accuracy);
        self.columns.speeds.push(speed);
    }

    pub fn finish(self) -> LocationColumns {
        self.columns
    }
}

/// Decodes wire columns back into the flat location stream.
#[derive(Debug, Default)]
pub struct LocationDeserializer;

impl LocationDeserializer {
    /// Decode the full location stream through a single fresh de-offsetter.
    pub fn decode(columns: &LocationColumns) -> Result<Vec<GeoLocation>, CodecError> {
        let count = columns.len();
        if [
            columns.latitudes.len(),
            columns.longitudes.len(),
            columns.accuracies.len(),
            columns.speeds.len(),
        ]
        .iter()
        .any(|&len| len != count)
        {
            return Err(CodecError::MalformedMessage(
                "location columns have inconsistent lengths".into(),
            ));
        }

        let mut deoffsetter = LocationDeOffsetter::new();
        let mut locations = Vec::with_capacity(count);
        for index in 0..count {
            let (timestamp, latitude, longitude, accuracy, speed) = deoffsetter.absolute(
                columns.timestamps[index],
                columns.latitudes[index],
                columns.longitudes[index],
                columns.accuracies[index],
                columns.speeds[index],
            );
            locations.push(GeoLocation::new(
                units::validate_timestamp(timestamp)?,
                units::degrees_from_wire(latitude),
                units::degrees_from_wire(longitude),
                units::accuracy_from_wire(accuracy),
                units::speed_from_wire(speed),
            )?);
        }
        Ok(locations)
    }
}
