//! Top-level measurement encoding
//!
//! Writes the 2-byte big-endian format-version header followed by the
//! columnar wire message, composing the per-stream serializers. The
//! compressed transfer variant keeps the header bytes plain and wraps only
//! the message in raw DEFLATE, so a reader can reject a wrong version
//! without touching the decompressor.

use byteorder::{BigEndian, WriteBytesExt};

use crate::codec::{EventSerializer, LocationSerializer, Point3dSerializer};
use crate::compress;
use crate::error::CodecError;
use crate::types::{Event, GeoLocation, Point3d};
use crate::units::SensorStream;
use crate::wire::{PointColumns, WireMessage};
use crate::FORMAT_VERSION;

/// Encoder for the current binary format version.
#[derive(Debug, Default)]
pub struct MeasurementSerializer;

impl MeasurementSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Encode to the pre-compression byte stream: version header plus message.
    ///
    /// # Arguments
    /// * `events` - Lifecycle and modality events, ordered by timestamp
    /// * `locations` - The measurement's flat location stream, ordered by timestamp
    /// * `acceleration_batches` - Acceleration samples, batched as captured
    /// * `rotation_batches` - Rotation samples, batched as captured
    /// * `direction_batches` - Direction samples, batched as captured
    ///
    /// # Returns
    /// The uncompressed storage representation of the measurement
    pub fn encode(
        &self,
        events: &[Event],
        locations: &[GeoLocation],
        acceleration_batches: &[Vec<Point3d>],
        rotation_batches: &[Vec<Point3d>],
        direction_batches: &[Vec<Point3d>],
    ) -> Result<Vec<u8>, CodecError> {
        let message = encode_message(
            events,
            locations,
            acceleration_batches,
            rotation_batches,
            direction_batches,
        );
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(FORMAT_VERSION)?;
        out.extend_from_slice(&message);
        Ok(out)
    }

    /// Encode the transfer format: the plain version header followed by the
    /// DEFLATE-compressed message.
    pub fn encode_compressed(
        &self,
        events: &[Event],
        locations: &[GeoLocation],
        acceleration_batches: &[Vec<Point3d>],
        rotation_batches: &[Vec<Point3d>],
        direction_batches: &[Vec<Point3d>],
    ) -> Result<Vec<u8>, CodecError> {
        let message = encode_message(
            events,
            locations,
            acceleration_batches,
            rotation_batches,
            direction_batches,
        );
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(FORMAT_VERSION)?;
        out.extend_from_slice(&compress::compress(&message)?);
        Ok(out)
    }
}

fn encode_message(
    events: &[Event],
    locations: &[GeoLocation],
    acceleration_batches: &[Vec<Point3d>],
    rotation_batches: &[Vec<Point3d>],
    direction_batches: &[Vec<Point3d>],
) -> Vec<u8> {
    let mut location_serializer = LocationSerializer::new();
    for location in locations {
        location_serializer.push(location);
    }

    let message = WireMessage {
        events: EventSerializer::encode(events),
        locations: location_serializer.finish(),
        accelerations: encode_batches(SensorStream::Acceleration, acceleration_batches),
        rotations: encode_batches(SensorStream::Rotation, rotation_batches),
        directions: encode_batches(SensorStream::Direction, direction_batches),
    };
    message.encode()
}

/// Each batch gets its own serializer: delta state never crosses batches.
fn encode_batches(stream: SensorStream, batches: &[Vec<Point3d>]) -> Vec<PointColumns> {
    batches
        .iter()
        .map(|batch| {
            let mut serializer = Point3dSerializer::new(stream);
            for point in batch {
                serializer.push(point);
            }
            serializer.finish()
        })
        .collect()
}
