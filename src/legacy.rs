//! Legacy version-1 decode path
//!
//! The version-1 format predates the columnar message: explicit 4-byte
//! big-endian record counts followed by raw fixed-size big-endian records,
//! with no delta coding. Events travel in a separate compressed stream with
//! their own 2-byte version header. Decode-only; the producing apps no
//! longer write this version.
//!
//! Measurement stream layout after decompression:
//! version u16, location count u32, acceleration count u32, rotation count
//! u32, direction count u32, then the records. A location is
//! {ts i64, lat f64, lon f64, speed i32 (cm/s), accuracy i32 (cm)}; a sensor
//! point is {ts i64, x f64, y f64, z f64} in physical units.
//!
//! Event stream layout after decompression:
//! version u16, count u32, then {ts i64, type u16, value length u16, value}.

use std::io::Read;

use byteorder::{BigEndian, ReadBytesExt};

use crate::compress;
use crate::error::CodecError;
use crate::track::TrackBuilder;
use crate::types::{Event, EventType, GeoLocation, Measurement, MetaData, Point3d};
use crate::units;
use crate::LEGACY_FORMAT_VERSION;

/// Decoder for the legacy phone-export format.
#[derive(Debug, Default)]
pub struct LegacyDeserializer;

impl LegacyDeserializer {
    pub fn new() -> Self {
        Self
    }

    /// Decode one legacy measurement from its two compressed streams.
    pub fn decode<R: Read, S: Read>(
        &self,
        metadata: MetaData,
        data: R,
        events: S,
    ) -> Result<Measurement, CodecError> {
        let (locations, accelerations, rotations, directions) = self.decode_data(data)?;
        let events = self.decode_events(events)?;
        let tracks = TrackBuilder::new().build(
            &locations,
            &events,
            &accelerations,
            &rotations,
            &directions,
        )?;
        Ok(Measurement::new(metadata, tracks))
    }

    /// Decode the measurement stream into the four flat data lists.
    #[allow(clippy::type_complexity)]
    pub fn decode_data<R: Read>(
        &self,
        data: R,
    ) -> Result<
        (
            Vec<GeoLocation>,
            Vec<Point3d>,
            Vec<Point3d>,
            Vec<Point3d>,
        ),
        CodecError,
    > {
        let bytes = compress::decompress(data)?;
        let mut cursor = &bytes[..];

        check_version(&mut cursor, "legacy data header")?;
        let location_count = read_count(&mut cursor, "location count")?;
        let acceleration_count = read_count(&mut cursor, "acceleration count")?;
        let rotation_count = read_count(&mut cursor, "rotation count")?;
        let direction_count = read_count(&mut cursor, "direction count")?;

        let mut locations = Vec::with_capacity(location_count);
        for _ in 0..location_count {
            let timestamp_ms = read_i64(&mut cursor, "location record")?;
            let latitude = read_f64(&mut cursor, "location record")?;
            let longitude = read_f64(&mut cursor, "location record")?;
            let speed = read_i32(&mut cursor, "location record")?;
            let accuracy = read_i32(&mut cursor, "location record")?;
            locations.push(GeoLocation::new(
                units::validate_timestamp(timestamp_ms)?,
                latitude,
                longitude,
                units::accuracy_from_wire(i64::from(accuracy)),
                units::speed_from_wire(i64::from(speed)),
            )?);
        }

        let accelerations = read_points(&mut cursor, acceleration_count)?;
        let rotations = read_points(&mut cursor, rotation_count)?;
        let directions = read_points(&mut cursor, direction_count)?;

        Ok((locations, accelerations, rotations, directions))
    }

    /// Decode the separate event stream.
    pub fn decode_events<R: Read>(&self, events: R) -> Result<Vec<Event>, CodecError> {
        let bytes = compress::decompress(events)?;
        let mut cursor = &bytes[..];

        check_version(&mut cursor, "legacy event header")?;
        let count = read_count(&mut cursor, "event count")?;

        let mut decoded = Vec::with_capacity(count);
        for _ in 0..count {
            let timestamp_ms = read_i64(&mut cursor, "event record")?;
            let type_code = read_u16(&mut cursor, "event record")?;
            if type_code > u16::from(u8::MAX) {
                return Err(CodecError::MalformedMessage(format!(
                    "event type {type_code} out of range"
                )));
            }
            let event_type = EventType::from_wire_number(type_code as u8)?;
            let value_len = read_u16(&mut cursor, "event record")? as usize;
            let value = if value_len == 0 {
                None
            } else {
                let mut raw = vec![0u8; value_len];
                cursor
                    .read_exact(&mut raw)
                    .map_err(|_| CodecError::TruncatedStream("event value"))?;
                Some(String::from_utf8(raw).map_err(|_| {
                    CodecError::MalformedMessage("event value is not UTF-8".into())
                })?)
            };
            decoded.push(Event {
                timestamp_ms,
                event_type,
                value,
            });
        }

        Ok(decoded)
    }
}

fn check_version(cursor: &mut &[u8], context: &'static str) -> Result<(), CodecError> {
    let version = read_u16(cursor, context)?;
    if version != LEGACY_FORMAT_VERSION {
        return Err(CodecError::UnsupportedFormatVersion {
            expected: LEGACY_FORMAT_VERSION,
            found: version,
        });
    }
    Ok(())
}

fn read_points(cursor: &mut &[u8], count: usize) -> Result<Vec<Point3d>, CodecError> {
    let mut points = Vec::with_capacity(count);
    for _ in 0..count {
        let timestamp_ms = read_i64(cursor, "sensor record")?;
        let x = read_f64(cursor, "sensor record")?;
        let y = read_f64(cursor, "sensor record")?;
        let z = read_f64(cursor, "sensor record")?;
        points.push(Point3d::new(
            units::validate_timestamp(timestamp_ms)?,
            x as f32,
            y as f32,
            z as f32,
        ));
    }
    Ok(points)
}

fn read_u16(cursor: &mut &[u8], context: &'static str) -> Result<u16, CodecError> {
    cursor
        .read_u16::<BigEndian>()
        .map_err(|_| CodecError::TruncatedStream(context))
}

fn read_i32(cursor: &mut &[u8], context: &'static str) -> Result<i32, CodecError> {
    cursor
        .read_i32::<BigEndian>()
        .map_err(|_| CodecError::TruncatedStream(context))
}

fn read_i64(cursor: &mut &[u8], context: &'static str) -> Result<i64, CodecError> {
    cursor
        .read_i64::<BigEndian>()
        .map_err(|_| CodecError::TruncatedStream(context))
}

fn read_f64(cursor: &mut &[u8], context: &'static str) -> Result<f64, CodecError> {
    cursor
        .read_f64::<BigEndian>()
        .map_err(|_| CodecError::TruncatedStream(context))
}

/// Read a record count. Records occupy many bytes each, so a count beyond
/// the remaining input is a truncated stream and must fail before any
/// allocation sized from it.
fn read_count(cursor: &mut &[u8], context: &'static str) -> Result<usize, CodecError> {
    let count = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| CodecError::TruncatedStream(context))? as usize;
    if count > cursor.len() {
        return Err(CodecError::TruncatedStream(context));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn make_metadata() -> MetaData {
        MetaData::new(
            crate::types::MeasurementIdentifier::new("legacy-device", 3),
            "Pixel 2",
            "Android 8",
            "1.0.0",
            98.0,
            "user-1",
            LEGACY_FORMAT_VERSION,
            chrono::Utc.with_ymd_and_hms(2019, 6, 1, 8, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn write_location(out: &mut Vec<u8>, ts: i64, lat: f64, lon: f64, speed_cm: i32, acc_cm: i32) {
        out.write_i64::<BigEndian>(ts).unwrap();
        out.write_f64::<BigEndian>(lat).unwrap();
        out.write_f64::<BigEndian>(lon).unwrap();
        out.write_i32::<BigEndian>(speed_cm).unwrap();
        out.write_i32::<BigEndian>(acc_cm).unwrap();
    }

    fn write_point(out: &mut Vec<u8>, ts: i64, x: f64, y: f64, z: f64) {
        out.write_i64::<BigEndian>(ts).unwrap();
        out.write_f64::<BigEndian>(x).unwrap();
        out.write_f64::<BigEndian>(y).unwrap();
        out.write_f64::<BigEndian>(z).unwrap();
    }

    fn make_data_stream() -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(LEGACY_FORMAT_VERSION).unwrap();
        out.write_u32::<BigEndian>(2).unwrap();
        out.write_u32::<BigEndian>(2).unwrap();
        out.write_u32::<BigEndian>(0).unwrap();
        out.write_u32::<BigEndian>(1).unwrap();
        write_location(&mut out, 1000, 51.012345, 13.712, 850, 500);
        write_location(&mut out, 2000, 51.0124, 13.71208, 900, 480);
        write_point(&mut out, 1000, 9.81, -0.12, 0.055);
        write_point(&mut out, 1010, 9.79, -0.118, 0.06);
        write_point(&mut out, 1005, 48.0, -12.5, 3.25);
        compress::compress(&out).unwrap()
    }

    fn make_event_stream() -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(LEGACY_FORMAT_VERSION).unwrap();
        out.write_u32::<BigEndian>(3).unwrap();
        // start
        out.write_i64::<BigEndian>(1000).unwrap();
        out.write_u16::<BigEndian>(1).unwrap();
        out.write_u16::<BigEndian>(0).unwrap();
        // modality change with value
        out.write_i64::<BigEndian>(1500).unwrap();
        out.write_u16::<BigEndian>(5).unwrap();
        out.write_u16::<BigEndian>(3).unwrap();
        out.extend_from_slice(b"BUS");
        // stop
        out.write_i64::<BigEndian>(2000).unwrap();
        out.write_u16::<BigEndian>(4).unwrap();
        out.write_u16::<BigEndian>(0).unwrap();
        compress::compress(&out).unwrap()
    }

    #[test]
    fn test_legacy_decode_end_to_end() {
        let measurement = LegacyDeserializer::new()
            .decode(
                make_metadata(),
                make_data_stream().as_slice(),
                make_event_stream().as_slice(),
            )
            .unwrap();

        assert_eq!(measurement.tracks.len(), 1);
        let track = &measurement.tracks[0];
        assert_eq!(track.locations.len(), 2);
        assert_eq!(track.locations[0].latitude, 51.012345);
        assert_eq!(track.locations[0].speed, 8.5);
        assert_eq!(track.locations[1].accuracy, 4.8);
        assert_eq!(track.accelerations.len(), 2);
        assert_eq!(track.directions.len(), 1);
        assert!(track.rotations.is_empty());
        // Modality change at 1500 applies to the second fix
        assert_eq!(
            track.locations[1].modality,
            crate::types::Modality::Bus
        );
    }

    #[test]
    fn test_legacy_version_mismatch() {
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(3).unwrap();
        let compressed = compress::compress(&out).unwrap();
        let result = LegacyDeserializer::new().decode_data(compressed.as_slice());
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedFormatVersion {
                expected: LEGACY_FORMAT_VERSION,
                found: 3,
            })
        ));
    }

    #[test]
    fn test_legacy_truncated_record() {
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(LEGACY_FORMAT_VERSION).unwrap();
        out.write_u32::<BigEndian>(1).unwrap();
        out.write_u32::<BigEndian>(0).unwrap();
        out.write_u32::<BigEndian>(0).unwrap();
        out.write_u32::<BigEndian>(0).unwrap();
        // Record promises a location but delivers only the timestamp
        out.write_i64::<BigEndian>(1000).unwrap();
        let compressed = compress::compress(&out).unwrap();
        let result = LegacyDeserializer::new().decode_data(compressed.as_slice());
        assert!(matches!(
            result,
            Err(CodecError::TruncatedStream("location record"))
        ));
    }

    #[test]
    fn test_legacy_unknown_event_type() {
        let mut out = Vec::new();
        out.write_u16::<BigEndian>(LEGACY_FORMAT_VERSION).unwrap();
        out.write_u32::<BigEndian>(1).unwrap();
        out.write_i64::<BigEndian>(1000).unwrap();
        out.write_u16::<BigEndian>(99).unwrap();
        out.write_u16::<BigEndian>(0).unwrap();
        let compressed = compress::compress(&out).unwrap();
        let result = LegacyDeserializer::new().decode_events(compressed.as_slice());
        assert!(matches!(result, Err(CodecError::UnknownEventType(99))));
    }
}
