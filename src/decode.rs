//! Top-level measurement decoding
//!
//! A [`Decoder`] is built from an explicit [`DecodeVariant`] and runs the
//! full pipeline: version-header check → optional decompression → wire
//! message parse → per-stream decode → track segmentation → [`Measurement`].
//! The header travels outside the compression wrapper, so an unsupported
//! version is rejected before any decompression or parsing.
//!
//! The legacy version-1 format has its own decode path in [`crate::legacy`]
//! because it arrives as two separate streams.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};

use crate::codec::{EventDeserializer, LocationDeserializer, Point3dDeserializer};
use crate::compress;
use crate::error::CodecError;
use crate::track::TrackBuilder;
use crate::types::{Event, GeoLocation, Measurement, MetaData, Point3d};
use crate::units::SensorStream;
use crate::wire::WireMessage;
use crate::FORMAT_VERSION;

/// How the incoming byte stream is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeVariant {
    /// Transfer stream: plain header, raw-DEFLATE-compressed message
    Compressed,
    /// Uncompressed storage stream, same header and message layout
    Uncompressed,
}

/// Decoder for the current binary format version.
#[derive(Debug)]
pub struct Decoder {
    variant: DecodeVariant,
}

impl Decoder {
    pub fn new(variant: DecodeVariant) -> Self {
        Self { variant }
    }

    pub fn compressed() -> Self {
        Self::new(DecodeVariant::Compressed)
    }

    pub fn uncompressed() -> Self {
        Self::new(DecodeVariant::Uncompressed)
    }

    /// Decode one measurement from the given stream.
    ///
    /// # Arguments
    /// * `metadata` - Validated descriptive data attached to the measurement
    /// * `reader` - The recording bytes, wrapped as declared by the variant
    ///
    /// # Returns
    /// The measurement with its lifecycle-bounded, modality-annotated tracks
    ///
    /// # Example
    /// ```ignore
    /// let measurement = Decoder::compressed().decode(metadata, file)?;
    /// println!("{} tracks", measurement.tracks.len());
    /// ```
    pub fn decode<R: Read>(
        &self,
        metadata: MetaData,
        reader: R,
    ) -> Result<Measurement, CodecError> {
        let (events, locations, accelerations, rotations, directions) =
            self.decode_streams(reader)?;
        let tracks = TrackBuilder::new().build(
            &locations,
            &events,
            &accelerations,
            &rotations,
            &directions,
        )?;
        Ok(Measurement::new(metadata, tracks))
    }

    /// Decode the five flat streams without running track segmentation.
    #[allow(clippy::type_complexity)]
    pub fn decode_streams<R: Read>(
        &self,
        mut reader: R,
    ) -> Result<
        (
            Vec<Event>,
            Vec<GeoLocation>,
            Vec<Point3d>,
            Vec<Point3d>,
            Vec<Point3d>,
        ),
        CodecError,
    > {
        // Version check happens before any decompression or parsing
        let mut header = [0u8; 2];
        reader.read_exact(&mut header).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                CodecError::TruncatedStream("format version header")
            } else {
                CodecError::Io(e)
            }
        })?;
        let version = BigEndian::read_u16(&header);
        if version != FORMAT_VERSION {
            return Err(CodecError::UnsupportedFormatVersion {
                expected: FORMAT_VERSION,
                found: version,
            });
        }

        let payload = match self.variant {
            DecodeVariant::Compressed => compress::decompress(reader)?,
            DecodeVariant::Uncompressed => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                bytes
            }
        };

        let message = WireMessage::decode(&payload)?;
        let events = EventDeserializer::decode(&message.events)?;
        let locations = LocationDeserializer::decode(&message.locations)?;
        let accelerations = Point3dDeserializer::new(SensorStream::Acceleration)
            .decode_batches(&message.accelerations)?;
        let rotations =
            Point3dDeserializer::new(SensorStream::Rotation).decode_batches(&message.rotations)?;
        let directions = Point3dDeserializer::new(SensorStream::Direction)
            .decode_batches(&message.directions)?;

        Ok((events, locations, accelerations, rotations, directions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::MeasurementSerializer;
    use crate::types::{EventType, MeasurementIdentifier, Modality};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn make_metadata() -> MetaData {
        MetaData::new(
            MeasurementIdentifier::new("device-1", 7),
            "Pixel 8",
            "Android 14",
            "3.2.1",
            421.7,
            "user-1",
            FORMAT_VERSION,
            chrono::Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn make_events() -> Vec<Event> {
        vec![
            Event::lifecycle(1000, EventType::LifecycleStart),
            Event::modality_change(1200, Modality::Bicycle),
            Event::lifecycle(4000, EventType::LifecycleStop),
        ]
    }

    fn make_locations() -> Vec<GeoLocation> {
        vec![
            GeoLocation::new(1000, 51.012345, 13.712, 5.0, 8.5).unwrap(),
            GeoLocation::new(2000, 51.0124, 13.71208, 4.8, 9.0).unwrap(),
            GeoLocation::new(3000, 51.0125, 13.712161, 5.2, 7.9).unwrap(),
        ]
    }

    fn make_points(base_ts: i64) -> Vec<Point3d> {
        (0..5)
            .map(|i| Point3d::new(base_ts + i * 10, 9.81, -0.12, 0.055))
            .collect()
    }

    #[test]
    fn test_compressed_roundtrip_produces_annotated_track() {
        let events = make_events();
        let locations = make_locations();
        let accelerations = vec![make_points(1000), make_points(2000)];

        let bytes = MeasurementSerializer::new()
            .encode_compressed(&events, &locations, &accelerations, &[], &[])
            .unwrap();
        let measurement = Decoder::compressed()
            .decode(make_metadata(), bytes.as_slice())
            .unwrap();

        assert_eq!(measurement.tracks.len(), 1);
        let track = &measurement.tracks[0];
        assert_eq!(track.locations.len(), 3);
        assert_eq!(track.accelerations.len(), 10);
        assert!(track.rotations.is_empty());
        // Modality change at 1200 applies to the later fixes only
        assert_eq!(track.locations[0].modality, Modality::Unknown);
        assert_eq!(track.locations[1].modality, Modality::Bicycle);
    }

    #[test]
    fn test_uncompressed_variant_reads_same_layout() {
        let events = make_events();
        let locations = make_locations();
        let bytes = MeasurementSerializer::new()
            .encode(&events, &locations, &[], &[], &[])
            .unwrap();

        let (decoded_events, decoded_locations, accelerations, rotations, directions) =
            Decoder::uncompressed().decode_streams(bytes.as_slice()).unwrap();
        assert_eq!(decoded_events, events);
        assert_eq!(decoded_locations, locations);
        assert!(accelerations.is_empty());
        assert!(rotations.is_empty());
        assert!(directions.is_empty());
    }

    #[test]
    fn test_version_mismatch_stops_before_parsing() {
        // Header says version 2, followed by bytes that are not a valid message
        let bytes = [0x00, 0x02, 0xFF, 0xFF, 0xFF];
        let result = Decoder::uncompressed().decode_streams(&bytes[..]);
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedFormatVersion {
                expected: FORMAT_VERSION,
                found: 2,
            })
        ));
    }

    #[test]
    fn test_version_mismatch_stops_before_decompression() {
        // The bytes after the header are not a valid DEFLATE stream; a
        // version check that ran after decompression would surface an I/O
        // error instead of the version mismatch.
        let bytes = [0x00, 0x02, 0xDE, 0xAD, 0xBE, 0xEF];
        let result = Decoder::compressed().decode_streams(&bytes[..]);
        assert!(matches!(
            result,
            Err(CodecError::UnsupportedFormatVersion {
                expected: FORMAT_VERSION,
                found: 2,
            })
        ));
    }

    #[test]
    fn test_missing_header_is_truncation() {
        let result = Decoder::uncompressed().decode_streams(&[0x00][..]);
        assert!(matches!(
            result,
            Err(CodecError::TruncatedStream("format version header"))
        ));
    }
}
