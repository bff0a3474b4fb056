//! Columnar wire message
//!
//! The structured message carried after the format-version header. Integer
//! columns are zigzag+varint coded; the per-stream codecs fill them with
//! delta/offset values that are already fixed-point scaled, so this layer
//! only moves integers and never interprets them.
//!
//! Layout: five tagged blocks in fixed order: events, locations, then one
//! block per sensor stream. Location data is five parallel integer columns;
//! each sensor block is a sequence of batches of four parallel columns.
//! Every block tolerates a zero count.

use crate::error::CodecError;

const TAG_EVENTS: u8 = 0x01;
const TAG_LOCATIONS: u8 = 0x02;
const TAG_ACCELERATIONS: u8 = 0x03;
const TAG_ROTATIONS: u8 = 0x04;
const TAG_DIRECTIONS: u8 = 0x05;

/// One event record as carried on the wire. The type byte is validated by the
/// event codec, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct WireEvent {
    pub timestamp_ms: i64,
    pub event_type: u8,
    pub value: Option<String>,
}

/// Five parallel integer columns for a measurement's location stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationColumns {
    pub timestamps: Vec<i64>,
    pub latitudes: Vec<i64>,
    pub longitudes: Vec<i64>,
    pub accuracies: Vec<i64>,
    pub speeds: Vec<i64>,
}

impl LocationColumns {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Four parallel integer columns for one batch of 3D samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointColumns {
    pub timestamps: Vec<i64>,
    pub x: Vec<i64>,
    pub y: Vec<i64>,
    pub z: Vec<i64>,
}

impl PointColumns {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// The complete message: events plus the four data streams.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireMessage {
    pub events: Vec<WireEvent>,
    pub locations: LocationColumns,
    pub accelerations: Vec<PointColumns>,
    pub rotations: Vec<PointColumns>,
    pub directions: Vec<PointColumns>,
}

impl WireMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        out.push(TAG_EVENTS);
        write_varint(self.events.len() as u64, &mut out);
        for event in &self.events {
            write_zigzag(event.timestamp_ms, &mut out);
            out.push(event.event_type);
            match &event.value {
                None => out.push(0),
                Some(value) => {
                    out.push(1);
                    write_varint(value.len() as u64, &mut out);
                    out.extend_from_slice(value.as_bytes());
                }
            }
        }

        out.push(TAG_LOCATIONS);
        write_varint(self.locations.len() as u64, &mut out);
        for column in [
            &self.locations.timestamps,
            &self.locations.latitudes,
            &self.locations.longitudes,
            &self.locations.accuracies,
            &self.locations.speeds,
        ] {
            for &value in column {
                write_zigzag(value, &mut out);
            }
        }

        for (tag, batches) in [
            (TAG_ACCELERATIONS, &self.accelerations),
            (TAG_ROTATIONS, &self.rotations),
            (TAG_DIRECTIONS, &self.directions),
        ] {
            out.push(tag);
            write_varint(batches.len() as u64, &mut out);
            for batch in batches {
                write_varint(batch.len() as u64, &mut out);
                for column in [&batch.timestamps, &batch.x, &batch.y, &batch.z] {
                    for &value in column {
                        write_zigzag(value, &mut out);
                    }
                }
            }
        }

        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(bytes);

        reader.expect_tag(TAG_EVENTS, "events block")?;
        let event_count = reader.read_count("event count")?;
        let mut events = Vec::with_capacity(event_count);
        for _ in 0..event_count {
            let timestamp_ms = reader.read_zigzag("event timestamp")?;
            let event_type = reader.read_u8("event type")?;
            let value = match reader.read_u8("event value marker")? {
                0 => None,
                _ => {
                    let len = reader.read_count("event value length")?;
                    let raw = reader.read_exact(len, "event value")?;
                    Some(String::from_utf8(raw.to_vec()).map_err(|_| {
                        CodecError::MalformedMessage("event value is not UTF-8".into())
                    })?)
                }
            };
            events.push(WireEvent {
                timestamp_ms,
                event_type,
                value,
            });
        }

        reader.expect_tag(TAG_LOCATIONS, "locations block")?;
        let location_count = reader.read_count("location count")?;
        let mut locations = LocationColumns::default();
        for column in [
            &mut locations.timestamps,
            &mut locations.latitudes,
            &mut locations.longitudes,
            &mut locations.accuracies,
            &mut locations.speeds,
        ] {
            column.reserve(location_count);
            for _ in 0..location_count {
                column.push(reader.read_zigzag("location column")?);
            }
        }

        let accelerations = decode_sensor_block(&mut reader, TAG_ACCELERATIONS)?;
        let rotations = decode_sensor_block(&mut reader, TAG_ROTATIONS)?;
        let directions = decode_sensor_block(&mut reader, TAG_DIRECTIONS)?;

        if reader.remaining() != 0 {
            return Err(CodecError::MalformedMessage(format!(
                "{} trailing bytes after message",
                reader.remaining()
            )));
        }

        Ok(Self {
            events,
            locations,
            accelerations,
            rotations,
            directions,
        })
    }
}

fn decode_sensor_block(
    reader: &mut ByteReader<'_>,
    tag: u8,
) -> Result<Vec<PointColumns>, CodecError> {
    reader.expect_tag(tag, "sensor block")?;
    let batch_count = reader.read_count("sensor batch count")?;
    let mut batches = Vec::with_capacity(batch_count);
    for _ in 0..batch_count {
        let point_count = reader.read_count("sensor point count")?;
        let mut batch = PointColumns::default();
        for column in [
            &mut batch.timestamps,
            &mut batch.x,
            &mut batch.y,
            &mut batch.z,
        ] {
            column.reserve(point_count);
            for _ in 0..point_count {
                column.push(reader.read_zigzag("sensor column")?);
            }
        }
        batches.push(batch);
    }
    Ok(batches)
}

struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    fn read_u8(&mut self, context: &'static str) -> Result<u8, CodecError> {
        let byte = *self
            .bytes
            .get(self.position)
            .ok_or(CodecError::TruncatedStream(context))?;
        self.position += 1;
        Ok(byte)
    }

    fn read_exact(&mut self, len: usize, context: &'static str) -> Result<&'a [u8], CodecError> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(CodecError::TruncatedStream(context))?;
        let slice = &self.bytes[self.position..end];
        self.position = end;
        Ok(slice)
    }

    fn expect_tag(&mut self, tag: u8, context: &'static str) -> Result<(), CodecError> {
        let found = self.read_u8(context)?;
        if found != tag {
            return Err(CodecError::MalformedMessage(format!(
                "expected tag {tag:#04x} for {context}, found {found:#04x}"
            )));
        }
        Ok(())
    }

    fn read_varint(&mut self, context: &'static str) -> Result<u64, CodecError> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8(context)?;
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift >= 64 {
                return Err(CodecError::MalformedMessage(format!(
                    "varint overflow in {context}"
                )));
            }
        }
    }

    /// Read an element count. Every counted element occupies at least one
    /// byte, so a count beyond the remaining input is a truncated stream and
    /// must fail before any allocation sized from it.
    fn read_count(&mut self, context: &'static str) -> Result<usize, CodecError> {
        let value = self.read_varint(context)?;
        let count = usize::try_from(value)
            .map_err(|_| CodecError::MalformedMessage(format!("count overflow in {context}")))?;
        if count > self.remaining() {
            return Err(CodecError::TruncatedStream(context));
        }
        Ok(count)
    }

    fn read_zigzag(&mut self, context: &'static str) -> Result<i64, CodecError> {
        let encoded = self.read_varint(context)?;
        Ok(((encoded >> 1) as i64) ^ -((encoded & 1) as i64))
    }
}

fn write_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn write_zigzag(value: i64, out: &mut Vec<u8>) {
    write_varint(((value << 1) ^ (value >> 63)) as u64, out);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn make_message() -> WireMessage {
        WireMessage {
            events: vec![
                WireEvent {
                    timestamp_ms: 1000,
                    event_type: 1,
                    value: None,
                },
                WireEvent {
                    timestamp_ms: 2500,
                    event_type: 5,
                    value: Some("BICYCLE".to_string()),
                },
            ],
            locations: LocationColumns {
                timestamps: vec![1000, 500],
                latitudes: vec![51_012_345, 55],
                longitudes: vec![13_712_000, 80],
                accuracies: vec![500, -20],
                speeds: vec![850, 50],
            },
            accelerations: vec![PointColumns {
                timestamps: vec![1000, 10],
                x: vec![9810, -20],
                y: vec![-120, 2],
                z: vec![55, -15],
            }],
            rotations: vec![],
            directions: vec![PointColumns::default()],
        }
    }

    #[test]
    fn test_message_roundtrip() {
        let message = make_message();
        let bytes = message.encode();
        let decoded = WireMessage::decode(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_empty_message_roundtrip() {
        let message = WireMessage::default();
        let decoded = WireMessage::decode(&message.encode()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_truncated_message_is_an_error() {
        let bytes = make_message().encode();
        for cut in [0, 1, bytes.len() / 2, bytes.len() - 1] {
            let result = WireMessage::decode(&bytes[..cut]);
            assert!(
                matches!(result, Err(CodecError::TruncatedStream(_))),
                "cut at {cut} should be a truncation error"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_are_an_error() {
        let mut bytes = make_message().encode();
        bytes.push(0x00);
        assert!(matches!(
            WireMessage::decode(&bytes),
            Err(CodecError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_wrong_block_tag_is_an_error() {
        let mut bytes = make_message().encode();
        bytes[0] = 0x7E;
        assert!(matches!(
            WireMessage::decode(&bytes),
            Err(CodecError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_zigzag_negative_values() {
        let mut out = Vec::new();
        write_zigzag(-1, &mut out);
        assert_eq!(out, vec![0x01]);
        let mut reader = ByteReader::new(&out);
        assert_eq!(reader.read_zigzag("test").unwrap(), -1);
    }
}
