//! Core types for the Trackpack codec and track builder
//!
//! This module defines the data model that flows through the codec: located
//! records, tri-axial sensor points, lifecycle events, and the track/measurement
//! aggregates produced by segmentation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CodecError;

/// Anything carrying a millisecond Unix timestamp, ordered by that timestamp.
pub trait Timestamped {
    fn timestamp_ms(&self) -> i64;
}

/// Identifier of one measurement: an opaque device id plus a per-device
/// measurement counter. Totally ordered by device id, then counter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MeasurementIdentifier {
    /// Opaque device identifier
    pub device_id: String,
    /// Non-negative per-device measurement counter
    pub measurement_id: u64,
}

impl MeasurementIdentifier {
    pub fn new(device_id: impl Into<String>, measurement_id: u64) -> Self {
        Self {
            device_id: device_id.into(),
            measurement_id,
        }
    }

    /// Create an identifier with a freshly generated device id.
    pub fn new_device(measurement_id: u64) -> Self {
        Self {
            device_id: Uuid::new_v4().to_string(),
            measurement_id,
        }
    }
}

impl std::fmt::Display for MeasurementIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.device_id, self.measurement_id)
    }
}

/// Mode of transport active during a location fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Unknown,
    Walking,
    Bicycle,
    Car,
    Bus,
    Train,
    Motorbike,
}

impl Modality {
    /// Database identifier carried by modality-change event values.
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Unknown => "UNKNOWN",
            Modality::Walking => "WALKING",
            Modality::Bicycle => "BICYCLE",
            Modality::Car => "CAR",
            Modality::Bus => "BUS",
            Modality::Train => "TRAIN",
            Modality::Motorbike => "MOTORBIKE",
        }
    }

    /// Parse a database identifier. Unrecognized identifiers map to `Unknown`
    /// so that forward-compatible event values never fail a decode.
    pub fn parse(value: &str) -> Self {
        match value {
            "WALKING" => Modality::Walking,
            "BICYCLE" => Modality::Bicycle,
            "CAR" => Modality::Car,
            "BUS" => Modality::Bus,
            "TRAIN" => Modality::Train,
            "MOTORBIKE" => Modality::Motorbike,
            _ => Modality::Unknown,
        }
    }
}

/// A located, annotated sample captured during a trip.
///
/// Speed may be transiently negative due to sensor noise; such values are
/// tolerated and passed through unchanged (a data-quality warning is logged).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub timestamp_ms: i64,
    /// Degrees, in [-90, 90]
    pub latitude: f64,
    /// Degrees, in [-180, 180]
    pub longitude: f64,
    /// Meters above sea level, when the fix carried one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<f64>,
    /// Estimated accuracy in meters, >= 0
    pub accuracy: f64,
    /// Meters per second
    pub speed: f64,
    /// Mode of transport active at this fix; set post-hoc by the track builder
    pub modality: Modality,
}

impl GeoLocation {
    pub fn new(
        timestamp_ms: i64,
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        speed: f64,
    ) -> Result<Self, CodecError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CodecError::LocationOutOfRange(format!(
                "latitude {latitude} not in [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CodecError::LocationOutOfRange(format!(
                "longitude {longitude} not in [-180, 180]"
            )));
        }
        if accuracy < 0.0 {
            return Err(CodecError::LocationOutOfRange(format!(
                "accuracy {accuracy} is negative"
            )));
        }
        if speed < 0.0 {
            tracing::warn!(timestamp_ms, speed, "negative speed tolerated");
        }
        Ok(Self {
            timestamp_ms,
            latitude,
            longitude,
            elevation: None,
            accuracy,
            speed,
            modality: Modality::Unknown,
        })
    }

    pub fn with_elevation(mut self, elevation: f64) -> Self {
        self.elevation = Some(elevation);
        self
    }
}

impl Timestamped for GeoLocation {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// One tri-axial sensor sample. The unit of x/y/z depends on the stream:
/// m/s² for accelerations, rad/s for rotations, µT for directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3d {
    pub timestamp_ms: i64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3d {
    pub fn new(timestamp_ms: i64, x: f32, y: f32, z: f32) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            z,
        }
    }
}

impl Timestamped for Point3d {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// Lifecycle and annotation event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    LifecycleStart,
    LifecyclePause,
    LifecycleResume,
    LifecycleStop,
    ModalityTypeChange,
}

impl EventType {
    /// Stable wire number of this event type.
    pub fn wire_number(&self) -> u8 {
        match self {
            EventType::LifecycleStart => 1,
            EventType::LifecyclePause => 2,
            EventType::LifecycleResume => 3,
            EventType::LifecycleStop => 4,
            EventType::ModalityTypeChange => 5,
        }
    }

    /// Decode a wire number. Unrecognized values are a fatal format error.
    pub fn from_wire_number(code: u8) -> Result<Self, CodecError> {
        match code {
            1 => Ok(EventType::LifecycleStart),
            2 => Ok(EventType::LifecyclePause),
            3 => Ok(EventType::LifecycleResume),
            4 => Ok(EventType::LifecycleStop),
            5 => Ok(EventType::ModalityTypeChange),
            other => Err(CodecError::UnknownEventType(other)),
        }
    }

    pub fn is_lifecycle(&self) -> bool {
        !matches!(self, EventType::ModalityTypeChange)
    }
}

/// A timestamped lifecycle or annotation event.
///
/// The `value` field is used only by `ModalityTypeChange` events and carries
/// the new modality's database identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp_ms: i64,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Event {
    pub fn lifecycle(timestamp_ms: i64, event_type: EventType) -> Self {
        Self {
            timestamp_ms,
            event_type,
            value: None,
        }
    }

    pub fn modality_change(timestamp_ms: i64, modality: Modality) -> Self {
        Self {
            timestamp_ms,
            event_type: EventType::ModalityTypeChange,
            value: Some(modality.as_str().to_string()),
        }
    }

    /// Modality carried by this event, when it is a modality change.
    pub fn modality(&self) -> Option<Modality> {
        if self.event_type != EventType::ModalityTypeChange {
            return None;
        }
        Some(
            self.value
                .as_deref()
                .map(Modality::parse)
                .unwrap_or(Modality::Unknown),
        )
    }
}

impl Timestamped for Event {
    fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }
}

/// A contiguous, time-bounded slice of one measurement's data between two
/// lifecycle boundary events. Each list is independently ordered by timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub locations: Vec<GeoLocation>,
    pub accelerations: Vec<Point3d>,
    pub rotations: Vec<Point3d>,
    pub directions: Vec<Point3d>,
}

impl Track {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the track carries neither locations nor sensor points.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
            && self.accelerations.is_empty()
            && self.rotations.is_empty()
            && self.directions.is_empty()
    }
}

/// Validated descriptive data attached to one measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub identifier: MeasurementIdentifier,
    /// Device model, e.g. "Pixel 8"
    pub device_type: String,
    /// Operating system version string
    pub os_version: String,
    /// Version of the recording application, must match the supported pattern
    pub app_version: String,
    /// Total track length in meters
    pub length_m: f64,
    /// Identifier of the owning user
    pub user_id: String,
    /// Binary format version the payload was recorded with
    pub format_version: u16,
    /// When the measurement was uploaded
    pub uploaded_at: DateTime<Utc>,
}

impl MetaData {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        identifier: MeasurementIdentifier,
        device_type: impl Into<String>,
        os_version: impl Into<String>,
        app_version: impl Into<String>,
        length_m: f64,
        user_id: impl Into<String>,
        format_version: u16,
        uploaded_at: DateTime<Utc>,
    ) -> Result<Self, CodecError> {
        let app_version = app_version.into();
        if !is_supported_version(&app_version) {
            return Err(CodecError::InvalidMetaData(format!(
                "app version {app_version:?} does not match the supported pattern"
            )));
        }
        if length_m < 0.0 {
            return Err(CodecError::InvalidMetaData(format!(
                "track length {length_m} is negative"
            )));
        }
        Ok(Self {
            identifier,
            device_type: device_type.into(),
            os_version: os_version.into(),
            app_version,
            length_m,
            user_id: user_id.into(),
            format_version,
            uploaded_at,
        })
    }
}

/// Check an application version string against the supported pattern:
/// three dot-separated numeric components with an optional `-suffix`.
fn is_supported_version(version: &str) -> bool {
    let base = match version.split_once('-') {
        Some((base, suffix)) if !suffix.is_empty() => base,
        Some(_) => return false,
        None => version,
    };
    let parts: Vec<&str> = base.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// One persisted chunk of a track, used when a measurement was stored in
/// pieces and needs to be reassembled at ingestion time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackBucket {
    /// Index of the track this bucket belongs to
    pub track_index: usize,
    /// Position of this bucket within the track
    pub bucket_sequence: usize,
    pub track: Track,
}

/// A fully reassembled measurement: metadata plus its ordered tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub metadata: MetaData,
    pub tracks: Vec<Track>,
}

impl Measurement {
    pub fn new(metadata: MetaData, tracks: Vec<Track>) -> Self {
        Self { metadata, tracks }
    }

    /// Reassemble a measurement from persisted track buckets.
    ///
    /// Buckets may arrive in any order; they are sorted by track index, then
    /// bucket sequence, and concatenated per track.
    pub fn from_buckets(metadata: MetaData, mut buckets: Vec<TrackBucket>) -> Self {
        buckets.sort_by_key(|b| (b.track_index, b.bucket_sequence));
        let mut tracks: Vec<Track> = Vec::new();
        let mut current_index: Option<usize> = None;
        for bucket in buckets {
            if current_index != Some(bucket.track_index) {
                tracks.push(Track::new());
                current_index = Some(bucket.track_index);
            }
            if let Some(track) = tracks.last_mut() {
                track.locations.extend(bucket.track.locations);
                track.accelerations.extend(bucket.track.accelerations);
                track.rotations.extend(bucket.track.rotations);
                track.directions.extend(bucket.track.directions);
            }
        }
        Self { metadata, tracks }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn make_metadata() -> MetaData {
        MetaData::new(
            MeasurementIdentifier::new("device-1", 42),
            "Pixel 8",
            "Android 14",
            "3.2.1",
            1250.5,
            "user-1",
            3,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn make_location(timestamp_ms: i64) -> GeoLocation {
        GeoLocation::new(timestamp_ms, 51.05, 13.72, 5.0, 8.5).unwrap()
    }

    #[test]
    fn test_identifier_ordering() {
        let a = MeasurementIdentifier::new("alpha", 9);
        let b = MeasurementIdentifier::new("alpha", 10);
        let c = MeasurementIdentifier::new("beta", 1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_new_device_identifiers_differ() {
        let a = MeasurementIdentifier::new_device(1);
        let b = MeasurementIdentifier::new_device(1);
        assert_ne!(a.device_id, b.device_id);
    }

    #[test]
    fn test_modality_identifier_roundtrip() {
        for modality in [
            Modality::Unknown,
            Modality::Walking,
            Modality::Bicycle,
            Modality::Car,
            Modality::Bus,
            Modality::Train,
            Modality::Motorbike,
        ] {
            assert_eq!(Modality::parse(modality.as_str()), modality);
        }
        // Unrecognized identifiers never fail
        assert_eq!(Modality::parse("HOVERCRAFT"), Modality::Unknown);
    }

    #[test]
    fn test_location_range_validation() {
        assert!(GeoLocation::new(1000, 91.0, 0.0, 1.0, 0.0).is_err());
        assert!(GeoLocation::new(1000, 0.0, -181.0, 1.0, 0.0).is_err());
        assert!(GeoLocation::new(1000, 0.0, 0.0, -1.0, 0.0).is_err());
        // Negative speed is tolerated, not rejected
        let loc = GeoLocation::new(1000, 0.0, 0.0, 1.0, -0.3).unwrap();
        assert_eq!(loc.speed, -0.3);
    }

    #[test]
    fn test_event_type_wire_numbers() {
        for event_type in [
            EventType::LifecycleStart,
            EventType::LifecyclePause,
            EventType::LifecycleResume,
            EventType::LifecycleStop,
            EventType::ModalityTypeChange,
        ] {
            assert_eq!(
                EventType::from_wire_number(event_type.wire_number()).unwrap(),
                event_type
            );
        }
        assert!(matches!(
            EventType::from_wire_number(9),
            Err(CodecError::UnknownEventType(9))
        ));
    }

    #[test]
    fn test_modality_change_event_value() {
        let event = Event::modality_change(2500, Modality::Bicycle);
        assert_eq!(event.value.as_deref(), Some("BICYCLE"));
        assert_eq!(event.modality(), Some(Modality::Bicycle));
        assert_eq!(
            Event::lifecycle(1000, EventType::LifecycleStart).modality(),
            None
        );
    }

    #[test]
    fn test_metadata_version_validation() {
        assert!(make_metadata().app_version == "3.2.1");
        for bad in ["3.2", "3.2.x", "", "3.2.1-", "a.b.c"] {
            let result = MetaData::new(
                MeasurementIdentifier::new("d", 1),
                "t",
                "os",
                bad,
                0.0,
                "u",
                3,
                Utc::now(),
            );
            assert!(result.is_err(), "expected {bad:?} to be rejected");
        }
        assert!(MetaData::new(
            MeasurementIdentifier::new("d", 1),
            "t",
            "os",
            "3.2.1-beta1",
            0.0,
            "u",
            3,
            Utc::now(),
        )
        .is_ok());
    }

    #[test]
    fn test_bucket_merge_ordering() {
        let mut first = Track::new();
        first.locations.push(make_location(1000));
        let mut second = Track::new();
        second.locations.push(make_location(2000));
        let mut third = Track::new();
        third.locations.push(make_location(5000));

        // Buckets arrive shuffled: track 1 before track 0, and within track 0
        // the second chunk before the first.
        let buckets = vec![
            TrackBucket {
                track_index: 1,
                bucket_sequence: 0,
                track: third,
            },
            TrackBucket {
                track_index: 0,
                bucket_sequence: 1,
                track: second,
            },
            TrackBucket {
                track_index: 0,
                bucket_sequence: 0,
                track: first,
            },
        ];

        let measurement = Measurement::from_buckets(make_metadata(), buckets);
        assert_eq!(measurement.tracks.len(), 2);
        let timestamps: Vec<i64> = measurement.tracks[0]
            .locations
            .iter()
            .map(|l| l.timestamp_ms)
            .collect();
        assert_eq!(timestamps, vec![1000, 2000]);
        assert_eq!(measurement.tracks[1].locations[0].timestamp_ms, 5000);
    }

    #[test]
    fn test_measurement_json_roundtrip() {
        let measurement = Measurement::new(make_metadata(), vec![Track::new()]);
        let json = measurement.to_json().unwrap();
        let parsed: Measurement = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, measurement);
    }
}
