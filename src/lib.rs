//! Trackpack - Binary codec and track segmentation for vehicle trip recordings
//!
//! Trackpack reads and writes a compact binary format for trip recordings:
//! geolocation fixes plus three tri-axial sensor streams (accelerometer,
//! gyroscope, magnetometer), annotated with lifecycle events. Decoding runs a
//! deterministic pipeline: version check → decompress → columnar message
//! parse → delta/fixed-point decode → track segmentation.
//!
//! ## Modules
//!
//! - **Codec**: delta/offset coding, fixed-point scaling, per-stream glue
//! - **Track building**: segmentation of flat streams into lifecycle-bounded
//!   tracks with modality annotation

pub mod codec;
pub mod compress;
pub mod decode;
pub mod encode;
pub mod error;
pub mod legacy;
pub mod offset;
pub mod track;
pub mod types;
pub mod units;
pub mod wire;

pub use decode::{DecodeVariant, Decoder};
pub use encode::MeasurementSerializer;
pub use error::CodecError;
pub use legacy::LegacyDeserializer;
pub use track::TrackBuilder;
pub use types::{
    Event, EventType, GeoLocation, Measurement, MeasurementIdentifier, MetaData, Modality,
    Point3d, Track, TrackBucket,
};

/// Binary format version written and accepted by the current codec
pub const FORMAT_VERSION: u16 = 3;

/// Format version of the legacy phone-export decode path
pub const LEGACY_FORMAT_VERSION: u16 = 1;

/// Trackpack version embedded by the CLI
pub const TRACKPACK_VERSION: &str = env!("CARGO_PKG_VERSION");
