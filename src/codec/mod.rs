//! Per-stream serializer/deserializer glue
//!
//! Composes fixed-point scaling and the delta codec on top of the wire
//! message columns. Every serializer owns a fresh offsetter, so one instance
//! covers exactly one ordered stream (a measurement's location stream, one
//! sensor batch) and can never be reused across streams.

mod event;
mod location;
mod point3d;

pub use event::{EventDeserializer, EventSerializer};
pub use location::{LocationDeserializer, LocationSerializer};
pub use point3d::{Point3dDeserializer, Point3dSerializer};
