//! 3D sensor stream codec
//!
//! One generic codec serves all three sensor streams; only the fixed-point
//! scaling constants differ, carried by [`SensorStream`].

use crate::error::CodecError;
use crate::offset::{Point3dDeOffsetter, Point3dOffsetter};
use crate::types::Point3d;
use crate::units::{self, SensorStream};
use crate::wire::PointColumns;

/// Encodes one batch of 3D samples into wire columns.
///
/// The delta state is scoped to one batch; every batch needs a fresh
/// serializer.
#[derive(Debug)]
pub struct Point3dSerializer {
    stream: SensorStream,
    offsetter: Point3dOffsetter,
    columns: PointColumns,
}

impl Point3dSerializer {
    pub fn new(stream: SensorStream) -> Self {
        Self {
            stream,
            offsetter: Point3dOffsetter::new(),
            columns: PointColumns::default(),
        }
    }

    /// Append one sample, in timestamp order.
    pub fn push(&mut self, point: &Point3d) {
        let (timestamp, x, y, z) = self.offsetter.offset(
            point.timestamp_ms,
            self.stream.to_wire(point.x),
            self.stream.to_wire(point.y),
            self.stream.to_wire(point.z),
        );
        self.columns.timestamps.push(timestamp);
        self.columns.x.push(x);
        self.columns.y.push(y);
        self.columns.z.push(z);
    }

    pub fn finish(self) -> PointColumns {
        self.columns
    }
}

/// Decodes wire columns back into 3D samples.
#[derive(Debug)]
pub struct Point3dDeserializer {
    stream: SensorStream,
}

impl Point3dDeserializer {
    pub fn new(stream: SensorStream) -> Self {
        Self { stream }
    }

    /// Decode one batch through a fresh de-offsetter.
    pub fn decode_batch(&self, columns: &PointColumns) -> Result<Vec<Point3d>, CodecError> {
        let count = columns.len();
        if [columns.x.len(), columns.y.len(), columns.z.len()]
            .iter()
            .any(|&len| len != count)
        {
            return Err(CodecError::MalformedMessage(
                "sensor columns have inconsistent lengths".into(),
            ));
        }

        let mut deoffsetter = Point3dDeOffsetter::new();
        let mut points = Vec::with_capacity(count);
        for index in 0..count {
            let (timestamp, x, y, z) = deoffsetter.absolute(
                columns.timestamps[index],
                columns.x[index],
                columns.y[index],
                columns.z[index],
            );
            points.push(Point3d::new(
                units::validate_timestamp(timestamp)?,
                self.stream.from_wire(x),
                self.stream.from_wire(y),
                self.stream.from_wire(z),
            ));
        }
        Ok(points)
    }

    /// Decode a sequence of batches into one flat, ordered sample list.
    pub fn decode_batches(&self, batches: &[PointColumns]) -> Result<Vec<Point3d>, CodecError> {
        let mut points = Vec::new();
        for batch in batches {
            points.extend(self.decode_batch(batch)?);
        }
        Ok(points)
    }
}
