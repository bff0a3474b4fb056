//! Integer delta codec
//!
//! Converts an absolute integer sequence to first-value-then-deltas and back.
//! Each `Offsetter`/`DeOffsetter` carries the last absolute value of exactly
//! one ordered, contiguous stream; a fresh instance is required per stream.
//! Calls must arrive in the original sequence order; out-of-order use
//! silently produces wrong values, which is a caller contract.

/// Stateful delta encoder for one integer column.
#[derive(Debug, Default)]
pub struct Offsetter {
    previous: Option<i64>,
}

impl Offsetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit the wire value for the next absolute value: the value itself on
    /// the first call, the difference to the previous value afterwards.
    pub fn offset(&mut self, absolute: i64) -> i64 {
        let emitted = match self.previous {
            None => absolute,
            Some(previous) => absolute - previous,
        };
        self.previous = Some(absolute);
        emitted
    }
}

/// Stateful delta decoder, the mirror of [`Offsetter`].
#[derive(Debug, Default)]
pub struct DeOffsetter {
    previous: Option<i64>,
}

impl DeOffsetter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstruct the next absolute value from an emitted wire value.
    pub fn absolute(&mut self, emitted: i64) -> i64 {
        let absolute = match self.previous {
            None => emitted,
            Some(previous) => previous + emitted,
        };
        self.previous = Some(absolute);
        absolute
    }
}

/// Delta encoder for one 3D sample stream: four independent columns
/// (timestamp, x, y, z), applied per sample in timestamp order.
#[derive(Debug, Default)]
pub struct Point3dOffsetter {
    timestamp: Offsetter,
    x: Offsetter,
    y: Offsetter,
    z: Offsetter,
}

impl Point3dOffsetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(&mut self, timestamp: i64, x: i64, y: i64, z: i64) -> (i64, i64, i64, i64) {
        (
            self.timestamp.offset(timestamp),
            self.x.offset(x),
            self.y.offset(y),
            self.z.offset(z),
        )
    }
}

/// Delta decoder for one 3D sample stream.
///
/// Absolute x/y/z values are guaranteed by the protocol to fit a 32-bit
/// signed range; a violation is a programming-contract error, not a
/// recoverable condition.
#[derive(Debug, Default)]
pub struct Point3dDeOffsetter {
    timestamp: DeOffsetter,
    x: DeOffsetter,
    y: DeOffsetter,
    z: DeOffsetter,
}

impl Point3dDeOffsetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absolute(&mut self, timestamp: i64, x: i64, y: i64, z: i64) -> (i64, i64, i64, i64) {
        let timestamp = self.timestamp.absolute(timestamp);
        let x = self.x.absolute(x);
        let y = self.y.absolute(y);
        let z = self.z.absolute(z);
        debug_assert!(
            fits_i32(x) && fits_i32(y) && fits_i32(z),
            "de-offset 3d value exceeds 32-bit range: ({x}, {y}, {z})"
        );
        (timestamp, x, y, z)
    }
}

fn fits_i32(value: i64) -> bool {
    i32::try_from(value).is_ok()
}

/// Delta encoder for one location stream: five independent columns
/// (timestamp, latitude, longitude, accuracy, speed). One instance covers a
/// measurement's entire flat location stream, not a single track.
#[derive(Debug, Default)]
pub struct LocationOffsetter {
    timestamp: Offsetter,
    latitude: Offsetter,
    longitude: Offsetter,
    accuracy: Offsetter,
    speed: Offsetter,
}

impl LocationOffsetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset(
        &mut self,
        timestamp: i64,
        latitude: i64,
        longitude: i64,
        accuracy: i64,
        speed: i64,
    ) -> (i64, i64, i64, i64, i64) {
        (
            self.timestamp.offset(timestamp),
            self.latitude.offset(latitude),
            self.longitude.offset(longitude),
            self.accuracy.offset(accuracy),
            self.speed.offset(speed),
        )
    }
}

/// Delta decoder for one location stream.
#[derive(Debug, Default)]
pub struct LocationDeOffsetter {
    timestamp: DeOffsetter,
    latitude: DeOffsetter,
    longitude: DeOffsetter,
    accuracy: DeOffsetter,
    speed: DeOffsetter,
}

impl LocationDeOffsetter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absolute(
        &mut self,
        timestamp: i64,
        latitude: i64,
        longitude: i64,
        accuracy: i64,
        speed: i64,
    ) -> (i64, i64, i64, i64, i64) {
        (
            self.timestamp.absolute(timestamp),
            self.latitude.absolute(latitude),
            self.longitude.absolute(longitude),
            self.accuracy.absolute(accuracy),
            self.speed.absolute(speed),
        )
    }
}
