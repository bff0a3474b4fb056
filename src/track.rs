//! Track segmentation
//!
//! Merges a measurement's flat location stream, its lifecycle/annotation
//! events, and the three sensor streams into an ordered list of [`Track`]s.
//! A track covers one contiguous active-recording interval: it begins at a
//! start/resume event and collects everything up to the start of the next
//! segment, so data recorded between a pause and the following resume stays
//! attached to the track being paused. A stop never cuts: trailing data
//! recorded after the stop event stays attached to the last track, a
//! deliberately retained behavior of the format.
//!
//! All five inputs are consumed through forward-only cursors in a single
//! pass; the cursors never rewind.

use crate::error::CodecError;
use crate::types::{Event, EventType, GeoLocation, Modality, Point3d, Timestamped, Track};

/// Factor of the sparse-measurement tolerance band: a measurement with at
/// most `(resume_count + 1) * factor` locations may produce fewer tracks
/// than its events suggest instead of failing on an empty trailing segment.
/// The value is an empirical heuristic from a production incident, not a
/// derived constant.
pub const DEFAULT_TOLERANCE_FACTOR: usize = 2;

/// The segmentation state machine.
#[derive(Debug)]
pub struct TrackBuilder {
    tolerance_factor: usize,
}

impl Default for TrackBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self {
            tolerance_factor: DEFAULT_TOLERANCE_FACTOR,
        }
    }

    /// Override the sparse-measurement tolerance factor.
    pub fn with_tolerance_factor(factor: usize) -> Self {
        Self {
            tolerance_factor: factor,
        }
    }

    /// Partition the given streams into tracks.
    ///
    /// All inputs must be ordered by timestamp. Locations are annotated with
    /// the modality active at their timestamp, carried forward across track
    /// boundaries.
    ///
    /// # Returns
    /// The tracks in chronological order of segment start
    ///
    /// # Errors
    /// [`CodecError::InvalidLifecycleEvents`] when the event ordering cannot
    /// be interpreted, [`CodecError::NoTracksRecorded`] when no track remains
    pub fn build(
        &self,
        locations: &[GeoLocation],
        events: &[Event],
        accelerations: &[Point3d],
        rotations: &[Point3d],
        directions: &[Point3d],
    ) -> Result<Vec<Track>, CodecError> {
        let (starts, resume_count) = segment_starts(events)?;
        let sparse = locations.len() <= (resume_count + 1) * self.tolerance_factor;

        let mut annotator = ModalityAnnotator::new(events);
        let mut location_cursor = StreamCursor::new(locations);
        let mut acceleration_cursor = StreamCursor::new(accelerations);
        let mut rotation_cursor = StreamCursor::new(rotations);
        let mut direction_cursor = StreamCursor::new(directions);

        let mut tracks = Vec::new();
        for (index, &start) in starts.iter().enumerate() {
            // A segment runs from its start up to the next segment's start;
            // the last one is unbounded, so a stop never truncates it.
            let next_start = starts.get(index + 1).copied();
            let trailing = next_start.is_none();

            location_cursor.advance_to(start);
            let segment_locations = location_cursor.take_until(next_start);
            acceleration_cursor.advance_to(start);
            let segment_accelerations = acceleration_cursor.take_until(next_start);
            rotation_cursor.advance_to(start);
            let segment_rotations = rotation_cursor.take_until(next_start);
            direction_cursor.advance_to(start);
            let segment_directions = direction_cursor.take_until(next_start);

            if segment_locations.is_empty() {
                if trailing && sparse {
                    tracing::info!(
                        segment = index,
                        locations = locations.len(),
                        resume_count,
                        "sparse trailing segment without locations tolerated"
                    );
                } else {
                    tracing::debug!(segment = index, "segment without locations skipped");
                    continue;
                }
            }

            tracks.push(Track {
                locations: annotator.annotate(segment_locations),
                accelerations: segment_accelerations.to_vec(),
                rotations: segment_rotations.to_vec(),
                directions: segment_directions.to_vec(),
            });
        }

        tracks.retain(|track| {
            if track.is_empty() {
                tracing::debug!("track without locations or sensor points discarded");
                return false;
            }
            true
        });

        if tracks.is_empty() {
            return Err(CodecError::NoTracksRecorded);
        }
        Ok(tracks)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Initial,
    Active,
    Paused,
    Stopped,
}

/// Walk the lifecycle events and derive the segment start timestamps,
/// validating the event ordering on the way. Duplicate events and events
/// after a stop are tolerated; a resume without a prior pause or a stream
/// not beginning with a start cannot be interpreted and fail.
fn segment_starts(events: &[Event]) -> Result<(Vec<i64>, usize), CodecError> {
    let mut starts: Vec<i64> = Vec::new();
    let mut resume_count = 0usize;
    let mut state = Lifecycle::Initial;

    for event in events.iter().filter(|e| e.event_type.is_lifecycle()) {
        let timestamp_ms = event.timestamp_ms;
        state = match (state, event.event_type) {
            (Lifecycle::Initial, EventType::LifecycleStart) => {
                starts.push(timestamp_ms);
                Lifecycle::Active
            }
            (Lifecycle::Initial, other) => {
                return Err(CodecError::InvalidLifecycleEvents(format!(
                    "first lifecycle event is {other:?} at {timestamp_ms}, expected a start"
                )))
            }
            (Lifecycle::Active, EventType::LifecyclePause) => Lifecycle::Paused,
            (Lifecycle::Active, EventType::LifecycleStop) => Lifecycle::Stopped,
            (Lifecycle::Active, EventType::LifecycleStart) => {
                tracing::debug!(timestamp_ms, "duplicate start ignored");
                Lifecycle::Active
            }
            (Lifecycle::Active, EventType::LifecycleResume) => {
                return Err(CodecError::InvalidLifecycleEvents(format!(
                    "resume at {timestamp_ms} without a prior pause"
                )))
            }
            (Lifecycle::Paused, EventType::LifecycleResume) => {
                resume_count += 1;
                starts.push(timestamp_ms);
                Lifecycle::Active
            }
            (Lifecycle::Paused, EventType::LifecycleStop) => Lifecycle::Stopped,
            (Lifecycle::Paused, EventType::LifecyclePause) => {
                tracing::debug!(timestamp_ms, "duplicate pause ignored");
                Lifecycle::Paused
            }
            (Lifecycle::Paused, EventType::LifecycleStart) => {
                return Err(CodecError::InvalidLifecycleEvents(format!(
                    "start at {timestamp_ms} while paused"
                )))
            }
            (Lifecycle::Stopped, _) => {
                tracing::debug!(timestamp_ms, "lifecycle event after stop ignored");
                Lifecycle::Stopped
            }
            (state, EventType::ModalityTypeChange) => state,
        };
    }

    Ok((starts, resume_count))
}

/// Forward-only cursor over a timestamp-ordered slice. The cursor only ever
/// advances; re-entering with an earlier boundary is a no-op, not a rewind.
#[derive(Debug)]
struct StreamCursor<'a, T> {
    items: &'a [T],
    index: usize,
}

impl<'a, T: Timestamped> StreamCursor<'a, T> {
    fn new(items: &'a [T]) -> Self {
        Self { items, index: 0 }
    }

    /// Advance until the cursor rests on the first element with timestamp
    /// >= `t`. An element exactly at `t` is not passed: it belongs to the
    /// segment starting at `t`.
    fn advance_to(&mut self, t: i64) {
        while self.index < self.items.len() && self.items[self.index].timestamp_ms() < t {
            self.index += 1;
        }
    }

    /// Consume and return the elements strictly before `next_start`, or the
    /// whole remainder when unbounded. An element exactly at `next_start`
    /// is left for the following segment. Safe on an exhausted cursor:
    /// yields an empty slice.
    fn take_until(&mut self, next_start: Option<i64>) -> &'a [T] {
        let start = self.index;
        match next_start {
            Some(boundary) => {
                while self.index < self.items.len()
                    && self.items[self.index].timestamp_ms() < boundary
                {
                    self.index += 1;
                }
            }
            None => self.index = self.items.len(),
        }
        &self.items[start..self.index]
    }
}

/// Applies modality-change events to locations, carrying the most recent
/// modality forward across segment boundaries.
#[derive(Debug)]
struct ModalityAnnotator {
    changes: Vec<(i64, Modality)>,
    index: usize,
    current: Option<Modality>,
}

impl ModalityAnnotator {
    fn new(events: &[Event]) -> Self {
        Self {
            changes: events
                .iter()
                .filter_map(|event| event.modality().map(|m| (event.timestamp_ms, m)))
                .collect(),
            index: 0,
            current: None,
        }
    }

    /// Annotate a segment's locations. Locations before the first
    /// modality-change event keep the modality they arrived with.
    fn annotate(&mut self, segment: &[GeoLocation]) -> Vec<GeoLocation> {
        segment
            .iter()
            .map(|location| {
                while self.index < self.changes.len()
                    && self.changes[self.index].0 <= location.timestamp_ms
                {
                    self.current = Some(self.changes[self.index].1);
                    self.index += 1;
                }
                let mut location = location.clone();
                if let Some(modality) = self.current {
                    location.modality = modality;
                }
                location
            })
            .collect()
    }
}
