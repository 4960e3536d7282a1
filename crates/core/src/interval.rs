//! Half-open wall-clock intervals within a single day.
//!
//! All scheduling arithmetic works on `[start, end)` ranges of
//! [`NaiveTime`]. Two intervals that merely touch (`a.end == b.start`) do not
//! overlap.

use chrono::NaiveTime;
use serde::Serialize;

use crate::error::CoreError;

/// A non-empty `[start, end)` range of local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeInterval {
    start: NaiveTime,
    end: NaiveTime,
}

impl TimeInterval {
    /// Build an interval, rejecting empty or inverted ranges.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self, CoreError> {
        if start >= end {
            return Err(CoreError::Validation(format!(
                "start_time ({start}) must be before end_time ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Standard half-open overlap test.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &TimeInterval) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Remove `cut` from this interval, returning the remaining pieces in
    /// order. Empty pieces are dropped, so a cut covering the whole interval
    /// yields an empty vector.
    pub fn subtract(&self, cut: &TimeInterval) -> Vec<TimeInterval> {
        if !self.overlaps(cut) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(2);
        if self.start < cut.start {
            pieces.push(TimeInterval {
                start: self.start,
                end: cut.start,
            });
        }
        if cut.end < self.end {
            pieces.push(TimeInterval {
                start: cut.end,
                end: self.end,
            });
        }
        pieces
    }
}

/// Sort and coalesce overlapping or touching intervals into a disjoint set.
pub fn merge_intervals(intervals: &[TimeInterval]) -> Vec<TimeInterval> {
    let mut sorted = intervals.to_vec();
    sorted.sort();

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(sorted.len());
    for interval in sorted {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                last.end = last.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// Whether `window` is fully contained in the union of `intervals`.
pub fn is_covered(window: &TimeInterval, intervals: &[TimeInterval]) -> bool {
    merge_intervals(intervals)
        .iter()
        .any(|interval| interval.contains(window))
}
