//! Ordered beat timestamps produced by offline analysis.

use std::time::Duration;

use crate::error::TimelineError;

/// Strictly ascending beat timestamps, relative to the start of the buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BeatTimeline {
    beats: Vec<Duration>,
}

impl BeatTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from timestamps that must already be strictly ascending
    pub fn from_sorted(beats: Vec<Duration>) -> Result<Self, TimelineError> {
        for (index, pair) in beats.windows(2).enumerate() {
            if pair[1] <= pair[0] {
                return Err(TimelineError::NotAscending {
                    index: index + 1,
                    at: pair[1],
                    previous: pair[0],
                });
            }
        }
        Ok(Self { beats })
    }

    /// Append a beat found by the analyzer, which scans forward only
    pub(crate) fn push(&mut self, at: Duration) {
        debug_assert!(self.beats.last().map_or(true, |&last| at > last));
        self.beats.push(at);
    }

    pub fn len(&self) -> usize {
        self.beats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Duration> {
        self.beats.get(index).copied()
    }

    pub fn as_slice(&self) -> &[Duration] {
        &self.beats
    }

    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.beats.iter().copied()
    }

    /// Gaps between consecutive beats
    pub fn intervals(&self) -> impl Iterator<Item = Duration> + '_ {
        self.beats.windows(2).map(|pair| pair[1] - pair[0])
    }

    /// Tempo from the median inter-beat interval.
    ///
    /// The median keeps a few missed or doubled beats from dragging the estimate.
    pub fn estimated_bpm(&self) -> Option<f64> {
        let mut intervals: Vec<Duration> = self.intervals().collect();
        if intervals.is_empty() {
            return None;
        }
        intervals.sort_unstable();
        let median = intervals[intervals.len() / 2].as_secs_f64();
        if median <= 0.0 {
            return None;
        }
        Some(60.0 / median)
    }
}

impl IntoIterator for BeatTimeline {
    type Item = Duration;
    type IntoIter = std::vec::IntoIter<Duration>;

    fn into_iter(self) -> Self::IntoIter {
        self.beats.into_iter()
    }
}

impl From<BeatTimeline> for Vec<Duration> {
    fn from(timeline: BeatTimeline) -> Self {
        timeline.beats
    }
}
