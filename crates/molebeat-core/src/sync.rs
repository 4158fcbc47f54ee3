//! Matching a beat timeline against a live playback position.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::clock::PlaybackClock;
use crate::timeline::BeatTimeline;

/// How long after its timestamp a beat may still fire
pub const DEFAULT_TRIGGER_WINDOW: Duration = Duration::from_micros(2000);

/// A beat delivered to the game loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatEvent {
    /// Position of the beat in its timeline (or period count for periodic ticks)
    pub index: usize,
    /// When the beat was due
    pub scheduled: Duration,
    /// Playback position at the poll that fired it
    pub observed: Duration,
}

impl BeatEvent {
    pub fn lateness(&self) -> Duration {
        self.observed.saturating_sub(self.scheduled)
    }
}

/// Outcome of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Beat(BeatEvent),
    Idle,
    /// Playback stopped or ran past the end; no more beats until reset
    Ended,
}

impl Tick {
    pub fn is_beat(&self) -> bool {
        matches!(self, Tick::Beat(_))
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Tick::Ended)
    }
}

/// Progress through the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncCursor {
    /// Beat currently being tracked
    pub index: usize,
    /// Whether that beat already fired
    pub fired_for_current: bool,
}

/// Fires each timeline beat at most once, in order, as playback reaches it.
///
/// Poll from a single loop; the cursor is updated in place. Polling faster than
/// the trigger window guarantees no beat is missed.
#[derive(Debug, Clone)]
pub struct LiveBeatSynchronizer {
    timeline: Arc<BeatTimeline>,
    total_duration: Duration,
    trigger_window: Duration,
    cursor: SyncCursor,
    fired: usize,
    ended: bool,
}

impl LiveBeatSynchronizer {
    pub fn new(timeline: impl Into<Arc<BeatTimeline>>, total_duration: Duration) -> Self {
        Self {
            timeline: timeline.into(),
            total_duration,
            trigger_window: DEFAULT_TRIGGER_WINDOW,
            cursor: SyncCursor::default(),
            fired: 0,
            ended: false,
        }
    }

    pub fn with_trigger_window(mut self, window: Duration) -> Self {
        self.trigger_window = window;
        self
    }

    pub fn trigger_window(&self) -> Duration {
        self.trigger_window
    }

    pub fn cursor(&self) -> SyncCursor {
        self.cursor
    }

    /// Beats fired since construction or the last reset
    pub fn fired_count(&self) -> usize {
        self.fired
    }

    /// Beats that can still fire
    pub fn remaining(&self) -> usize {
        let len = self.timeline.len();
        if self.ended || len == 0 {
            return 0;
        }
        len - self.cursor.index - usize::from(self.cursor.fired_for_current)
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Rewind to the first beat for a restarted playback
    pub fn reset(&mut self) {
        self.cursor = SyncCursor::default();
        self.fired = 0;
        self.ended = false;
    }

    pub fn poll_clock<C: PlaybackClock + ?Sized>(&mut self, clock: &C) -> Tick {
        self.poll(clock.position(), clock.is_playing())
    }

    /// Decide whether a beat fires at playback position `offset`
    pub fn poll(&mut self, offset: Duration, playback_active: bool) -> Tick {
        if self.ended {
            return Tick::Ended;
        }
        if !playback_active || offset >= self.total_duration {
            debug!(?offset, fired = self.fired, "playback ended");
            self.ended = true;
            return Tick::Ended;
        }

        let beats = self.timeline.as_slice();
        if self.cursor.index >= beats.len() {
            return Tick::Idle;
        }

        // Catch up to the last beat at or before `offset`
        let from = self.cursor.index;
        while self.cursor.index + 1 < beats.len() && beats[self.cursor.index + 1] <= offset {
            self.cursor.index += 1;
            self.cursor.fired_for_current = false;
        }
        if self.cursor.index > from + 1 {
            debug!(
                skipped = self.cursor.index - from - 1,
                ?offset,
                "poll too coarse, beats skipped"
            );
        }

        let target = beats[self.cursor.index];
        let in_window = offset >= target && offset - target < self.trigger_window;
        if !in_window || self.cursor.fired_for_current {
            return Tick::Idle;
        }

        let event = BeatEvent {
            index: self.cursor.index,
            scheduled: target,
            observed: offset,
        };
        if self.cursor.index + 1 < beats.len() {
            self.cursor.index += 1;
            self.cursor.fired_for_current = false;
        } else {
            self.cursor.fired_for_current = true;
        }
        self.fired += 1;

        trace!(index = event.index, lateness = ?event.lateness(), "beat fired");
        Tick::Beat(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn sync(beats: &[u64]) -> LiveBeatSynchronizer {
        let timeline = BeatTimeline::from_sorted(beats.iter().map(|&b| ms(b)).collect()).unwrap();
        LiveBeatSynchronizer::new(timeline, ms(1000))
    }

    #[test]
    fn test_every_beat_fires_once_in_order() {
        let mut sync = sync(&[100, 250, 400]);
        let mut fired = Vec::new();
        let mut offset = Duration::ZERO;

        loop {
            match sync.poll(offset, true) {
                Tick::Beat(event) => fired.push(event),
                Tick::Idle => {}
                Tick::Ended => break,
            }
            offset += Duration::from_micros(500);
        }

        let indices: Vec<_> = fired.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        for event in &fired {
            assert!(event.lateness() < DEFAULT_TRIGGER_WINDOW);
        }
        assert_eq!(sync.fired_count(), 3);
        assert_eq!(sync.remaining(), 0);
    }

    #[test]
    fn test_stalled_clock_fires_once() {
        let mut sync = sync(&[100, 250, 400]);
        assert!(sync.poll(ms(100), true).is_beat());
        assert_eq!(sync.poll(ms(100), true), Tick::Idle);
        assert_eq!(sync.poll(ms(100), true), Tick::Idle);
    }

    #[test]
    fn test_last_beat_does_not_repeat() {
        let mut sync = sync(&[100]);
        assert!(sync.poll(ms(100), true).is_beat());
        assert_eq!(sync.cursor(), SyncCursor { index: 0, fired_for_current: true });
        assert_eq!(sync.poll(ms(100) + Duration::from_micros(500), true), Tick::Idle);
    }

    #[test]
    fn test_window_is_half_open() {
        let mut sync = sync(&[100]);
        assert_eq!(sync.poll(ms(99), true), Tick::Idle);
        assert_eq!(sync.poll(ms(102), true), Tick::Idle);

        let mut sync = self::sync(&[100]);
        let event = sync.poll(ms(100) + Duration::from_micros(1999), true);
        assert!(event.is_beat());
    }

    #[test]
    fn test_coarse_poll_lands_on_latest_beat() {
        let mut sync = sync(&[100, 250, 400]);
        assert_eq!(sync.poll(ms(90), true), Tick::Idle);

        // Jumped straight over beat 0 into beat 1's window
        match sync.poll(ms(251), true) {
            Tick::Beat(event) => {
                assert_eq!(event.index, 1);
                assert_eq!(event.lateness(), ms(1));
            }
            other => panic!("expected beat, got {:?}", other),
        }
        assert_eq!(sync.remaining(), 1);
    }

    #[test]
    fn test_stale_beat_is_dropped() {
        let mut sync = sync(&[100, 250, 400]);
        assert_eq!(sync.poll(ms(260), true), Tick::Idle);
        assert!(sync.poll(ms(400), true).is_beat());
    }

    #[test]
    fn test_empty_timeline() {
        let mut sync = LiveBeatSynchronizer::new(BeatTimeline::new(), ms(50));
        assert_eq!(sync.poll(ms(0), true), Tick::Idle);
        assert_eq!(sync.poll(ms(49), true), Tick::Idle);
        assert_eq!(sync.poll(ms(50), true), Tick::Ended);
        assert_eq!(sync.remaining(), 0);
    }

    #[test]
    fn test_end_is_sticky_until_reset() {
        let mut sync = sync(&[100, 250]);
        assert_eq!(sync.poll(ms(10), false), Tick::Ended);
        assert_eq!(sync.poll(ms(100), true), Tick::Ended);
        assert!(sync.is_ended());

        sync.reset();
        assert!(!sync.is_ended());
        assert_eq!(sync.remaining(), 2);
        assert!(sync.poll(ms(100), true).is_beat());
    }

    #[test]
    fn test_custom_trigger_window() {
        let mut sync = sync(&[100]).with_trigger_window(ms(20));
        assert!(sync.poll(ms(115), true).is_beat());
    }
}
