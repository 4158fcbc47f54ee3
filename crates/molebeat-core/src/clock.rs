//! Sources of "where is playback right now".

use std::time::{Duration, Instant};

/// Live playback position, polled once per tick
pub trait PlaybackClock {
    /// Offset from the start of playback
    fn position(&self) -> Duration;

    /// Whether playback is still running
    fn is_playing(&self) -> bool;
}

impl<C: PlaybackClock + ?Sized> PlaybackClock for &C {
    fn position(&self) -> Duration {
        (**self).position()
    }

    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }
}

/// Simulated playback of `length` driven by the monotonic clock.
///
/// Stands in for an audio device when there is none, or when timing should not
/// depend on one.
#[derive(Debug, Clone)]
pub struct WallClock {
    started: Instant,
    length: Duration,
    stopped: bool,
}

impl WallClock {
    /// Start "playing" now
    pub fn start(length: Duration) -> Self {
        Self {
            started: Instant::now(),
            length,
            stopped: false,
        }
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }
}

impl PlaybackClock for WallClock {
    fn position(&self) -> Duration {
        self.started.elapsed().min(self.length)
    }

    fn is_playing(&self) -> bool {
        !self.stopped && self.started.elapsed() < self.length
    }
}
