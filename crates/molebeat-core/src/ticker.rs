//! Tick sources for the game loop and off-thread delivery of their beats.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::clock::PlaybackClock;
use crate::sync::{BeatEvent, LiveBeatSynchronizer, Tick};

/// Anything polled once per game-loop iteration that sometimes produces a beat
pub trait Ticker {
    /// `elapsed` is the playback (or game) position, `active` whether it is still running
    fn poll(&mut self, elapsed: Duration, active: bool) -> Tick;

    /// Start over from the beginning
    fn reset(&mut self);
}

impl Ticker for LiveBeatSynchronizer {
    fn poll(&mut self, elapsed: Duration, active: bool) -> Tick {
        LiveBeatSynchronizer::poll(self, elapsed, active)
    }

    fn reset(&mut self) {
        LiveBeatSynchronizer::reset(self);
    }
}

/// Fixed-rate ticks at 0, p, 2p, ...
///
/// At most one tick per poll; periods missed by a slow poller are skipped rather
/// than delivered in a burst.
#[derive(Debug, Clone)]
pub struct PeriodicTicker {
    period: Duration,
    length: Option<Duration>,
    next_index: usize,
}

impl PeriodicTicker {
    /// A zero period is treated as one nanosecond
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_nanos(1)),
            length: None,
            next_index: 0,
        }
    }

    /// Report `Ended` once `elapsed` reaches `length`
    pub fn with_length(mut self, length: Duration) -> Self {
        self.length = Some(length);
        self
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    fn due(&self, index: usize) -> Duration {
        let nanos = self.period.as_nanos().saturating_mul(index as u128);
        crate::buffer::duration_from_nanos(nanos)
    }
}

impl Ticker for PeriodicTicker {
    fn poll(&mut self, elapsed: Duration, active: bool) -> Tick {
        if !active || self.length.is_some_and(|length| elapsed >= length) {
            return Tick::Ended;
        }

        let scheduled = self.due(self.next_index);
        if elapsed < scheduled {
            return Tick::Idle;
        }

        let event = BeatEvent {
            index: self.next_index,
            scheduled,
            observed: elapsed,
        };
        let current = elapsed.as_nanos() / self.period.as_nanos();
        self.next_index = usize::try_from(current).unwrap_or(usize::MAX).saturating_add(1);
        Tick::Beat(event)
    }

    fn reset(&mut self) {
        self.next_index = 0;
    }
}

/// Runs the beat handler on its own thread so a slow handler never delays polling.
///
/// Events are queued in order; dropping the dispatcher lets the worker drain the
/// queue and then joins it.
pub struct BeatDispatcher {
    sender: Option<Sender<BeatEvent>>,
    worker: Option<JoinHandle<usize>>,
}

impl BeatDispatcher {
    pub fn spawn<F>(mut handler: F) -> io::Result<Self>
    where
        F: FnMut(BeatEvent) + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::unbounded::<BeatEvent>();
        let worker = thread::Builder::new()
            .name("beat-dispatch".into())
            .spawn(move || {
                let mut handled = 0;
                for event in receiver.iter() {
                    handler(event);
                    handled += 1;
                }
                handled
            })?;

        Ok(Self {
            sender: Some(sender),
            worker: Some(worker),
        })
    }

    /// Queue an event; `false` if the worker is gone
    pub fn dispatch(&self, event: BeatEvent) -> bool {
        match &self.sender {
            Some(sender) => sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Wait for every queued event to be handled; returns how many were
    pub fn finish(mut self) -> usize {
        self.shutdown()
    }

    fn shutdown(&mut self) -> usize {
        drop(self.sender.take());
        match self.worker.take().map(JoinHandle::join) {
            Some(Ok(handled)) => handled,
            Some(Err(_)) => {
                warn!("beat handler panicked");
                0
            }
            None => 0,
        }
    }
}

impl Drop for BeatDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll `ticker` against `clock` until it ends, handing each beat to `on_beat`.
///
/// Returns the number of beats delivered.
pub fn drive<T, C, F>(ticker: &mut T, clock: &C, poll_interval: Duration, mut on_beat: F) -> usize
where
    T: Ticker + ?Sized,
    C: PlaybackClock + ?Sized,
    F: FnMut(BeatEvent),
{
    let mut delivered = 0;
    loop {
        match ticker.poll(clock.position(), clock.is_playing()) {
            Tick::Beat(event) => {
                on_beat(event);
                delivered += 1;
            }
            Tick::Idle => {}
            Tick::Ended => break,
        }
        if !poll_interval.is_zero() {
            thread::sleep(poll_interval);
        }
    }
    debug!(delivered, "ticker ended");
    delivered
}
