//! Decoded PCM samples handed to the analyzer.

use std::sync::Arc;
use std::time::Duration;

use crate::error::BufferError;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Immutable mono buffer of signed 16-bit samples.
///
/// The sample rate is implied by `sample_count / duration`. Sample storage is shared,
/// so cloning a buffer to hand it to a playback thread does not copy samples.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<[i16]>,
    duration: Duration,
}

impl AudioBuffer {
    /// Wrap samples recorded at `sample_rate` Hz
    pub fn new(samples: impl Into<Arc<[i16]>>, sample_rate: u32) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let samples = samples.into();
        let nanos = samples.len() as u128 * NANOS_PER_SEC / sample_rate as u128;
        Ok(Self {
            samples,
            duration: duration_from_nanos(nanos),
        })
    }

    /// Wrap samples spanning `duration`; the sample rate is derived from both
    pub fn with_duration(
        samples: impl Into<Arc<[i16]>>,
        duration: Duration,
    ) -> Result<Self, BufferError> {
        let samples = samples.into();
        if !samples.is_empty() && duration.is_zero() {
            return Err(BufferError::ZeroDuration {
                sample_count: samples.len(),
            });
        }
        Ok(Self { samples, duration })
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Shared handle to the samples, for consumers that outlive this borrow
    pub fn shared_samples(&self) -> Arc<[i16]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Samples per second implied by count and duration (0 for an empty buffer)
    pub fn sample_rate(&self) -> f64 {
        if self.duration.is_zero() {
            return 0.0;
        }
        self.samples.len() as f64 / self.duration.as_secs_f64()
    }

    /// Offset of sample `index` from the start of the buffer.
    ///
    /// Computed as `duration * index / count` in one step so long buffers
    /// do not accumulate the rounding of a truncated per-sample period.
    pub fn timestamp_of(&self, index: usize) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        duration_from_nanos(self.duration.as_nanos() * index as u128 / self.samples.len() as u128)
    }

    /// Number of whole samples that fit in `span` (floor)
    pub fn samples_in(&self, span: Duration) -> usize {
        if self.duration.is_zero() {
            return 0;
        }
        let count = span.as_nanos() * self.samples.len() as u128 / self.duration.as_nanos();
        usize::try_from(count).unwrap_or(usize::MAX)
    }
}

pub(crate) fn duration_from_nanos(nanos: u128) -> Duration {
    let secs = nanos / NANOS_PER_SEC;
    let sub = (nanos % NANOS_PER_SEC) as u32;
    Duration::new(u64::try_from(secs).unwrap_or(u64::MAX), sub)
}
