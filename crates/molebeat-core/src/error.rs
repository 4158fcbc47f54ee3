//! Error types for buffer construction, analysis configuration and timelines.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while wrapping decoded samples in an [`AudioBuffer`](crate::AudioBuffer)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BufferError {
    /// A sample rate of zero cannot describe any duration
    #[error("sample rate must be positive")]
    ZeroSampleRate,

    /// Samples were supplied but the buffer claims to last no time at all
    #[error("buffer holds {sample_count} samples but has zero duration")]
    ZeroDuration { sample_count: usize },
}

/// Configuration errors reported before any beat is searched for.
///
/// Analysis is aborted on any of these; no partial timeline is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("analysis period must be positive")]
    ZeroAnalysisPeriod,

    #[error("analysis period {period:?} is shorter than one sample")]
    EmptyBlock { period: Duration },

    /// Neighbouring blocks would share a nanosecond timestamp
    #[error("block of {block_size} samples spans less than one nanosecond")]
    SubNanosecondBlock { block_size: usize },

    #[error("invalid frequency band {low_hz} Hz - {high_hz} Hz")]
    InvalidBand { low_hz: f64, high_hz: f64 },

    #[error("threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("block of {block_size} samples is larger than the signal ({sample_count} samples)")]
    BlockLargerThanSignal {
        block_size: usize,
        sample_count: usize,
    },

    #[error("low frequency {low_hz} Hz (bin {low_bin}) exceeds the representable range (bin {max_bin})")]
    LowFrequencyOutOfRange {
        low_hz: f64,
        low_bin: usize,
        max_bin: usize,
    },
}

/// Errors raised when building a [`BeatTimeline`](crate::BeatTimeline) by hand
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimelineError {
    #[error("beat {index} at {at:?} does not come after the previous beat at {previous:?}")]
    NotAscending {
        index: usize,
        at: Duration,
        previous: Duration,
    },
}
