//! Analysis parameters and the block geometry derived from them.

use std::time::Duration;

use tracing::debug;

use crate::buffer::AudioBuffer;
use crate::error::AnalysisError;

/// Parameters for one offline analysis run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    /// Length of one analysis block
    pub analysis_period: Duration,
    /// Lower edge of the band of interest in Hz (inclusive)
    pub low_freq: f64,
    /// Upper edge of the band of interest in Hz (inclusive)
    pub high_freq: f64,
    /// Normalized amplitude (0-1) a band bin must reach to count as a beat
    pub threshold: f64,
    /// Refractory gap skipped after each detection
    pub ignore_period: Duration,
    /// Gap skipped between blocks while searching for the calibration maximum
    pub calibration_skip: Duration,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            analysis_period: Duration::from_millis(10),
            low_freq: 60.0,
            high_freq: 500.0, // kick and snare body
            threshold: 0.7,
            ignore_period: Duration::from_millis(100),
            calibration_skip: Duration::from_millis(100),
        }
    }
}

impl AnalysisConfig {
    pub fn with_analysis_period(mut self, period: Duration) -> Self {
        self.analysis_period = period;
        self
    }

    pub fn with_band(mut self, low_freq: f64, high_freq: f64) -> Self {
        self.low_freq = low_freq;
        self.high_freq = high_freq;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_ignore_period(mut self, period: Duration) -> Self {
        self.ignore_period = period;
        self
    }

    pub fn with_calibration_skip(mut self, skip: Duration) -> Self {
        self.calibration_skip = skip;
        self
    }

    /// Check the invariants that do not depend on the buffer
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.analysis_period.is_zero() {
            return Err(AnalysisError::ZeroAnalysisPeriod);
        }
        let band_ok = self.low_freq.is_finite()
            && self.high_freq.is_finite()
            && self.low_freq >= 0.0
            && self.low_freq <= self.high_freq;
        if !band_ok {
            return Err(AnalysisError::InvalidBand {
                low_hz: self.low_freq,
                high_hz: self.high_freq,
            });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            // NaN fails `contains` as well
            return Err(AnalysisError::ThresholdOutOfRange(self.threshold));
        }
        Ok(())
    }
}

/// Block geometry for one buffer/config pair.
///
/// All sample counts are floors of exact nanosecond ratios.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockPlan {
    /// Samples per analysis block
    pub block_size: usize,
    /// Samples skipped after a detection
    pub ignore_samples: usize,
    /// Samples skipped between calibration blocks
    pub calibration_skip_samples: usize,
    /// Implied sample rate in Hz
    pub sample_rate: f64,
    pub nyquist: f64,
    /// Hz per bin used to map the band onto transform bins, `nyquist / block_size`
    pub bin_width: f64,
    /// First bin of the band (inclusive)
    pub low_bin: usize,
    /// Last bin of the band (inclusive), clamped to `block_size / 2`
    pub high_bin: usize,
    /// Time covered by one block
    pub block_span: Duration,
}

impl BlockPlan {
    pub fn new(buffer: &AudioBuffer, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;

        let sample_count = buffer.sample_count();
        let block_size = buffer.samples_in(config.analysis_period);
        if block_size == 0 {
            return Err(AnalysisError::EmptyBlock {
                period: config.analysis_period,
            });
        }
        if block_size > sample_count {
            return Err(AnalysisError::BlockLargerThanSignal {
                block_size,
                sample_count,
            });
        }

        let block_span = buffer.timestamp_of(block_size);
        if block_span.is_zero() {
            return Err(AnalysisError::SubNanosecondBlock { block_size });
        }

        let sample_rate = buffer.sample_rate();
        let nyquist = sample_rate / 2.0;
        let bin_width = nyquist / block_size as f64;
        let max_bin = block_size / 2;

        let low_bin = (config.low_freq / bin_width).floor() as usize;
        if low_bin > max_bin {
            return Err(AnalysisError::LowFrequencyOutOfRange {
                low_hz: config.low_freq,
                low_bin,
                max_bin,
            });
        }
        let high_bin = ((config.high_freq / bin_width).floor() as usize).min(max_bin);

        let plan = Self {
            block_size,
            ignore_samples: buffer.samples_in(config.ignore_period),
            calibration_skip_samples: buffer.samples_in(config.calibration_skip),
            sample_rate,
            nyquist,
            bin_width,
            low_bin,
            high_bin,
            block_span,
        };

        debug!(
            block_size = plan.block_size,
            sample_rate = plan.sample_rate,
            duration_secs = buffer.duration().as_secs_f64(),
            nyquist = plan.nyquist,
            bin_width = plan.bin_width,
            low_bin = plan.low_bin,
            high_bin = plan.high_bin,
            ignore_samples = plan.ignore_samples,
            "block plan ready"
        );

        Ok(plan)
    }

    /// Number of transform bins inside the band
    pub fn band_bins(&self) -> usize {
        self.high_bin - self.low_bin + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(rate: u32, secs: usize) -> AudioBuffer {
        AudioBuffer::new(vec![0i16; rate as usize * secs], rate).unwrap()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(AnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_plan_geometry() {
        let config = AnalysisConfig::default()
            .with_analysis_period(Duration::from_millis(16))
            .with_band(500.0, 1500.0)
            .with_ignore_period(Duration::from_millis(500));
        let plan = BlockPlan::new(&buffer(8000, 2), &config).unwrap();

        assert_eq!(plan.block_size, 128);
        assert_eq!(plan.ignore_samples, 4000);
        assert_eq!(plan.calibration_skip_samples, 800);
        assert!((plan.bin_width - 31.25).abs() < 1e-9);
        assert!((plan.nyquist - 4000.0).abs() < 1e-9);
        assert_eq!(plan.low_bin, 16);
        assert_eq!(plan.high_bin, 48);
        assert_eq!(plan.band_bins(), 33);
        assert_eq!(plan.block_span, Duration::from_millis(16));
    }

    #[test]
    fn test_high_bin_is_clamped() {
        let config = AnalysisConfig::default()
            .with_analysis_period(Duration::from_millis(16))
            .with_band(100.0, 20_000.0);
        let plan = BlockPlan::new(&buffer(8000, 1), &config).unwrap();
        assert_eq!(plan.high_bin, 64);
    }

    #[test]
    fn test_low_bin_above_nyquist_is_an_error() {
        let config = AnalysisConfig::default()
            .with_analysis_period(Duration::from_millis(16))
            .with_band(5000.0, 6000.0);
        let err = BlockPlan::new(&buffer(8000, 1), &config).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::LowFrequencyOutOfRange {
                low_hz: 5000.0,
                low_bin: 160,
                max_bin: 64,
            }
        );
    }

    #[test]
    fn test_block_larger_than_signal() {
        let short = AudioBuffer::new(vec![0i16; 100], 8000).unwrap();
        let config = AnalysisConfig::default().with_analysis_period(Duration::from_millis(16));
        assert_eq!(
            BlockPlan::new(&short, &config).unwrap_err(),
            AnalysisError::BlockLargerThanSignal {
                block_size: 128,
                sample_count: 100,
            }
        );
    }

    #[test]
    fn test_sub_sample_period_is_rejected() {
        let config = AnalysisConfig::default().with_analysis_period(Duration::from_micros(10));
        assert!(matches!(
            BlockPlan::new(&buffer(8000, 1), &config),
            Err(AnalysisError::EmptyBlock { .. })
        ));
    }

    #[test]
    fn test_block_shorter_than_a_nanosecond_is_rejected() {
        // ~2.3 us of audio: four samples per block still floor to 0 ns
        let dense = AudioBuffer::new(vec![1000i16; 10_000], u32::MAX).unwrap();
        let config = AnalysisConfig::default()
            .with_analysis_period(Duration::from_nanos(1))
            .with_band(0.0, 1e12)
            .with_threshold(0.0);
        assert_eq!(
            BlockPlan::new(&dense, &config).unwrap_err(),
            AnalysisError::SubNanosecondBlock { block_size: 4 }
        );
        assert!(crate::detect_beats(&dense, config).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        let base = AnalysisConfig::default();
        assert_eq!(
            base.with_analysis_period(Duration::ZERO).validate(),
            Err(AnalysisError::ZeroAnalysisPeriod)
        );
        assert!(matches!(
            base.with_band(200.0, 100.0).validate(),
            Err(AnalysisError::InvalidBand { .. })
        ));
        assert!(matches!(
            base.with_band(f64::NAN, 100.0).validate(),
            Err(AnalysisError::InvalidBand { .. })
        ));
        assert_eq!(
            base.with_threshold(1.5).validate(),
            Err(AnalysisError::ThresholdOutOfRange(1.5))
        );
        assert!(base.with_threshold(f64::NAN).validate().is_err());
    }
}
