//! Offline beat detection over a fully decoded buffer.
//!
//! Two passes over the samples:
//! 1. Calibration - every `block_size + calibration_skip` samples, transform one block
//!    and keep the loudest bin seen anywhere in the spectrum. This is the global
//!    maximum every later magnitude is divided by.
//! 2. Detection - walk contiguous blocks; a block is a beat when any bin of the
//!    band reaches `threshold` after normalization. A beat skips `ignore_period`
//!    worth of samples before scanning resumes.

use tracing::{debug, info, trace, warn};

use crate::buffer::AudioBuffer;
use crate::config::{AnalysisConfig, BlockPlan};
use crate::error::AnalysisError;
use crate::spectrum::SpectralTransform;
use crate::timeline::BeatTimeline;

/// Turns an [`AudioBuffer`] into a [`BeatTimeline`]. Holds no state between runs.
#[derive(Debug, Clone, Default)]
pub struct OfflineBeatAnalyzer {
    config: AnalysisConfig,
}

impl OfflineBeatAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Block geometry this analyzer would use for `buffer`
    pub fn plan(&self, buffer: &AudioBuffer) -> Result<BlockPlan, AnalysisError> {
        BlockPlan::new(buffer, &self.config)
    }

    /// Run both passes.
    ///
    /// An empty buffer, or one whose spectrum is silent everywhere, yields an empty
    /// timeline. Configuration problems are returned before any block is transformed.
    pub fn analyze(&self, buffer: &AudioBuffer) -> Result<BeatTimeline, AnalysisError> {
        if buffer.is_empty() {
            self.config.validate()?;
            debug!("empty buffer, nothing to analyze");
            return Ok(BeatTimeline::new());
        }

        let plan = self.plan(buffer)?;
        let mut transform = SpectralTransform::new(plan.block_size);

        let global_max = calibrate_with(&plan, buffer, &mut transform);
        if global_max <= 0.0 {
            warn!(
                samples = buffer.sample_count(),
                "calibration found no spectral energy, no beats detectable"
            );
            return Ok(BeatTimeline::new());
        }
        debug!(global_max, "calibration done");

        let timeline = self.scan(&plan, buffer, &mut transform, global_max);

        info!(
            beats = timeline.len(),
            duration_secs = buffer.duration().as_secs_f64(),
            low_hz = self.config.low_freq,
            high_hz = self.config.high_freq,
            "beat analysis complete"
        );

        Ok(timeline)
    }

    /// Calibration pass on its own: the largest per-bin magnitude over the sampled blocks
    pub fn calibrate(&self, plan: &BlockPlan, buffer: &AudioBuffer) -> f64 {
        let mut transform = SpectralTransform::new(plan.block_size);
        calibrate_with(plan, buffer, &mut transform)
    }

    fn scan(
        &self,
        plan: &BlockPlan,
        buffer: &AudioBuffer,
        transform: &mut SpectralTransform,
        global_max: f64,
    ) -> BeatTimeline {
        let samples = buffer.samples();
        let mut timeline = BeatTimeline::new();
        let mut start = 0;

        while start + plan.block_size <= samples.len() {
            let block = transform.transform(&samples[start..start + plan.block_size]);
            let level = block.band_peak(plan.low_bin..=plan.high_bin) / global_max;

            if level >= self.config.threshold {
                let at = buffer.timestamp_of(start);
                trace!(?at, level, "beat");
                timeline.push(at);
                start += plan.block_size + plan.ignore_samples;
            } else {
                start += plan.block_size;
            }
        }

        timeline
    }
}

fn calibrate_with(plan: &BlockPlan, buffer: &AudioBuffer, transform: &mut SpectralTransform) -> f64 {
    let samples = buffer.samples();
    let stride = plan.block_size + plan.calibration_skip_samples;
    let mut global_max = 0.0f64;
    let mut start = 0;

    while start + plan.block_size <= samples.len() {
        let block = transform.transform(&samples[start..start + plan.block_size]);
        global_max = global_max.max(block.peak_magnitude());
        start += stride;
    }

    global_max
}

/// Analyze `buffer` with `config` in one call
pub fn detect_beats(
    buffer: &AudioBuffer,
    config: AnalysisConfig,
) -> Result<BeatTimeline, AnalysisError> {
    OfflineBeatAnalyzer::new(config).analyze(buffer)
}
