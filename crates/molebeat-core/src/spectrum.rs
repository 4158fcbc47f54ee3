//! Forward DFT over fixed-size sample blocks.

use std::ops::RangeInclusive;
use std::sync::Arc;

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// One planned forward FFT plus the buffers it runs in.
///
/// Planning is done once per block size; each [`transform`](Self::transform)
/// reuses the same input and scratch storage.
pub struct SpectralTransform {
    fft: Arc<dyn Fft<f64>>,
    buffer: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
}

impl SpectralTransform {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); size],
            scratch,
        }
    }

    /// Transform one block of samples (real part = sample, imaginary part = 0).
    ///
    /// Blocks shorter than the transform size are zero-padded; extra samples are ignored.
    pub fn transform(&mut self, samples: &[i16]) -> SpectralBlock<'_> {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let value = samples.get(i).copied().unwrap_or(0);
            *slot = Complex::new(f64::from(value), 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        SpectralBlock { bins: &self.buffer }
    }
}

/// Frequency-domain view of one transformed block. Lives until the next transform.
pub struct SpectralBlock<'a> {
    bins: &'a [Complex<f64>],
}

impl SpectralBlock<'_> {
    /// `|X[bin]| / N`, the amplitude of a bin for an unnormalized forward DFT
    pub fn magnitude(&self, bin: usize) -> f64 {
        self.bins[bin].norm() / self.bins.len() as f64
    }

    /// Largest magnitude over every bin of the block
    pub fn peak_magnitude(&self) -> f64 {
        (0..self.bins.len())
            .map(|bin| self.magnitude(bin))
            .fold(0.0, f64::max)
    }

    /// Largest magnitude inside `band`; bins past the end of the block are ignored
    pub fn band_peak(&self, band: RangeInclusive<usize>) -> f64 {
        let last = self.bins.len().saturating_sub(1);
        let (low, high) = (*band.start(), (*band.end()).min(last));
        if self.bins.is_empty() || low > high {
            return 0.0;
        }
        (low..=high)
            .map(|bin| self.magnitude(bin))
            .fold(0.0, f64::max)
    }
}
