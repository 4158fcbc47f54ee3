//! Playback on the default output device, doubling as the synchronizer's clock.

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Stream, StreamConfig};
use molebeat_core::{AudioBuffer, PlaybackClock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// A running output stream and a count of the frames it has consumed.
///
/// The position runs ahead of what is audible by the device's buffer latency.
pub struct PlaybackStream {
    _stream: Stream,
    frames_played: Arc<AtomicU64>,
    failed: Arc<AtomicBool>,
    output_rate: u32,
    length: Duration,
}

impl PlaybackStream {
    pub fn start(buffer: &AudioBuffer) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("No default output device")?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let stream_config: StreamConfig = device
            .default_output_config()
            .context("Failed to get output config")?
            .into();
        let channels = usize::from(stream_config.channels.max(1));
        let output_rate = stream_config.sample_rate.0;

        // Nearest-sample resampling from the buffer's rate to the device's
        let step = buffer.sample_rate() / f64::from(output_rate);
        let samples = buffer.shared_samples();
        let frames_played = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicBool::new(false));

        let counter = Arc::clone(&frames_played);
        let failed_flag = Arc::clone(&failed);
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let played = counter.fetch_add(1, Ordering::Relaxed);
                        let source = (played as f64 * step) as usize;
                        let value = samples
                            .get(source)
                            .map_or(0.0, |&s| f32::from(s) / f32::from(i16::MAX));
                        frame.fill(value);
                    }
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                    failed_flag.store(true, Ordering::Relaxed);
                },
                None,
            )
            .context("Failed to build output stream")?;
        stream.play().context("Failed to start playback")?;

        info!(device = %device_name, output_rate, "playback started");

        Ok(Self {
            _stream: stream,
            frames_played,
            failed,
            output_rate,
            length: buffer.duration(),
        })
    }
}

impl PlaybackClock for PlaybackStream {
    fn position(&self) -> Duration {
        let frames = u128::from(self.frames_played.load(Ordering::Relaxed));
        let nanos = frames * 1_000_000_000 / u128::from(self.output_rate.max(1));
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX)).min(self.length)
    }

    fn is_playing(&self) -> bool {
        !self.failed.load(Ordering::Relaxed) && self.position() < self.length
    }
}
