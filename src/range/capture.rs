use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;

/// RMS below this (dB) is treated as silence.
pub const SILENCE_THRESHOLD_DB: f32 = -50.0;

/// Mono audio captured from an input device.
pub struct Recording {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Recording {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn rms_db(&self) -> f32 {
        to_db(compute_rms(&self.samples))
    }

    pub fn is_silent(&self) -> bool {
        self.rms_db() < SILENCE_THRESHOLD_DB
    }
}

/// Record from the default input device for `duration`.
///
/// The cpal callback downmixes each buffer to mono and hands it to this
/// thread over a channel; the stream is dropped once the time is up.
/// `on_tick` gets the elapsed time roughly every 100 ms.
pub fn record_for(duration: Duration, on_tick: impl Fn(Duration)) -> Result<Recording> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No default input device found")?;

    let config = device
        .default_input_config()
        .context("Failed to get default input config")?;

    let sample_rate = config.sample_rate().0;
    let channels = config.channels() as usize;
    let format = config.sample_format();

    let (tx, rx) = mpsc::channel::<Vec<f32>>();
    let stop = Arc::new(AtomicBool::new(false));

    let err_fn = |err: cpal::StreamError| tracing::warn!("input stream error: {err}");

    let stream = match format {
        SampleFormat::F32 => {
            let stop = Arc::clone(&stop);
            device.build_input_stream(
                &config.into(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !stop.load(Ordering::Relaxed) {
                        let _ = tx.send(downmix(data, channels));
                    }
                },
                err_fn,
                None,
            )?
        }
        SampleFormat::I16 => {
            let stop = Arc::clone(&stop);
            device.build_input_stream(
                &config.into(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    if !stop.load(Ordering::Relaxed) {
                        let scaled: Vec<f32> =
                            data.iter().map(|&s| s as f32 / i16::MAX as f32).collect();
                        let _ = tx.send(downmix(&scaled, channels));
                    }
                },
                err_fn,
                None,
            )?
        }
        other => anyhow::bail!("Unsupported sample format: {other:?}"),
    };

    stream.play().context("Failed to start audio stream")?;
    tracing::info!(sample_rate, channels, secs = duration.as_secs_f32(), "recording");

    let tick = Duration::from_millis(100);
    let start = Instant::now();
    let mut samples = Vec::new();

    while start.elapsed() < duration {
        while let Ok(chunk) = rx.try_recv() {
            samples.extend(chunk);
        }
        std::thread::sleep(tick);
        on_tick(start.elapsed().min(duration));
    }

    stop.store(true, Ordering::Relaxed);
    drop(stream);
    samples.extend(rx.try_iter().flatten());
    Ok(Recording {
        samples,
        sample_rate,
    })
}

/// Average interleaved frames down to one channel.
pub fn downmix(data: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return data.to_vec();
    }
    data.chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Compute RMS of a sample buffer (linear, not dB).
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

fn to_db(rms: f32) -> f32 {
    if rms > 0.0 {
        20.0 * rms.log10()
    } else {
        f32::NEG_INFINITY
    }
}
