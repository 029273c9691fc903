use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};

use super::capture;
use super::detect::track_pitch;
use super::sample::PitchSample;
use crate::config::PitchConfig;
use crate::music::note::Note;

/// Anything that can produce a finished, time-ordered list of pitch samples.
///
/// Stopping a recording early simply yields a shorter list.
pub trait PitchSource {
    fn collect_samples(&mut self) -> Result<Vec<PitchSample>>;
}

/// Deterministic pitch readings built from held notes and rests.
///
/// Frequencies wobble by a few cents around the tempered pitch, so averages
/// are exercised without any randomness.
pub struct SyntheticPitchSource {
    interval_ms: u64,
    segments: Vec<Segment>,
}

enum Segment {
    Hold(Note, u64),
    Rest(u64),
}

const WOBBLE_CENTS: f32 = 8.0;

impl SyntheticPitchSource {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            segments: Vec::new(),
        }
    }

    /// Hold `note` for `duration_ms`.
    pub fn hold(mut self, note: &str, duration_ms: u64) -> Result<Self> {
        let note = Note::parse(note).with_context(|| format!("Bad synthetic note: {note}"))?;
        self.segments.push(Segment::Hold(note, duration_ms));
        Ok(self)
    }

    /// Silence (no readings) for `duration_ms`.
    pub fn rest(mut self, duration_ms: u64) -> Self {
        self.segments.push(Segment::Rest(duration_ms));
        self
    }

    /// A short warm-up: a low hold, a quick run up, a high hold, with a
    /// repeated low note after a breath.
    pub fn demo(interval_ms: u64) -> Result<Self> {
        Self::new(interval_ms)
            .hold("A2", 2_400)?
            .hold("B2", 300)?
            .hold("C#3", 300)?
            .hold("E3", 2_200)?
            .rest(600)
            .hold("A2", 2_500)?
            .hold("E3", 300)?
            .hold("A3", 300)?
            .hold("E4", 4_500)?
            .hold("F#4", 450)
    }
}

impl PitchSource for SyntheticPitchSource {
    fn collect_samples(&mut self) -> Result<Vec<PitchSample>> {
        let mut samples = Vec::new();
        let mut clock_ms = 0;

        for segment in &self.segments {
            match segment {
                Segment::Rest(duration) => clock_ms += duration,
                Segment::Hold(note, duration) => {
                    let end = clock_ms + duration;
                    while clock_ms < end {
                        let i = samples.len() as f32;
                        let cents = WOBBLE_CENTS * (i * 0.7).sin();
                        let mut sample = PitchSample::from_note(*note, 0.9, clock_ms);
                        sample.frequency *= 2.0_f32.powf(cents / 1200.0);
                        samples.push(sample);
                        clock_ms += self.interval_ms;
                    }
                }
            }
        }

        Ok(samples)
    }
}

/// Pitch readings tracked from a WAV file.
pub struct WavPitchSource {
    path: PathBuf,
    hop_ms: f64,
    config: PitchConfig,
}

impl WavPitchSource {
    pub fn new(path: impl Into<PathBuf>, hop_ms: f64, config: PitchConfig) -> Self {
        Self {
            path: path.into(),
            hop_ms,
            config,
        }
    }
}

impl PitchSource for WavPitchSource {
    fn collect_samples(&mut self) -> Result<Vec<PitchSample>> {
        let (audio, sample_rate) = load_mono(&self.path)?;
        tracing::info!(
            path = %self.path.display(),
            secs = audio.len() as f32 / sample_rate.max(1) as f32,
            "tracking pitch"
        );
        Ok(track_pitch(&audio, sample_rate, self.hop_ms, &self.config))
    }
}

/// Pitch readings tracked from a fixed-length microphone recording.
pub struct MicPitchSource {
    duration: Duration,
    hop_ms: f64,
    config: PitchConfig,
    on_tick: Option<Box<dyn Fn(Duration)>>,
}

impl MicPitchSource {
    pub fn new(duration: Duration, hop_ms: f64, config: PitchConfig) -> Self {
        Self {
            duration,
            hop_ms,
            config,
            on_tick: None,
        }
    }

    /// Report elapsed recording time while capturing.
    pub fn with_progress(mut self, on_tick: impl Fn(Duration) + 'static) -> Self {
        self.on_tick = Some(Box::new(on_tick));
        self
    }
}

impl PitchSource for MicPitchSource {
    fn collect_samples(&mut self) -> Result<Vec<PitchSample>> {
        let on_tick = |elapsed: Duration| {
            if let Some(tick) = &self.on_tick {
                tick(elapsed);
            }
        };
        let recording = capture::record_for(self.duration, on_tick)?;
        if recording.is_silent() {
            tracing::warn!(rms_db = recording.rms_db(), "recording is nearly silent");
        }
        Ok(track_pitch(
            &recording.samples,
            recording.sample_rate,
            self.hop_ms,
            &self.config,
        ))
    }
}

/// Load a WAV file as mono f32 in [-1.0, 1.0], averaging channels.
/// Returns the samples and the sample rate.
pub fn load_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max_val = (1_i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<hound::Result<Vec<_>>>()
                .context("Failed to read WAV samples")?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<hound::Result<Vec<_>>>()
            .context("Failed to read WAV samples")?,
    };

    Ok((
        capture::downmix(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}
