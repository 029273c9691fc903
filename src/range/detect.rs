use std::f32::consts::PI;

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use super::sample::PitchSample;
use crate::config::PitchConfig;

/// Track the sung pitch through a mono recording, one reading every
/// `hop_ms` milliseconds.
///
/// Each reading runs the McLeod detector over a Hann-windowed chunk of real
/// audio. Chunks with no clear pitch, or a pitch outside the configured
/// floor/ceiling, produce no sample; the timestamps of the others still
/// reflect where they sit in the recording. The detector's clarity becomes
/// the sample confidence.
pub fn track_pitch(
    samples: &[f32],
    sample_rate: u32,
    hop_ms: f64,
    config: &PitchConfig,
) -> Vec<PitchSample> {
    if sample_rate == 0 || hop_ms <= 0.0 || config.pitch_floor_hz <= 0.0 {
        return Vec::new();
    }
    let sr = sample_rate as f32;

    let frame_size = (config.frame_size_ms / 1000.0 * sr) as usize;
    let hop_size = ((hop_ms * sample_rate as f64 / 1000.0).round() as usize).max(1);

    // Two periods of the lowest pitch we accept, rounded up for the FFT.
    let min_buffer = (2.0 * sr / config.pitch_floor_hz).ceil() as usize;
    let detector_size = min_buffer.next_power_of_two().max(frame_size);
    let padding = detector_size / 2;

    let mut detector = McLeodDetector::<f64>::new(detector_size, padding);
    let mut readings = Vec::new();
    let mut pos = 0;

    while pos + detector_size <= samples.len() {
        let windowed: Vec<f64> = hann(&samples[pos..pos + detector_size])
            .into_iter()
            .map(f64::from)
            .collect();

        let pitch = detector.get_pitch(
            &windowed,
            sample_rate as usize,
            config.power_threshold,
            config.clarity_threshold,
        );

        let timestamp_ms = (pos as f64 * 1000.0 / sample_rate as f64).round() as u64;

        if let Some(pitch) = pitch {
            let frequency = pitch.frequency as f32;
            if (config.pitch_floor_hz..=config.pitch_ceiling_hz).contains(&frequency) {
                let confidence = (pitch.clarity as f32).clamp(0.0, 1.0);
                if let Some(sample) = PitchSample::from_frequency(frequency, confidence, timestamp_ms) {
                    readings.push(sample);
                }
            }
        }

        pos += hop_size;
    }

    tracing::debug!(voiced = readings.len(), "pitch tracking finished");
    readings
}

/// Hann window: w(n) = 0.5 * (1 - cos(2πn / (N - 1))).
fn hann(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    if n <= 1 {
        return samples.to_vec();
    }
    let scale = 2.0 * PI / (n - 1) as f32;
    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| s * 0.5 * (1.0 - (scale * i as f32).cos()))
        .collect()
}
