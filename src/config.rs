use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths;

/// Application configuration, loaded from <config_dir>/config.toml.
///
/// Every section is `#[serde(default)]`, so a missing file or a file that
/// only sets a few keys still yields a complete config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub search: SearchConfig,
    pub range: RangeConfig,
    pub pitch: PitchConfig,
}

/// Fuzzy search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on ranked song results (and on artists returned).
    pub max_results: usize,
    /// Minimum score for a single-field match to be shown.
    pub min_score: u32,
    /// Minimum score for a match that hit both title and artist.
    pub multi_field_min_score: u32,
    /// How many title/artist split guesses to query.
    pub max_split_guesses: usize,
    /// Entries kept by the result cache.
    pub cache_capacity: usize,
}

/// Vocal range detection thresholds, expressed in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Nominal cadence of the pitch source.
    pub sampling_interval_ms: f64,
    /// A note must be held this long without interruption to count.
    pub min_sustain_ms: f64,
    /// Total sustained time a note needs across all its held stretches.
    pub min_total_ms: f64,
    /// Fewer samples than this is inconclusive.
    pub min_samples: usize,
    /// Sample count at which confidence reaches 1.0.
    pub confidence_saturation: usize,
    /// Use the median gap between sample timestamps instead of
    /// `sampling_interval_ms` when converting times to sample counts.
    pub derive_cadence_from_timestamps: bool,
}

/// Settings for McLeod pitch tracking of recorded audio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    pub pitch_floor_hz: f32,
    pub pitch_ceiling_hz: f32,
    /// Analysis window duration.
    pub frame_size_ms: f32,
    /// McLeod power threshold; frames quieter than this are unvoiced.
    pub power_threshold: f64,
    /// McLeod clarity threshold in 0.0..1.0.
    pub clarity_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 15,
            min_score: 5_000,
            multi_field_min_score: 3_000,
            max_split_guesses: 6,
            cache_capacity: 64,
        }
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            sampling_interval_ms: 150.0,
            min_sustain_ms: 2_000.0,
            min_total_ms: 4_000.0,
            min_samples: 10,
            confidence_saturation: 50,
            derive_cadence_from_timestamps: true,
        }
    }
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            // E1 is about 41 Hz; 30 Hz leaves room for the lowest basses.
            pitch_floor_hz: 30.0,
            pitch_ceiling_hz: 1_100.0,
            frame_size_ms: 30.0,
            power_threshold: 0.2,
            clarity_threshold: 0.5,
        }
    }
}

impl RangeConfig {
    /// Samples a single held stretch needs at the nominal cadence.
    pub fn min_consecutive(&self) -> usize {
        self.min_consecutive_at(self.sampling_interval_ms)
    }

    /// Samples a note needs in total at the nominal cadence.
    pub fn min_total(&self) -> usize {
        self.min_total_at(self.sampling_interval_ms)
    }

    pub fn min_consecutive_at(&self, interval_ms: f64) -> usize {
        samples_for(self.min_sustain_ms, interval_ms)
    }

    pub fn min_total_at(&self, interval_ms: f64) -> usize {
        samples_for(self.min_total_ms, interval_ms)
    }
}

/// Round to the nearest whole sample, never below one.
fn samples_for(duration_ms: f64, interval_ms: f64) -> usize {
    if interval_ms <= 0.0 || !interval_ms.is_finite() {
        return 1;
    }
    ((duration_ms / interval_ms).round() as usize).max(1)
}

/// Load the application config from $XDG_CONFIG_HOME/rangefinder/config.toml.
/// If the file doesn't exist, returns defaults.
pub fn load_config() -> Result<AppConfig> {
    let path = paths::config_file();

    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
