use std::collections::HashMap;

use super::sample::{ConsecutiveGroup, Extremum, NoteOccurrence, PitchSample, VocalRangeResult};
use crate::config::RangeConfig;

/// Find the lowest or highest note the singer actually sustained.
///
/// Steps:
///   1. fewer than `min_samples` readings → None
///   2. split into runs of the same note
///   3. drop runs shorter than the sustain floor (transients, glides)
///   4. merge surviving runs per note, even when they are far apart
///   5. keep notes whose merged count reaches the total floor
///   6. pick the note with the lowest/highest mean frequency
///
/// Both floors are configured in milliseconds and converted to sample counts
/// at the recording's cadence. Confidence is `count / confidence_saturation`,
/// capped at 1.0.
pub fn analyze_vocal_range(
    samples: &[PitchSample],
    which: Extremum,
    config: &RangeConfig,
) -> Option<VocalRangeResult> {
    if samples.len() < config.min_samples {
        tracing::debug!(samples = samples.len(), "too few pitch samples for a range");
        return None;
    }

    let interval_ms = effective_interval_ms(samples, config);
    let min_consecutive = config.min_consecutive_at(interval_ms);
    let min_total = config.min_total_at(interval_ms);

    let groups = consecutive_groups(samples);
    let occurrences = merge_sustained(groups, min_consecutive);

    let mut best: Option<(NoteOccurrence, f32)> = None;
    for occurrence in occurrences {
        if occurrence.total_count < min_total {
            continue;
        }
        let average = occurrence.average_frequency();
        let better = match &best {
            None => true,
            Some((_, current)) => match which {
                Extremum::Lowest => average < *current,
                Extremum::Highest => average > *current,
            },
        };
        if better {
            best = Some((occurrence, average));
        }
    }

    let Some((occurrence, frequency)) = best else {
        tracing::debug!(
            interval_ms,
            min_consecutive,
            min_total,
            "no note was sustained long enough"
        );
        return None;
    };

    let saturation = config.confidence_saturation.max(1) as f32;
    Some(VocalRangeResult {
        confidence: (occurrence.total_count as f32 / saturation).min(1.0),
        note: occurrence.key,
        frequency,
        sample_count: occurrence.total_count,
    })
}

/// Split samples into maximal runs of the same note and octave.
pub fn consecutive_groups(samples: &[PitchSample]) -> Vec<ConsecutiveGroup> {
    let mut groups: Vec<ConsecutiveGroup> = Vec::new();

    for sample in samples {
        let key = sample.key();
        match groups.last_mut() {
            Some(group) if group.key == key => group.frequencies.push(sample.frequency),
            _ => groups.push(ConsecutiveGroup {
                key,
                frequencies: vec![sample.frequency],
            }),
        }
    }

    groups
}

/// Merge the runs that are at least `min_consecutive` long by note.
/// Notes keep the order in which they were first sustained.
pub fn merge_sustained(groups: Vec<ConsecutiveGroup>, min_consecutive: usize) -> Vec<NoteOccurrence> {
    let mut merged: Vec<NoteOccurrence> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for group in groups.into_iter().filter(|g| g.len() >= min_consecutive) {
        match index.get(&group.key) {
            Some(&i) => {
                merged[i].total_count += group.len();
                merged[i].frequencies.extend(group.frequencies);
            }
            None => {
                index.insert(group.key.clone(), merged.len());
                merged.push(NoteOccurrence {
                    total_count: group.len(),
                    key: group.key,
                    frequencies: group.frequencies,
                });
            }
        }
    }

    merged
}

/// The sampling interval to convert time thresholds with.
///
/// With `derive_cadence_from_timestamps` this is the median positive gap
/// between consecutive timestamps; otherwise, or with fewer than two such
/// gaps, the configured `sampling_interval_ms`.
pub fn effective_interval_ms(samples: &[PitchSample], config: &RangeConfig) -> f64 {
    if !config.derive_cadence_from_timestamps {
        return config.sampling_interval_ms;
    }
    observed_interval_ms(samples).unwrap_or(config.sampling_interval_ms)
}

/// Median positive gap between consecutive timestamps.
pub fn observed_interval_ms(samples: &[PitchSample]) -> Option<f64> {
    let mut deltas: Vec<u64> = samples
        .windows(2)
        .map(|pair| pair[1].timestamp_ms.saturating_sub(pair[0].timestamp_ms))
        .filter(|&delta| delta > 0)
        .collect();

    if deltas.len() < 2 {
        return None;
    }

    deltas.sort_unstable();
    let mid = deltas.len() / 2;
    let median = if deltas.len() % 2 == 0 {
        (deltas[mid - 1] + deltas[mid]) as f64 / 2.0
    } else {
        deltas[mid] as f64
    };
    Some(median)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::music::note::Note;

    /// Appends `count` readings of `note` at `interval_ms` spacing.
    struct Recording {
        samples: Vec<PitchSample>,
        interval_ms: u64,
    }

    impl Recording {
        fn new(interval_ms: u64) -> Self {
            Self {
                samples: Vec::new(),
                interval_ms,
            }
        }

        fn hold(mut self, note: &str, count: usize) -> Self {
            let note = Note::parse(note).unwrap();
            for _ in 0..count {
                let ts = self.samples.len() as u64 * self.interval_ms;
                self.samples.push(PitchSample::from_note(note, 0.9, ts));
            }
            self
        }
    }

    fn at_150ms() -> Recording {
        Recording::new(150)
    }

    fn lowest(samples: &[PitchSample]) -> Option<VocalRangeResult> {
        analyze_vocal_range(samples, Extremum::Lowest, &RangeConfig::default())
    }

    fn highest(samples: &[PitchSample]) -> Option<VocalRangeResult> {
        analyze_vocal_range(samples, Extremum::Highest, &RangeConfig::default())
    }

    #[test]
    fn too_few_samples_is_inconclusive() {
        let rec = at_150ms().hold("E2", 9);
        assert!(lowest(&rec.samples).is_none());
    }

    #[test]
    fn long_hold_of_one_note() {
        let rec = at_150ms().hold("E2", 35);
        let result = lowest(&rec.samples).unwrap();
        assert_eq!(result.note, "E2");
        assert!((result.frequency - 82.41).abs() < 0.01, "got {}", result.frequency);
        assert!((result.confidence - 0.7).abs() < 1e-6);
        assert_eq!(result.sample_count, 35);
    }

    #[test]
    fn confidence_saturates() {
        let rec = at_150ms().hold("E2", 60);
        assert_eq!(lowest(&rec.samples).unwrap().confidence, 1.0);
    }

    #[test]
    fn two_bursts_of_one_note_combine() {
        let rec = at_150ms().hold("A2", 14).hold("C3", 3).hold("A2", 14);
        let result = lowest(&rec.samples).unwrap();
        assert_eq!(result.note, "A2");
        assert_eq!(result.sample_count, 28);
        // The short C3 run never qualifies, even for the highest note
        assert_eq!(highest(&rec.samples).unwrap().note, "A2");
    }

    #[test]
    fn two_different_notes_below_total_floor() {
        let rec = at_150ms().hold("A2", 20).hold("C3", 20);
        assert!(lowest(&rec.samples).is_none());
        assert!(highest(&rec.samples).is_none());
    }

    #[test]
    fn bursts_below_sustain_floor_never_count() {
        // 12 + 12 + 12 of A2 would be 36 in total, but no single run is held
        let rec = at_150ms()
            .hold("A2", 12)
            .hold("B2", 1)
            .hold("A2", 12)
            .hold("B2", 1)
            .hold("A2", 12);
        assert!(lowest(&rec.samples).is_none());
    }

    #[test]
    fn exact_thresholds() {
        // 13 + 14 = 27: both runs clear 13, total clears 27
        let rec = at_150ms().hold("D3", 13).hold("E3", 1).hold("D3", 14);
        assert_eq!(lowest(&rec.samples).unwrap().sample_count, 27);

        let rec = at_150ms().hold("D3", 26);
        assert!(lowest(&rec.samples).is_none());

        let rec = at_150ms().hold("D3", 27);
        assert!(lowest(&rec.samples).is_some());
    }

    #[test]
    fn picks_extremes_by_average_frequency() {
        let rec = at_150ms().hold("G4", 30).hold("E2", 30).hold("C3", 40);
        assert_eq!(lowest(&rec.samples).unwrap().note, "E2");
        assert_eq!(highest(&rec.samples).unwrap().note, "G4");
    }

    #[test]
    fn average_uses_every_reading() {
        let mut rec = at_150ms().hold("A3", 30);
        for (i, sample) in rec.samples.iter_mut().enumerate() {
            sample.frequency = if i % 2 == 0 { 218.0 } else { 222.0 };
        }
        let result = lowest(&rec.samples).unwrap();
        assert!((result.frequency - 220.0).abs() < 1e-3);
    }

    #[test]
    fn slower_source_uses_observed_cadence() {
        // 14 readings at 300 ms: 4.2 s of sustain
        let rec = Recording::new(300).hold("F2", 14);
        assert_eq!(observed_interval_ms(&rec.samples), Some(300.0));
        assert_eq!(lowest(&rec.samples).unwrap().note, "F2");

        let fixed = RangeConfig {
            derive_cadence_from_timestamps: false,
            ..RangeConfig::default()
        };
        assert!(analyze_vocal_range(&rec.samples, Extremum::Lowest, &fixed).is_none());
    }

    #[test]
    fn observed_interval_is_median_of_positive_gaps() {
        let mut rec = Recording::new(100).hold("F2", 6);
        // One late reading and a duplicate timestamp
        rec.samples[5].timestamp_ms = 900;
        rec.samples[2].timestamp_ms = rec.samples[1].timestamp_ms;
        // gaps: 100, 0, 200, 100, 500 → positive sorted: 100 100 200 500
        assert_eq!(observed_interval_ms(&rec.samples), Some(150.0));

        let rec = Recording::new(100).hold("F2", 2);
        assert_eq!(observed_interval_ms(&rec.samples), None);
    }

    #[test]
    fn groups_are_maximal_runs() {
        let rec = at_150ms().hold("C3", 2).hold("D3", 1).hold("C3", 3);
        let groups = consecutive_groups(&rec.samples);
        let shape: Vec<(&str, usize)> = groups.iter().map(|g| (g.key.as_str(), g.len())).collect();
        assert_eq!(shape, vec![("C3", 2), ("D3", 1), ("C3", 3)]);
    }

    #[test]
    fn same_class_different_octave_are_different_notes() {
        let rec = at_150ms().hold("C3", 15).hold("C4", 15);
        let merged = merge_sustained(consecutive_groups(&rec.samples), 13);
        assert_eq!(merged.len(), 2);
        assert!(lowest(&rec.samples).is_none());
    }
}
