//! Vocal range detection from pitch samples.
//!
//!   PitchSource → PitchSample[] → analyze_vocal_range (lowest / highest)
//!     → validate_range / classify_range

pub mod aggregator;
pub mod capture;
pub mod classify;
pub mod detect;
pub mod sample;
pub mod source;

use serde::Serialize;

use crate::config::RangeConfig;
use aggregator::analyze_vocal_range;
use classify::{classify_range, validate_range, RangeClassification};
use sample::{Extremum, PitchSample, VocalRangeResult};

/// Both ends of a detected range, with validation and voice type when both
/// ends were found.
#[derive(Debug, Clone, Serialize)]
pub struct RangeReport {
    pub samples: usize,
    pub lowest: Option<VocalRangeResult>,
    pub highest: Option<VocalRangeResult>,
    pub valid: bool,
    pub classification: Option<RangeClassification>,
}

/// Run the aggregator for both ends and classify the pair.
pub fn detect_range(samples: &[PitchSample], config: &RangeConfig) -> RangeReport {
    let lowest = analyze_vocal_range(samples, Extremum::Lowest, config);
    let highest = analyze_vocal_range(samples, Extremum::Highest, config);

    let (valid, classification) = match (&lowest, &highest) {
        (Some(low), Some(high)) => (
            validate_range(&low.note, &high.note),
            classify_range(&low.note, &high.note).ok(),
        ),
        _ => (false, None),
    };

    RangeReport {
        samples: samples.len(),
        lowest,
        highest,
        valid,
        classification,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use source::{PitchSource, SyntheticPitchSource};

    #[test]
    fn demo_report_is_valid() {
        let samples = SyntheticPitchSource::demo(150).unwrap().collect_samples().unwrap();
        let report = detect_range(&samples, &RangeConfig::default());

        assert!(report.valid);
        let classification = report.classification.unwrap();
        // A2 to E4
        assert_eq!(classification.semitones, 19);
        assert_eq!(classification.classification, "Bass");
    }

    #[test]
    fn one_sustained_note_is_not_a_range() {
        let samples = SyntheticPitchSource::new(150)
            .hold("D3", 6_000)
            .unwrap()
            .collect_samples()
            .unwrap();
        let report = detect_range(&samples, &RangeConfig::default());

        assert_eq!(report.lowest.as_ref().unwrap().note, "D3");
        assert_eq!(report.highest.as_ref().unwrap().note, "D3");
        assert!(!report.valid);
        assert_eq!(report.classification.unwrap().semitones, 0);
    }

    #[test]
    fn empty_recording_is_inconclusive() {
        let report = detect_range(&[], &RangeConfig::default());
        assert!(report.lowest.is_none());
        assert!(!report.valid);
        assert!(report.classification.is_none());
    }
}
