use serde::Serialize;

use crate::music::note::{note_to_value, Note, NoteError};

/// Narrowest plausible detected range: one octave.
pub const MIN_RANGE_SEMITONES: i32 = 12;
/// Widest plausible detected range: five octaves.
pub const MAX_RANGE_SEMITONES: i32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeClassification {
    pub semitones: i32,
    pub octaves: i32,
    pub remaining_semitones: i32,
    pub classification: &'static str,
    pub range_description: String,
}

/// Whether a detected low/high pair spans between one and five octaves.
/// Malformed notes are logged and treated as invalid.
pub fn validate_range(low: &str, high: &str) -> bool {
    match (note_to_value(low), note_to_value(high)) {
        (Ok(low), Ok(high)) => {
            let span = high - low;
            (MIN_RANGE_SEMITONES..=MAX_RANGE_SEMITONES).contains(&span)
        }
        _ => false,
    }
}

/// Span and voice-type label for a low/high pair.
pub fn classify_range(low: &str, high: &str) -> Result<RangeClassification, NoteError> {
    let (low, high) = match (Note::parse(low), Note::parse(high)) {
        (Ok(low), Ok(high)) => (low, high),
        (Err(err), _) | (_, Err(err)) => {
            tracing::warn!(low, high, "cannot classify range: {err}");
            return Err(err);
        }
    };

    let semitones = high.value() - low.value();
    let octaves = semitones.div_euclid(12);
    let remaining_semitones = semitones.rem_euclid(12);

    Ok(RangeClassification {
        semitones,
        octaves,
        remaining_semitones,
        classification: voice_type(low.octave(), high.octave()),
        range_description: describe_span(octaves, remaining_semitones),
    })
}

/// Heuristic voice type from the octaves of the range ends.
/// Arms are checked in order; the first match wins.
pub fn voice_type(low: u8, high: u8) -> &'static str {
    match (low, high) {
        (0..=1, _) => "Bass/Low Voice",
        (2, 0..=4) => "Bass",
        (2, 5) => "Baritone",
        (2, _) => "Baritone/Tenor",
        (3, 0..=4) => "Baritone",
        (3, 5) => "Tenor",
        (3, _) => "Countertenor/Alto",
        // Only reachable with low = 4; low = 3 is taken by the arm above.
        (3..=4, 6) => "Mezzo-Soprano",
        (4, 0..=5) => "Alto",
        (4, _) => "Soprano",
        (5.., 6..) => "Soprano/High Voice",
        _ => "Unknown",
    }
}

fn describe_span(octaves: i32, semitones: i32) -> String {
    let mut text = format!("{octaves} {}", plural(octaves, "octave"));
    if semitones > 0 {
        text.push_str(&format!(" and {semitones} {}", plural(semitones, "semitone")));
    }
    text
}

fn plural(n: i32, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
