use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Chromatic pitch class names, indexed by their offset from C.
/// Only sharps are spelled; flats and E#/B# are not part of the note grammar.
pub const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const SEMITONES_PER_OCTAVE: i32 = 12;
const A4_HZ: f32 = 440.0;
const A4_VALUE: i32 = 69;

static NOTE_PATTERN: OnceLock<Regex> = OnceLock::new();

fn note_pattern() -> &'static Regex {
    NOTE_PATTERN.get_or_init(|| Regex::new(r"^([A-G]#?)(\d+)$").unwrap())
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NoteError {
    /// The string does not match `<Letter>[#]<octave>`, or names a pitch
    /// class outside the sharp-only chromatic table (E#, B#).
    #[error("malformed note: {0:?}")]
    Malformed(String),

    /// A vocal range string that is not `<LowNote> - <HighNote>`.
    #[error("malformed vocal range: {0:?}")]
    MalformedRange(String),
}

/// A musical pitch: pitch class plus octave, e.g. `C#4`.
///
/// Notes order by their semitone value, so `C0 < C#0 < D0 < ... < C8`.
/// The value uses the MIDI numbering: C4 = 60, A4 = 69.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    class: u8,
    octave: u8,
}

impl Note {
    /// Parse a note string. Anything outside `^[A-G]#?\d+$` is rejected,
    /// as are octaves too large to fit a `u8`.
    pub fn parse(s: &str) -> Result<Self, NoteError> {
        let caps = note_pattern()
            .captures(s)
            .ok_or_else(|| NoteError::Malformed(s.to_string()))?;

        let class = PITCH_CLASSES
            .iter()
            .position(|&name| name == &caps[1])
            .ok_or_else(|| NoteError::Malformed(s.to_string()))?;

        let octave: u8 = caps[2]
            .parse()
            .map_err(|_| NoteError::Malformed(s.to_string()))?;

        Ok(Self {
            class: class as u8,
            octave,
        })
    }

    /// Build a note from a semitone value. Negative values have no
    /// representation in the grammar (octave would be -1) and yield None.
    pub fn from_value(value: i32) -> Option<Self> {
        if value < SEMITONES_PER_OCTAVE {
            return None;
        }
        Some(Self {
            class: (value % SEMITONES_PER_OCTAVE) as u8,
            octave: u8::try_from(value / SEMITONES_PER_OCTAVE - 1).ok()?,
        })
    }

    /// Semitone value: `pitch_class_offset + (octave + 1) * 12`.
    pub fn value(&self) -> i32 {
        self.class as i32 + (self.octave as i32 + 1) * SEMITONES_PER_OCTAVE
    }

    pub fn pitch_class(&self) -> &'static str {
        PITCH_CLASSES[self.class as usize]
    }

    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Equal-tempered frequency with A4 = 440 Hz.
    pub fn frequency(&self) -> f32 {
        A4_HZ * 2.0_f32.powf((self.value() - A4_VALUE) as f32 / SEMITONES_PER_OCTAVE as f32)
    }

    /// Nearest note to a frequency, with the deviation in cents (-50..50).
    /// Returns None for non-positive, non-finite or sub-C0 frequencies.
    pub fn from_frequency(hz: f32) -> Option<(Self, f32)> {
        if hz <= 0.0 || !hz.is_finite() {
            return None;
        }
        let exact = A4_VALUE as f32 + SEMITONES_PER_OCTAVE as f32 * (hz / A4_HZ).log2();
        let nearest = exact.round();
        let cents = (exact - nearest) * 100.0;
        Self::from_value(nearest as i32).map(|note| (note, cents))
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave)
    }
}

impl PartialOrd for Note {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Note {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value().cmp(&other.value())
    }
}

/// Convert a note string to its semitone value.
///
/// A malformed note is logged and returned as `Err`: callers must not
/// compare or subtract values without handling it.
pub fn note_to_value(note: &str) -> Result<i32, NoteError> {
    Note::parse(note).map(|n| n.value()).map_err(|err| {
        tracing::warn!(note, "rejecting malformed note");
        err
    })
}

/// Convert a semitone value back to its canonical note string.
pub fn value_to_note(value: i32) -> Option<String> {
    Note::from_value(value).map(|n| n.to_string())
}

/// Frequency in Hz of a note string.
pub fn note_to_frequency(note: &str) -> Result<f32, NoteError> {
    Note::parse(note).map(|n| n.frequency())
}

/// A song's singable range, stored as `"<LowNote> - <HighNote>"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocalRange {
    pub low: Note,
    pub high: Note,
}

impl VocalRange {
    pub fn parse(s: &str) -> Result<Self, NoteError> {
        let (low, high) = s
            .split_once('-')
            .ok_or_else(|| NoteError::MalformedRange(s.to_string()))?;

        let low = Note::parse(low.trim())?;
        let high = Note::parse(high.trim())?;

        if low > high {
            return Err(NoteError::MalformedRange(s.to_string()));
        }

        Ok(Self { low, high })
    }

    /// True when this range sits entirely inside `outer`.
    pub fn fits_within(&self, outer: &VocalRange) -> bool {
        self.low >= outer.low && self.high <= outer.high
    }

    pub fn semitones(&self) -> i32 {
        self.high.value() - self.low.value()
    }
}

impl fmt::Display for VocalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.low, self.high)
    }
}
