use serde::{Deserialize, Serialize};

use crate::music::note::Note;

/// One labelled pitch reading from a pitch source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchSample {
    /// Detected fundamental in Hz.
    pub frequency: f32,
    /// Pitch class, e.g. "C#".
    pub note: String,
    pub octave: i32,
    /// Producer-supplied confidence in 0.0..=1.0.
    pub confidence: f32,
    /// Milliseconds since the start of the recording. Non-decreasing.
    pub timestamp_ms: u64,
}

impl PitchSample {
    /// A sample labelled with the given note at its equal-tempered frequency.
    pub fn from_note(note: Note, confidence: f32, timestamp_ms: u64) -> Self {
        Self {
            frequency: note.frequency(),
            note: note.pitch_class().to_string(),
            octave: note.octave() as i32,
            confidence,
            timestamp_ms,
        }
    }

    /// Label a raw frequency with its nearest note. None when the frequency
    /// has no note in the grammar (non-positive, or below C0).
    pub fn from_frequency(frequency: f32, confidence: f32, timestamp_ms: u64) -> Option<Self> {
        let (note, _cents) = Note::from_frequency(frequency)?;
        Some(Self {
            frequency,
            note: note.pitch_class().to_string(),
            octave: note.octave() as i32,
            confidence,
            timestamp_ms,
        })
    }

    /// Note and octave together, e.g. "C#4". Samples with equal keys are the
    /// same note.
    pub fn key(&self) -> String {
        format!("{}{}", self.note, self.octave)
    }
}

/// Which end of the range to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Extremum {
    Lowest,
    Highest,
}

/// The note picked as the lowest or highest sustained note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VocalRangeResult {
    pub note: String,
    /// Mean of every sustained reading of the note.
    pub frequency: f32,
    pub confidence: f32,
    /// Samples that counted towards the note.
    pub sample_count: usize,
}

/// A maximal run of adjacent samples with the same note.
#[derive(Debug, Clone)]
pub struct ConsecutiveGroup {
    pub key: String,
    pub frequencies: Vec<f32>,
}

impl ConsecutiveGroup {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

/// Every sustained run of one note across a recording, merged.
#[derive(Debug, Clone)]
pub struct NoteOccurrence {
    pub key: String,
    pub total_count: usize,
    pub frequencies: Vec<f32>,
}

impl NoteOccurrence {
    pub fn average_frequency(&self) -> f32 {
        if self.frequencies.is_empty() {
            return 0.0;
        }
        self.frequencies.iter().sum::<f32>() / self.frequencies.len() as f32
    }
}
