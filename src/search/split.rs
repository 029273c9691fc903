use serde::Serialize;

/// Which side of the boundary is read as the song title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// "rhapsody queen": title words, then artist words
    TitleFirst,
    /// "queen rhapsody": artist words, then title words
    ArtistFirst,
}

/// One guess at how a multi-word query divides into title and artist.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitGuess {
    pub title: String,
    pub artist: String,
    pub orientation: Orientation,
    /// Plausibility of this division, 0..1.
    pub confidence: f32,
}

pub const MIN_SPLIT_TOKENS: usize = 2;
pub const MAX_SPLIT_TOKENS: usize = 5;

const ARTIST_FIRST_PENALTY: f32 = 0.9;

/// Plausibility of a split with `title_words` title tokens and
/// `artist_words` artist tokens.
///
/// Artist names tend to be short and titles long, so confidence grows with
/// the title's share of the query and shrinks with every extra artist word.
fn split_confidence(title_words: usize, artist_words: usize, orientation: Orientation) -> f32 {
    let total = (title_words + artist_words) as f32;
    let title_share = title_words as f32 / total;
    let confidence = (0.4 + 0.4 * title_share + 0.2 / artist_words as f32).min(1.0);

    match orientation {
        Orientation::TitleFirst => confidence,
        Orientation::ArtistFirst => confidence * ARTIST_FIRST_PENALTY,
    }
}

/// Every title/artist division of `tokens` in both orientations, most
/// plausible first, truncated to `max_guesses`.
///
/// Queries outside 2..=5 tokens produce no guesses.
pub fn split_guesses(tokens: &[String], max_guesses: usize) -> Vec<SplitGuess> {
    if tokens.len() < MIN_SPLIT_TOKENS || tokens.len() > MAX_SPLIT_TOKENS {
        return Vec::new();
    }

    let mut guesses = Vec::with_capacity((tokens.len() - 1) * 2);

    for boundary in 1..tokens.len() {
        let head = tokens[..boundary].join(" ");
        let tail = tokens[boundary..].join(" ");
        let head_words = boundary;
        let tail_words = tokens.len() - boundary;

        guesses.push(SplitGuess {
            title: head.clone(),
            artist: tail.clone(),
            orientation: Orientation::TitleFirst,
            confidence: split_confidence(head_words, tail_words, Orientation::TitleFirst),
        });
        guesses.push(SplitGuess {
            title: tail,
            artist: head,
            orientation: Orientation::ArtistFirst,
            confidence: split_confidence(tail_words, head_words, Orientation::ArtistFirst),
        });
    }

    // Stable sort keeps boundary order among equal confidences.
    guesses.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    guesses.truncate(max_guesses);
    guesses
}
