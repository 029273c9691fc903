use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rangefinder")]
#[command(about = "Find songs that fit your voice")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fuzzy search the song catalogue by title and/or artist
    Search {
        /// Free text, e.g. "rhapsody queen"
        query: String,

        /// Group matches by artist
        #[arg(long, conflicts_with = "simple")]
        artists: bool,

        /// Plain substring search with no relevance cutoff
        #[arg(long)]
        simple: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Import songs from a JSON array of {id?, name, artist, vocalRange}
    Import {
        file: PathBuf,
    },

    /// Detect the vocal range sung in a WAV file
    Detect {
        wav: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record from the microphone and detect the vocal range
    Listen {
        /// Recording length
        #[arg(long, default_value_t = 20)]
        seconds: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run range detection on a built-in synthetic warm-up
    Demo {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate and classify a low/high note pair, e.g. `classify A2 E4`
    Classify {
        low: String,
        high: String,
    },

    /// List catalogue songs whose range fits inside LOW - HIGH
    SongsFor {
        low: String,
        high: String,
    },

    /// Show config and data locations
    Paths,
}
