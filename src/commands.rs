use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use rangefinder::config::AppConfig;
use rangefinder::music::note::{Note, VocalRange};
use rangefinder::paths;
use rangefinder::range::classify::{classify_range, validate_range};
use rangefinder::range::source::{MicPitchSource, PitchSource, SyntheticPitchSource, WavPitchSource};
use rangefinder::range::{detect_range, RangeReport};
use rangefinder::search::cache::SearchCache;
use rangefinder::search::simple::search_songs_by_query;
use rangefinder::search::{SearchEngine, SearchFilter, SearchOutcome, SearchResults};
use rangefinder::storage::db::SqliteSongStore;
use rangefinder::storage::song_data::{songs_in_range, SongImport};
use rangefinder::storage::store::SongStore;

fn open_store() -> Result<SqliteSongStore> {
    SqliteSongStore::open(&paths::db_path())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

pub fn search(config: &AppConfig, query: &str, artists: bool, json: bool) -> Result<()> {
    let store: Arc<dyn SongStore> = Arc::new(open_store()?);
    let cache = Arc::new(SearchCache::new(config.search.cache_capacity));
    let engine = SearchEngine::new(store, config.search.clone()).with_cache(cache);
    let filter = if artists {
        SearchFilter::Artists
    } else {
        SearchFilter::Songs
    };

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    let results = match rt.block_on(engine.search(query, filter))? {
        SearchOutcome::Fresh(results) => results,
        // Only one search runs per invocation
        SearchOutcome::Stale => return Ok(()),
    };

    if json {
        return print_json(&results);
    }

    if results.is_empty() {
        println!("No matches for {}.", style(query).cyan());
        return Ok(());
    }

    match results {
        SearchResults::Songs(songs) => {
            for hit in songs {
                println!(
                    "  {:>6}  {} {} {}  {}  {}",
                    style(hit.score).bold(),
                    style(&hit.song.name).green(),
                    style("by").dim(),
                    hit.song.artist,
                    style(&hit.song.vocal_range).cyan(),
                    style(format!("[{}]", hit.strategy)).dim(),
                );
            }
        }
        SearchResults::Artists(artists) => {
            for artist in artists {
                println!(
                    "  {}  {}",
                    style(&artist.name).green().bold(),
                    style(format!("{} songs", artist.song_count)).dim()
                );
                for song in &artist.songs {
                    println!("      {}  {}", song.name, style(&song.vocal_range).cyan());
                }
            }
        }
    }

    Ok(())
}

pub fn simple_search(query: &str, json: bool) -> Result<()> {
    let store = open_store()?;
    let matches = search_songs_by_query(&store, query)?;

    if json {
        return print_json(&matches);
    }

    if matches.is_empty() {
        println!("No matches for {}.", style(query).cyan());
    }
    for hit in matches {
        println!(
            "  {:>3}  {} {} {}  {}",
            style(hit.score).bold(),
            style(&hit.song.name).green(),
            style("by").dim(),
            hit.song.artist,
            style(&hit.song.vocal_range).cyan(),
        );
    }
    Ok(())
}

pub fn import(file: &Path) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let songs: Vec<SongImport> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse songs from {}", file.display()))?;

    let unparsable = songs
        .iter()
        .filter(|s| VocalRange::parse(&s.vocal_range).is_err())
        .count();

    let store = open_store()?;

    let pb = ProgressBar::new(songs.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "  Importing {bar:30.green/dim} {pos}/{len}",
    )?);
    let written = store.import(&songs, |n| pb.set_position(n as u64))?;
    pb.finish_and_clear();

    println!(
        "Imported {} songs into {}",
        style(written).bold(),
        style(paths::db_path().display()).green()
    );
    if unparsable > 0 {
        println!(
            "  {} {unparsable} songs have no usable vocal range and won't appear in range lists.",
            style("NOTE").yellow().bold()
        );
    }
    Ok(())
}

pub fn detect_wav(config: &AppConfig, wav: &Path, json: bool) -> Result<()> {
    let mut source = WavPitchSource::new(
        wav,
        config.range.sampling_interval_ms,
        config.pitch.clone(),
    );
    let samples = source.collect_samples()?;
    print_report(&detect_range(&samples, &config.range), json)
}

pub fn listen(config: &AppConfig, seconds: u64, json: bool) -> Result<()> {
    let duration = Duration::from_secs(seconds.max(1));

    println!(
        "Sing your {} note and your {} note, holding each for a few seconds.",
        style("lowest").cyan().bold(),
        style("highest").cyan().bold()
    );

    let pb = ProgressBar::new(duration.as_millis() as u64 / 100);
    pb.set_style(ProgressStyle::with_template(
        "  Listening {bar:30.green/dim} {elapsed_precise}",
    )?);
    let ticker = pb.clone();

    let mut source = MicPitchSource::new(
        duration,
        config.range.sampling_interval_ms,
        config.pitch.clone(),
    )
    .with_progress(move |elapsed| ticker.set_position(elapsed.as_millis() as u64 / 100));

    let samples = source.collect_samples()?;
    pb.finish_and_clear();

    print_report(&detect_range(&samples, &config.range), json)
}

pub fn demo(config: &AppConfig, json: bool) -> Result<()> {
    let interval_ms = config.range.sampling_interval_ms.round().max(1.0) as u64;
    let samples = SyntheticPitchSource::demo(interval_ms)?.collect_samples()?;
    print_report(&detect_range(&samples, &config.range), json)
}

fn print_report(report: &RangeReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }

    println!("  {:<9} {}", style("Samples:").bold(), report.samples);

    let (Some(low), Some(high)) = (&report.lowest, &report.highest) else {
        println!(
            "  {} Not enough sustained singing to find a range. Try again, holding each note for at least two seconds.",
            style("INCONCLUSIVE").yellow().bold()
        );
        return Ok(());
    };

    for (label, end) in [("Lowest:", low), ("Highest:", high)] {
        println!(
            "  {:<9} {} ({:.1} Hz, confidence {:.0}%)",
            style(label).bold(),
            style(&end.note).cyan(),
            end.frequency,
            end.confidence * 100.0
        );
    }

    if let Some(classification) = &report.classification {
        println!(
            "  {:<9} {} - {}, {}",
            style("Range:").bold(),
            low.note,
            high.note,
            classification.range_description
        );
        println!(
            "  {:<9} {}",
            style("Voice:").bold(),
            style(classification.classification).green().bold()
        );
    }

    if !report.valid {
        println!(
            "  {} A range should span one to five octaves. Try recording again.",
            style("WARNING").red().bold()
        );
    }
    Ok(())
}

pub fn classify(low: &str, high: &str) -> Result<()> {
    let classification = classify_range(low, high)
        .with_context(|| format!("Cannot classify {low} - {high}"))?;

    let verdict = if validate_range(low, high) {
        style("plausible").green()
    } else {
        style("implausible").red()
    };

    println!("  {:<9} {low} - {high} ({verdict})", style("Range:").bold());
    println!(
        "  {:<9} {} semitones, {}",
        style("Span:").bold(),
        classification.semitones,
        classification.range_description
    );
    println!(
        "  {:<9} {}",
        style("Voice:").bold(),
        style(classification.classification).green().bold()
    );
    Ok(())
}

pub fn songs_for(low: &str, high: &str) -> Result<()> {
    let low = Note::parse(low).with_context(|| format!("Bad low note: {low}"))?;
    let high = Note::parse(high).with_context(|| format!("Bad high note: {high}"))?;
    if low > high {
        anyhow::bail!("Low note {low} is above high note {high}");
    }
    let singer = VocalRange { low, high };

    let songs = open_store()?.list()?;
    let fitting = songs_in_range(&songs, &singer);

    if fitting.is_empty() {
        println!("No catalogued songs fit inside {}.", style(singer).cyan());
        return Ok(());
    }

    println!("Songs inside {}:", style(singer).cyan().bold());
    for song in fitting {
        println!(
            "  {} {} {}  {}",
            style(&song.name).green(),
            style("by").dim(),
            song.artist,
            style(&song.vocal_range).cyan()
        );
    }
    Ok(())
}

pub fn paths() {
    println!("  {:<8} {}", style("Config:").bold(), paths::config_file().display());
    println!("  {:<8} {}", style("Songs:").bold(), paths::db_path().display());
}
