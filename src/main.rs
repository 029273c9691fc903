mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("rangefinder=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = rangefinder::config::load_config()?;

    match cli.command {
        Command::Search {
            query,
            artists,
            simple,
            json,
        } => {
            if simple {
                commands::simple_search(&query, json)
            } else {
                commands::search(&config, &query, artists, json)
            }
        }

        Command::Import { file } => commands::import(&file),

        Command::Detect { wav, json } => commands::detect_wav(&config, &wav, json),

        Command::Listen { seconds, json } => commands::listen(&config, seconds, json),

        Command::Demo { json } => commands::demo(&config, json),

        Command::Classify { low, high } => commands::classify(&low, &high),

        Command::SongsFor { low, high } => commands::songs_for(&low, &high),

        Command::Paths => {
            commands::paths();
            Ok(())
        }
    }
}
