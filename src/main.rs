//! osmfc - Anki flashcards from OpenStreetMap features.

mod card;
mod cli;
mod config;
mod deck;
mod filter;
mod ident;
mod logger;
mod map;
mod osm;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, build::build_deck};
use config::OsmfcConfig;
use logger::Level;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_level(Level::from_verbosity(cli.verbose));

    let config = OsmfcConfig::load(&cli)?;
    build_deck(&config)?;
    Ok(())
}
