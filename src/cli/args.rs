//! Command-line interface definitions.

use clap::{ArgAction, ColorChoice, Parser};
use std::path::PathBuf;

use crate::card::ModelVariant;
use crate::osm::SourceKind;

/// Build Anki flashcards from OpenStreetMap features
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Place to query (e.g. "Strasbourg, grande ile") or path to an OSM XML extract
    #[arg(value_name = "SOURCE")]
    pub source: String,

    /// Package path
    #[arg(short, long, default_value = "output.apkg", value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Increase verbosity (-v: progress, -vv: debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// How to read SOURCE
    #[arg(short = 's', long = "source", value_enum, default_value_t = SourceKind::Auto)]
    pub source_kind: SourceKind,

    /// Required tag, repeatable (replaces [filter] tags)
    #[arg(short = 't', long = "tag", value_name = "KEY=VALUE")]
    pub tags: Vec<String>,

    /// Note model
    #[arg(short, long, value_enum)]
    pub model: Option<ModelVariant>,

    /// Deck name
    #[arg(short = 'n', long)]
    pub deck_name: Option<String>,

    /// Config file path (default: osmfc.toml, searched upward)
    #[arg(short = 'C', long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,
}
