//! Configuration management for `osmfc.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── osm        # [osm]
//! │   ├── filter     # [filter]
//! │   ├── deck       # [deck]
//! │   └── map        # [map]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   └── field      # FieldPath
//! └── mod.rs         # OsmfcConfig (this file)
//! ```
//!
//! The config file is optional: without one every section uses its defaults.
//! Command-line flags override file values.
//!
//! # Sections
//!
//! | Section    | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `[osm]`    | OSM/Nominatim/Overpass endpoints, HTTP timeout  |
//! | `[filter]` | Required tags (`--tag`)                         |
//! | `[deck]`   | Deck name (`--deck-name`), model (`--model`)    |
//! | `[map]`    | Canvas, highlight colour, background layers     |

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{DeckConfig, FilterConfig, MapConfig, OsmConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath};

use crate::cli::Cli;
use crate::filter::Filter;
use crate::osm::SourceKind;
use crate::{debug, log, warn};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Default config file name, searched upward from the working directory.
pub const CONFIG_FILE: &str = "osmfc.toml";

// ============================================================================
// root configuration
// ============================================================================

/// What to build in this run (command line only).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Place query or OSM XML path.
    pub source: String,
    pub source_kind: SourceKind,
    /// Package path.
    pub output: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            source_kind: SourceKind::Auto,
            output: PathBuf::from("output.apkg"),
        }
    }
}

/// Root configuration structure representing osmfc.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OsmfcConfig {
    /// Path of the loaded config file, if any (internal use only)
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Command-line inputs (internal use only)
    #[serde(skip)]
    pub run: RunConfig,

    /// OSM endpoints and HTTP settings
    #[serde(default)]
    pub osm: OsmConfig,

    /// Feature selection
    #[serde(default)]
    pub filter: FilterConfig,

    /// Deck and note model
    #[serde(default)]
    pub deck: DeckConfig,

    /// Map rendering
    #[serde(default)]
    pub map: MapConfig,
}

impl OsmfcConfig {
    /// Load configuration for a parsed command line.
    ///
    /// An explicit `--config` must exist; otherwise `osmfc.toml` is searched
    /// upward from cwd and defaults are used when there is none.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => Some(path.clone()),
            None => find_config_file(Path::new(CONFIG_FILE)),
        };

        let mut config = match &config_path {
            Some(path) => {
                log!("config"; "using {}", path.display());
                Self::from_path(path)?
            }
            None => {
                debug!("config"; "no {} found, using defaults", CONFIG_FILE);
                Self::default()
            }
        };

        config.config_path = config_path;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path, warning about unknown fields.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        warn!("unknown fields in {}, ignoring:", display_path);
        for field in fields {
            warn!("- {}", field);
        }
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-line values on top of the file configuration.
    pub fn apply_cli(&mut self, cli: &Cli) {
        self.run = RunConfig {
            source: cli.source.clone(),
            source_kind: cli.source_kind,
            output: cli.output.clone(),
        };

        if !cli.tags.is_empty() {
            self.filter.tags = cli.tags.clone();
        }
        Self::update_option(&mut self.deck.model, cli.model.as_ref());
        Self::update_option(&mut self.deck.name, cli.deck_name.as_ref());
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // accessors
    // ========================================================================

    /// The feature filter (validated at load).
    pub fn filter(&self) -> Result<Filter> {
        Ok(self.filter.filter()?)
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate every section, reporting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        if self.run.source.trim().is_empty() {
            diag.error(FieldPath::new("SOURCE"), "place query or file path is empty");
        }

        self.osm.validate(&mut diag);
        self.filter.validate(&mut diag);
        self.deck.validate(&mut diag);
        self.map.validate(&mut diag);

        diag.print_warnings();
        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config from TOML.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> OsmfcConfig {
    let (parsed, ignored) = OsmfcConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
