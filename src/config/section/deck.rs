//! `[deck]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [deck]
//! name = "Monuments"
//! description = "Monuments from OpenStreetMap"
//! model = "annotated"            # highlighted | annotated | basic
//! media_dir = "media"            # Map SVGs, relative to the working directory
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::card::ModelVariant;
use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
    pub name: String,
    pub description: String,
    pub model: ModelVariant,
    pub media_dir: PathBuf,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            name: "Monuments".into(),
            description: "Monuments from OpenStreetMap".into(),
            model: ModelVariant::default(),
            media_dir: PathBuf::from("media"),
        }
    }
}

impl DeckConfig {
    pub const NAME: FieldPath = FieldPath::new("deck.name");
    pub const MEDIA_DIR: FieldPath = FieldPath::new("deck.media_dir");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.name.trim().is_empty() {
            diag.error(Self::NAME, "must not be empty");
        }
        if self.model.needs_map() && self.media_dir.as_os_str().is_empty() {
            diag.error_with_hint(
                Self::MEDIA_DIR,
                format!("the {} model writes map files", self.model),
                "set media_dir, e.g. \"media\"",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_deck_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.deck.name, "Monuments");
        assert_eq!(config.deck.model, ModelVariant::Annotated);
        assert_eq!(config.deck.media_dir, PathBuf::from("media"));
    }

    #[test]
    fn test_deck_model() {
        let config = test_parse_config("[deck]\nmodel = \"highlighted\"\nname = \"Castles\"");
        assert_eq!(config.deck.model, ModelVariant::Highlighted);
        assert_eq!(config.deck.name, "Castles");

        let result: Result<crate::config::OsmfcConfig, _> =
            toml::from_str("[deck]\nmodel = \"fancy\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_deck_validate() {
        let config = test_parse_config("[deck]\nname = \" \"\nmedia_dir = \"\"");
        let mut diag = ConfigDiagnostics::new();
        config.deck.validate(&mut diag);
        assert_eq!(diag.len(), 2);

        let config = test_parse_config("[deck]\nmodel = \"basic\"\nmedia_dir = \"\"");
        let mut diag = ConfigDiagnostics::new();
        config.deck.validate(&mut diag);
        assert!(diag.is_empty());
    }
}
