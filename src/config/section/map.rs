//! `[map]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [map]
//! width = 1200                   # Canvas size in SVG units
//! height = 1200
//! margin = 24                    # Blank border on every side
//! highlight = "#ff0000"          # Fill/stroke of selected features
//! layers = ["building", "highway", "waterway", "natural=water"]
//! ```
//!
//! A layer is a tag key (`building`) or a key/value pair (`natural=water`).
//! Query sources also fetch these ways so the map has context.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::osm::overpass::Layer;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub highlight: String,
    pub layers: Vec<String>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 1200,
            margin: 24,
            highlight: "#ff0000".into(),
            layers: ["building", "highway", "waterway", "natural=water"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl MapConfig {
    pub const WIDTH: FieldPath = FieldPath::new("map.width");
    pub const HEIGHT: FieldPath = FieldPath::new("map.height");
    pub const MARGIN: FieldPath = FieldPath::new("map.margin");
    pub const HIGHLIGHT: FieldPath = FieldPath::new("map.highlight");
    pub const LAYERS: FieldPath = FieldPath::new("map.layers");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.width == 0 {
            diag.error(Self::WIDTH, "must be greater than 0");
        }
        if self.height == 0 {
            diag.error(Self::HEIGHT, "must be greater than 0");
        }
        if self.width > 0
            && self.height > 0
            && u64::from(self.margin) * 2 >= u64::from(self.width.min(self.height))
        {
            diag.error(Self::MARGIN, "leaves no room to draw");
        }
        if self.highlight.trim().is_empty() {
            diag.error_with_hint(Self::HIGHLIGHT, "must not be empty", "e.g. \"#ff0000\"");
        }
        for layer in &self.layers {
            if let Err(e) = layer.parse::<Layer>() {
                diag.error_with_hint(Self::LAYERS, e, "use `key` or `key=value`");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};
    use crate::map::SvgRenderer;

    #[test]
    fn test_map_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.map.width, 1200);
        assert_eq!(config.map.height, 1200);
        assert_eq!(SvgRenderer::from_config(&config.map).unwrap().layers().len(), 4);
    }

    #[test]
    fn test_map_validate() {
        let config = test_parse_config("[map]\nwidth = 0\nlayers = [\"=x\", \"building\"]");
        let mut diag = ConfigDiagnostics::new();
        config.map.validate(&mut diag);
        assert_eq!(diag.len(), 2);
        assert!(SvgRenderer::from_config(&config.map).is_err());
    }

    #[test]
    fn test_map_margin_too_large() {
        let config = test_parse_config("[map]\nwidth = 100\nheight = 40\nmargin = 20");
        let mut diag = ConfigDiagnostics::new();
        config.map.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field.as_str(), "map.margin");
    }
}
