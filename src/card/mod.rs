//! Card field construction.
//!
//! Each model variant has a fixed field layout; [`build_fields`] produces the
//! fields of one note in exactly that order. The deck model for a variant is
//! built from the same [`ModelVariant::field_names`], so the two cannot drift.
//!
//! | Variant       | Fields                                          |
//! |---------------|-------------------------------------------------|
//! | `highlighted` | FeatureName, GenericMap, HighlightedMap, URL    |
//! | `annotated`   | FeatureName, OsmId, URL                         |
//! | `basic`       | Front, Back, URL                                |

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::osm::{Feature, OsmId, normalize};
use crate::utils::html;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CardError {
    #[error("the {0} model needs map images for {1}")]
    MissingMapReference(ModelVariant, OsmId),

    #[error("{0} has no usable name")]
    Unnamed(OsmId),
}

/// Note layout, paired one-to-one with a deck model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelVariant {
    /// One generic and one highlighted SVG image per note
    Highlighted,
    /// A single annotated SVG map embedded in the card template
    #[default]
    Annotated,
    /// Text only: name and location
    Basic,
}

impl ModelVariant {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Highlighted => "highlighted",
            Self::Annotated => "annotated",
            Self::Basic => "basic",
        }
    }

    /// Field names, in note order.
    pub const fn field_names(self) -> &'static [&'static str] {
        match self {
            Self::Highlighted => &["FeatureName", "GenericMap", "HighlightedMap", "URL"],
            Self::Annotated => &["FeatureName", "OsmId", "URL"],
            Self::Basic => &["Front", "Back", "URL"],
        }
    }

    /// Whether notes reference rendered maps.
    pub const fn needs_map(self) -> bool {
        !matches!(self, Self::Basic)
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a note points at its map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapReference {
    /// Media file names inside the package.
    Images { generic: String, highlighted: String },
    /// Shape id inside the SVG embedded in the model.
    SvgId(String),
}

/// Ordered fields of one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardFields {
    pub variant: ModelVariant,
    pub values: Vec<String>,
}

impl CardFields {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Display name (always the first field).
    pub fn name(&self) -> &str {
        self.values.first().map_or("", String::as_str)
    }

    /// Escaped URL (always the last field).
    pub fn url(&self) -> &str {
        self.values.last().map_or("", String::as_str)
    }
}

/// Canonical URL of an element: `https://www.openstreetmap.org/way/1234`.
pub fn osm_url(base_url: &str, id: OsmId) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), id)
}

/// Build the fields of one note for `feature`.
///
/// Names and URLs are HTML-escaped. `map` is only read by the `highlighted`
/// variant; `annotated` derives the shape id from the feature itself.
pub fn build_fields(
    feature: &Feature,
    variant: ModelVariant,
    map: Option<&MapReference>,
    base_url: &str,
) -> Result<CardFields, CardError> {
    let name = feature.name().ok_or(CardError::Unnamed(feature.id))?;
    let name = html::escape(name).into_owned();
    let url = html::escape(&osm_url(base_url, feature.id)).into_owned();

    let values = match variant {
        ModelVariant::Highlighted => match map {
            Some(MapReference::Images {
                generic,
                highlighted,
            }) => vec![name, html::img(generic), html::img(highlighted), url],
            _ => return Err(CardError::MissingMapReference(variant, feature.id)),
        },
        ModelVariant::Annotated => {
            let shape_id = match map {
                Some(MapReference::SvgId(id)) => id.clone(),
                _ => normalize(feature.id),
            };
            vec![name, shape_id, url]
        }
        ModelVariant::Basic => vec![name, location_text(feature), url],
    };

    Ok(CardFields { variant, values })
}

/// `way 1234 (48.58240, 7.75010)`
fn location_text(feature: &Feature) -> String {
    let kind = feature.id.kind;
    match feature.geometry.centroid() {
        Some(c) => format!("{} {} ({:.5}, {:.5})", kind, feature.id.id, c.lat, c.lon),
        None => format!("{} {}", kind, feature.id.id),
    }
}
