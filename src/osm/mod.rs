//! OpenStreetMap data access.
//!
//! # Module Structure
//!
//! ```text
//! osm/
//! ├── types      # OsmId, Feature, Geometry, FeatureTable
//! ├── xml        # Streaming OSM XML reader (node/way/relation callbacks)
//! ├── overpass   # Nominatim geocoding + Overpass API fetch
//! ├── source     # OsmSource trait, file/query sources
//! └── error      # OsmError
//! ```
//!
//! Every source produces the same [`FeatureTable`]; nothing downstream knows
//! whether the data came from a local extract or a live query.

mod error;
pub mod overpass;
mod source;
mod types;
pub mod xml;

pub use error::OsmError;
pub use source::{SourceKind, open_source};
pub use types::{Bounds, Coord, Feature, FeatureTable, Geometry, OsmId, is_closed, normalize};

#[cfg(test)]
pub use types::Tags;
