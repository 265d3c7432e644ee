//! OSM data sources.
//!
//! | Source        | Input                       | Fingerprint     |
//! |---------------|-----------------------------|-----------------|
//! | `FileSource`  | OSM XML extract on disk     | the path as given |
//! | `QuerySource` | place name (Nominatim)      | the query text  |
//!
//! The fingerprint is what deck identifiers are derived from, so re-running
//! the same input produces the same deck.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::overpass::{Layer, OverpassClient, build_query};
use super::types::FeatureTable;
use super::{OsmError, xml};
use crate::config::OsmConfig;
use crate::filter::Filter;
use crate::log;

/// Where OSM data comes from.
pub trait OsmSource {
    /// Text identifying the input across runs.
    fn fingerprint(&self) -> &str;

    /// Fetch/parse the features.
    fn load(&self) -> Result<FeatureTable, OsmError>;
}

/// How to interpret the positional `SOURCE` argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// An existing path is a file, anything else a query
    #[default]
    Auto,
    /// Local OSM XML extract
    File,
    /// Place name resolved online
    Query,
}

impl SourceKind {
    /// Resolve `Auto` against the filesystem.
    pub fn resolve(self, input: &str) -> Self {
        match self {
            Self::Auto if Path::new(input).is_file() => Self::File,
            Self::Auto => Self::Query,
            other => other,
        }
    }
}

// ============================================================================
// File source
// ============================================================================

/// A local OSM XML extract.
pub struct FileSource {
    path: PathBuf,
    label: String,
}

impl FileSource {
    pub fn new(input: &str) -> Self {
        Self {
            path: PathBuf::from(input),
            label: input.to_string(),
        }
    }
}

impl OsmSource for FileSource {
    fn fingerprint(&self) -> &str {
        &self.label
    }

    fn load(&self) -> Result<FeatureTable, OsmError> {
        log!("osm"; "reading {}", self.path.display());
        xml::parse_file(&self.path)
    }
}

// ============================================================================
// Query source
// ============================================================================

/// A place name fetched from Nominatim + Overpass.
pub struct QuerySource {
    query: String,
    client: OverpassClient,
    filter: Filter,
    layers: Vec<Layer>,
}

impl QuerySource {
    pub fn new(query: &str, config: &OsmConfig, filter: &Filter, layers: &[Layer]) -> Self {
        Self {
            query: query.to_string(),
            client: OverpassClient::new(config),
            filter: filter.clone(),
            layers: layers.to_vec(),
        }
    }
}

impl OsmSource for QuerySource {
    fn fingerprint(&self) -> &str {
        &self.query
    }

    fn load(&self) -> Result<FeatureTable, OsmError> {
        let place = self.client.geocode(&self.query)?;
        let ql = build_query(&place, &self.filter, &self.layers, self.client.timeout);

        log!("query"; "fetching features from overpass");
        let xml = self.client.fetch(&ql)?;

        let mut table = xml::parse_str(&xml)?;
        table.perimeter = Some(place.id);
        if table.bounds.is_none() {
            table.bounds = place.bounds;
        }
        Ok(table)
    }
}

/// Build the source for `input`.
pub fn open_source(
    input: &str,
    kind: SourceKind,
    config: &OsmConfig,
    filter: &Filter,
    layers: &[Layer],
) -> Box<dyn OsmSource> {
    match kind.resolve(input) {
        SourceKind::File => Box::new(FileSource::new(input)),
        SourceKind::Query | SourceKind::Auto => {
            Box::new(QuerySource::new(input, config, filter, layers))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_source_kind_resolve() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.osm");
        fs::write(&path, "<osm/>").unwrap();
        let path = path.to_string_lossy();

        assert_eq!(SourceKind::Auto.resolve(&path), SourceKind::File);
        assert_eq!(
            SourceKind::Auto.resolve("Strasbourg, grande ile"),
            SourceKind::Query
        );
        assert_eq!(SourceKind::Query.resolve(&path), SourceKind::Query);
        assert_eq!(SourceKind::File.resolve("missing.osm"), SourceKind::File);
    }

    #[test]
    fn test_file_source_fingerprint_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extract.osm");
        fs::write(
            &path,
            r#"<osm><node id="1" lat="1" lon="2"><tag k="name" v="A"/></node></osm>"#,
        )
        .unwrap();
        let input = path.to_string_lossy().to_string();

        let source = FileSource::new(&input);
        assert_eq!(source.fingerprint(), input);
        let table = source.load().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.perimeter.is_none());
    }

    #[test]
    fn test_open_source_picks_query() {
        let config = OsmConfig::default();
        let filter = Filter::parse(["heritage=2"]).unwrap();
        let source = open_source(
            "Strasbourg, grande ile",
            SourceKind::Auto,
            &config,
            &filter,
            &[],
        );
        assert_eq!(source.fingerprint(), "Strasbourg, grande ile");
    }
}
