//! Live OSM data: Nominatim geocoding + Overpass API.
//!
//! A place query such as `"Strasbourg, grande ile"` is resolved to an OSM
//! element by Nominatim. Its area (or bounding box, for places mapped as a
//! node) then scopes an Overpass query returning XML, which goes through the
//! same reader as local extracts.

use std::fmt::Write as _;
use std::str::FromStr;
use std::time::Duration;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use ureq::Agent;

use super::types::{Bounds, Feature, OsmId, OsmType};
use super::OsmError;
use crate::config::OsmConfig;
use crate::filter::Filter;
use crate::{debug, log};

// ============================================================================
// Layers
// ============================================================================

/// Background layer fetched around the selected features: `key` or `key=value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub key: String,
    pub value: Option<String>,
}

impl FromStr for Layer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = match s.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.trim().to_string())),
            None => (s.trim(), None),
        };
        if key.is_empty() {
            return Err(format!("invalid layer `{s}`: empty key"));
        }
        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

impl Layer {
    /// Whether `feature` belongs to this layer.
    pub fn matches(&self, feature: &Feature) -> bool {
        feature
            .tag(&self.key)
            .is_some_and(|v| self.value.as_deref().is_none_or(|want| want == v))
    }

    fn selector(&self) -> String {
        match &self.value {
            Some(value) => format!("[\"{}\"=\"{}\"]", ql_escape(&self.key), ql_escape(value)),
            None => format!("[\"{}\"]", ql_escape(&self.key)),
        }
    }
}

/// Escape a string literal for Overpass QL.
fn ql_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

// ============================================================================
// Geocoding
// ============================================================================

/// A geocoded place.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub id: OsmId,
    pub display_name: String,
    pub bounds: Option<Bounds>,
}

/// Subset of a Nominatim `jsonv2` search result.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    osm_type: String,
    osm_id: i64,
    #[serde(default)]
    display_name: String,
    /// `[south, north, west, east]` as strings
    #[serde(default)]
    boundingbox: Vec<String>,
}

impl NominatimPlace {
    fn into_place(self) -> Result<Place, OsmError> {
        let kind: OsmType = self.osm_type.parse()?;
        let bbox: Vec<f64> = self
            .boundingbox
            .iter()
            .filter_map(|v| v.parse().ok())
            .collect();
        let bounds = match bbox.as_slice() {
            [south, north, west, east] => Some(Bounds::new(*south, *west, *north, *east)),
            _ => None,
        };
        Ok(Place {
            id: OsmId::new(kind, self.osm_id),
            display_name: self.display_name,
            bounds,
        })
    }
}

/// Parse a Nominatim search response, taking the best match.
pub fn parse_geocoder_response(query: &str, body: &str) -> Result<Place, OsmError> {
    let places: Vec<NominatimPlace> = serde_json::from_str(body)?;
    places
        .into_iter()
        .next()
        .ok_or_else(|| OsmError::PlaceNotFound(query.to_string()))?
        .into_place()
}

// ============================================================================
// Query building
// ============================================================================

/// Build the Overpass QL query for a place.
///
/// Fetches every element matching `filter`, the background `layers`, and the
/// place's own boundary, then recurses down to the nodes needed for geometry.
pub fn build_query(place: &Place, filter: &Filter, layers: &[Layer], timeout: u64) -> String {
    let mut query = format!("[out:xml][timeout:{timeout}];\n");

    let scope = match place.id.kind {
        OsmType::Relation | OsmType::Way => {
            let _ = writeln!(
                query,
                "{}({})->.perimeter;\n.perimeter map_to_area->.searchArea;",
                short_type(place.id.kind),
                place.id.id
            );
            "(area.searchArea)".to_string()
        }
        OsmType::Node => {
            let _ = writeln!(query, "node({})->.perimeter;", place.id.id);
            match place.bounds {
                Some(b) => format!(
                    "({},{},{},{})",
                    b.min_lat, b.min_lon, b.max_lat, b.max_lon
                ),
                None => "(around.perimeter:1000)".to_string(),
            }
        }
    };

    query.push_str("(\n");

    let selectors: String = filter
        .iter()
        .map(|(key, value)| format!("[\"{}\"=\"{}\"]", ql_escape(key), ql_escape(value)))
        .collect();
    let _ = writeln!(query, "  nwr{selectors}{scope};");

    for layer in layers {
        let _ = writeln!(query, "  way{}{scope};", layer.selector());
    }

    query.push_str("  .perimeter;\n);\n(._;>;);\nout body;\n");
    query
}

const fn short_type(kind: OsmType) -> &'static str {
    match kind {
        OsmType::Node => "node",
        OsmType::Way => "way",
        OsmType::Relation => "rel",
    }
}

// ============================================================================
// Client
// ============================================================================

/// Blocking HTTP client for Nominatim and Overpass.
#[derive(Clone)]
pub struct OverpassClient {
    agent: Agent,
    nominatim_url: String,
    overpass_url: String,
    user_agent: String,
    max_response_bytes: u64,
    pub timeout: u64,
}

impl OverpassClient {
    pub fn new(config: &OsmConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout)))
            .build()
            .into();
        Self {
            agent,
            nominatim_url: config.nominatim_url.clone(),
            overpass_url: config.overpass_url.clone(),
            user_agent: config.user_agent.clone(),
            max_response_bytes: config.max_response_mb.saturating_mul(1024 * 1024),
            timeout: config.timeout,
        }
    }

    /// Resolve a place name to an OSM element.
    pub fn geocode(&self, query: &str) -> Result<Place, OsmError> {
        let url = format!(
            "{}?q={}&format=jsonv2&limit=1",
            self.nominatim_url,
            utf8_percent_encode(query, NON_ALPHANUMERIC)
        );
        debug!("query"; "GET {}", url);

        let body = self
            .agent
            .get(&url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .and_then(|mut response| response.body_mut().read_to_string())
            .map_err(|source| OsmError::Http {
                url: url.clone(),
                source,
            })?;

        let place = parse_geocoder_response(query, &body)?;
        log!("query"; "resolved `{}` to {} ({})", query, place.id, place.display_name);
        Ok(place)
    }

    /// Run an Overpass QL query, returning the raw OSM XML.
    pub fn fetch(&self, ql: &str) -> Result<String, OsmError> {
        debug!("query"; "POST {}\n{}", self.overpass_url, ql);

        self.agent
            .post(&self.overpass_url)
            .header("User-Agent", self.user_agent.as_str())
            .send(ql)
            .and_then(|mut response| {
                response
                    .body_mut()
                    .with_config()
                    .limit(self.max_response_bytes)
                    .read_to_string()
            })
            .map_err(|source| OsmError::Http {
                url: self.overpass_url.clone(),
                source,
            })
    }
}
