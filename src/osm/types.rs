//! Core OSM data types shared by every source.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rustc_hash::FxHashMap;

use super::OsmError;

// ============================================================================
// Identifiers
// ============================================================================

/// OSM element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl OsmType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Way => "way",
            Self::Relation => "relation",
        }
    }

    /// Upper-case prefix used in normalized identifiers.
    pub const fn letter(self) -> char {
        match self {
            Self::Node => 'N',
            Self::Way => 'W',
            Self::Relation => 'R',
        }
    }
}

impl fmt::Display for OsmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OsmType {
    type Err = OsmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "node" | "n" | "N" => Ok(Self::Node),
            "way" | "w" | "W" => Ok(Self::Way),
            "relation" | "r" | "R" => Ok(Self::Relation),
            other => Err(OsmError::UnknownType(other.to_string())),
        }
    }
}

/// Stable key of an OSM element: `(type, id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OsmId {
    pub kind: OsmType,
    pub id: i64,
}

impl OsmId {
    pub const fn new(kind: OsmType, id: i64) -> Self {
        Self { kind, id }
    }

    pub const fn node(id: i64) -> Self {
        Self::new(OsmType::Node, id)
    }

    pub const fn way(id: i64) -> Self {
        Self::new(OsmType::Way, id)
    }

    pub const fn relation(id: i64) -> Self {
        Self::new(OsmType::Relation, id)
    }

    /// Compact identifier used to tag map shapes, e.g. `W1234`.
    pub fn normalized(&self) -> String {
        format!("{}{}", self.kind.letter(), self.id)
    }
}

/// `way/1234`, the path segment used by openstreetmap.org.
impl fmt::Display for OsmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Normalize an OSM id: `(way, 1234)` -> `W1234`.
#[inline]
pub fn normalize(id: OsmId) -> String {
    id.normalized()
}

// ============================================================================
// Geometry
// ============================================================================

/// WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub lat: f64,
    pub lon: f64,
}

impl Coord {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Resolved shape of a feature.
///
/// Only the renderer looks inside; selection and card fields treat it as opaque
/// (the basic model reads the centroid).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Geometry {
    /// Coordinates could not be resolved (missing nodes, empty relation).
    #[default]
    Empty,
    Point(Coord),
    Path(Vec<Coord>),
    /// Member ways of a relation, one path per member.
    Multi(Vec<Vec<Coord>>),
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Point(_) => false,
            Self::Path(path) => path.is_empty(),
            Self::Multi(paths) => paths.iter().all(Vec::is_empty),
        }
    }

    /// All coordinates, in drawing order.
    pub fn coords(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            Self::Empty => Box::new(std::iter::empty()),
            Self::Point(c) => Box::new(std::iter::once(*c)),
            Self::Path(path) => Box::new(path.iter().copied()),
            Self::Multi(paths) => Box::new(paths.iter().flatten().copied()),
        }
    }

    /// Mean of all coordinates.
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Option<Coord> {
        let (mut lat, mut lon, mut n) = (0.0, 0.0, 0usize);
        for c in self.coords() {
            lat += c.lat;
            lon += c.lon;
            n += 1;
        }
        (n > 0).then(|| Coord::new(lat / n as f64, lon / n as f64))
    }
}

/// Returns true when a path ends where it starts (area-like way).
pub fn is_closed(path: &[Coord]) -> bool {
    path.len() > 2 && path.first() == path.last()
}

/// Geographic bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lat: f64,
    pub min_lon: f64,
    pub max_lat: f64,
    pub max_lon: f64,
}

impl Bounds {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Smallest box containing all coordinates, `None` when empty.
    pub fn from_coords(coords: impl IntoIterator<Item = Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first.lat, first.lon, first.lat, first.lon);
        for c in iter {
            bounds.extend(c);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, c: Coord) {
        self.min_lat = self.min_lat.min(c.lat);
        self.min_lon = self.min_lon.min(c.lon);
        self.max_lat = self.max_lat.max(c.lat);
        self.max_lon = self.max_lon.max(c.lon);
    }

    pub fn center(&self) -> Coord {
        Coord::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

// ============================================================================
// Features
// ============================================================================

/// Tag name -> value. Keys are unique.
pub type Tags = BTreeMap<String, String>;

/// A tagged OSM element.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: OsmId,
    pub tags: Tags,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(id: OsmId, tags: Tags) -> Self {
        Self {
            id,
            tags,
            geometry: Geometry::Empty,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Tag lookup; absence is a normal outcome.
    #[inline]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The `name` tag, trimmed, if present and non-blank.
    pub fn name(&self) -> Option<&str> {
        self.tag("name").map(str::trim).filter(|n| !n.is_empty())
    }
}

/// Features of an area as produced by an [`OsmSource`](super::OsmSource).
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    /// Tagged elements in document order.
    pub features: Vec<Feature>,
    /// Boundary of the queried place, when known.
    pub perimeter: Option<OsmId>,
    pub bounds: Option<Bounds>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Lookup table by id. The first occurrence wins for duplicated ids.
    pub fn index(&self) -> FxHashMap<OsmId, &Feature> {
        let mut index = FxHashMap::default();
        for feature in &self.features {
            index.entry(feature.id).or_insert(feature);
        }
        index
    }

    pub fn perimeter_feature(&self) -> Option<&Feature> {
        let id = self.perimeter?;
        self.features.iter().find(|f| f.id == id)
    }

    /// Declared bounds, or the extent of every feature.
    pub fn extent(&self) -> Option<Bounds> {
        self.bounds.or_else(|| {
            Bounds::from_coords(self.features.iter().flat_map(|f| f.geometry.coords()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(OsmId::way(1234)), "W1234");
        assert_eq!(normalize(OsmId::node(7)), "N7");
        assert_eq!(normalize(OsmId::relation(99)), "R99");
    }

    #[test]
    fn test_osm_id_display() {
        assert_eq!(OsmId::way(1234).to_string(), "way/1234");
        assert_eq!(OsmId::relation(5).to_string(), "relation/5");
    }

    #[test]
    fn test_osm_type_from_str() {
        assert_eq!("node".parse::<OsmType>().unwrap(), OsmType::Node);
        assert_eq!("way".parse::<OsmType>().unwrap(), OsmType::Way);
        assert_eq!("relation".parse::<OsmType>().unwrap(), OsmType::Relation);
        assert!("area".parse::<OsmType>().is_err());
    }

    #[test]
    fn test_feature_name_blank_is_absent() {
        let blank = Feature::new(OsmId::node(1), tags(&[("name", "   ")]));
        assert_eq!(blank.name(), None);

        let named = Feature::new(OsmId::node(2), tags(&[("name", " Old Gate ")]));
        assert_eq!(named.name(), Some("Old Gate"));

        let missing = Feature::new(OsmId::node(3), Tags::new());
        assert_eq!(missing.name(), None);
        assert_eq!(missing.tag("historic"), None);
    }

    #[test]
    fn test_geometry_centroid() {
        let path = Geometry::Path(vec![Coord::new(0.0, 0.0), Coord::new(2.0, 4.0)]);
        assert_eq!(path.centroid(), Some(Coord::new(1.0, 2.0)));
        assert_eq!(Geometry::Empty.centroid(), None);
        assert!(Geometry::Multi(vec![vec![]]).is_empty());
    }

    #[test]
    fn test_is_closed() {
        let a = Coord::new(0.0, 0.0);
        let b = Coord::new(0.0, 1.0);
        let c = Coord::new(1.0, 1.0);
        assert!(is_closed(&[a, b, c, a]));
        assert!(!is_closed(&[a, b, c]));
        assert!(!is_closed(&[a, a]));
    }

    #[test]
    fn test_bounds_from_coords() {
        let bounds =
            Bounds::from_coords([Coord::new(1.0, 5.0), Coord::new(-1.0, 7.0)]).unwrap();
        assert_eq!(bounds, Bounds::new(-1.0, 5.0, 1.0, 7.0));
        assert_eq!(bounds.center(), Coord::new(0.0, 6.0));
        assert!(Bounds::from_coords([]).is_none());
    }

    #[test]
    fn test_table_index_first_wins() {
        let table = FeatureTable {
            features: vec![
                Feature::new(OsmId::way(1), tags(&[("name", "first")])),
                Feature::new(OsmId::way(1), tags(&[("name", "second")])),
            ],
            ..Default::default()
        };
        let index = table.index();
        assert_eq!(index.len(), 1);
        assert_eq!(index[&OsmId::way(1)].name(), Some("first"));
    }
}
