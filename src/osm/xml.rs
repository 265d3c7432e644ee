//! Streaming OSM XML reader.
//!
//! [`read_osm`] walks an OSM XML document once and reports every element to
//! an [`OsmVisitor`] (one callback per node/way/relation). [`TableBuilder`]
//! is the visitor used by the sources: it keeps node coordinates and way
//! node lists so that geometry can be resolved once the document ends.
//!
//! ```text
//! <node id lat lon>  -> visitor.node()
//! <way id> <nd ref/> -> visitor.way()
//! <relation id> <member type ref role/> -> visitor.relation()
//! <bounds minlat minlon maxlat maxlon/> -> visitor.bounds()
//! ```

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use rustc_hash::FxHashMap;

use super::types::{Bounds, Coord, Feature, FeatureTable, Geometry, OsmId, OsmType, Tags};
use super::OsmError;
use crate::debug;

// ============================================================================
// Raw elements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub id: i64,
    pub coord: Option<Coord>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawWay {
    pub id: i64,
    pub refs: Vec<i64>,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: OsmId,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRelation {
    pub id: i64,
    pub members: Vec<Member>,
    pub tags: Tags,
}

/// Per-element callbacks.
pub trait OsmVisitor {
    fn node(&mut self, node: RawNode);
    fn way(&mut self, way: RawWay);
    fn relation(&mut self, relation: RawRelation);
    fn bounds(&mut self, _bounds: Bounds) {}
}

enum Current {
    None,
    Node(RawNode),
    Way(RawWay),
    Relation(RawRelation),
}

impl Current {
    fn tags_mut(&mut self) -> Option<&mut Tags> {
        match self {
            Self::None => None,
            Self::Node(n) => Some(&mut n.tags),
            Self::Way(w) => Some(&mut w.tags),
            Self::Relation(r) => Some(&mut r.tags),
        }
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Read an OSM XML document, reporting elements to `visitor`.
pub fn read_osm<R: BufRead>(input: R, visitor: &mut impl OsmVisitor) -> Result<(), OsmError> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let mut current = Current::None;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf);
        match event.map_err(|source| OsmError::Xml {
            position: reader.error_position() as u64,
            source,
        })? {
            Event::Eof => break,
            Event::Start(e) => match e.name().as_ref() {
                b"node" => current = Current::Node(read_node(&e)?),
                b"way" => current = Current::Way(read_way(&e)?),
                b"relation" => current = Current::Relation(read_relation(&e)?),
                _ => read_child(&e, &mut current, visitor)?,
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"node" => visitor.node(read_node(&e)?),
                b"way" => visitor.way(read_way(&e)?),
                b"relation" => visitor.relation(read_relation(&e)?),
                _ => read_child(&e, &mut current, visitor)?,
            },
            Event::End(e) => {
                if matches!(e.name().as_ref(), b"node" | b"way" | b"relation") {
                    match std::mem::replace(&mut current, Current::None) {
                        Current::Node(node) => visitor.node(node),
                        Current::Way(way) => visitor.way(way),
                        Current::Relation(relation) => visitor.relation(relation),
                        Current::None => {}
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Children of node/way/relation plus the top-level `<bounds>`.
fn read_child(
    e: &BytesStart<'_>,
    current: &mut Current,
    visitor: &mut impl OsmVisitor,
) -> Result<(), OsmError> {
    match e.name().as_ref() {
        b"tag" => {
            if let Some(tags) = current.tags_mut()
                && let (Some(k), Some(v)) = (attr(e, b"k")?, attr(e, b"v")?)
            {
                tags.insert(k, v);
            }
        }
        b"nd" => {
            if let Current::Way(way) = current {
                way.refs.push(required_i64(e, "nd", "ref")?);
            }
        }
        b"member" => {
            if let Current::Relation(relation) = current {
                let kind = attr(e, b"type")?.ok_or(OsmError::MissingAttribute {
                    element: "member",
                    attr: "type",
                })?;
                let kind: OsmType = kind.parse()?;
                let id = required_i64(e, "member", "ref")?;
                let role = attr(e, b"role")?.unwrap_or_default();
                relation.members.push(Member {
                    id: OsmId::new(kind, id),
                    role,
                });
            }
        }
        b"bounds" => {
            let min_lat = required_f64(e, "bounds", "minlat")?;
            let min_lon = required_f64(e, "bounds", "minlon")?;
            let max_lat = required_f64(e, "bounds", "maxlat")?;
            let max_lon = required_f64(e, "bounds", "maxlon")?;
            visitor.bounds(Bounds::new(min_lat, min_lon, max_lat, max_lon));
        }
        _ => {}
    }
    Ok(())
}

fn read_node(e: &BytesStart<'_>) -> Result<RawNode, OsmError> {
    let id = required_i64(e, "node", "id")?;
    let lat = optional_f64(e, "node", "lat")?;
    let lon = optional_f64(e, "node", "lon")?;
    Ok(RawNode {
        id,
        coord: lat.zip(lon).map(|(lat, lon)| Coord::new(lat, lon)),
        tags: Tags::new(),
    })
}

fn read_way(e: &BytesStart<'_>) -> Result<RawWay, OsmError> {
    Ok(RawWay {
        id: required_i64(e, "way", "id")?,
        refs: Vec::new(),
        tags: Tags::new(),
    })
}

fn read_relation(e: &BytesStart<'_>) -> Result<RawRelation, OsmError> {
    Ok(RawRelation {
        id: required_i64(e, "relation", "id")?,
        members: Vec::new(),
        tags: Tags::new(),
    })
}

// ============================================================================
// Attribute helpers
// ============================================================================

/// Unescaped attribute value.
fn attr(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, OsmError> {
    for attr in e.attributes().with_checks(false) {
        let attr = attr?;
        if attr.key.as_ref() == key {
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(quick_xml::escape::unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

fn required_i64(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<i64, OsmError> {
    let value = attr(e, name.as_bytes())?.ok_or(OsmError::MissingAttribute {
        element,
        attr: name,
    })?;
    value.parse().map_err(|_| OsmError::InvalidAttribute {
        element,
        attr: name,
        value,
    })
}

fn optional_f64(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<Option<f64>, OsmError> {
    match attr(e, name.as_bytes())? {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| OsmError::InvalidAttribute {
                element,
                attr: name,
                value,
            }),
        None => Ok(None),
    }
}

fn required_f64(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<f64, OsmError> {
    optional_f64(e, element, name)?.ok_or(OsmError::MissingAttribute {
        element,
        attr: name,
    })
}

// ============================================================================
// Table builder
// ============================================================================

enum Pending {
    Node(Option<Coord>),
    Way(Vec<i64>),
    Relation(Vec<Member>),
}

/// Visitor collecting a [`FeatureTable`].
///
/// Untagged elements never become features but still contribute
/// coordinates (way vertices) and node lists (multipolygon members).
#[derive(Default)]
pub struct TableBuilder {
    coords: FxHashMap<i64, Coord>,
    way_refs: FxHashMap<i64, Vec<i64>>,
    pending: Vec<(OsmId, Tags, Pending)>,
    bounds: Option<Bounds>,
}

impl OsmVisitor for TableBuilder {
    fn node(&mut self, node: RawNode) {
        if let Some(coord) = node.coord {
            self.coords.insert(node.id, coord);
        }
        if !node.tags.is_empty() {
            self.pending
                .push((OsmId::node(node.id), node.tags, Pending::Node(node.coord)));
        }
    }

    fn way(&mut self, way: RawWay) {
        if way.tags.is_empty() {
            self.way_refs.insert(way.id, way.refs);
        } else {
            self.way_refs.insert(way.id, way.refs.clone());
            self.pending
                .push((OsmId::way(way.id), way.tags, Pending::Way(way.refs)));
        }
    }

    fn relation(&mut self, relation: RawRelation) {
        if !relation.tags.is_empty() {
            self.pending.push((
                OsmId::relation(relation.id),
                relation.tags,
                Pending::Relation(relation.members),
            ));
        }
    }

    fn bounds(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve geometry and produce the table.
    pub fn finish(self) -> FeatureTable {
        let mut missing = 0usize;
        let features: Vec<_> = self
            .pending
            .iter()
            .map(|(id, tags, pending)| {
                let geometry = match pending {
                    Pending::Node(coord) => coord.map_or(Geometry::Empty, Geometry::Point),
                    Pending::Way(refs) => {
                        let path = self.resolve(refs, &mut missing);
                        if path.is_empty() {
                            Geometry::Empty
                        } else {
                            Geometry::Path(path)
                        }
                    }
                    Pending::Relation(members) => self.resolve_relation(members, &mut missing),
                };
                Feature::new(*id, tags.clone()).with_geometry(geometry)
            })
            .collect();

        if missing > 0 {
            debug!("osm"; "{} node references outside the extract", missing);
        }

        let bounds = self
            .bounds
            .or_else(|| Bounds::from_coords(self.coords.values().copied()));

        FeatureTable {
            features,
            perimeter: None,
            bounds,
        }
    }

    fn resolve(&self, refs: &[i64], missing: &mut usize) -> Vec<Coord> {
        refs.iter()
            .filter_map(|r| {
                let coord = self.coords.get(r).copied();
                if coord.is_none() {
                    *missing += 1;
                }
                coord
            })
            .collect()
    }

    fn resolve_relation(&self, members: &[Member], missing: &mut usize) -> Geometry {
        let paths: Vec<_> = members
            .iter()
            .filter(|m| m.id.kind == OsmType::Way)
            .filter_map(|m| self.way_refs.get(&m.id.id))
            .map(|refs| self.resolve(refs, missing))
            .filter(|path| !path.is_empty())
            .collect();

        if !paths.is_empty() {
            return Geometry::Multi(paths);
        }

        // Relations made of nodes only (e.g. site relations)
        members
            .iter()
            .filter(|m| m.id.kind == OsmType::Node)
            .find_map(|m| self.coords.get(&m.id.id).copied())
            .map_or(Geometry::Empty, Geometry::Point)
    }
}

// ============================================================================
// Entry points
// ============================================================================

/// Parse an OSM XML document held in memory.
pub fn parse_str(xml: &str) -> Result<FeatureTable, OsmError> {
    let mut builder = TableBuilder::new();
    read_osm(xml.as_bytes(), &mut builder)?;
    Ok(builder.finish())
}

/// Parse an OSM XML extract from disk.
pub fn parse_file(path: &Path) -> Result<FeatureTable, OsmError> {
    let file = File::open(path).map_err(|err| OsmError::Io(path.to_path_buf(), err))?;
    let mut builder = TableBuilder::new();
    read_osm(BufReader::with_capacity(64 * 1024, file), &mut builder)?;
    Ok(builder.finish())
}
