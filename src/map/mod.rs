//! Map rendering and annotation.
//!
//! ```text
//! FeatureTable ──render──> SVG ──annotate──> AnnotatedMap ──write_media──> media/<session>.svg
//!                                                 │
//!                                                 └─highlight(id)──> media/<session>-<id>.svg
//! ```
//!
//! Every selected feature is drawn inside `<a xlink:href="W1234">`. Annotation
//! turns that link into an `id` on the shape and hides it, so one document
//! can show any single feature by flipping its opacity.

mod annotate;
mod render;

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::card::MapReference;
use crate::logger::ProgressLine;
use crate::osm::{FeatureTable, OsmId};

pub use annotate::{AnnotatedMap, annotate, highlight};
pub use render::SvgRenderer;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("malformed SVG")]
    Xml(#[from] quick_xml::Error),

    #[error("malformed SVG attribute")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed SVG entity")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("SVG is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("failed to write SVG")]
    Write(#[from] std::io::Error),

    #[error("IO error when writing `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid map layer `{0}`")]
    InvalidLayer(String),

    #[error("nothing to draw: the data has no coordinates")]
    EmptyExtent,
}

/// What to draw: the whole table, with `selected` features emphasized.
#[derive(Debug, Clone, Copy)]
pub struct MapScene<'a> {
    pub table: &'a FeatureTable,
    pub selected: &'a [OsmId],
}

impl<'a> MapScene<'a> {
    pub const fn new(table: &'a FeatureTable, selected: &'a [OsmId]) -> Self {
        Self { table, selected }
    }
}

/// Produces an SVG document for a scene.
///
/// The output must wrap every drawable selected feature in an anchor whose
/// `href` is the normalized id, with its shape as the first `<path>` inside.
pub trait MapRenderer {
    fn render(&self, scene: &MapScene<'_>) -> Result<String, MapError>;
}

// ============================================================================
// Media files
// ============================================================================

/// Map files written for one run.
#[derive(Debug, Clone, Default)]
pub struct MapMedia {
    /// The annotated map (`<session>.svg`).
    pub generic: PathBuf,
    /// Per-feature highlighted copies (`<session>-<id>.svg`), by shape id.
    pub highlighted: Vec<(String, PathBuf)>,
}

impl MapMedia {
    /// Every written file, generic map first.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.generic.as_path())
            .chain(self.highlighted.iter().map(|(_, path)| path.as_path()))
    }

    /// Card-side reference to the images of `shape_id`.
    pub fn reference(&self, shape_id: &str) -> Option<MapReference> {
        let highlighted = self
            .highlighted
            .iter()
            .find(|(id, _)| id == shape_id)
            .map(|(_, path)| file_name(path))?;
        Some(MapReference::Images {
            generic: file_name(&self.generic),
            highlighted,
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Write the annotated map to `dir`, plus one highlighted copy per shape id
/// when `per_feature` is set. The directory is created if needed.
pub fn write_media(
    dir: &Path,
    session: &str,
    map: &AnnotatedMap,
    per_feature: bool,
) -> Result<MapMedia, MapError> {
    fs::create_dir_all(dir).map_err(|e| MapError::Io(dir.to_path_buf(), e))?;

    let generic = dir.join(format!("{session}.svg"));
    write_file(&generic, &map.svg)?;

    let mut media = MapMedia {
        generic,
        highlighted: Vec::new(),
    };
    if !per_feature {
        return Ok(media);
    }

    let mut seen = FxHashSet::default();
    let unique: Vec<&str> = map
        .ids
        .iter()
        .map(String::as_str)
        .filter(|id| seen.insert(*id))
        .collect();

    let progress = ProgressLine::new("map", &[("maps", unique.len())]);
    for id in unique {
        let path = dir.join(format!("{session}-{id}.svg"));
        write_file(&path, &highlight(&map.svg, id)?)?;
        media.highlighted.push((id.to_string(), path));
        progress.inc("maps");
    }
    progress.finish();
    Ok(media)
}

fn write_file(path: &Path, content: &str) -> Result<(), MapError> {
    fs::write(path, content).map_err(|e| MapError::Io(path.to_path_buf(), e))
}
