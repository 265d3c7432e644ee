//! Built-in SVG renderer.
//!
//! Draws in four passes, back to front:
//!
//! 1. background
//! 2. perimeter outline of the queried place
//! 3. background layers (buildings, water, highways, waterways)
//! 4. selected features, each inside `<a xlink:href="W1234">`

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rustc_hash::FxHashSet;

use super::{MapError, MapRenderer, MapScene};
use crate::config::MapConfig;
use crate::debug;
use crate::osm::overpass::Layer;
use crate::osm::{Bounds, Coord, Feature, Geometry, OsmId, is_closed, normalize};

const BACKGROUND: &str = "#f2efe9";
const PERIMETER: &str = "fill: none; stroke: #7a7a7a; stroke-width: 3; stroke-dasharray: 8 4";
const BUILDING: &str = "fill: #d9d0c9; stroke: #b9a89a; stroke-width: 0.5";
const WATER: &str = "fill: #aad3df; stroke: none";
const HIGHWAY: &str = "fill: none; stroke: #ffffff; stroke-width: 3";
const WATERWAY: &str = "fill: none; stroke: #aad3df; stroke-width: 2";
const OTHER: &str = "fill: none; stroke: #bbbbbb; stroke-width: 1";

/// Radius of a point feature, in canvas units.
const POINT_RADIUS: f64 = 6.0;

/// Smallest span (degrees) the projection fits, so a single point still maps.
const MIN_SPAN: f64 = 1e-3;

/// Renders a scene to SVG text.
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    width: u32,
    height: u32,
    margin: u32,
    highlight: String,
    layers: Vec<Layer>,
}

impl SvgRenderer {
    pub fn new(width: u32, height: u32, margin: u32, highlight: &str, layers: Vec<Layer>) -> Self {
        Self {
            width,
            height,
            margin,
            highlight: highlight.to_string(),
            layers,
        }
    }

    pub fn from_config(config: &MapConfig) -> Result<Self, MapError> {
        let layers = config
            .layers
            .iter()
            .map(|s| s.parse::<Layer>().map_err(|_| MapError::InvalidLayer(s.clone())))
            .collect::<Result<_, _>>()?;
        Ok(Self::new(
            config.width,
            config.height,
            config.margin,
            &config.highlight,
            layers,
        ))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    fn layer_of(&self, feature: &Feature) -> Option<&Layer> {
        self.layers.iter().find(|layer| layer.matches(feature))
    }

    fn selected_style(&self, geometry: &Geometry) -> String {
        let c = &self.highlight;
        match geometry {
            Geometry::Path(path) if !is_closed(path) && path.len() > 1 => {
                format!("fill: none; stroke: {c}; stroke-width: 4")
            }
            _ => format!("fill: {c}; stroke: {c}; stroke-width: 2"),
        }
    }
}

impl MapRenderer for SvgRenderer {
    fn render(&self, scene: &MapScene<'_>) -> Result<String, MapError> {
        let table = scene.table;
        let bounds = table.extent().ok_or(MapError::EmptyExtent)?;
        let projection = Projection::fit(
            bounds,
            f64::from(self.width),
            f64::from(self.height),
            f64::from(self.margin),
        );

        let width = self.width.to_string();
        let height = self.height.to_string();
        let view_box = format!("0 0 {} {}", self.width, self.height);

        let mut svg = SvgWriter::new();
        svg.decl()?;
        svg.start(
            "svg",
            &[
                ("xmlns", "http://www.w3.org/2000/svg"),
                ("xmlns:xlink", "http://www.w3.org/1999/xlink"),
                ("width", &width),
                ("height", &height),
                ("viewBox", &view_box),
            ],
        )?;
        svg.empty(
            "rect",
            &[("width", "100%"), ("height", "100%"), ("fill", BACKGROUND)],
        )?;

        let selected: FxHashSet<OsmId> = scene.selected.iter().copied().collect();

        // Perimeter
        if let Some(perimeter) = table.perimeter_feature()
            && !perimeter.geometry.is_empty()
        {
            svg.start("g", &[("id", "perimeter")])?;
            let d = projection.path_data(&perimeter.geometry);
            svg.empty("path", &[("d", &d), ("style", PERIMETER)])?;
            svg.end("g")?;
        }

        // Background layers
        svg.start("g", &[("id", "layers")])?;
        for feature in &table.features {
            if selected.contains(&feature.id)
                || Some(feature.id) == table.perimeter
                || feature.geometry.is_empty()
            {
                continue;
            }
            if let Some(layer) = self.layer_of(feature) {
                let d = projection.path_data(&feature.geometry);
                svg.empty("path", &[("d", &d), ("style", layer_style(layer))])?;
            }
        }
        svg.end("g")?;

        // Selected features, in selection order
        let index = table.index();
        let mut drawn = FxHashSet::default();
        svg.start("g", &[("id", "features")])?;
        for id in scene.selected {
            if !drawn.insert(*id) {
                continue;
            }
            let Some(feature) = index.get(id) else {
                debug!("map"; "{} is not in the data, skipped", id);
                continue;
            };
            if feature.geometry.is_empty() {
                debug!("map"; "{} has no geometry, skipped", id);
                continue;
            }

            let href = normalize(*id);
            let d = projection.path_data(&feature.geometry);
            let style = self.selected_style(&feature.geometry);

            svg.start("a", &[("xlink:href", &href)])?;
            svg.empty("path", &[("d", &d), ("style", &style)])?;
            if let Some(name) = feature.name() {
                svg.text_element("title", name)?;
            }
            svg.end("a")?;
        }
        svg.end("g")?;

        svg.end("svg")?;
        svg.finish()
    }
}

fn layer_style(layer: &Layer) -> &'static str {
    match (layer.key.as_str(), layer.value.as_deref()) {
        ("building", _) => BUILDING,
        ("highway", _) => HIGHWAY,
        ("waterway", _) => WATERWAY,
        ("water", _) | (_, Some("water")) => WATER,
        _ => OTHER,
    }
}

// ============================================================================
// Projection
// ============================================================================

/// Equirectangular projection fitted to the canvas.
///
/// Longitudes are scaled by `cos(mid_lat)` so shapes keep their proportions
/// at the latitude of the map center; the result is centered in the canvas
/// minus `margin` on every side.
#[derive(Debug, Clone, Copy)]
struct Projection {
    min_lon: f64,
    max_lat: f64,
    kx: f64,
    scale: f64,
    x0: f64,
    y0: f64,
}

impl Projection {
    fn fit(bounds: Bounds, width: f64, height: f64, margin: f64) -> Self {
        let kx = bounds.center().lat.to_radians().cos().max(0.01);
        let span_x = ((bounds.max_lon - bounds.min_lon) * kx).max(MIN_SPAN);
        let span_y = (bounds.max_lat - bounds.min_lat).max(MIN_SPAN);

        let inner_w = (width - 2.0 * margin).max(1.0);
        let inner_h = (height - 2.0 * margin).max(1.0);
        let scale = (inner_w / span_x).min(inner_h / span_y);

        let drawn_w = (bounds.max_lon - bounds.min_lon) * kx * scale;
        let drawn_h = (bounds.max_lat - bounds.min_lat) * scale;

        Self {
            min_lon: bounds.min_lon,
            max_lat: bounds.max_lat,
            kx,
            scale,
            x0: margin + (inner_w - drawn_w) / 2.0,
            y0: margin + (inner_h - drawn_h) / 2.0,
        }
    }

    fn project(&self, c: Coord) -> (f64, f64) {
        (
            self.x0 + (c.lon - self.min_lon) * self.kx * self.scale,
            self.y0 + (self.max_lat - c.lat) * self.scale,
        )
    }

    /// SVG path data for a geometry. Points become circles.
    fn path_data(&self, geometry: &Geometry) -> String {
        match geometry {
            Geometry::Empty => String::new(),
            Geometry::Point(c) => self.circle(*c),
            Geometry::Path(path) => self.polyline(path),
            Geometry::Multi(paths) => paths
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| self.polyline(p))
                .collect::<Vec<_>>()
                .join(" "),
        }
    }

    fn polyline(&self, path: &[Coord]) -> String {
        match path {
            [] => String::new(),
            [single] => self.circle(*single),
            _ => {
                let points: Vec<String> = path
                    .iter()
                    .map(|c| {
                        let (x, y) = self.project(*c);
                        format!("{x:.1},{y:.1}")
                    })
                    .collect();
                let mut d = format!("M{}", points.join(" L"));
                if is_closed(path) {
                    d.push_str(" Z");
                }
                d
            }
        }
    }

    fn circle(&self, c: Coord) -> String {
        let (x, y) = self.project(c);
        let r = POINT_RADIUS;
        format!(
            "M{:.1},{y:.1} a{r},{r} 0 1,0 {d},0 a{r},{r} 0 1,0 -{d},0",
            x - r,
            d = 2.0 * r
        )
    }
}

// ============================================================================
// Writer
// ============================================================================

struct SvgWriter {
    inner: Writer<Vec<u8>>,
}

impl SvgWriter {
    fn new() -> Self {
        Self {
            inner: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    fn decl(&mut self) -> Result<(), MapError> {
        self.inner
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(())
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), MapError> {
        let mut elem = BytesStart::new(name);
        elem.extend_attributes(attrs.iter().copied());
        self.inner.write_event(Event::Start(elem))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), MapError> {
        let mut elem = BytesStart::new(name);
        elem.extend_attributes(attrs.iter().copied());
        self.inner.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<(), MapError> {
        self.inner.write_event(Event::Start(BytesStart::new(name)))?;
        self.inner.write_event(Event::Text(BytesText::new(text)))?;
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn end(&mut self, name: &str) -> Result<(), MapError> {
        self.inner.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn finish(self) -> Result<String, MapError> {
        String::from_utf8(self.inner.into_inner()).map_err(|e| MapError::Utf8(e.utf8_error()))
    }
}
