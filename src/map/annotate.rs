//! SVG annotation: turn feature links into hidden, addressable shapes.
//!
//! ```text
//! <a xlink:href="W1234"><path d="…" style="fill: red"/></a>
//!   ↓ annotate
//! <a xlink:href="W1234"><path id="W1234" d="…" style="fill: red; opacity: 0"/></a>
//!   ↓ highlight("W1234")
//! <a xlink:href="W1234"><path id="W1234" d="…" style="fill: red; opacity: 1"/></a>
//! ```
//!
//! Both passes stream events through quick-xml; anything they do not touch is
//! written back as read.

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::MapError;

const HIDDEN: &str = "0";
const SHOWN: &str = "1";

/// Annotated SVG plus the shape ids it now contains, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotatedMap {
    pub svg: String,
    pub ids: Vec<String>,
}

/// Give the first `<path>` of every linked `<a>` the link target as `id`, and
/// hide it.
///
/// The `href` attribute is matched on its local name, so `xlink:href`,
/// `svg:href` and plain `href` all count. Anchors without one are left alone.
pub fn annotate(svg: &str) -> Result<AnnotatedMap, MapError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len() + svg.len() / 8));
    let mut ids = Vec::new();

    // (depth of the anchor, href not yet assigned to a path)
    let mut anchors: Vec<(usize, Option<String>)> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(elem) => {
                depth += 1;
                if elem.local_name().as_ref() == b"a" {
                    if let Some(href) = href(&elem)? {
                        anchors.push((depth, Some(href)));
                    }
                    writer.write_event(Event::Start(elem))?;
                } else if is_path(&elem)
                    && let Some(id) = take_pending(&mut anchors)
                {
                    writer.write_event(Event::Start(hide(&elem, &id)?))?;
                    ids.push(id);
                } else {
                    writer.write_event(Event::Start(elem))?;
                }
            }
            Event::Empty(elem) => {
                if is_path(&elem)
                    && let Some(id) = take_pending(&mut anchors)
                {
                    writer.write_event(Event::Empty(hide(&elem, &id)?))?;
                    ids.push(id);
                } else {
                    writer.write_event(Event::Empty(elem))?;
                }
            }
            Event::End(elem) => {
                if anchors.last().is_some_and(|(d, _)| *d == depth) {
                    anchors.pop();
                }
                depth = depth.saturating_sub(1);
                writer.write_event(Event::End(elem))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    Ok(AnnotatedMap {
        svg: into_string(writer)?,
        ids,
    })
}

/// Copy of an annotated SVG where the shape `id` is visible.
///
/// An unknown id yields an unchanged copy.
pub fn highlight(svg: &str, id: &str) -> Result<String, MapError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len()));

    loop {
        match reader.read_event()? {
            Event::Start(elem) if is_path(&elem) && has_id(&elem, id)? => {
                writer.write_event(Event::Start(show(&elem)?))?;
            }
            Event::Empty(elem) if is_path(&elem) && has_id(&elem, id)? => {
                writer.write_event(Event::Empty(show(&elem)?))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    into_string(writer)
}

// ============================================================================
// Helpers
// ============================================================================

fn is_path(elem: &BytesStart<'_>) -> bool {
    elem.local_name().as_ref() == b"path"
}

/// Innermost anchor's href, if no path has claimed it yet.
fn take_pending(anchors: &mut [(usize, Option<String>)]) -> Option<String> {
    anchors.last_mut().and_then(|(_, pending)| pending.take())
}

/// Decoded `(qualified name, value)` pairs.
fn attributes(elem: &BytesStart<'_>) -> Result<Vec<(String, String)>, MapError> {
    elem.attributes()
        .map(|attr| {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let raw = std::str::from_utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(raw)?.into_owned();
            Ok((key, value))
        })
        .collect()
}

fn href(elem: &BytesStart<'_>) -> Result<Option<String>, MapError> {
    for attr in elem.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"href" {
            let raw = std::str::from_utf8(&attr.value)?;
            return Ok(Some(quick_xml::escape::unescape(raw)?.into_owned()));
        }
    }
    Ok(None)
}

fn has_id(elem: &BytesStart<'_>, id: &str) -> Result<bool, MapError> {
    Ok(attributes(elem)?
        .iter()
        .any(|(key, value)| key == "id" && value == id))
}

/// Rebuild a path with `id` first and the hidden opacity appended to its style.
fn hide(elem: &BytesStart<'_>, id: &str) -> Result<BytesStart<'static>, MapError> {
    let attrs = attributes(elem)?;
    let mut out = elem.to_owned();
    out.clear_attributes();
    out.push_attribute(("id", id));

    let mut styled = false;
    for (key, value) in &attrs {
        match key.as_str() {
            "id" => {}
            "style" => {
                styled = true;
                out.push_attribute((key.as_str(), with_opacity(value, HIDDEN).as_str()));
            }
            _ => out.push_attribute((key.as_str(), value.as_str())),
        }
    }
    if !styled {
        out.push_attribute(("style", with_opacity("", HIDDEN).as_str()));
    }
    Ok(out)
}

fn show(elem: &BytesStart<'_>) -> Result<BytesStart<'static>, MapError> {
    let attrs = attributes(elem)?;
    let mut out = elem.to_owned();
    out.clear_attributes();
    for (key, value) in &attrs {
        if key == "style" {
            out.push_attribute((key.as_str(), with_opacity(value, SHOWN).as_str()));
        } else {
            out.push_attribute((key.as_str(), value.as_str()));
        }
    }
    Ok(out)
}

/// Inline style with its `opacity` declaration set to `value`, appended last.
///
/// Other declarations keep their order; `fill-opacity` and friends are not
/// touched.
fn with_opacity(style: &str, value: &str) -> String {
    let opacity = format!("opacity: {value}");
    let mut decls: Vec<&str> = style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty() && !is_opacity(decl))
        .collect();
    decls.push(&opacity);
    decls.join("; ")
}

fn is_opacity(decl: &str) -> bool {
    decl.split_once(':')
        .is_some_and(|(property, _)| property.trim().eq_ignore_ascii_case("opacity"))
}

fn into_string(writer: Writer<Vec<u8>>) -> Result<String, MapError> {
    String::from_utf8(writer.into_inner()).map_err(|e| MapError::Utf8(e.utf8_error()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_annotate_sets_id_and_hides() {
        let svg = r#"<svg><a xlink:href="W1234"><path d="M0 0 L1 1" style="fill: red"/></a></svg>"#;
        let map = annotate(svg).unwrap();
        assert_eq!(map.ids, vec!["W1234".to_string()]);
        assert_eq!(
            map.svg,
            r#"<svg><a xlink:href="W1234"><path id="W1234" d="M0 0 L1 1" style="fill: red; opacity: 0"/></a></svg>"#
        );
    }

    #[test]
    fn test_annotate_path_without_style() {
        let svg = r#"<svg><svg:a href="N7"><svg:path d="M0 0"></svg:path></svg:a></svg>"#;
        let map = annotate(svg).unwrap();
        assert_eq!(map.ids, vec!["N7".to_string()]);
        assert!(
            map.svg
                .contains(r#"<svg:path id="N7" d="M0 0" style="opacity: 0"></svg:path>"#)
        );
    }

    #[test]
    fn test_annotate_only_first_path() {
        let svg = r#"<svg><a href="W1"><title>Gate</title><path d="A"/><path d="B"/></a><path d="C"/></svg>"#;
        let map = annotate(svg).unwrap();
        assert_eq!(map.ids, vec!["W1".to_string()]);
        assert!(map.svg.contains(r#"<path id="W1" d="A" style="opacity: 0"/>"#));
        assert!(map.svg.contains(r#"<path d="B"/>"#));
        assert!(map.svg.contains(r#"<path d="C"/>"#));
    }

    #[test]
    fn test_annotate_ignores_anchor_without_href() {
        let svg = r#"<svg><a name="x"><path d="A"/></a></svg>"#;
        let map = annotate(svg).unwrap();
        assert!(map.ids.is_empty());
        assert_eq!(map.svg, svg);
    }

    #[test]
    fn test_annotate_replaces_existing_id() {
        let svg = r#"<svg><a href="R3"><path id="old" d="A" style="stroke: blue;"/></a></svg>"#;
        let map = annotate(svg).unwrap();
        assert!(
            map.svg
                .contains(r#"<path id="R3" d="A" style="stroke: blue; opacity: 0"/>"#)
        );
        assert!(!map.svg.contains("old"));
    }

    #[test]
    fn test_annotate_keeps_escaped_text() {
        let svg = r#"<svg><a href="W1"><title>Fish &amp; Chips</title><path d="A"/></a></svg>"#;
        let map = annotate(svg).unwrap();
        assert!(map.svg.contains("<title>Fish &amp; Chips</title>"));
    }

    #[test]
    fn test_annotate_rejects_malformed() {
        assert!(annotate("<svg><a href=\"W1\"><path></svg>").is_err());
    }

    #[test]
    fn test_highlight_shows_one_shape() {
        let svg = r#"<svg><a href="W1"><path d="A"/></a><a href="W2"><path d="B"/></a></svg>"#;
        let map = annotate(svg).unwrap();

        let shown = highlight(&map.svg, "W2").unwrap();
        assert!(shown.contains(r#"<path id="W1" d="A" style="opacity: 0"/>"#));
        assert!(shown.contains(r#"<path id="W2" d="B" style="opacity: 1"/>"#));

        assert_eq!(highlight(&map.svg, "N404").unwrap(), map.svg);
    }

    #[test]
    fn test_opacity_leaves_other_properties() {
        let svg = r#"<svg><a href="W1"><path d="A" style="fill: red; fill-opacity: 0.5; stroke-opacity: 0"/></a></svg>"#;
        let map = annotate(svg).unwrap();
        assert!(map.svg.contains(
            r#"style="fill: red; fill-opacity: 0.5; stroke-opacity: 0; opacity: 0""#
        ));

        let shown = highlight(&map.svg, "W1").unwrap();
        assert!(shown.contains(
            r#"style="fill: red; fill-opacity: 0.5; stroke-opacity: 0; opacity: 1""#
        ));
    }

    #[test]
    fn test_annotate_replaces_existing_opacity() {
        let svg = r#"<svg><a href="N2"><path d="A" style="opacity: 0.8; fill: blue"/></a></svg>"#;
        let map = annotate(svg).unwrap();
        assert!(map.svg.contains(r#"style="fill: blue; opacity: 0""#));
        assert_eq!(map.svg.matches("opacity").count(), 1);
    }
}
