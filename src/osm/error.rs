//! OSM data errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading or fetching OSM data.
#[derive(Debug, Error)]
pub enum OsmError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("malformed OSM XML at byte {position}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("malformed XML attribute")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed XML entity")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("XML attribute is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("<{element}> is missing the `{attr}` attribute")]
    MissingAttribute {
        element: &'static str,
        attr: &'static str,
    },

    #[error("<{element}> has an invalid `{attr}` attribute: {value:?}")]
    InvalidAttribute {
        element: &'static str,
        attr: &'static str,
        value: String,
    },

    #[error("unknown OSM element type `{0}`")]
    UnknownType(String),

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: ureq::Error,
    },

    #[error("unexpected geocoder response")]
    Geocoder(#[from] serde_json::Error),

    #[error("no place found for query `{0}`")]
    PlaceNotFound(String),
}
