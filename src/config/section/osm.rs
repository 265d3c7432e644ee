//! `[osm]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [osm]
//! base_url = "https://www.openstreetmap.org"                 # Card links
//! nominatim_url = "https://nominatim.openstreetmap.org/search"
//! overpass_url = "https://overpass-api.de/api/interpreter"
//! timeout = 180                                             # Seconds, also sent to Overpass
//! user_agent = "osmfc/0.3 (flashcards from OpenStreetMap)"
//! max_response_mb = 64                                      # Overpass response cap
//! ```

use serde::{Deserialize, Serialize};

use crate::config::util::is_http_url;
use crate::config::{ConfigDiagnostics, FieldPath};

/// OpenStreetMap endpoints and HTTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OsmConfig {
    /// Base of the element URLs written on cards.
    pub base_url: String,

    /// Nominatim search endpoint.
    pub nominatim_url: String,

    /// Overpass interpreter endpoint.
    pub overpass_url: String,

    /// Request timeout in seconds.
    pub timeout: u64,

    /// User-Agent sent with every request (required by the OSM usage policies).
    pub user_agent: String,

    /// Largest Overpass response accepted, in MiB.
    pub max_response_mb: u64,
}

impl Default for OsmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.openstreetmap.org".into(),
            nominatim_url: "https://nominatim.openstreetmap.org/search".into(),
            overpass_url: "https://overpass-api.de/api/interpreter".into(),
            timeout: 180,
            user_agent: concat!(
                "osmfc/",
                env!("CARGO_PKG_VERSION"),
                " (flashcards from OpenStreetMap)"
            )
            .into(),
            max_response_mb: 64,
        }
    }
}

impl OsmConfig {
    pub const BASE_URL: FieldPath = FieldPath::new("osm.base_url");
    pub const NOMINATIM_URL: FieldPath = FieldPath::new("osm.nominatim_url");
    pub const OVERPASS_URL: FieldPath = FieldPath::new("osm.overpass_url");
    pub const TIMEOUT: FieldPath = FieldPath::new("osm.timeout");
    pub const USER_AGENT: FieldPath = FieldPath::new("osm.user_agent");
    pub const MAX_RESPONSE_MB: FieldPath = FieldPath::new("osm.max_response_mb");

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for (field, url) in [
            (Self::BASE_URL, &self.base_url),
            (Self::NOMINATIM_URL, &self.nominatim_url),
            (Self::OVERPASS_URL, &self.overpass_url),
        ] {
            if !is_http_url(url) {
                diag.error_with_hint(
                    field,
                    format!("`{url}` is not a valid URL"),
                    "use an absolute http(s) URL",
                );
            }
        }

        if self.timeout == 0 {
            diag.error(Self::TIMEOUT, "must be greater than 0");
        }
        if self.max_response_mb == 0 {
            diag.error(Self::MAX_RESPONSE_MB, "must be greater than 0");
        }
        if self.user_agent.trim().is_empty() {
            diag.error_with_hint(
                Self::USER_AGENT,
                "must not be empty",
                "Nominatim and Overpass reject anonymous clients",
            );
        }
    }
}
