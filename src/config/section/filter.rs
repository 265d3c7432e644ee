//! `[filter]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [filter]
//! tags = ["heritage=2"]          # Every pair must match
//! ```
//!
//! `--tag` on the command line replaces the whole list.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::filter::{Filter, FilterError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Required `key=value` pairs, in order.
    pub tags: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            tags: vec!["heritage=2".into()],
        }
    }
}

impl FilterConfig {
    pub const TAGS: FieldPath = FieldPath::new("filter.tags");

    pub fn filter(&self) -> Result<Filter, FilterError> {
        Filter::parse(&self.tags)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        match self.filter() {
            Ok(filter) if filter.is_empty() => {
                diag.warn(Self::TAGS, "no required tag, every named feature is selected");
            }
            Ok(_) => {}
            Err(e) => {
                diag.error_with_hint(Self::TAGS, e.to_string(), "e.g. tags = [\"heritage=2\"]");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_filter_default() {
        let config = test_parse_config("");
        let filter = config.filter.filter().unwrap();
        assert_eq!(filter.to_string(), "{heritage=2}");
    }

    #[test]
    fn test_filter_tags() {
        let config = test_parse_config("[filter]\ntags = [\"historic=monument\", \"wikidata=Q1\"]");
        let filter = config.filter.filter().unwrap();
        assert_eq!(
            filter.iter().collect::<Vec<_>>(),
            vec![("historic", "monument"), ("wikidata", "Q1")]
        );
    }

    #[test]
    fn test_filter_validate() {
        let config = test_parse_config("[filter]\ntags = [\"heritage\"]");
        let mut diag = ConfigDiagnostics::new();
        config.filter.validate(&mut diag);
        assert_eq!(diag.len(), 1);
        assert!(diag.errors()[0].message.contains("heritage"));
    }

    #[test]
    fn test_filter_empty_warns() {
        let config = test_parse_config("[filter]\ntags = []");
        let mut diag = ConfigDiagnostics::new();
        config.filter.validate(&mut diag);
        assert!(diag.is_empty());
        assert_eq!(diag.warnings().len(), 1);
        assert_eq!(diag.warnings()[0].0.as_str(), "filter.tags");
    }
}
