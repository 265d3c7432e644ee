//! Tag-based feature selection.
//!
//! A [`Filter`] is an ordered list of required `(tag, value)` pairs. A feature
//! matches when every pair is present with an equal value and the feature has
//! a non-blank `name` (cards without a name are useless).

use std::fmt;

use thiserror::Error;

use crate::osm::{Feature, OsmId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("invalid tag filter `{0}`, expected `key=value`")]
    InvalidPair(String),
}

/// Required tag/value pairs, in the order given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pairs: Vec<(String, String)>,
}

impl Filter {
    /// Parse `key=value` strings.
    pub fn parse<I, S>(items: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pairs = items
            .into_iter()
            .map(|item| {
                let item = item.as_ref();
                match item.split_once('=') {
                    Some((key, value)) if !key.trim().is_empty() => {
                        Ok((key.trim().to_string(), value.trim().to_string()))
                    }
                    _ => Err(FilterError::InvalidPair(item.to_string())),
                }
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { pairs })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whether `feature` carries every required pair and a usable name.
    pub fn matches(&self, feature: &Feature) -> bool {
        feature.name().is_some()
            && self
                .iter()
                .all(|(key, value)| feature.tag(key) == Some(value))
    }

    /// Canonical bytes for identifier derivation (JSON array of pairs).
    pub fn fingerprint(&self) -> Vec<u8> {
        serde_json::to_vec(&self.pairs).unwrap_or_default()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.iter().map(|(k, v)| format!("{k}={v}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Identifiers of the features matching `filter`, in input order.
///
/// Duplicated ids in the input stay duplicated.
pub fn select(features: &[Feature], filter: &Filter) -> Vec<OsmId> {
    features
        .iter()
        .filter(|feature| filter.matches(feature))
        .map(|feature| feature.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm::Tags;

    fn feature(id: OsmId, pairs: &[(&str, &str)]) -> Feature {
        let tags: Tags = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Feature::new(id, tags)
    }

    #[test]
    fn test_select_requires_name() {
        let features = vec![
            feature(
                OsmId::way(1),
                &[("historic", "monument"), ("name", "Old Gate")],
            ),
            feature(OsmId::node(2), &[("historic", "monument")]),
        ];
        let filter = Filter::parse(["historic=monument"]).unwrap();
        assert_eq!(select(&features, &filter), vec![OsmId::way(1)]);
    }

    #[test]
    fn test_select_blank_name_is_no_match() {
        let features = vec![feature(
            OsmId::node(1),
            &[("heritage", "2"), ("name", " \t ")],
        )];
        let filter = Filter::parse(["heritage=2"]).unwrap();
        assert!(select(&features, &filter).is_empty());
    }

    #[test]
    fn test_select_all_pairs_required() {
        let features = vec![
            feature(
                OsmId::node(1),
                &[("heritage", "2"), ("historic", "castle"), ("name", "A")],
            ),
            feature(
                OsmId::node(2),
                &[("heritage", "2"), ("historic", "monument"), ("name", "B")],
            ),
            feature(OsmId::node(3), &[("heritage", "3"), ("name", "C")]),
        ];
        let filter = Filter::parse(["heritage=2", "historic=monument"]).unwrap();
        assert_eq!(select(&features, &filter), vec![OsmId::node(2)]);
    }

    #[test]
    fn test_select_empty_filter_keeps_named() {
        let features = vec![
            feature(OsmId::node(1), &[("name", "A")]),
            feature(OsmId::node(2), &[("amenity", "bench")]),
        ];
        assert_eq!(select(&features, &Filter::default()), vec![OsmId::node(1)]);
        assert!(select(&[], &Filter::default()).is_empty());
    }

    #[test]
    fn test_select_is_stable_and_keeps_duplicates() {
        let features = vec![
            feature(OsmId::way(9), &[("heritage", "2"), ("name", "Z")]),
            feature(OsmId::node(1), &[("heritage", "2"), ("name", "A")]),
            feature(OsmId::way(9), &[("heritage", "2"), ("name", "Z")]),
        ];
        let filter = Filter::parse(["heritage=2"]).unwrap();
        let first = select(&features, &filter);
        assert_eq!(first, vec![OsmId::way(9), OsmId::node(1), OsmId::way(9)]);
        assert_eq!(select(&features, &filter), first);
    }

    #[test]
    fn test_parse_rejects_malformed_pairs() {
        assert_eq!(
            Filter::parse(["heritage"]).unwrap_err(),
            FilterError::InvalidPair("heritage".into())
        );
        assert!(Filter::parse(["=2"]).is_err());
        let filter = Filter::parse([" heritage = 2 "]).unwrap();
        assert_eq!(filter.iter().collect::<Vec<_>>(), vec![("heritage", "2")]);
    }

    #[test]
    fn test_fingerprint_depends_on_order() {
        let ab = Filter::parse(["a=1", "b=2"]).unwrap();
        let ba = Filter::parse(["b=2", "a=1"]).unwrap();
        assert_eq!(ab.fingerprint(), br#"[["a","1"],["b","2"]]"#.to_vec());
        assert_ne!(ab.fingerprint(), ba.fingerprint());
    }

    #[test]
    fn test_display() {
        let filter = Filter::parse(["heritage=2", "historic=monument"]).unwrap();
        assert_eq!(filter.to_string(), "{heritage=2, historic=monument}");
    }
}
