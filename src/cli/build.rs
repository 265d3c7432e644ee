//! Deck building orchestration.
//!
//! Pipeline phases:
//! - **Load** - Read the extract or run the Nominatim + Overpass query
//! - **Select** - Keep named features matching the tag filter
//! - **Identify** - Derive stable deck/model ids and the session id
//! - **Map** - Render, annotate and write the map SVGs (map models only)
//! - **Notes** - Build card fields for every selected feature
//! - **Package** - Write the `.apkg`

use crate::{
    card::{MapReference, ModelVariant, build_fields},
    config::OsmfcConfig,
    debug,
    deck::{AnkiPackager, DeckAssembler, DeckPlan, NoteModel, PackageSummary},
    filter::select,
    ident::{DeckIds, session_salt},
    log,
    logger::ProgressLine,
    map::{AnnotatedMap, MapMedia, MapRenderer, MapScene, SvgRenderer, annotate, write_media},
    osm::{FeatureTable, OsmId, normalize, open_source},
    utils::plural_count,
    warn,
};
use anyhow::{Context, Result};
use rustc_hash::FxHashSet;

/// Build the deck described by `config` and write the package.
pub fn build_deck(config: &OsmfcConfig) -> Result<PackageSummary> {
    let filter = config.filter()?;
    let renderer = SvgRenderer::from_config(&config.map)?;
    let variant = config.deck.model;

    // Load
    let source = open_source(
        &config.run.source,
        config.run.source_kind,
        &config.osm,
        &filter,
        renderer.layers(),
    );
    let table = source
        .load()
        .with_context(|| format!("Failed to load OSM data for `{}`", source.fingerprint()))?;
    if table.is_empty() {
        warn!("no tagged OSM element in `{}`", source.fingerprint());
    } else {
        log!("osm"; "{} loaded", plural_count(table.len(), "feature"));
    }

    // Select
    let selected = select(&table.features, &filter);
    if selected.is_empty() {
        warn!("no feature matches {}", filter);
    } else {
        log!("filter"; "{} matching {}", plural_count(selected.len(), "feature"), filter);
    }

    // Identify
    let ids = DeckIds::derive(
        source.fingerprint(),
        &filter.fingerprint(),
        variant.as_str(),
        &session_salt(),
    );
    debug!("deck"; "deck id {}, model id {}, session {}", ids.deck, ids.model, ids.session);

    // Map
    let maps = if variant.needs_map() && !selected.is_empty() {
        Some(render_maps(config, &renderer, &table, &selected, &ids.session_hex)?)
    } else {
        None
    };

    // Notes
    let model = NoteModel::for_variant(
        variant,
        ids.model,
        maps.as_ref().map(|(annotated, _)| annotated.svg.as_str()),
    );
    let mut plan = DeckPlan::new(ids.deck, &config.deck.name, &config.deck.description, model);
    add_notes(config, &mut plan, &table, &selected, maps.as_ref())?;

    if let Some((_, media)) = &maps {
        for file in media.files() {
            plan.add_media(file);
        }
    }

    // Package
    let output = &config.run.output;
    let summary = AnkiPackager::new()
        .assemble(&plan, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    log!(
        "deck";
        "wrote {} ({}, {})",
        output.display(),
        plural_count(summary.notes, "note"),
        plural_count(summary.cards, "card")
    );
    Ok(summary)
}

/// Render the annotated map and write it (plus per-feature copies for the
/// `highlighted` model) to the media directory.
fn render_maps(
    config: &OsmfcConfig,
    renderer: &SvgRenderer,
    table: &FeatureTable,
    selected: &[OsmId],
    session: &str,
) -> Result<(AnnotatedMap, MapMedia)> {
    let svg = renderer
        .render(&MapScene::new(table, selected))
        .context("Failed to render map")?;
    let annotated = annotate(&svg).context("Failed to annotate map")?;
    debug!("map"; "{} on the map", plural_count(annotated.ids.len(), "shape"));

    let per_feature = config.deck.model == ModelVariant::Highlighted;
    let media = write_media(&config.deck.media_dir, session, &annotated, per_feature)
        .context("Failed to write map files")?;
    log!(
        "map";
        "{} written to {}",
        plural_count(media.files().count(), "map"),
        config.deck.media_dir.display()
    );
    Ok((annotated, media))
}

/// One note per selected feature. Features missing from the map are skipped.
fn add_notes(
    config: &OsmfcConfig,
    plan: &mut DeckPlan,
    table: &FeatureTable,
    selected: &[OsmId],
    maps: Option<&(AnnotatedMap, MapMedia)>,
) -> Result<()> {
    let variant = config.deck.model;
    let index = table.index();
    let shapes: FxHashSet<&str> = maps
        .map(|(annotated, _)| annotated.ids.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let progress = ProgressLine::new("deck", &[("notes", selected.len())]);
    for id in selected {
        let Some(feature) = index.get(id) else {
            continue;
        };
        let shape = normalize(*id);

        let reference = match variant {
            ModelVariant::Basic => None,
            _ if !shapes.contains(shape.as_str()) => {
                warn!("{} has no shape on the map, skipped", id);
                progress.inc("notes");
                continue;
            }
            ModelVariant::Highlighted => maps.and_then(|(_, media)| media.reference(&shape)),
            ModelVariant::Annotated => Some(MapReference::SvgId(shape)),
        };

        let fields = build_fields(feature, variant, reference.as_ref(), &config.osm.base_url)?;
        debug!("card"; "{}: {} <{}>", id, fields.name(), fields.url());
        plan.add_note(fields)?;
        progress.inc("notes");
    }
    progress.finish();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use crate::config::test_parse_config;
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const EXTRACT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<osm version="0.6">
  <node id="1" lat="48.580" lon="7.740"/>
  <node id="2" lat="48.580" lon="7.742"/>
  <node id="3" lat="48.582" lon="7.742"/>
  <node id="4" lat="48.583" lon="7.745">
    <tag k="heritage" v="2"/>
    <tag k="name" v="Fish &amp; Chips Memorial"/>
  </node>
  <node id="5" lat="48.584" lon="7.746">
    <tag k="heritage" v="2"/>
  </node>
  <way id="10">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="1"/>
    <tag k="heritage" v="2"/>
    <tag k="name" v="Old Gate"/>
  </way>
  <way id="11">
    <nd ref="1"/><nd ref="3"/>
    <tag k="highway" v="residential"/>
  </way>
</osm>
"#;

    fn setup(dir: &Path, args: &[&str]) -> OsmfcConfig {
        let extract = dir.join("extract.osm");
        fs::write(&extract, EXTRACT).unwrap();
        let output = dir.join("output.apkg");

        let mut argv = vec![
            "osmfc".to_string(),
            "-o".to_string(),
            output.to_string_lossy().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        argv.push(extract.to_string_lossy().to_string());

        let mut config = test_parse_config("");
        config.deck.media_dir = dir.join("media");
        config.apply_cli(&Cli::parse_from(argv));
        config.validate().unwrap();
        config
    }

    fn media_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir.join("media"))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    fn load(config: &OsmfcConfig) -> (FeatureTable, Vec<OsmId>) {
        let filter = config.filter().unwrap();
        let source = open_source(
            &config.run.source,
            config.run.source_kind,
            &config.osm,
            &filter,
            &[],
        );
        let table = source.load().unwrap();
        let selected = select(&table.features, &filter);
        (table, selected)
    }

    #[test]
    fn test_add_notes_basic_fields() {
        let dir = TempDir::new().unwrap();
        let config = setup(dir.path(), &["-m", "basic"]);
        let (table, selected) = load(&config);
        assert_eq!(selected, vec![OsmId::node(4), OsmId::way(10)]);

        let model = NoteModel::for_variant(ModelVariant::Basic, 2, None);
        let mut plan = DeckPlan::new(1, "Monuments", "", model);
        add_notes(&config, &mut plan, &table, &selected, None).unwrap();

        let notes = plan.notes();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].name(), "Fish &amp; Chips Memorial");
        assert_eq!(notes[0].url(), "https://www.openstreetmap.org/node/4");
        assert_eq!(notes[1].name(), "Old Gate");
        assert!(notes[1].values[1].starts_with("way 10 ("));
        assert_eq!(notes[1].url(), "https://www.openstreetmap.org/way/10");
    }

    #[test]
    fn test_add_notes_annotated_uses_map_shapes() {
        let dir = TempDir::new().unwrap();
        let config = setup(dir.path(), &[]);
        let (table, selected) = load(&config);

        let renderer = SvgRenderer::from_config(&config.map).unwrap();
        let maps = render_maps(&config, &renderer, &table, &selected, "s").unwrap();
        let model = NoteModel::for_variant(ModelVariant::Annotated, 2, Some(&maps.0.svg));
        let mut plan = DeckPlan::new(1, "Monuments", "", model);
        add_notes(&config, &mut plan, &table, &selected, Some(&maps)).unwrap();

        let values: Vec<_> = plan.notes().iter().map(|n| n.values.clone()).collect();
        assert_eq!(
            values,
            vec![
                vec![
                    "Fish &amp; Chips Memorial".to_string(),
                    "N4".to_string(),
                    "https://www.openstreetmap.org/node/4".to_string(),
                ],
                vec![
                    "Old Gate".to_string(),
                    "W10".to_string(),
                    "https://www.openstreetmap.org/way/10".to_string(),
                ],
            ]
        );
    }

    #[test]
    fn test_add_notes_skips_features_off_the_map() {
        let dir = TempDir::new().unwrap();
        let config = setup(dir.path(), &[]);
        let (table, selected) = load(&config);

        let model = NoteModel::for_variant(ModelVariant::Annotated, 2, None);
        let mut plan = DeckPlan::new(1, "Monuments", "", model);
        add_notes(&config, &mut plan, &table, &selected, None).unwrap();
        assert!(plan.notes().is_empty());
    }

    #[test]
    fn test_build_annotated_deck() {
        let dir = TempDir::new().unwrap();
        let config = setup(dir.path(), &[]);

        let summary = build_deck(&config).unwrap();
        assert_eq!(summary, PackageSummary { notes: 2, cards: 4 });
        assert!(config.run.output.exists());

        let files = media_files(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with(".svg"));
    }

    #[test]
    fn test_build_highlighted_deck() {
        let dir = TempDir::new().unwrap();
        let config = setup(dir.path(), &["-m", "highlighted"]);

        let summary = build_deck(&config).unwrap();
        assert_eq!(summary, PackageSummary { notes: 2, cards: 4 });

        let files = media_files(dir.path());
        assert_eq!(files.len(), 3);
        assert!(files.iter().any(|f| f.ends_with("-W10.svg")));
        assert!(files.iter().any(|f| f.ends_with("-N4.svg")));
    }

    #[test]
    fn test_build_basic_deck_without_maps() {
        let dir = TempDir::new().unwrap();
        let config = setup(dir.path(), &["--model", "basic"]);

        let summary = build_deck(&config).unwrap();
        assert_eq!(summary, PackageSummary { notes: 2, cards: 2 });
        assert!(media_files(dir.path()).is_empty());
    }

    #[test]
    fn test_build_with_no_match() {
        let dir = TempDir::new().unwrap();
        let config = setup(dir.path(), &["-t", "historic=castle"]);

        let summary = build_deck(&config).unwrap();
        assert_eq!(summary, PackageSummary::default());
        assert!(config.run.output.exists());
        assert!(media_files(dir.path()).is_empty());
    }

    #[test]
    fn test_build_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut config = setup(dir.path(), &["-s", "file"]);
        config.run.source = dir.path().join("nope.osm").to_string_lossy().to_string();

        let err = build_deck(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to load OSM data"));
        assert!(!config.run.output.exists());
    }
}
