//! Anki package (`.apkg`) writer backed by genanki-rs.

use std::fs;
use std::path::Path;

use genanki_rs::{Deck, Field, Model, Note, Package, Template};

use super::{DeckAssembler, DeckError, DeckPlan, NoteModel, PackageSummary};
use crate::debug;

/// Writes `.apkg` files.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnkiPackager;

impl AnkiPackager {
    pub const fn new() -> Self {
        Self
    }
}

impl DeckAssembler for AnkiPackager {
    fn assemble(&self, plan: &DeckPlan, output: &Path) -> Result<PackageSummary, DeckError> {
        let media = media_paths(plan)?;
        let model = build_model(&plan.model)?;

        let mut deck = Deck::new(to_anki_id(plan.deck_id)?, &plan.name, &plan.description);
        for fields in plan.notes() {
            let values: Vec<&str> = fields.values.iter().map(String::as_str).collect();
            let note = Note::new(model.clone(), values).map_err(package_error)?;
            deck.add_note(note);
        }

        if let Some(parent) = output.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| DeckError::Package(e.to_string()))?;
        }
        let output = output
            .to_str()
            .ok_or_else(|| DeckError::Package(format!("non UTF-8 path {}", output.display())))?;

        debug!("deck"; "writing {} notes, {} media files to {}", plan.notes().len(), media.len(), output);
        let mut package = Package::new(vec![deck], media).map_err(package_error)?;
        package.write_to_file(output).map_err(package_error)?;

        Ok(plan.summary())
    }
}

/// Media paths as strings, after checking that every file exists.
fn media_paths(plan: &DeckPlan) -> Result<Vec<&str>, DeckError> {
    plan.media()
        .iter()
        .map(|path| {
            if !path.is_file() {
                return Err(DeckError::MissingMedia(path.clone()));
            }
            path.to_str()
                .ok_or_else(|| DeckError::Package(format!("non UTF-8 path {}", path.display())))
        })
        .collect()
}

fn build_model(model: &NoteModel) -> Result<Model, DeckError> {
    let fields = model.fields.iter().map(|name| Field::new(name)).collect();
    let templates = model
        .templates
        .iter()
        .map(|t| Template::new(&t.name).qfmt(&t.front).afmt(&t.back))
        .collect();
    Ok(Model::new_with_options(
        to_anki_id(model.id)?,
        &model.name,
        fields,
        templates,
        Some(&model.css),
        None,
        None,
        None,
        None,
    ))
}

fn to_anki_id(id: u64) -> Result<i64, DeckError> {
    i64::try_from(id).map_err(|_| DeckError::InvalidId(id))
}

fn package_error(e: impl std::fmt::Display) -> DeckError {
    DeckError::Package(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardFields, ModelVariant};
    use tempfile::TempDir;

    fn plan(variant: ModelVariant, svg: Option<&str>) -> DeckPlan {
        DeckPlan::new(
            1_234_567,
            "Monuments",
            "Heritage sites",
            NoteModel::for_variant(variant, 7_654_321, svg),
        )
    }

    fn note(variant: ModelVariant, values: &[&str]) -> CardFields {
        CardFields {
            variant,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn is_zip(path: &Path) -> bool {
        fs::read(path).is_ok_and(|bytes| bytes.starts_with(b"PK"))
    }

    #[test]
    fn test_assemble_basic_package() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("output.apkg");

        let mut plan = plan(ModelVariant::Basic, None);
        plan.add_note(note(
            ModelVariant::Basic,
            &["Old Gate", "way 10", "https://www.openstreetmap.org/way/10"],
        ))
        .unwrap();
        plan.add_note(note(
            ModelVariant::Basic,
            &["Fish &amp; Chips", "node 4", "https://www.openstreetmap.org/node/4"],
        ))
        .unwrap();

        let summary = AnkiPackager::new().assemble(&plan, &output).unwrap();
        assert_eq!(summary, PackageSummary { notes: 2, cards: 2 });
        assert!(is_zip(&output));
    }

    #[test]
    fn test_assemble_with_media_overwrites() {
        let dir = TempDir::new().unwrap();
        let media = dir.path().join("media");
        fs::create_dir_all(&media).unwrap();
        fs::write(media.join("s.svg"), "<svg/>").unwrap();
        fs::write(media.join("s-W1.svg"), "<svg/>").unwrap();

        let output = dir.path().join("out").join("deck.apkg");
        fs::create_dir_all(output.parent().unwrap()).unwrap();
        fs::write(&output, "stale").unwrap();

        let mut plan = plan(ModelVariant::Highlighted, None);
        plan.add_note(note(
            ModelVariant::Highlighted,
            &[
                "Old Gate",
                r#"<img src="s.svg">"#,
                r#"<img src="s-W1.svg">"#,
                "https://www.openstreetmap.org/way/1",
            ],
        ))
        .unwrap();
        plan.add_media(media.join("s.svg"));
        plan.add_media(media.join("s-W1.svg"));

        let summary = AnkiPackager::new().assemble(&plan, &output).unwrap();
        assert_eq!(summary, PackageSummary { notes: 1, cards: 2 });
        assert!(is_zip(&output));
    }

    #[test]
    fn test_assemble_annotated_package() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("annotated.apkg");
        let svg = r#"<svg><a href="W1"><path id="W1" d="M0,0 L1,1" style="opacity: 0"/></a></svg>"#;

        let mut plan = plan(ModelVariant::Annotated, Some(svg));
        plan.add_note(note(
            ModelVariant::Annotated,
            &["Old Gate", "W1", "https://www.openstreetmap.org/way/1"],
        ))
        .unwrap();

        let summary = AnkiPackager::new().assemble(&plan, &output).unwrap();
        assert_eq!(summary.cards, 2);
        assert!(is_zip(&output));
    }

    #[test]
    fn test_missing_media_is_reported_before_writing() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("output.apkg");
        let missing = dir.path().join("media").join("nope.svg");

        let mut plan = plan(ModelVariant::Basic, None);
        plan.add_media(&missing);

        let err = AnkiPackager::new().assemble(&plan, &output).unwrap_err();
        assert!(matches!(err, DeckError::MissingMedia(p) if p == missing));
        assert!(!output.exists());
    }

    #[test]
    fn test_empty_deck_is_written() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("empty.apkg");
        let summary = AnkiPackager::new()
            .assemble(&plan(ModelVariant::Annotated, None), &output)
            .unwrap();
        assert_eq!(summary, PackageSummary::default());
        assert!(output.exists());
    }

    #[test]
    fn test_id_out_of_range() {
        assert!(matches!(to_anki_id(u64::MAX), Err(DeckError::InvalidId(_))));
        assert_eq!(to_anki_id(42).unwrap(), 42);
    }
}
