//! Deck assembly.
//!
//! A [`DeckPlan`] collects everything that goes into one package (deck
//! identity, note model, notes, media) and validates notes as they are added.
//! A [`DeckAssembler`] turns a finished plan into a file.

mod anki;
pub mod model;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::card::{CardFields, ModelVariant};

pub use anki::AnkiPackager;
pub use model::NoteModel;

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("note has {found} fields but the `{model}` model expects {expected}")]
    FieldCountMismatch {
        expected: usize,
        found: usize,
        model: String,
    },

    #[error("note built for the {found} model cannot go into a {expected} deck")]
    VariantMismatch {
        expected: ModelVariant,
        found: ModelVariant,
    },

    #[error("media file `{0}` does not exist")]
    MissingMedia(PathBuf),

    #[error("identifier {0} does not fit in a signed 64-bit integer")]
    InvalidId(u64),

    #[error("failed to write package: {0}")]
    Package(String),
}

/// Result of a successful assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageSummary {
    pub notes: usize,
    pub cards: usize,
}

/// Contents of one package.
#[derive(Debug, Clone)]
pub struct DeckPlan {
    pub deck_id: u64,
    pub name: String,
    pub description: String,
    pub model: NoteModel,
    notes: Vec<CardFields>,
    media: Vec<PathBuf>,
}

impl DeckPlan {
    pub fn new(deck_id: u64, name: &str, description: &str, model: NoteModel) -> Self {
        Self {
            deck_id,
            name: name.to_string(),
            description: description.to_string(),
            model,
            notes: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Queue a note, rejecting fields that do not fit the model.
    pub fn add_note(&mut self, fields: CardFields) -> Result<(), DeckError> {
        if fields.variant != self.model.variant {
            return Err(DeckError::VariantMismatch {
                expected: self.model.variant,
                found: fields.variant,
            });
        }
        if fields.len() != self.model.field_count() {
            return Err(DeckError::FieldCountMismatch {
                expected: self.model.field_count(),
                found: fields.len(),
                model: self.model.name.clone(),
            });
        }
        self.notes.push(fields);
        Ok(())
    }

    /// Attach a media file (checked for existence at assembly).
    pub fn add_media(&mut self, path: impl Into<PathBuf>) {
        self.media.push(path.into());
    }

    pub fn notes(&self) -> &[CardFields] {
        &self.notes
    }

    pub fn media(&self) -> &[PathBuf] {
        &self.media
    }

    /// Cards generated on import: every note yields one card per template.
    pub fn card_count(&self) -> usize {
        self.notes.len() * self.model.template_count()
    }

    pub fn summary(&self) -> PackageSummary {
        PackageSummary {
            notes: self.notes.len(),
            cards: self.card_count(),
        }
    }
}

/// Writes a [`DeckPlan`] as an importable package.
pub trait DeckAssembler {
    /// Write `plan` to `output`, replacing any existing file.
    fn assemble(&self, plan: &DeckPlan, output: &Path) -> Result<PackageSummary, DeckError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_plan(variant: ModelVariant) -> DeckPlan {
        DeckPlan::new(
            1,
            "Monuments",
            "",
            NoteModel::for_variant(variant, 2, None),
        )
    }

    fn fields(variant: ModelVariant, values: &[&str]) -> CardFields {
        CardFields {
            variant,
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    #[test]
    fn test_add_note_checks_field_count() {
        let mut plan = new_plan(ModelVariant::Annotated);
        plan.add_note(fields(ModelVariant::Annotated, &["Gate", "W1", "url"]))
            .unwrap();

        let err = plan
            .add_note(fields(ModelVariant::Annotated, &["Gate", "W1"]))
            .unwrap_err();
        assert!(matches!(
            err,
            DeckError::FieldCountMismatch {
                expected: 3,
                found: 2,
                ..
            }
        ));
        assert_eq!(plan.notes().len(), 1);
    }

    #[test]
    fn test_add_note_checks_variant() {
        let mut plan = new_plan(ModelVariant::Basic);
        let err = plan
            .add_note(fields(ModelVariant::Annotated, &["Gate", "W1", "url"]))
            .unwrap_err();
        assert!(matches!(err, DeckError::VariantMismatch { .. }));
    }

    #[test]
    fn test_card_count() {
        let mut plan = new_plan(ModelVariant::Highlighted);
        assert_eq!(plan.summary(), PackageSummary::default());
        for name in ["A", "B", "C"] {
            plan.add_note(fields(
                ModelVariant::Highlighted,
                &[name, "<img src=\"g.svg\">", "<img src=\"h.svg\">", "url"],
            ))
            .unwrap();
        }
        assert_eq!(plan.summary(), PackageSummary { notes: 3, cards: 6 });

        let mut basic = new_plan(ModelVariant::Basic);
        basic
            .add_note(fields(ModelVariant::Basic, &["A", "node 1", "url"]))
            .unwrap();
        assert_eq!(basic.card_count(), 1);
    }
}
