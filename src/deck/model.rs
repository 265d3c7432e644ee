//! Note models, one per [`ModelVariant`].
//!
//! Field names come from [`ModelVariant::field_names`], the same list the
//! card builder fills, so a model always accepts the notes built for it.

use crate::card::ModelVariant;

/// Styling shared by every model.
pub const CARD_CSS: &str = ".card {
font-family: arial;
font-size: 20px;
text-align: center;
color: black;
background-color: white;
}
svg {
max-width: 100%;
height: auto;
}
";

const ANSWER_RULE: &str = "{{FrontSide}}\n\n<hr id=answer>\n\n";
const URL_LINE: &str = "(OSM url: <a href=\"{{URL}}\">{{URL}}</a>)";

/// One card type of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardTemplate {
    pub name: String,
    pub front: String,
    pub back: String,
}

impl CardTemplate {
    fn new(name: &str, front: String, back: String) -> Self {
        Self {
            name: name.to_string(),
            front,
            back,
        }
    }
}

/// A note type: ordered fields plus card templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteModel {
    pub id: u64,
    pub name: String,
    pub variant: ModelVariant,
    pub fields: Vec<String>,
    pub templates: Vec<CardTemplate>,
    pub css: String,
}

impl NoteModel {
    /// Build the model for `variant`.
    ///
    /// The `annotated` model embeds `svg` (an annotated map) in its
    /// templates; other variants ignore it.
    pub fn for_variant(variant: ModelVariant, id: u64, svg: Option<&str>) -> Self {
        let templates = match variant {
            ModelVariant::Highlighted => highlighted_templates(),
            ModelVariant::Annotated => annotated_templates(svg.map_or("", strip_prolog)),
            ModelVariant::Basic => basic_templates(),
        };
        let name = match variant {
            ModelVariant::Highlighted => "OpenStreetMap features",
            ModelVariant::Annotated => "OpenStreetMap features (annotated map)",
            ModelVariant::Basic => "OpenStreetMap features (basic)",
        };
        Self {
            id,
            name: name.to_string(),
            variant,
            fields: variant.field_names().iter().map(|f| f.to_string()).collect(),
            templates,
            css: CARD_CSS.to_string(),
        }
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }
}

fn highlighted_templates() -> Vec<CardTemplate> {
    vec![
        CardTemplate::new(
            "Card 1",
            "Where is {{FeatureName}}?\n\n{{GenericMap}}".to_string(),
            format!("{ANSWER_RULE}{{{{HighlightedMap}}}}\n\n{URL_LINE}"),
        ),
        CardTemplate::new(
            "Card 2",
            "What is this?\n\n{{HighlightedMap}}".to_string(),
            format!("{ANSWER_RULE}{{{{FeatureName}}}}<br>\n\n{URL_LINE}"),
        ),
    ]
}

/// Script revealing the shape whose id is the note's `OsmId`.
fn reveal_script() -> &'static str {
    "<script>\n\
     (function () {\n  \
       var shape = document.getElementById(\"{{OsmId}}\");\n  \
       if (shape) { shape.style.opacity = 1; }\n\
     })();\n\
     </script>"
}

fn annotated_templates(svg: &str) -> Vec<CardTemplate> {
    let script = reveal_script();
    vec![
        CardTemplate::new(
            "Card 1",
            format!("Where is {{{{FeatureName}}}}?\n\n<div class=\"map\">{svg}</div>"),
            format!("{ANSWER_RULE}{script}\n\n{URL_LINE}"),
        ),
        CardTemplate::new(
            "Card 2",
            format!("What is this?\n\n<div class=\"map\">{svg}</div>\n{script}"),
            format!("{ANSWER_RULE}{{{{FeatureName}}}}<br>\n\n{URL_LINE}"),
        ),
    ]
}

fn basic_templates() -> Vec<CardTemplate> {
    vec![CardTemplate::new(
        "Card 1",
        "{{Front}}".to_string(),
        format!("{ANSWER_RULE}{{{{Back}}}}\n\n{URL_LINE}"),
    )]
}

/// Drop the XML declaration so the document can sit inside HTML.
fn strip_prolog(svg: &str) -> &str {
    svg.find("<svg").map_or(svg, |start| &svg[start..])
}
