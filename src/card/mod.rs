mod bitmap;
mod font;
mod generator;
mod layout;
mod render;
mod templates;

pub use font::{CardFont, FontMetrics, FontSource, load_font_metrics, resolve_card_font};
pub use generator::{FlashcardPair, TemplateCardRenderer};
pub use layout::{
    FittedLayout, LINE_GAP, MIN_FONT_SIZE, PlacedLine, block_height, fit_text, place_lines,
    wrap_text,
};
pub use render::encode_card;
pub use templates::TemplateSet;

use std::path::PathBuf;

pub const QUESTION_LABEL: &str = "QUESTION";
pub const ANSWER_LABEL: &str = "ANSWER";

/// What a card face is drawn on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Background {
    Template(PathBuf),
    Solid { label: String, color: String },
}

impl Background {
    pub fn solid(label: &str, color: &str) -> Self {
        Background::Solid {
            label: label.to_string(),
            color: color.to_string(),
        }
    }

    pub fn template_path(&self) -> Option<&std::path::Path> {
        match self {
            Background::Template(path) => Some(path.as_path()),
            Background::Solid { .. } => None,
        }
    }
}
