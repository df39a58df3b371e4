use anyhow::{Result, bail};
use image::RgbImage;
use rand::Rng;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use usvg::fontdb;

use super::font::{CardFont, resolve_card_font};
use super::layout::{FittedLayout, fit_text, place_lines};
use super::render::{Backdrop, TextRun, compose_svg, load_template, rasterize};
use super::templates::TemplateSet;
use super::{ANSWER_LABEL, Background, QUESTION_LABEL};
use crate::settings::{CardSettings, Settings, is_hex_color};

const TEMPLATE_FONT_SIZE: f32 = 32.0;
const FALLBACK_FONT_SIZE: f32 = 36.0;
const FALLBACK_LABEL_FONT_SIZE: f32 = 20.0;
const FALLBACK_WIDTH: u32 = 800;
const FALLBACK_HEIGHT: u32 = 500;
const FALLBACK_TEXT_WIDTH: f32 = 700.0;
const FALLBACK_LABEL_POSITION: (i32, i32) = (20, 20);

/// Both faces of a flashcard and the backgrounds they were drawn on.
pub struct FlashcardPair {
    pub front: RgbImage,
    pub back: RgbImage,
    pub front_background: Background,
    pub back_background: Background,
}

/// Draws card text onto template images, or onto a solid card when no
/// template is available. The font is resolved once on construction and the
/// renderer is read-only afterwards, so one instance can serve concurrent
/// render calls.
pub struct TemplateCardRenderer {
    templates: TemplateSet,
    settings: CardSettings,
    fonts: Arc<fontdb::Database>,
    font: CardFont,
}

impl TemplateCardRenderer {
    pub fn new(question_dir: &Path, answer_dir: &Path, settings: CardSettings) -> Self {
        Self::with_templates(TemplateSet::discover(question_dir, answer_dir), settings)
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.question_templates_dir,
            &settings.answer_templates_dir,
            settings.card.clone(),
        )
    }

    pub fn with_templates(templates: TemplateSet, settings: CardSettings) -> Self {
        let mut fonts = fontdb::Database::new();
        fonts.load_system_fonts();
        Self::with_fonts(templates, settings, fonts)
    }

    /// Uses `fonts` instead of the system font set.
    pub fn with_fonts(
        templates: TemplateSet,
        settings: CardSettings,
        mut fonts: fontdb::Database,
    ) -> Self {
        let font = resolve_card_font(
            &mut fonts,
            &settings.font_family,
            &settings.font_fallback_path,
        );
        debug!("card font: {:?} {:?}", font.source(), font.family());
        Self {
            templates,
            settings,
            fonts: Arc::new(fonts),
            font,
        }
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn settings(&self) -> &CardSettings {
        &self.settings
    }

    pub fn font(&self) -> &CardFont {
        &self.font
    }

    /// Fits `text` with the font this renderer draws it with.
    pub fn fit_text(
        &self,
        text: &str,
        initial_font_size: f32,
        max_width: f32,
        max_height: f32,
    ) -> FittedLayout {
        fit_text(text, initial_font_size, max_width, max_height, &self.font)
    }

    pub fn render(
        &self,
        background: &Background,
        text: &str,
        text_color: &str,
    ) -> Result<RgbImage> {
        ensure_color(text_color)?;
        let font = &self.font;
        let svg = match background {
            Background::Template(path) => {
                let template = load_template(path)?;
                let margin = self.settings.margin.saturating_mul(2);
                let max_width = template.width.saturating_sub(margin) as f32;
                let max_height = template.height.saturating_sub(margin) as f32;
                let layout = fit_text(text, TEMPLATE_FONT_SIZE, max_width, max_height, font);
                debug!(
                    "template {}: {} lines at {}px",
                    path.display(),
                    layout.lines.len(),
                    layout.font_size
                );
                let backdrop = Backdrop::Template(&template);
                let placed = place_lines(&layout, template.width, template.height, font);
                let runs = placed
                    .iter()
                    .map(|line| TextRun {
                        text: &line.text,
                        x: line.x,
                        y: line.y,
                        font_size: layout.font_size,
                        color: text_color,
                        shadow: true,
                    })
                    .collect::<Vec<_>>();
                compose_svg(&backdrop, &runs, font)
            }
            Background::Solid { label, color } => {
                ensure_color(color)?;
                // Height never triggers shrinking on the solid card.
                let layout = fit_text(
                    text,
                    FALLBACK_FONT_SIZE,
                    FALLBACK_TEXT_WIDTH,
                    f32::INFINITY,
                    font,
                );
                let backdrop = Backdrop::Solid {
                    color: color.as_str(),
                    width: FALLBACK_WIDTH,
                    height: FALLBACK_HEIGHT,
                };
                let placed = place_lines(&layout, FALLBACK_WIDTH, FALLBACK_HEIGHT, font);
                let mut runs = Vec::with_capacity(placed.len() + 1);
                runs.push(TextRun {
                    text: label.as_str(),
                    x: FALLBACK_LABEL_POSITION.0,
                    y: FALLBACK_LABEL_POSITION.1,
                    font_size: FALLBACK_LABEL_FONT_SIZE,
                    color: text_color,
                    shadow: true,
                });
                runs.extend(placed.iter().map(|line| TextRun {
                    text: &line.text,
                    x: line.x,
                    y: line.y,
                    font_size: layout.font_size,
                    color: text_color,
                    shadow: true,
                }));
                compose_svg(&backdrop, &runs, font)
            }
        };
        rasterize(&svg, Arc::clone(&self.fonts))
    }

    pub fn create_flashcard_pair(
        &self,
        question: &str,
        answer: &str,
        question_template: Option<&Path>,
    ) -> Result<FlashcardPair> {
        self.create_flashcard_pair_with_rng(
            question,
            answer,
            question_template,
            &mut rand::thread_rng(),
        )
    }

    /// Same as [`create_flashcard_pair`](Self::create_flashcard_pair) with the
    /// random source used for unmatched answer templates supplied by the caller.
    pub fn create_flashcard_pair_with_rng<R: Rng + ?Sized>(
        &self,
        question: &str,
        answer: &str,
        question_template: Option<&Path>,
        rng: &mut R,
    ) -> Result<FlashcardPair> {
        let (front_background, back_background) = self.pair_backgrounds(question_template, rng);
        let front = self.render(
            &front_background,
            question,
            self.text_color_for(&front_background),
        )?;
        let back = self.render(
            &back_background,
            answer,
            self.text_color_for(&back_background),
        )?;
        Ok(FlashcardPair {
            front,
            back,
            front_background,
            back_background,
        })
    }

    pub(crate) fn pair_backgrounds<R: Rng + ?Sized>(
        &self,
        question_template: Option<&Path>,
        rng: &mut R,
    ) -> (Background, Background) {
        let question_template =
            question_template.filter(|_| !self.templates.questions().is_empty());
        let front = match question_template {
            Some(path) => Background::Template(path.to_path_buf()),
            None => Background::solid(QUESTION_LABEL, &self.settings.question_color),
        };
        let answer_template =
            question_template.and_then(|path| self.templates.answer_template_for(path, rng));
        let back = match answer_template {
            Some(path) => Background::Template(path),
            None => Background::solid(ANSWER_LABEL, &self.settings.answer_color),
        };
        (front, back)
    }

    fn text_color_for(&self, background: &Background) -> &str {
        match background {
            Background::Template(_) => &self.settings.template_text_color,
            Background::Solid { .. } => &self.settings.fallback_text_color,
        }
    }
}

fn ensure_color(color: &str) -> Result<()> {
    if !is_hex_color(color) {
        bail!("invalid colour '{}': expected #RGB, #RRGGBB or #RRGGBBAA", color);
    }
    Ok(())
}
