use anyhow::{anyhow, Result};
use image::RgbImage;
use rand::Rng;
use std::path::PathBuf;

use crate::card::{TemplateCardRenderer, TemplateSet};
use crate::deck::{Deck, Flashcard};

/// Review state for one deck: which card is shown, which face is up, and the
/// question template each card was assigned when the session started.
#[derive(Debug, Clone)]
pub struct StudySession {
    deck: Deck,
    assignments: Vec<Option<PathBuf>>,
    index: usize,
    show_front: bool,
}

impl StudySession {
    pub fn new<R: Rng + ?Sized>(deck: Deck, templates: &TemplateSet, rng: &mut R) -> Self {
        let assignments = deck
            .cards()
            .iter()
            .map(|_| templates.pick_question_template(rng))
            .collect();
        Self {
            deck,
            assignments,
            index: 0,
            show_front: true,
        }
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_showing_front(&self) -> bool {
        self.show_front
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.deck.get(self.index)
    }

    pub fn current_template(&self) -> Option<&std::path::Path> {
        self.assignments
            .get(self.index)
            .and_then(|assigned| assigned.as_deref())
    }

    pub fn flip(&mut self) {
        self.show_front = !self.show_front;
    }

    pub fn next(&mut self) {
        if !self.deck.is_empty() {
            self.index = (self.index + 1) % self.deck.len();
        }
        self.show_front = true;
    }

    pub fn prev(&mut self) {
        if !self.deck.is_empty() {
            self.index = (self.index + self.deck.len() - 1) % self.deck.len();
        }
        self.show_front = true;
    }

    pub fn jump_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        if !self.deck.is_empty() {
            self.index = rng.gen_range(0..self.deck.len());
        }
        self.show_front = true;
    }

    pub fn progress_label(&self) -> String {
        if self.deck.is_empty() {
            return "No cards available".to_string();
        }
        format!("Card {} of {}", self.index + 1, self.deck.len())
    }

    /// Renders the face of the current card that is facing up.
    pub fn render_current<R: Rng + ?Sized>(
        &self,
        renderer: &TemplateCardRenderer,
        rng: &mut R,
    ) -> Result<RgbImage> {
        let card = self
            .current()
            .ok_or_else(|| anyhow!("no cards available"))?;
        let pair = renderer.create_flashcard_pair_with_rng(
            &card.question,
            &card.answer,
            self.current_template(),
            rng,
        )?;
        Ok(if self.show_front { pair.front } else { pair.back })
    }
}
