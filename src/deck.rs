use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tera::{Context as TeraContext, Tera};
use tracing::{debug, info, warn};

const FLASHCARD_PROMPT: &str = include_str!("prompts/flashcard_prompt.tera");
const JSON_OBJECT_PATTERN: &str = r"\{[^}]+\}";

pub const MIN_CARDS: usize = 3;
pub const MAX_CARDS: usize = 20;
pub const DEFAULT_CARDS: usize = 5;

/// A retrieved text segment handed over by the document pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Text completion backend (an LLM) used to author flashcards.
pub trait Completion {
    fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

/// Ordered flashcards keyed by question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Flashcard>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a card; a repeated question keeps its position and takes the new answer.
    pub fn insert(&mut self, question: String, answer: String) {
        if let Some(existing) = self.cards.iter_mut().find(|card| card.question == question) {
            existing.answer = answer;
            return;
        }
        self.cards.push(Flashcard { question, answer });
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn get(&self, index: usize) -> Option<&Flashcard> {
        self.cards.get(index)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl FromIterator<(String, String)> for Deck {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut deck = Deck::new();
        for (question, answer) in iter {
            deck.insert(question, answer);
        }
        deck
    }
}

pub fn clamp_card_count(requested: usize) -> usize {
    requested.clamp(MIN_CARDS, MAX_CARDS)
}

pub fn render_flashcard_prompt(num_cards: usize, documents: &[Document]) -> Result<String> {
    let text = documents
        .iter()
        .map(|doc| doc.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let mut context = TeraContext::new();
    context.insert("num_cards", &num_cards);
    context.insert("text", text.as_str());
    Tera::one_off(FLASHCARD_PROMPT, &context, false)
        .with_context(|| "failed to render flashcard prompt")
}

/// Extracts `{"question": ..., "answer": ...}` objects from free-form model
/// output. Objects that fail to parse or lack non-empty strings are skipped.
pub fn parse_flashcards(response: &str, limit: usize) -> Result<Deck> {
    let pattern = Regex::new(JSON_OBJECT_PATTERN)
        .map_err(|err| anyhow!("invalid flashcard pattern: {}", err))?;
    let mut deck = Deck::new();
    if limit == 0 {
        return Ok(deck);
    }

    for found in pattern.find_iter(response) {
        let candidate = found.as_str().replace("\\\"", "\"");
        let value: serde_json::Value = match serde_json::from_str(candidate.trim()) {
            Ok(value) => value,
            Err(err) => {
                debug!("skipping malformed flashcard object: {}", err);
                continue;
            }
        };
        let question = value.get("question").and_then(|v| v.as_str()).map(str::trim);
        let answer = value.get("answer").and_then(|v| v.as_str()).map(str::trim);
        let (Some(question), Some(answer)) = (question, answer) else {
            continue;
        };
        if question.is_empty() || answer.is_empty() {
            continue;
        }
        let mut question = question.to_string();
        if !question.ends_with('?') {
            question.push('?');
        }
        deck.insert(question, answer.to_string());
        if deck.len() >= limit {
            break;
        }
    }

    Ok(deck)
}

pub fn generate_deck<C: Completion + ?Sized>(
    completion: &C,
    documents: &[Document],
    num_cards: usize,
) -> Result<Deck> {
    let prompt = render_flashcard_prompt(num_cards, documents)?;
    let response = completion
        .complete(&prompt)
        .with_context(|| "flashcard completion failed")?;
    let deck = parse_flashcards(&response, num_cards)?;
    if deck.len() < num_cards {
        warn!(
            "only generated {} valid flashcards out of {} requested",
            deck.len(),
            num_cards
        );
    } else {
        info!("generated {} flashcards", deck.len());
    }
    Ok(deck)
}
