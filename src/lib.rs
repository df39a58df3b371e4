use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub mod card;
pub mod deck;
pub mod logging;
pub mod session;
pub mod settings;

pub use card::{Background, FlashcardPair, TemplateCardRenderer, TemplateSet};
pub use deck::{Completion, Deck, Document, Flashcard};
pub use session::StudySession;

#[derive(Debug, Clone)]
pub struct Config {
    pub question: Option<String>,
    pub answer: Option<String>,
    pub deck_path: Option<String>,
    pub cards: usize,
    pub question_template: Option<String>,
    pub output_dir: String,
    pub format: String,
    pub print_prompt: Option<String>,
    pub settings_path: Option<String>,
}

pub fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let num_cards = deck::clamp_card_count(config.cards);

    if let Some(source) = config.print_prompt.as_deref() {
        let documents = load_documents(Path::new(source))?;
        return deck::render_flashcard_prompt(num_cards, &documents);
    }

    let (output_mime, extension) = resolve_output_format(&config.format)?;
    let deck = load_deck(&config, num_cards)?;
    let renderer = TemplateCardRenderer::from_settings(&settings);

    let output_dir = PathBuf::from(&config.output_dir);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let fixed_template = config.question_template.as_deref().map(PathBuf::from);
    let mut rng = rand::thread_rng();
    let mut written = Vec::new();
    for (idx, card) in deck.cards().iter().enumerate() {
        let template = fixed_template
            .clone()
            .or_else(|| renderer.templates().pick_question_template(&mut rng));
        let pair = renderer
            .create_flashcard_pair_with_rng(
                &card.question,
                &card.answer,
                template.as_deref(),
                &mut rng,
            )
            .with_context(|| format!("failed to render card {}", idx + 1))?;
        for (face, image) in [("front", &pair.front), ("back", &pair.back)] {
            let path = output_dir.join(format!("card-{:02}-{}.{}", idx + 1, face, extension));
            let bytes = card::encode_card(image, output_mime)?;
            fs::write(&path, bytes)
                .with_context(|| format!("failed to write card: {}", path.display()))?;
            info!("wrote {}", path.display());
            written.push(path.display().to_string());
        }
    }

    Ok(written.join("\n"))
}

fn load_deck(config: &Config, num_cards: usize) -> Result<Deck> {
    if let Some(path) = config.deck_path.as_deref() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read deck: {}", path))?;
        let deck = deck::parse_flashcards(&content, num_cards)?;
        if deck.is_empty() {
            return Err(anyhow!("no valid flashcards found in {}", path));
        }
        return Ok(deck);
    }

    let question = config.question.as_deref().map(str::trim).unwrap_or_default();
    let answer = config.answer.as_deref().map(str::trim).unwrap_or_default();
    if question.is_empty() || answer.is_empty() {
        return Err(anyhow!("--question and --answer are required without --deck"));
    }
    Ok(std::iter::once((question.to_string(), answer.to_string())).collect())
}

/// One document per blank-line separated paragraph.
fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read source text: {}", path.display()))?;
    let documents = content
        .split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(Document::new)
        .collect::<Vec<_>>();
    if documents.is_empty() {
        return Err(anyhow!("source text is empty: {}", path.display()));
    }
    Ok(documents)
}

fn resolve_output_format(format: &str) -> Result<(&'static str, &'static str)> {
    match format.trim().to_ascii_lowercase().as_str() {
        "png" => Ok(("image/png", "png")),
        "jpg" | "jpeg" => Ok(("image/jpeg", "jpg")),
        other => Err(anyhow!(
            "unsupported output format '{}' (expected png or jpeg)",
            other
        )),
    }
}
