use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "flashcard-renderer",
    version,
    about = "Render flashcard images from question/answer pairs"
)]
struct Cli {
    /// Question text for a single card
    #[arg(short = 'q', long = "question")]
    question: Option<String>,

    /// Answer text for a single card
    #[arg(short = 'a', long = "answer")]
    answer: Option<String>,

    /// File with model output containing {"question": ..., "answer": ...} objects
    #[arg(short = 'd', long = "deck")]
    deck: Option<String>,

    /// Number of cards to take from --deck or to request in the prompt (3-20)
    #[arg(short = 'n', long = "cards", default_value_t = 5)]
    cards: usize,

    /// Question template image to use for every card
    #[arg(short = 't', long = "question-template")]
    question_template: Option<String>,

    /// Directory to write rendered cards into
    #[arg(short = 'o', long = "output-dir", default_value = "cards")]
    output_dir: String,

    /// Output image format (png or jpeg)
    #[arg(short = 'f', long = "format", default_value = "png")]
    format: String,

    /// Print the flashcard generation prompt for a source text file and exit
    #[arg(long = "print-prompt")]
    print_prompt: Option<String>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    flashcard_renderer::logging::init(cli.verbose)?;

    let output = flashcard_renderer::run(flashcard_renderer::Config {
        question: cli.question,
        answer: cli.answer,
        deck_path: cli.deck,
        cards: cli.cards,
        question_template: cli.question_template,
        output_dir: cli.output_dir,
        format: cli.format,
        print_prompt: cli.print_prompt,
        settings_path: cli.read_settings,
    })?;

    println!("{}", output);
    Ok(())
}
