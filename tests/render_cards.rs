use flashcard_renderer::{Config, run};

#[test]
fn single_card_is_written_as_two_images() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("out");
    let output = run(Config {
        question: Some("What is X?".to_string()),
        answer: Some("X is Y.".to_string()),
        deck_path: None,
        cards: 5,
        question_template: None,
        output_dir: output_dir.display().to_string(),
        format: "jpeg".to_string(),
        print_prompt: None,
        settings_path: None,
    })
    .unwrap();

    let written: Vec<_> = output.lines().collect();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("card-01-front.jpg"));
    assert!(written[1].ends_with("card-01-back.jpg"));
    for path in written {
        let image = image::open(path).unwrap();
        assert_eq!((image.width(), image.height()), (800, 500));
    }
}

#[test]
fn print_prompt_reads_source_text() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("notes.txt");
    std::fs::write(&source, "Cells divide by mitosis.\n\nMeiosis halves chromosomes.").unwrap();
    let output = run(Config {
        question: None,
        answer: None,
        deck_path: None,
        cards: 4,
        question_template: None,
        output_dir: dir.path().join("unused").display().to_string(),
        format: "png".to_string(),
        print_prompt: Some(source.display().to_string()),
        settings_path: None,
    })
    .unwrap();

    assert!(output.starts_with("Generate 4 high-quality flashcard questions"));
    assert!(output.contains("Cells divide by mitosis. Meiosis halves chromosomes."));
}
