use flashcard_renderer::deck::{Document, render_flashcard_prompt};

#[test]
fn flashcard_prompt_snapshot() {
    let documents = [
        Document::new("Photosynthesis converts light energy into chemical energy."),
        Document::new("Chlorophyll absorbs mostly blue and red light."),
    ];
    let prompt = render_flashcard_prompt(5, &documents).unwrap();
    insta::assert_snapshot!(prompt);
}
