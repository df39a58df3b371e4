use super::font::CardFont;

/// Vertical gap between consecutive lines, in pixels.
pub const LINE_GAP: f32 = 15.0;
pub const MIN_FONT_SIZE: f32 = 10.0;
pub const FONT_SIZE_STEP: f32 = 2.0;

/// Wrapped text plus the font size it was wrapped at.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedLayout {
    pub font_size: f32,
    pub lines: Vec<String>,
    pub line_height: f32,
    pub total_height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: i32,
    pub y: i32,
    pub width: f32,
}

/// Greedy word wrap. A word wider than `max_width` sits alone on its line.
pub fn wrap_text(text: &str, font: &CardFont, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if font.text_width(&candidate, font_size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn block_height(line_count: usize, line_height: f32) -> f32 {
    if line_count == 0 {
        return 0.0;
    }
    line_count as f32 * line_height + (line_count - 1) as f32 * LINE_GAP
}

/// Wraps `text` at `initial_font_size`, then shrinks by two points at a time
/// until the block fits `max_height` or the size reaches the floor. At the
/// floor the text is returned as-is even if it still overflows.
pub fn fit_text(
    text: &str,
    initial_font_size: f32,
    max_width: f32,
    max_height: f32,
    font: &CardFont,
) -> FittedLayout {
    let mut layout = wrap_at(text, initial_font_size, max_width, font);
    while layout.total_height > max_height && layout.font_size > MIN_FONT_SIZE {
        let next_size = (layout.font_size - FONT_SIZE_STEP).max(MIN_FONT_SIZE);
        layout = wrap_at(text, next_size, max_width, font);
    }
    layout
}

fn wrap_at(text: &str, font_size: f32, max_width: f32, font: &CardFont) -> FittedLayout {
    let lines = wrap_text(text, font, font_size, max_width);
    let line_height = font.line_height(font_size);
    let total_height = block_height(lines.len(), line_height);
    FittedLayout {
        font_size,
        lines,
        line_height,
        total_height,
    }
}

/// Centres the block vertically and each line horizontally on a
/// `width` x `height` canvas. `y` is the top of the line box.
pub fn place_lines(
    layout: &FittedLayout,
    width: u32,
    height: u32,
    font: &CardFont,
) -> Vec<PlacedLine> {
    let mut y = centered_offset(height, layout.total_height);
    let step = (layout.line_height + LINE_GAP).round() as i32;
    let mut placed = Vec::with_capacity(layout.lines.len());
    for line in &layout.lines {
        let line_width = font.text_width(line, layout.font_size);
        placed.push(PlacedLine {
            text: line.clone(),
            x: centered_offset(width, line_width),
            y,
            width: line_width,
        });
        y += step;
    }
    placed
}

fn centered_offset(outer: u32, inner: f32) -> i32 {
    ((outer as f32 - inner) / 2.0).floor() as i32
}
