//! 5x7 bitmap glyphs drawn as SVG rects when no font face is installed.
//!
//! Each glyph sits in a 6x8 cell (one column and one row of spacing). Rows are
//! stored top to bottom with the leftmost pixel in bit 4.

const GLYPH_COLUMNS: u32 = 5;
const GLYPH_ROWS: u32 = 7;
const CELL_COLUMNS: f32 = 6.0;
const CELL_ROWS: f32 = 8.0;

/// Horizontal advance per character, in ems.
pub(crate) const ADVANCE_EM: f32 = CELL_COLUMNS / CELL_ROWS;

const MISSING: [u8; 7] = [
    0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111,
];

fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        ' ' => return None,
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
        '3' => [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
        '?' => [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b00000, 0b00100],
        '!' => [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100],
        '.' => [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100],
        ',' => [0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b00100, 0b01000],
        ':' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000],
        ';' => [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b00100, 0b01000],
        '\'' => [0b01100, 0b00100, 0b01000, 0b00000, 0b00000, 0b00000, 0b00000],
        '"' => [0b01010, 0b01010, 0b01010, 0b00000, 0b00000, 0b00000, 0b00000],
        '-' => [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000],
        '+' => [0b00000, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0b00000],
        '=' => [0b00000, 0b00000, 0b11111, 0b00000, 0b11111, 0b00000, 0b00000],
        '/' => [0b00000, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b00000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        other if other.is_whitespace() => return None,
        _ => MISSING,
    };
    Some(rows)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PixelRect {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) w: f32,
    pub(crate) h: f32,
}

pub(crate) fn text_width(text: &str, font_size: f32) -> f32 {
    text.chars().filter(|ch| *ch != '\n').count() as f32 * ADVANCE_EM * font_size
}

/// Rects covering the lit pixels of `text`, with the glyph block centred
/// vertically in a line box of `line_height` starting at (`x`, `top`).
/// Horizontal runs within a row are merged into one rect.
pub(crate) fn glyph_rects(
    text: &str,
    x: f32,
    top: f32,
    font_size: f32,
    line_height: f32,
) -> Vec<PixelRect> {
    let pixel = font_size / CELL_ROWS;
    let offset_y = (line_height - GLYPH_ROWS as f32 * pixel) / 2.0;
    let mut rects = Vec::new();
    let mut cell_x = x;
    for ch in text.chars().filter(|ch| *ch != '\n') {
        if let Some(rows) = glyph(ch) {
            for (row_idx, row) in rows.iter().enumerate() {
                let y = top + offset_y + row_idx as f32 * pixel;
                let mut col = 0;
                while col < GLYPH_COLUMNS {
                    if !lit(*row, col) {
                        col += 1;
                        continue;
                    }
                    let start = col;
                    while col < GLYPH_COLUMNS && lit(*row, col) {
                        col += 1;
                    }
                    rects.push(PixelRect {
                        x: cell_x + start as f32 * pixel,
                        y,
                        w: (col - start) as f32 * pixel,
                        h: pixel,
                    });
                }
            }
        }
        cell_x += CELL_COLUMNS * pixel;
    }
    rects
}

fn lit(row: u8, col: u32) -> bool {
    row & (1 << (GLYPH_COLUMNS - 1 - col)) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaces_draw_nothing_but_advance() {
        let rects = glyph_rects(" I", 0.0, 0.0, 8.0, 8.0);
        assert!(!rects.is_empty());
        assert!(rects.iter().all(|rect| rect.x >= 6.0));
        assert_eq!(text_width(" I", 8.0), 12.0);
    }

    #[test]
    fn runs_are_merged_per_row() {
        // Top row of 'T' is five lit pixels.
        let rects = glyph_rects("T", 0.0, 0.0, 8.0, 7.0);
        assert_eq!(
            rects[0],
            PixelRect {
                x: 0.0,
                y: 0.0,
                w: 5.0,
                h: 1.0
            }
        );
        assert_eq!(rects.len(), 7);
    }

    #[test]
    fn lowercase_and_unknown_characters_still_draw() {
        assert_eq!(glyph('a'), glyph('A'));
        assert_eq!(glyph('é'), Some(MISSING));
        assert_eq!(glyph('\t'), None);
    }
}
