use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{DynamicImage, GenericImageView, RgbImage};
use resvg::render;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tiny_skia::Pixmap;
use usvg::{Options, Tree, fontdb};

use super::bitmap;
use super::font::CardFont;

const SHADOW_OFFSET: i32 = 2;
const SHADOW_COLOR: &str = "#000000";
const SHADOW_OPACITY: f32 = 0.25;

/// A template decoded and normalised to RGB, re-encoded as PNG for embedding.
pub(crate) struct TemplateImage {
    pub(crate) png: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

pub(crate) enum Backdrop<'a> {
    Template(&'a TemplateImage),
    Solid { color: &'a str, width: u32, height: u32 },
}

impl Backdrop<'_> {
    pub(crate) fn size(&self) -> (u32, u32) {
        match self {
            Backdrop::Template(template) => (template.width, template.height),
            Backdrop::Solid { width, height, .. } => (*width, *height),
        }
    }
}

/// One line of text; `y` is the top of the line box.
pub(crate) struct TextRun<'a> {
    pub(crate) text: &'a str,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) font_size: f32,
    pub(crate) color: &'a str,
    pub(crate) shadow: bool,
}

pub(crate) fn load_template(path: &Path) -> Result<TemplateImage> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read template: {}", path.display()))?;
    let decoded = image::load_from_memory(&bytes)
        .with_context(|| format!("failed to decode template: {}", path.display()))?;
    let (width, height) = decoded.dimensions();
    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut png = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .with_context(|| format!("failed to normalise template: {}", path.display()))?;
    Ok(TemplateImage { png, width, height })
}

pub(crate) fn compose_svg(
    backdrop: &Backdrop<'_>,
    runs: &[TextRun<'_>],
    font: &CardFont,
) -> String {
    let (width, height) = backdrop.size();
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    match backdrop {
        Backdrop::Template(template) => {
            let data_uri = format!("data:image/png;base64,{}", BASE64.encode(&template.png));
            svg.push_str(&format!(
                r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
                uri = data_uri,
                w = width,
                h = height
            ));
        }
        Backdrop::Solid { color, .. } => {
            svg.push_str(&format!(
                r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{fill}"/>"#,
                w = width,
                h = height,
                fill = escape_xml(color)
            ));
        }
    }

    for run in runs {
        if run.shadow {
            push_text(
                &mut svg,
                run,
                font,
                SHADOW_OFFSET,
                SHADOW_COLOR,
                Some(SHADOW_OPACITY),
            );
        }
        push_text(&mut svg, run, font, 0, run.color, None);
    }

    svg.push_str("</svg>");
    svg
}

fn push_text(
    svg: &mut String,
    run: &TextRun<'_>,
    font: &CardFont,
    offset: i32,
    color: &str,
    opacity: Option<f32>,
) {
    let fill = escape_xml(color);
    let opacity = opacity
        .map(|value| format!(r#" fill-opacity="{}""#, value))
        .unwrap_or_default();
    let x = (run.x + offset) as f32;
    let y = (run.y + offset) as f32;

    if font.is_bitmap() {
        let line_height = font.line_height(run.font_size);
        svg.push_str(&format!(r#"<g fill="{}"{}>"#, fill, opacity));
        for rect in bitmap::glyph_rects(run.text, x, y, run.font_size, line_height) {
            svg.push_str(&format!(
                r#"<rect x="{}" y="{}" width="{}" height="{}"/>"#,
                rect.x, rect.y, rect.w, rect.h
            ));
        }
        svg.push_str("</g>");
        return;
    }

    svg.push_str(&format!(
        r#"<text x="{x}" y="{y}" font-size="{size}" font-family="{family}" fill="{fill}"{opacity} xml:space="preserve">{text}</text>"#,
        x = x,
        y = y + font.ascent(run.font_size),
        size = run.font_size,
        family = escape_xml(font.family().unwrap_or("sans-serif")),
        fill = fill,
        opacity = opacity,
        text = escape_xml(run.text)
    ));
}

pub(crate) fn rasterize(svg: &str, fontdb: Arc<fontdb::Database>) -> Result<RgbImage> {
    let options = Options {
        fontdb,
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse card SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty card size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from card SVG"))?;
    Ok(DynamicImage::ImageRgba8(image).to_rgb8())
}

/// Encodes a rendered card for display, e.g. `image/jpeg` for a preview.
pub fn encode_card(card: &RgbImage, output_mime: &str) -> Result<Vec<u8>> {
    let format = image_format_from_mime(output_mime)
        .ok_or_else(|| anyhow!("unsupported output image mime '{}'", output_mime))?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    DynamicImage::ImageRgb8(card.clone())
        .write_to(&mut cursor, format)
        .with_context(|| "failed to encode card image")?;
    Ok(bytes)
}

fn image_format_from_mime(mime: &str) -> Option<image::ImageFormat> {
    match mime {
        "image/png" => Some(image::ImageFormat::Png),
        "image/jpeg" => Some(image::ImageFormat::Jpeg),
        "image/jpg" => Some(image::ImageFormat::Jpeg),
        "image/bmp" => Some(image::ImageFormat::Bmp),
        _ => None,
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::font::resolve_card_font;

    fn white_run(text: &str) -> TextRun<'_> {
        TextRun {
            text,
            x: 100,
            y: 200,
            font_size: 36.0,
            color: "#FFFFFF",
            shadow: true,
        }
    }

    const SOLID_BLUE: Backdrop<'static> = Backdrop::Solid {
        color: "#4A90E2",
        width: 800,
        height: 500,
    };

    #[test]
    fn svg_draws_shadow_before_primary_text() {
        let Some((path, _)) = crate::card::font::tests::installed_font_file() else {
            return;
        };
        let mut db = fontdb::Database::new();
        let font = resolve_card_font(&mut db, "Definitely Not A Font", &path);
        let svg = compose_svg(&SOLID_BLUE, &[white_run("A & <B>")], &font);
        let shadow = svg.find(r##"fill="#000000" fill-opacity="0.25""##).expect("shadow run");
        let primary = svg.find(r##"fill="#FFFFFF""##).expect("primary run");
        assert!(shadow < primary);
        assert!(svg.contains(r#"x="102""#));
        assert!(svg.contains("A &amp; &lt;B&gt;"));
        assert!(svg.contains(r##"<rect x="0" y="0" width="800" height="500" fill="#4A90E2"/>"##));
    }

    #[test]
    fn bitmap_font_draws_glyph_rects_with_shadow() {
        let svg = compose_svg(&SOLID_BLUE, &[white_run("T")], &CardFont::bitmap());
        assert!(!svg.contains("<text"));
        let shadow = svg
            .find(r##"<g fill="#000000" fill-opacity="0.25">"##)
            .expect("shadow group");
        let primary = svg.find(r##"<g fill="#FFFFFF">"##).expect("primary group");
        assert!(shadow < primary);
        // Top bar of the 'T' starts at the run's left edge.
        assert!(svg[primary..].contains(r#"<rect x="100" "#));
        assert!(svg[shadow..primary].contains(r#"<rect x="102" "#));
    }

    #[test]
    fn colours_are_escaped_in_attributes() {
        let backdrop = Backdrop::Solid {
            color: r#"red" onload="x"#,
            width: 10,
            height: 10,
        };
        let run = TextRun {
            color: "<blue>",
            ..white_run("I")
        };
        let svg = compose_svg(&backdrop, &[run], &CardFont::bitmap());
        assert!(svg.contains(r#"fill="red&quot; onload=&quot;x""#));
        assert!(svg.contains(r#"<g fill="&lt;blue&gt;">"#));
    }

    #[test]
    fn solid_backdrop_rasterizes_to_its_colour() {
        let backdrop = Backdrop::Solid {
            color: "#27AE60",
            width: 40,
            height: 30,
        };
        let svg = compose_svg(&backdrop, &[], &CardFont::bitmap());
        let image = rasterize(&svg, Arc::new(fontdb::Database::new())).expect("rasterize");
        assert_eq!(image.dimensions(), (40, 30));
        assert_eq!(image.get_pixel(20, 15).0, [0x27, 0xAE, 0x60]);
    }

    #[test]
    fn corrupt_template_is_reported_with_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").expect("write");
        let err = match load_template(&path) {
            Ok(_) => panic!("expected decode failure"),
            Err(err) => err,
        };
        assert!(format!("{:#}", err).contains("broken.png"));
    }

    #[test]
    fn encode_rejects_unknown_mime() {
        let card = RgbImage::new(4, 4);
        assert!(encode_card(&card, "image/x-unknown").is_err());
        let jpeg = encode_card(&card, "image/jpeg").expect("jpeg");
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    }
}
