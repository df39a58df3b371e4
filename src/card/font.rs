use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use ttf_parser::{Face, name_id};
use usvg::fontdb;

use super::bitmap;

#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    descender: i16,
    family: Option<String>,
    face_index: u32,
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn scale(&self, font_size: f32) -> f32 {
        font_size / self.units_per_em.max(1) as f32
    }
}

/// Where the active font came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontSource {
    SystemFamily,
    FallbackFile,
    InstalledDefault,
    Bitmap,
}

/// Font handle used for measuring and drawing card text.
///
/// Without face data the text is drawn with the builtin 5x7 bitmap glyphs.
#[derive(Clone)]
pub struct CardFont {
    metrics: Option<FontMetrics>,
    source: FontSource,
}

impl CardFont {
    pub fn bitmap() -> Self {
        Self {
            metrics: None,
            source: FontSource::Bitmap,
        }
    }

    fn with_metrics(metrics: FontMetrics, source: FontSource) -> Self {
        Self {
            metrics: Some(metrics),
            source,
        }
    }

    pub fn source(&self) -> FontSource {
        self.source
    }

    pub fn is_bitmap(&self) -> bool {
        self.metrics.is_none()
    }

    pub fn family(&self) -> Option<&str> {
        self.metrics.as_ref().and_then(|metrics| metrics.family())
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.metrics.as_ref().map(|metrics| metrics.data())
    }

    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match &self.metrics {
            Some(metrics) => measure_text_width_px(text, font_size, metrics),
            None => bitmap::text_width(text, font_size),
        }
    }

    pub fn line_height(&self, font_size: f32) -> f32 {
        match &self.metrics {
            Some(metrics) => {
                let units = (metrics.ascender as i32 - metrics.descender as i32).max(1);
                units as f32 * metrics.scale(font_size)
            }
            None => font_size * 1.2,
        }
    }

    /// Distance from the top of a line box to its baseline.
    pub fn ascent(&self, font_size: f32) -> f32 {
        match &self.metrics {
            Some(metrics) => metrics.ascender.max(0) as f32 * metrics.scale(font_size),
            None => font_size * 0.95,
        }
    }
}

/// Resolves the card font: the preferred system family, then the fallback
/// font file, then whatever face is installed, then the bitmap glyphs.
/// Never fails. Every face it returns is registered in `db` under the family
/// name the SVG will ask for.
pub fn resolve_card_font(
    db: &mut fontdb::Database,
    family: &str,
    fallback_path: &Path,
) -> CardFont {
    match load_system_family(db, family) {
        Ok(metrics) => return CardFont::with_metrics(metrics, FontSource::SystemFamily),
        Err(err) => debug!("preferred font unavailable: {}", err),
    }

    match load_fallback_file(db, fallback_path) {
        Ok(metrics) => return CardFont::with_metrics(metrics, FontSource::FallbackFile),
        Err(err) => debug!("fallback font unavailable: {}", err),
    }

    match load_installed_default(db) {
        Ok(metrics) => return CardFont::with_metrics(metrics, FontSource::InstalledDefault),
        Err(err) => debug!("no installed font usable: {}", err),
    }

    debug!("drawing card text with bitmap glyphs");
    CardFont::bitmap()
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data, 0)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

fn measure_text_width_px(text: &str, font_size: f32, font: &FontMetrics) -> f32 {
    let Ok(face) = Face::parse(&font.data, font.face_index) else {
        return bitmap::text_width(text, font_size);
    };
    let mut advance = 0u32;
    for ch in text.chars() {
        if ch == '\n' {
            continue;
        }
        if ch == ' ' {
            advance = advance.saturating_add(font.space_advance as u32);
            continue;
        }
        if let Some(glyph) = face.glyph_index(ch) {
            let glyph_advance = face.glyph_hor_advance(glyph).unwrap_or(font.space_advance);
            advance = advance.saturating_add(glyph_advance as u32);
        } else {
            advance = advance.saturating_add(font.space_advance as u32);
        }
    }
    advance as f32 * font.scale(font_size)
}

fn load_font_metrics_from_data(data: &[u8], index: u32) -> Result<FontMetrics> {
    let face = Face::parse(data, index).map_err(|err| anyhow!("{}", err))?;
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    Ok(FontMetrics {
        data: Arc::new(data.to_vec()),
        units_per_em,
        space_advance,
        ascender: face.ascender(),
        descender: face.descender(),
        family: extract_family_name(&face),
        face_index: index,
    })
}

fn load_system_family(db: &fontdb::Database, family: &str) -> Result<FontMetrics> {
    let families = [fontdb::Family::Name(family)];
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    load_registered_face(db, id)
}

fn load_fallback_file(db: &mut fontdb::Database, path: &Path) -> Result<FontMetrics> {
    let metrics = load_font_metrics(path)?;
    let ids = db.load_font_source(fontdb::Source::Binary(metrics.data.clone()));
    let family = ids
        .first()
        .and_then(|id| db.face(*id))
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone());
    Ok(FontMetrics {
        family: family.or(metrics.family.clone()),
        ..metrics
    })
}

fn load_installed_default(db: &mut fontdb::Database) -> Result<FontMetrics> {
    let id = db
        .faces()
        .find(|face| !face.families.is_empty())
        .map(|face| face.id)
        .ok_or_else(|| anyhow!("no font faces installed"))?;
    let metrics = load_registered_face(db, id)?;
    if let Some(family) = metrics.family() {
        db.set_sans_serif_family(family);
    }
    Ok(metrics)
}

/// Metrics for a face already in `db`, named the way `db` names it.
fn load_registered_face(db: &fontdb::Database, id: fontdb::ID) -> Result<FontMetrics> {
    let family = db
        .face(id)
        .and_then(|face| face.families.first())
        .map(|(name, _)| name.clone());
    let mut metrics = db
        .with_face_data(id, |data, index| load_font_metrics_from_data(data, index))
        .ok_or_else(|| anyhow!("failed to load font data"))??;
    if family.is_some() {
        metrics.family = family;
    }
    Ok(metrics)
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Path of some font file installed on this machine, if there is one.
    pub(crate) fn installed_font_file() -> Option<(PathBuf, String)> {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        db.faces().find_map(|face| match (&face.source, face.families.first()) {
            (fontdb::Source::File(path), Some((family, _))) if face.index == 0 => {
                Some((path.clone(), family.clone()))
            }
            _ => None,
        })
    }

    #[test]
    fn empty_database_resolves_to_bitmap_glyphs() {
        let mut db = fontdb::Database::new();
        let font = resolve_card_font(
            &mut db,
            "Definitely Not A Font",
            Path::new("/nonexistent/font.ttf"),
        );
        assert_eq!(font.source(), FontSource::Bitmap);
        assert!(font.is_bitmap());
        assert!(font.family().is_none());
        assert!(font.data().is_none());
    }

    #[test]
    fn installed_face_is_used_when_names_miss() {
        let Some((path, _)) = installed_font_file() else {
            return;
        };
        let mut db = fontdb::Database::new();
        db.load_font_file(&path).expect("load font file");
        let font = resolve_card_font(
            &mut db,
            "Definitely Not A Font",
            Path::new("/nonexistent/font.ttf"),
        );
        assert_eq!(font.source(), FontSource::InstalledDefault);
        let family = font.family().expect("family").to_string();
        let generic = [fontdb::Family::SansSerif];
        let query = fontdb::Query {
            families: &generic,
            ..Default::default()
        };
        assert!(db.query(&query).is_some(), "sans-serif should map to {}", family);
    }

    #[test]
    fn fallback_file_is_registered_under_its_family() {
        let Some((path, family)) = installed_font_file() else {
            return;
        };
        let mut db = fontdb::Database::new();
        let font = resolve_card_font(&mut db, "Definitely Not A Font", &path);
        assert_eq!(font.source(), FontSource::FallbackFile);
        assert_eq!(font.family(), Some(family.as_str()));
        assert!(db.len() > 0);
    }

    #[test]
    fn bitmap_metrics_scale_with_size() {
        let font = CardFont::bitmap();
        let small = font.text_width("hello world", 10.0);
        let large = font.text_width("hello world", 20.0);
        assert!((large - small * 2.0).abs() < 0.001);
        assert!((font.line_height(20.0) - 24.0).abs() < 0.001);
        assert!(font.ascent(20.0) < font.line_height(20.0));
    }

    #[test]
    fn unreadable_font_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").expect("write");
        assert!(load_font_metrics(&path).is_err());
    }
}
