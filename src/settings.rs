use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub question_templates_dir: PathBuf,
    pub answer_templates_dir: PathBuf,
    pub card: CardSettings,
}

/// Rendering knobs shared by every card the renderer produces.
#[derive(Debug, Clone)]
pub struct CardSettings {
    pub margin: u32,
    pub template_text_color: String,
    pub question_color: String,
    pub answer_color: String,
    pub fallback_text_color: String,
    pub font_family: String,
    pub font_fallback_path: PathBuf,
}

impl Default for CardSettings {
    fn default() -> Self {
        Self {
            margin: 50,
            template_text_color: "#FFFFFF".to_string(),
            question_color: "#4A90E2".to_string(),
            answer_color: "#27AE60".to_string(),
            fallback_text_color: "#FFFFFF".to_string(),
            font_family: "Arial".to_string(),
            font_fallback_path: PathBuf::from(
                "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
            ),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            question_templates_dir: PathBuf::from("templates/questions"),
            answer_templates_dir: PathBuf::from("templates/answers"),
            card: CardSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    templates: Option<TemplateSettings>,
    card: Option<CardSection>,
    font: Option<FontSection>,
}

#[derive(Debug, Default, Deserialize)]
struct TemplateSettings {
    question_dir: Option<String>,
    answer_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CardSection {
    margin: Option<u32>,
    template_text_color: Option<String>,
    question_color: Option<String>,
    answer_color: Option<String>,
    fallback_text_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FontSection {
    family: Option<String>,
    fallback_path: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    load_settings_with_home(home_dir().as_deref(), extra_path)
}

fn load_settings_with_home(home: Option<&Path>, extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(templates) = incoming.templates {
            if let Some(dir) = non_blank(templates.question_dir) {
                self.question_templates_dir = PathBuf::from(dir);
            }
            if let Some(dir) = non_blank(templates.answer_dir) {
                self.answer_templates_dir = PathBuf::from(dir);
            }
        }
        if let Some(card) = incoming.card {
            if let Some(margin) = card.margin {
                self.card.margin = margin;
            }
            merge_color(&mut self.card.template_text_color, card.template_text_color);
            merge_color(&mut self.card.question_color, card.question_color);
            merge_color(&mut self.card.answer_color, card.answer_color);
            merge_color(&mut self.card.fallback_text_color, card.fallback_text_color);
        }
        if let Some(font) = incoming.font {
            if let Some(family) = non_blank(font.family) {
                self.card.font_family = family;
            }
            if let Some(path) = non_blank(font.fallback_path) {
                self.card.font_fallback_path = PathBuf::from(path);
            }
        }
    }
}

fn merge_color(target: &mut String, incoming: Option<String>) {
    let Some(color) = non_blank(incoming) else {
        return;
    };
    if is_hex_color(&color) {
        *target = color;
    } else {
        tracing::warn!("ignoring invalid colour '{}' in settings", color);
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Accepts `#RGB`, `#RRGGBB` and `#RRGGBBAA`.
pub(crate) fn is_hex_color(value: &str) -> bool {
    let Some(hex) = value.strip_prefix('#') else {
        return false;
    };
    matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|ch| ch.is_ascii_hexdigit())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".flashcard-renderer"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_embedded_settings() {
        let home = tempdir().expect("tempdir");
        let settings = load_settings_with_home(Some(home.path()), None).expect("settings");
        assert_eq!(settings.card.margin, 50);
        assert_eq!(settings.card.question_color, "#4A90E2");
        assert_eq!(settings.card.answer_color, "#27AE60");
        assert_eq!(settings.card.font_family, "Arial");
    }

    #[test]
    fn home_and_extra_files_override_in_order() {
        let home = tempdir().expect("tempdir");
        fs::write(
            home.path().join("settings.toml"),
            "[card]\nmargin = 30\nanswer_color = \"#000000\"\n",
        )
        .expect("write home settings");
        let extra_dir = tempdir().expect("tempdir");
        let extra = extra_dir.path().join("extra.toml");
        fs::write(
            &extra,
            concat!(
                "[card]\nmargin = 20\nquestion_color = \"not-a-colour\"\n",
                "[templates]\nquestion_dir = \"  \"\n",
            ),
        )
        .expect("write extra settings");

        let settings = load_settings_with_home(Some(home.path()), Some(&extra)).expect("settings");
        assert_eq!(settings.card.margin, 20);
        assert_eq!(settings.card.answer_color, "#000000");
        assert_eq!(settings.card.question_color, "#4A90E2");
        assert_eq!(
            settings.question_templates_dir,
            PathBuf::from("templates/questions")
        );
    }

    #[test]
    fn missing_explicit_settings_file_is_an_error() {
        let home = tempdir().expect("tempdir");
        let missing = home.path().join("nope.toml");
        let err = load_settings_with_home(Some(home.path()), Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn hex_colour_validation() {
        assert!(is_hex_color("#fff"));
        assert!(is_hex_color("#00000040"));
        assert!(!is_hex_color("red"));
        assert!(!is_hex_color("#12345"));
    }
}
