use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub ocr_confidence: f32,
    pub ocr_psm: u32,
    pub ocr_languages: HashMap<String, String>,
    pub merge_vertical_ratio: f32,
    pub merge_margin: u32,
    pub render_width_ratio: f32,
    pub render_reference_font_size: f32,
    pub fallback_foreground: String,
    pub fallback_background: String,
    pub font_family: Option<String>,
    pub font_path: Option<String>,
    pub provider: String,
    pub target_lang: String,
    pub email: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: u64,
    pub output_suffix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr_confidence: 60.0,
            ocr_psm: 3,
            ocr_languages: HashMap::new(),
            merge_vertical_ratio: 0.7,
            merge_margin: 20,
            render_width_ratio: 0.95,
            render_reference_font_size: 32.0,
            fallback_foreground: "#ffffff".to_string(),
            fallback_background: "#000000".to_string(),
            font_family: None,
            font_path: None,
            provider: "mymemory".to_string(),
            target_lang: "en".to_string(),
            email: None,
            model: None,
            timeout_secs: 30,
            output_suffix: "-translated".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSettings>,
    merge: Option<MergeSettings>,
    render: Option<RenderSettings>,
    translate: Option<TranslateSettings>,
    output: Option<OutputSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    confidence: Option<f32>,
    psm: Option<u32>,
    languages: Option<HashMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
struct MergeSettings {
    vertical_ratio: Option<f32>,
    margin: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RenderSettings {
    width_ratio: Option<f32>,
    reference_font_size: Option<f32>,
    fallback_foreground: Option<String>,
    fallback_background: Option<String>,
    font_family: Option<String>,
    font_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSettings {
    provider: Option<String>,
    target_lang: Option<String>,
    email: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputSettings {
    suffix: Option<String>,
}

/// Loads the embedded defaults, then every settings file that exists, in
/// increasing precedence: `./settings.toml`, `./settings.local.toml`, the
/// home directory pair, and finally `extra_path`.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge(parse_settings(DEFAULT_SETTINGS_TOML, Path::new("<embedded>"))?);
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home_dir() {
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
            settings.merge(parse_settings(&content, &path)?);
        }
    }

    Ok(settings)
}

fn parse_settings(content: &str, path: &Path) -> Result<SettingsFile> {
    toml::from_str(content)
        .with_context(|| format!("failed to parse settings: {}", path.display()))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(ocr) = incoming.ocr {
            if let Some(confidence) = ocr.confidence {
                self.ocr_confidence = confidence;
            }
            if let Some(psm) = ocr.psm {
                self.ocr_psm = psm;
            }
            if let Some(languages) = ocr.languages {
                for (code, tesseract) in languages {
                    self.ocr_languages.insert(code.to_lowercase(), tesseract);
                }
            }
        }
        if let Some(merge) = incoming.merge {
            if let Some(ratio) = merge.vertical_ratio {
                if ratio > 0.0 {
                    self.merge_vertical_ratio = ratio;
                }
            }
            if let Some(margin) = merge.margin {
                self.merge_margin = margin;
            }
        }
        if let Some(render) = incoming.render {
            if let Some(ratio) = render.width_ratio {
                if ratio > 0.0 {
                    self.render_width_ratio = ratio;
                }
            }
            if let Some(size) = render.reference_font_size {
                if size > 0.0 {
                    self.render_reference_font_size = size;
                }
            }
            if let Some(color) = non_blank(render.fallback_foreground) {
                self.fallback_foreground = color;
            }
            if let Some(color) = non_blank(render.fallback_background) {
                self.fallback_background = color;
            }
            if let Some(family) = non_blank(render.font_family) {
                self.font_family = Some(family);
            }
            if let Some(path) = non_blank(render.font_path) {
                self.font_path = Some(path);
            }
        }
        if let Some(translate) = incoming.translate {
            if let Some(provider) = non_blank(translate.provider) {
                self.provider = provider;
            }
            if let Some(lang) = non_blank(translate.target_lang) {
                self.target_lang = lang;
            }
            if let Some(email) = non_blank(translate.email) {
                self.email = Some(email);
            }
            if let Some(model) = non_blank(translate.model) {
                self.model = Some(model);
            }
            if let Some(timeout) = translate.timeout_secs {
                self.timeout_secs = timeout;
            }
        }
        if let Some(output) = incoming.output {
            if let Some(suffix) = non_blank(output.suffix) {
                self.output_suffix = suffix;
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".image-translator-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn embedded_defaults_match_code_defaults() {
        let parsed = parse_settings(DEFAULT_SETTINGS_TOML, Path::new("<embedded>")).unwrap();
        let mut settings = Settings::default();
        settings.merge(parsed);
        assert_eq!(settings.ocr_confidence, 60.0);
        assert_eq!(settings.merge_margin, 20);
        assert_eq!(settings.provider, "mymemory");
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.ocr_languages.get("zh").map(String::as_str), Some("jpn"));
        assert_eq!(settings.font_path, None);
    }

    #[test]
    fn creates_home_settings_and_applies_extra_file() {
        with_temp_home(|home| {
            let extra = home.join("override.toml");
            fs::write(
                &extra,
                "[translate]\ntarget_lang = \"fr\"\ntimeout_secs = 0\n\n[ocr.languages]\nzh = \"chi_sim\"\n",
            )
            .unwrap();

            let settings = load_settings(Some(&extra)).unwrap();
            assert!(home.join(".image-translator-rust/settings.toml").exists());
            assert_eq!(settings.target_lang, "fr");
            assert_eq!(settings.timeout_secs, 0);
            assert_eq!(
                settings.ocr_languages.get("zh").map(String::as_str),
                Some("chi_sim")
            );
            assert_eq!(settings.ocr_languages.get("ja").map(String::as_str), Some("jpn"));
        });
    }

    #[test]
    fn missing_extra_file_is_an_error() {
        with_temp_home(|home| {
            let err = load_settings(Some(&home.join("absent.toml"))).unwrap_err();
            assert!(err.to_string().starts_with("settings file not found"));
        });
    }

    #[test]
    fn blank_values_do_not_override() {
        let mut settings = Settings::default();
        settings.merge(
            toml::from_str("[translate]\nprovider = \"  \"\n\n[output]\nsuffix = \"\"\n").unwrap(),
        );
        assert_eq!(settings.provider, "mymemory");
        assert_eq!(settings.output_suffix, "-translated");
    }
}
