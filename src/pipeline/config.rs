use anyhow::{Context, Result};
use std::collections::HashMap;

use crate::ocr::{ColorFallback, FitRules, MergeRules, parse_hex_color};
use crate::settings::Settings;

/// ISO 639-1 codes mapped to tesseract language packs. Chinese is read
/// with the Japanese pack, which covers the shared ideographs.
const DETECTOR_LANGUAGES: &[(&str, &str)] = &[
    ("zh", "jpn"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("en", "eng"),
    ("fr", "fra"),
    ("de", "deu"),
    ("es", "spa"),
    ("it", "ita"),
    ("pt", "por"),
    ("ru", "rus"),
    ("ar", "ara"),
    ("hi", "hin"),
    ("th", "tha"),
    ("vi", "vie"),
];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Detections below this confidence are dropped. Default `60`.
    pub confidence_threshold: f32,
    pub merge: MergeRules,
    pub fit: FitRules,
    pub colors: ColorFallback,
    /// Language every region is translated into. Default `"en"`.
    pub target_lang: String,
    /// Appended to the source stem for the output file. Default `"-translated"`.
    pub output_suffix: String,
    pub detector_languages: HashMap<String, String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 60.0,
            merge: MergeRules::default(),
            fit: FitRules::default(),
            colors: ColorFallback::default(),
            target_lang: "en".to_string(),
            output_suffix: "-translated".to_string(),
            detector_languages: DETECTOR_LANGUAGES
                .iter()
                .map(|(code, pack)| (code.to_string(), pack.to_string()))
                .collect(),
        }
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut config = Self {
            confidence_threshold: settings.ocr_confidence,
            merge: MergeRules {
                vertical_ratio: settings.merge_vertical_ratio,
                horizontal_margin: settings.merge_margin,
            },
            fit: FitRules {
                reference_font_size: settings.render_reference_font_size,
                width_ratio: settings.render_width_ratio,
            },
            colors: ColorFallback {
                foreground: parse_hex_color(&settings.fallback_foreground)
                    .with_context(|| "invalid render.fallback_foreground")?,
                background: parse_hex_color(&settings.fallback_background)
                    .with_context(|| "invalid render.fallback_background")?,
            },
            target_lang: settings.target_lang.clone(),
            output_suffix: settings.output_suffix.clone(),
            ..Self::default()
        };
        for (code, pack) in &settings.ocr_languages {
            config
                .detector_languages
                .insert(code.to_lowercase(), pack.clone());
        }
        Ok(config)
    }

    /// Language code handed to the detector for `source_lang`. Unknown codes
    /// pass through so tesseract pack names can be given directly.
    pub fn detector_language(&self, source_lang: &str) -> String {
        let code = source_lang.trim().to_lowercase();
        self.detector_languages
            .get(&code)
            .cloned()
            .unwrap_or_else(|| source_lang.trim().to_string())
    }
}
