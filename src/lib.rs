use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub mod logging;
pub mod ocr;
pub mod pipeline;
pub mod providers;
pub mod settings;
mod translator;

#[cfg(test)]
pub(crate) mod test_util;

pub use pipeline::{
    CancelFlag, ImageJob, Pipeline, PipelineConfig, PipelineError, Worker, output_path,
    spawn_worker,
};
pub use providers::{Provider, ProviderKind, ProviderOptions};
pub use translator::{TranslateText, Translator};

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub source_lang: String,
    pub images: Vec<PathBuf>,
    pub target_lang: Option<String>,
    pub provider: Option<String>,
    pub key: Option<String>,
    pub model: Option<String>,
    pub email: Option<String>,
    pub confidence: Option<f32>,
    pub font_path: Option<String>,
    pub font_family: Option<String>,
    pub settings_path: Option<String>,
}

/// Builds the tesseract + HTTP provider pipeline from settings and CLI
/// overrides and starts it on a worker thread.
pub fn run(config: Config) -> Result<Worker> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let mut settings = settings::load_settings(settings_path)?;
    apply_overrides(&mut settings, &config);

    let kind = ProviderKind::from_name(&settings.provider)?;
    let provider = providers::build_provider(kind, ProviderOptions {
        key: config.key.clone(),
        email: settings.email.clone(),
        model: settings.model.clone(),
    })
    .with_context(|| format!("failed to set up provider {}", kind.as_str()))?;
    let translator = Translator::new(provider)?
        .with_timeout(Some(Duration::from_secs(settings.timeout_secs)));

    let pipeline_config = PipelineConfig::from_settings(&settings)?;
    let detector = ocr::TesseractDetector::new(settings.ocr_psm);
    let compositor = ocr::Compositor::new(resolve_font(&settings));
    info!(
        "translating {} image(s) {} -> {} via {}",
        config.images.len(),
        config.source_lang,
        pipeline_config.target_lang,
        kind.as_str()
    );

    let pipeline = Pipeline::new(detector, translator, compositor, pipeline_config);
    spawn_worker(pipeline, config.source_lang, config.images)
}

fn apply_overrides(settings: &mut settings::Settings, config: &Config) {
    if let Some(lang) = non_blank(&config.target_lang) {
        settings.target_lang = lang;
    }
    if let Some(provider) = non_blank(&config.provider) {
        settings.provider = provider;
    }
    if let Some(model) = non_blank(&config.model) {
        settings.model = Some(model);
    }
    if let Some(email) = non_blank(&config.email) {
        settings.email = Some(email);
    }
    if let Some(confidence) = config.confidence {
        settings.ocr_confidence = confidence;
    }
    if let Some(path) = non_blank(&config.font_path) {
        settings.font_path = Some(path);
    }
    if let Some(family) = non_blank(&config.font_family) {
        settings.font_family = Some(family);
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn resolve_font(settings: &settings::Settings) -> Option<ocr::ResolvedOverlayFont> {
    let font_path = settings.font_path.as_deref().map(Path::new);
    let font_family = settings.font_family.as_deref();
    match ocr::resolve_overlay_font(font_path, font_family, overlay_fallback_fonts()) {
        Ok(font) => {
            info!("overlay font: {}", font.family);
            Some(font)
        }
        Err(err) => {
            warn!("overlay font unavailable: {:#}", err);
            None
        }
    }
}

#[cfg(target_os = "macos")]
fn overlay_fallback_fonts() -> &'static [&'static str] {
    &["Noto Sans", "Hiragino Sans", "Helvetica", "Arial"]
}

#[cfg(target_os = "windows")]
fn overlay_fallback_fonts() -> &'static [&'static str] {
    &["Noto Sans", "Arial Unicode MS", "Arial", "Segoe UI"]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn overlay_fallback_fonts() -> &'static [&'static str] {
    &["Noto Sans", "DejaVu Sans", "Liberation Sans"]
}
