use anyhow::{Result, anyhow};
use image::RgbaImage;
use std::collections::HashMap;

use crate::ocr::{BBoxPx, RawDetection, TextDetector};
use crate::translator::TranslateText;

pub(crate) fn with_temp_home<F, R>(func: F) -> R
where
    F: FnOnce(&std::path::Path) -> R,
{
    static HOME_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
    let _guard = HOME_MUTEX.lock().unwrap_or_else(|err| err.into_inner());
    let dir = tempfile::tempdir().expect("tempdir");
    let old_home = std::env::var("HOME").ok();
    // SAFETY: HOME is only mutated while holding HOME_MUTEX.
    unsafe { std::env::set_var("HOME", dir.path()) };
    let result = func(dir.path());
    match old_home {
        Some(old) => unsafe { std::env::set_var("HOME", old) },
        None => unsafe { std::env::remove_var("HOME") },
    }
    result
}

pub(crate) fn word(x: u32, y: u32, w: u32, h: u32, text: &str) -> RawDetection {
    RawDetection {
        bbox: BBoxPx::new(x, y, w, h),
        conf: 95.0,
        text: text.to_string(),
        word_num: 1,
    }
}

/// Returns the same detections for every image.
pub(crate) struct FixedDetector(pub Vec<RawDetection>);

impl TextDetector for FixedDetector {
    fn detect(&self, _image: &RgbaImage, _language: &str) -> Result<Vec<RawDetection>> {
        Ok(self.0.clone())
    }
}

pub(crate) struct FailingDetector;

impl TextDetector for FailingDetector {
    fn detect(&self, _image: &RgbaImage, _language: &str) -> Result<Vec<RawDetection>> {
        Err(anyhow!("tesseract exited with status 1"))
    }
}

/// Looks translations up in a table; unknown text is an error.
#[derive(Default)]
pub(crate) struct TableTranslator(pub HashMap<String, String>);

impl TableTranslator {
    pub(crate) fn with(pairs: &[(&str, &str)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        )
    }
}

impl TranslateText for TableTranslator {
    fn translate(&self, text: &str, _source_lang: &str, _target_lang: &str) -> Result<String> {
        self.0
            .get(text)
            .cloned()
            .ok_or_else(|| anyhow!("service unavailable"))
    }
}
