mod geom;
mod merge;
mod normalize;
mod parse;
mod tesseract;

use anyhow::{Context, Result};
use image::RgbaImage;
use std::io::Write;
use std::sync::OnceLock;
use tracing::debug;

use crate::ocr::RawDetection;

pub use merge::{MergeRules, merge_fragments};
pub use normalize::normalize_detections;

/// Source of word-level OCR hits for one image.
pub trait TextDetector {
    fn detect(&self, image: &RgbaImage, language: &str) -> Result<Vec<RawDetection>>;
}

/// Runs the `tesseract` binary and reads its word-level TSV output.
///
/// The installed language packs are listed once, on first detection.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    psm: u32,
    installed: OnceLock<Option<Vec<String>>>,
}

impl TesseractDetector {
    pub const DEFAULT_PSM: u32 = 3;

    pub fn new(psm: u32) -> Self {
        Self {
            psm,
            installed: OnceLock::new(),
        }
    }

    #[cfg(test)]
    fn with_installed(psm: u32, languages: &[&str]) -> Self {
        let detector = Self::new(psm);
        let languages = languages.iter().map(|lang| lang.to_string()).collect();
        let _ = detector.installed.set(Some(languages));
        detector
    }

    fn installed_languages(&self) -> Option<&[String]> {
        self.installed
            .get_or_init(|| match tesseract::list_tesseract_languages() {
                Ok(languages) => Some(languages),
                Err(err) => {
                    debug!("language packs unknown: {:#}", err);
                    None
                }
            })
            .as_deref()
    }

    fn resolve_languages(&self, requested: &str) -> Result<String> {
        tesseract::normalize_ocr_languages(requested, self.installed_languages())
    }
}

impl Default for TesseractDetector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PSM)
    }
}

impl TextDetector for TesseractDetector {
    fn detect(&self, image: &RgbaImage, language: &str) -> Result<Vec<RawDetection>> {
        let languages = self.resolve_languages(language)?;
        let mut tmp = tempfile::Builder::new()
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush().ok();

        let tsv = tesseract::run_tesseract_tsv(tmp.path(), &languages, self.psm)?;
        let detections = parse::parse_tsv_detections(&tsv)?;
        debug!(
            "tesseract ({}, psm {}) returned {} word rows",
            languages,
            self.psm,
            detections.len()
        );
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_packs_are_narrowed_to_installed_ones() {
        let detector = TesseractDetector::with_installed(3, &["eng", "jpn"]);
        assert_eq!(detector.resolve_languages("jpn+kor").unwrap(), "jpn");
        assert_eq!(detector.resolve_languages("eng").unwrap(), "eng");
        let err = detector.resolve_languages("kor").unwrap_err();
        assert!(err.to_string().contains("not available: kor"));
    }
}
