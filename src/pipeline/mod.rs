mod config;
mod error;
mod worker;

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use crate::ocr::{
    Compositor, TextDetector, TextRegion, fit_text, infer_colors, merge_fragments,
    normalize_detections,
};
use crate::translator::TranslateText;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use worker::{Worker, spawn_worker};

use error::reason;

/// Detect, translate and repaint the text of whole images.
pub struct Pipeline<D, T> {
    detector: D,
    translator: T,
    compositor: Compositor,
    config: PipelineConfig,
}

impl<D: TextDetector, T: TranslateText> Pipeline<D, T> {
    pub fn new(detector: D, translator: T, compositor: Compositor, config: PipelineConfig) -> Self {
        Self {
            detector,
            translator,
            compositor,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Translates one image. The returned job does the work lazily and
    /// yields one status line per step; it cannot be restarted.
    pub fn process(&self, source_lang: &str, path: impl AsRef<Path>) -> ImageJob<'_, D, T> {
        ImageJob {
            pipeline: self,
            source_lang: source_lang.to_string(),
            path: path.as_ref().to_path_buf(),
            state: JobState::Pending,
        }
    }

    /// Processes `paths` one after another. `cancel` is checked between
    /// images only; an image already started runs to completion.
    pub fn run_batch(
        &self,
        source_lang: &str,
        paths: Vec<PathBuf>,
        cancel: CancelFlag,
    ) -> BatchRun<'_, D, T> {
        BatchRun {
            pipeline: self,
            source_lang: source_lang.to_string(),
            paths: paths.into_iter(),
            current: None,
            cancel,
            finished: false,
        }
    }

    fn prepare(&self, source_lang: &str, path: &Path) -> Result<Option<Work>, PipelineError> {
        let file = file_label(path);
        let (image, format) = load_image(path).map_err(|err| PipelineError::UnreadableImage {
            file: file.clone(),
            reason: reason(&err),
        })?;

        let language = self.config.detector_language(source_lang);
        let detections = self
            .detector
            .detect(&image, &language)
            .map_err(|err| PipelineError::Detection {
                file: file.clone(),
                reason: reason(&err),
            })?;
        let fragments = normalize_detections(detections, self.config.confidence_threshold);
        let regions = merge_fragments(fragments, &self.config.merge);
        info!("{}: {} text region(s) to translate", file, regions.len());
        if regions.is_empty() {
            return Ok(None);
        }

        Ok(Some(Work {
            image,
            format,
            total: regions.len(),
            index: 0,
            regions: regions.into_iter(),
        }))
    }

    fn apply_region(&self, source_lang: &str, work: &mut Work, region: TextRegion) -> String {
        work.index += 1;
        let (index, total) = (work.index, work.total);

        let translated = match self.translate(&region.text, source_lang) {
            Ok(translated) => translated,
            Err(err) => {
                return PipelineError::Translation {
                    index,
                    total,
                    original: region.text,
                    reason: reason(&err),
                }
                .to_string();
            }
        };

        let colors = infer_colors(&work.image, &region.bbox, &self.config.colors);
        let fit = fit_text(
            &translated,
            region.bbox.w,
            self.compositor.font_metrics(),
            &self.config.fit,
        );
        debug!(
            "[{}/{}] bbox {:?} colors {:?} font size {:.1}",
            index, total, region.bbox, colors, fit.font_size
        );
        let painted = TextRegion {
            bbox: region.bbox,
            text: translated,
        };
        if let Err(err) = self
            .compositor
            .paint(&mut work.image, &painted, &colors, &fit)
        {
            return PipelineError::Render {
                index,
                total,
                original: region.text,
                reason: reason(&err),
            }
            .to_string();
        }
        format!(
            "[{}/{}] '{}' -> '{}'",
            index, total, region.text, painted.text
        )
    }

    fn translate(&self, text: &str, source_lang: &str) -> Result<String> {
        let translated = self
            .translator
            .translate(text, source_lang, &self.config.target_lang)?;
        let translated = translated.trim();
        if translated.is_empty() {
            anyhow::bail!("empty translation");
        }
        Ok(translated.to_string())
    }

    fn write_output(&self, path: &Path, work: Work) -> Result<String, PipelineError> {
        let output = output_path(path, &self.config.output_suffix);
        save_image(work.image, &output, work.format).map_err(|err| PipelineError::Write {
            file: file_label(path),
            reason: reason(&err),
        })?;
        Ok(format!("{} Written", file_label(&output)))
    }
}

/// Lazily processes one image; see [`Pipeline::process`].
pub struct ImageJob<'a, D, T> {
    pipeline: &'a Pipeline<D, T>,
    source_lang: String,
    path: PathBuf,
    state: JobState,
}

enum JobState {
    Pending,
    Working(Work),
    Done,
}

struct Work {
    image: RgbaImage,
    format: Option<ImageFormat>,
    regions: std::vec::IntoIter<TextRegion>,
    index: usize,
    total: usize,
}

impl<D: TextDetector, T: TranslateText> Iterator for ImageJob<'_, D, T> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, JobState::Done) {
            JobState::Pending => match self.pipeline.prepare(&self.source_lang, &self.path) {
                Ok(Some(work)) => {
                    self.state = JobState::Working(work);
                    self.next()
                }
                Ok(None) => Some(format!("{}: no text found", file_label(&self.path))),
                Err(err) => Some(err.to_string()),
            },
            JobState::Working(mut work) => match work.regions.next() {
                Some(region) => {
                    let message = self
                        .pipeline
                        .apply_region(&self.source_lang, &mut work, region);
                    self.state = JobState::Working(work);
                    Some(message)
                }
                None => Some(match self.pipeline.write_output(&self.path, work) {
                    Ok(message) => message,
                    Err(err) => err.to_string(),
                }),
            },
            JobState::Done => None,
        }
    }
}

/// Shared stop request for a running batch.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Status lines of a whole batch; see [`Pipeline::run_batch`].
pub struct BatchRun<'a, D, T> {
    pipeline: &'a Pipeline<D, T>,
    source_lang: String,
    paths: std::vec::IntoIter<PathBuf>,
    current: Option<ImageJob<'a, D, T>>,
    cancel: CancelFlag,
    finished: bool,
}

impl<D: TextDetector, T: TranslateText> Iterator for BatchRun<'_, D, T> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(job) = self.current.as_mut() {
                if let Some(message) = job.next() {
                    return Some(message);
                }
                self.current = None;
            }
            if self.finished {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.finished = true;
                return Some("cancelled".to_string());
            }
            match self.paths.next() {
                Some(path) => self.current = Some(self.pipeline.process(&self.source_lang, path)),
                None => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

/// `<stem><suffix>.<ext>` next to `path`; `png` when the source has no
/// extension.
pub fn output_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let ext = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_else(|| "png".to_string());
    path.with_file_name(format!("{}{}.{}", stem, suffix, ext))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_image(path: &Path) -> Result<(RgbaImage, Option<ImageFormat>)> {
    let reader = image::ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let image = reader.decode()?.to_rgba8();
    Ok((image, format))
}

fn save_image(image: RgbaImage, output: &Path, source_format: Option<ImageFormat>) -> Result<()> {
    let format = ImageFormat::from_path(output)
        .ok()
        .or(source_format)
        .unwrap_or(ImageFormat::Png);
    let result = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgba8(image)
            .to_rgb8()
            .save_with_format(output, format)
    } else {
        image.save_with_format(output, format)
    };
    result.with_context(|| format!("failed to encode {}", output.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::{BBoxPx, RawDetection, Rgba};
    use crate::test_util::{FailingDetector, FixedDetector, TableTranslator, word};

    const PAPER: Rgba = image::Rgba([240, 240, 240, 255]);
    const INK: Rgba = image::Rgba([20, 20, 20, 255]);

    fn pipeline<D: TextDetector>(
        detector: D,
        translator: TableTranslator,
    ) -> Pipeline<D, TableTranslator> {
        Pipeline::new(
            detector,
            translator,
            Compositor::new(None),
            PipelineConfig::default(),
        )
    }

    fn sample_image(dir: &Path, name: &str) -> PathBuf {
        let mut image = RgbaImage::from_pixel(120, 60, PAPER);
        for x in 12..30 {
            image.put_pixel(x, 15, INK);
        }
        let path = dir.join(name);
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn output_path_keeps_directory_and_extension() {
        assert_eq!(
            output_path(Path::new("/tmp/scans/page.jpg"), "-translated"),
            PathBuf::from("/tmp/scans/page-translated.jpg")
        );
        assert_eq!(
            output_path(Path::new("page"), "-en"),
            PathBuf::from("page-en.png")
        );
    }

    #[test]
    fn unreadable_image_ends_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let pipeline = pipeline(FixedDetector(Vec::new()), TableTranslator::default());
        let messages = pipeline.process("ja", &path).collect::<Vec<_>>();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("broken.png: failed to read image: "));
        assert!(!dir.path().join("broken-translated.png").exists());
    }

    #[test]
    fn detector_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_image(dir.path(), "page.png");
        let pipeline = pipeline(FailingDetector, TableTranslator::default());
        let messages = pipeline.process("ja", &path).collect::<Vec<_>>();
        insta::assert_debug_snapshot!(messages, @r#"
        [
            "page.png: text detection failed: tesseract exited with status 1",
        ]
        "#);
    }

    #[test]
    fn image_without_text_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_image(dir.path(), "blank.png");
        let low_confidence = RawDetection {
            conf: 30.0,
            ..word(10, 10, 20, 10, "noise")
        };
        let pipeline = pipeline(
            FixedDetector(vec![low_confidence]),
            TableTranslator::default(),
        );
        let messages = pipeline.process("ja", &path).collect::<Vec<_>>();
        assert_eq!(messages, vec!["blank.png: no text found".to_string()]);
        assert!(!dir.path().join("blank-translated.png").exists());
    }

    #[test]
    fn failed_region_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_image(dir.path(), "page.png");
        let pipeline = pipeline(
            FixedDetector(vec![
                word(10, 10, 30, 12, "ichi"),
                word(10, 40, 30, 12, "ni"),
            ]),
            TableTranslator::with(&[("ni", "two")]),
        );
        let messages = pipeline.process("ja", &path).collect::<Vec<_>>();
        insta::assert_debug_snapshot!(messages, @r#"
        [
            "[1/2] translation failed for 'ichi': service unavailable",
            "[2/2] 'ni' -> 'two'",
            "page-translated.png Written",
        ]
        "#);

        let output = image::open(dir.path().join("page-translated.png"))
            .unwrap()
            .to_rgba8();
        let source = image::open(&path).unwrap().to_rgba8();
        let second = BBoxPx::new(10, 40, 30, 12);
        for (x, y, pixel) in output.enumerate_pixels() {
            if !second.contains(x, y) {
                assert_eq!(pixel, source.get_pixel(x, y), "pixel ({x}, {y}) changed");
            }
        }
    }

    #[test]
    fn region_without_font_reports_rendering_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_image(dir.path(), "page.png");
        let pipeline = Pipeline::new(
            FixedDetector(vec![word(10, 10, 30, 12, "ichi")]),
            TableTranslator::with(&[("ichi", "one")]),
            Compositor::without_fonts(),
            PipelineConfig::default(),
        );
        let messages = pipeline.process("ja", &path).collect::<Vec<_>>();
        insta::assert_debug_snapshot!(messages, @r#"
        [
            "[1/1] rendering failed for 'ichi': no font available to draw text",
            "page-translated.png Written",
        ]
        "#);

        let output = image::open(dir.path().join("page-translated.png"))
            .unwrap()
            .to_rgba8();
        let source = image::open(&path).unwrap().to_rgba8();
        assert_eq!(output, source);
    }

    #[test]
    fn blank_translation_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample_image(dir.path(), "page.png");
        let pipeline = pipeline(
            FixedDetector(vec![word(10, 10, 30, 12, "ichi")]),
            TableTranslator::with(&[("ichi", "   ")]),
        );
        let messages = pipeline.process("ja", &path).collect::<Vec<_>>();
        assert_eq!(
            messages[0],
            "[1/1] translation failed for 'ichi': empty translation"
        );
    }

    #[test]
    fn cancelled_batch_stops_between_images() {
        let dir = tempfile::tempdir().unwrap();
        let first = sample_image(dir.path(), "one.png");
        let second = sample_image(dir.path(), "two.png");
        let pipeline = pipeline(FixedDetector(Vec::new()), TableTranslator::default());

        let cancel = CancelFlag::default();
        let mut batch = pipeline.run_batch("ja", vec![first, second], cancel.clone());
        assert_eq!(batch.next().as_deref(), Some("one.png: no text found"));
        cancel.cancel();
        assert_eq!(batch.next().as_deref(), Some("cancelled"));
        assert_eq!(batch.next(), None);
        assert_eq!(batch.next(), None);
    }

    #[test]
    fn batch_reports_every_image() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        let blank = sample_image(dir.path(), "blank.png");
        let pipeline = pipeline(FixedDetector(Vec::new()), TableTranslator::default());
        let messages = pipeline
            .run_batch("ja", vec![missing, blank], CancelFlag::default())
            .collect::<Vec<_>>();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("missing.png: failed to read image"));
        assert_eq!(messages[1], "blank.png: no text found");
    }
}
