mod color;
mod engine;
mod fit;
mod font;
mod render;

pub use color::{ColorFallback, ColorPair, infer_colors, parse_hex_color};
pub use engine::{
    MergeRules, TesseractDetector, TextDetector, merge_fragments, normalize_detections,
};
pub use fit::{FitRules, TextFit, fit_text};
pub use font::{FontMetrics, ResolvedOverlayFont, resolve_overlay_font};
pub use render::Compositor;

pub type Rgba = image::Rgba<u8>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BBoxPx {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl BBoxPx {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.h)
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Clamps the box to a `width` x `height` canvas. May return an empty box.
    pub fn clamp_to(&self, width: u32, height: u32) -> BBoxPx {
        let x = self.x.min(width);
        let y = self.y.min(height);
        BBoxPx {
            x,
            y,
            w: self.right().min(width) - x,
            h: self.bottom().min(height) - y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

/// One word-level hit as reported by the OCR engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RawDetection {
    pub bbox: BBoxPx,
    /// Engine confidence in `0..=100`; tesseract reports `-1` for non-word rows.
    pub conf: f32,
    pub text: String,
    pub word_num: u32,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TextFragment {
    pub bbox: BBoxPx,
    pub text: String,
    pub conf: f32,
}

/// A merged cluster of fragments; the unit of translation and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    pub bbox: BBoxPx,
    pub text: String,
}

impl TextRegion {
    pub(crate) fn seed(fragment: TextFragment) -> Self {
        Self {
            bbox: fragment.bbox,
            text: fragment.text,
        }
    }
}
