use super::font::{FontMetrics, measure_text_width_px, vertical_metrics_px};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRules {
    /// Font size in pixels that corresponds to scale `1.0`. Default `32`.
    pub reference_font_size: f32,
    /// Share of the region width the text may occupy. Default `0.95`.
    pub width_ratio: f32,
}

impl Default for FitRules {
    fn default() -> Self {
        Self {
            reference_font_size: 32.0,
            width_ratio: 0.95,
        }
    }
}

/// Render parameters for one region's text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextFit {
    pub scale: f32,
    pub font_size: f32,
    /// Advance width at `font_size`.
    pub text_width: f32,
    pub ascent: f32,
    /// Negative, below the baseline.
    pub descent: f32,
}

impl TextFit {
    pub fn is_drawable(&self) -> bool {
        self.font_size > 0.0 && self.text_width > 0.0
    }
}

/// Scales `text` so its advance width is `width_ratio` of `target_width`.
///
/// Only the width is fitted; a long translation in a short region can end up
/// taller than the region.
pub fn fit_text(
    text: &str,
    target_width: u32,
    font: Option<&FontMetrics>,
    rules: &FitRules,
) -> TextFit {
    let reference_width = measure_text_width_px(text, rules.reference_font_size, font);
    let scale = if reference_width > 0.0 {
        (target_width as f32 / reference_width) * rules.width_ratio
    } else {
        0.0
    };
    let font_size = rules.reference_font_size * scale;
    let (ascent, descent) = vertical_metrics_px(font_size, font);
    TextFit {
        scale,
        font_size,
        text_width: reference_width * scale,
        ascent,
        descent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_matches_width_ratio_formula() {
        let rules = FitRules::default();
        let reference = measure_text_width_px("hello world", rules.reference_font_size, None);
        let fit = fit_text("hello world", 145, None, &rules);
        let expected = 0.95 * 145.0 / reference;
        assert!((fit.scale - expected).abs() < 1e-5);
        assert!((fit.font_size - expected * rules.reference_font_size).abs() < 1e-3);
        assert!((fit.text_width - 145.0 * 0.95).abs() < 1e-3);
    }

    #[test]
    fn scale_is_independent_of_reference_size() {
        let small = fit_text("abc", 90, None, &FitRules {
            reference_font_size: 10.0,
            width_ratio: 0.95,
        });
        let large = fit_text("abc", 90, None, &FitRules {
            reference_font_size: 40.0,
            width_ratio: 0.95,
        });
        assert!((small.font_size - large.font_size).abs() < 1e-3);
        assert!((small.text_width - large.text_width).abs() < 1e-3);
    }

    #[test]
    fn vertical_metrics_follow_fitted_size() {
        let fit = fit_text("wide text", 200, None, &FitRules::default());
        assert!((fit.ascent - fit.font_size * 0.8).abs() < 1e-3);
        assert!((fit.descent + fit.font_size * 0.2).abs() < 1e-3);
    }

    #[test]
    fn blank_text_is_not_drawable() {
        let fit = fit_text("", 100, None, &FitRules::default());
        assert_eq!(fit.scale, 0.0);
        assert!(!fit.is_drawable());
    }
}
