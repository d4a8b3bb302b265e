use anyhow::{Context, Result, anyhow};
use image::RgbaImage;
use std::sync::Arc;
use tiny_skia::Pixmap;
use tracing::{debug, warn};
use usvg::{Options, Tree, fontdb};

use super::color::to_svg_color;
use super::font::default_overlay_font;
use super::{ColorPair, FontMetrics, ResolvedOverlayFont, TextFit, TextRegion};

/// Paints translated text over regions of an image.
///
/// The font database is built once; every region is rasterized with resvg at
/// the region's size and copied into the image, so pixels outside a region's
/// box are never written.
pub struct Compositor {
    fontdb: Arc<fontdb::Database>,
    font: Option<ResolvedOverlayFont>,
}

impl Compositor {
    /// Without an overlay font, a face already present in the system font
    /// database is used for both measuring and drawing.
    pub fn new(font: Option<ResolvedOverlayFont>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let font = match font {
            Some(resolved) => {
                db.load_font_data(resolved.metrics.data().to_vec());
                Some(resolved)
            }
            None => match default_overlay_font(&db) {
                Ok(resolved) => {
                    warn!("no overlay font resolved; drawing with {}", resolved.family);
                    Some(resolved)
                }
                Err(err) => {
                    warn!("no font available; translated text cannot be drawn ({:#})", err);
                    None
                }
            },
        };
        debug!("compositor font database has {} faces", db.len());
        Self {
            fontdb: Arc::new(db),
            font,
        }
    }

    #[cfg(test)]
    pub(crate) fn without_fonts() -> Self {
        Self {
            fontdb: Arc::new(fontdb::Database::new()),
            font: None,
        }
    }

    /// Metrics the type fitter must measure with so that widths agree with
    /// what gets rendered.
    pub fn font_metrics(&self) -> Option<&FontMetrics> {
        self.font.as_ref().map(|font| &font.metrics)
    }

    /// Fills the region with the background color and draws `region.text`
    /// centered in the foreground color. Overwrites the pixels in place.
    pub fn paint(
        &self,
        image: &mut RgbaImage,
        region: &TextRegion,
        colors: &ColorPair,
        fit: &TextFit,
    ) -> Result<()> {
        let area = region.bbox.clamp_to(image.width(), image.height());
        if area.is_empty() {
            return Ok(());
        }
        let family = match (&self.font, fit.is_drawable()) {
            (Some(font), _) => font.family.as_str(),
            (None, false) => "sans-serif",
            (None, true) => return Err(anyhow!("no font available to draw text")),
        };
        let svg = region_svg(area.w, area.h, &region.text, colors, fit, family);
        let options = Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Options::default()
        };
        let tree = Tree::from_str(&svg, &options).with_context(|| "failed to parse SVG")?;
        let mut pixmap =
            Pixmap::new(area.w, area.h).ok_or_else(|| anyhow!("empty region pixmap"))?;
        resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

        for (idx, pixel) in pixmap.pixels().iter().enumerate() {
            let idx = idx as u32;
            let color = pixel.demultiply();
            image.put_pixel(
                area.x + idx % area.w,
                area.y + idx / area.w,
                image::Rgba([color.red(), color.green(), color.blue(), color.alpha()]),
            );
        }
        Ok(())
    }
}

fn region_svg(
    width: u32,
    height: u32,
    text: &str,
    colors: &ColorPair,
    fit: &TextFit,
    font_family: &str,
) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    ));
    svg.push_str(&format!(
        r#"<rect x="0" y="0" width="{w}" height="{h}" fill="{fill}" fill-opacity="{opacity}"/>"#,
        w = width,
        h = height,
        fill = to_svg_color(colors.background),
        opacity = colors.background.0[3] as f32 / 255.0
    ));
    if fit.is_drawable() {
        let (x, baseline) = text_origin(width, height, fit);
        svg.push_str(&format!(
            r#"<text x="{x}" y="{y}" font-size="{size}" font-family="'{family}'" fill="{color}" fill-opacity="{opacity}" xml:space="preserve">{text}</text>"#,
            x = x,
            y = baseline,
            size = fit.font_size,
            family = escape_xml(font_family),
            color = to_svg_color(colors.foreground),
            opacity = colors.foreground.0[3] as f32 / 255.0,
            text = escape_xml(text)
        ));
    }
    svg.push_str("</svg>");
    svg
}

/// Left edge and baseline that center the fitted text in a `width` x
/// `height` box.
fn text_origin(width: u32, height: u32, fit: &TextFit) -> (f32, f32) {
    let x = (width as f32 - fit.text_width) / 2.0;
    let text_height = fit.ascent - fit.descent;
    let baseline = (height as f32 - text_height) / 2.0 + fit.ascent;
    (x, baseline)
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
