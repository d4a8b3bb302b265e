use anyhow::{Result, anyhow};
use image::RgbaImage;
use std::cmp::Reverse;
use std::collections::HashMap;

use super::{BBoxPx, Rgba};

pub const WHITE: Rgba = image::Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba = image::Rgba([0, 0, 0, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPair {
    pub background: Rgba,
    pub foreground: Rgba,
}

/// Colors used when a region has too few distinct colors to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorFallback {
    pub foreground: Rgba,
    pub background: Rgba,
}

impl Default for ColorFallback {
    fn default() -> Self {
        Self {
            foreground: WHITE,
            background: BLACK,
        }
    }
}

/// Picks the dominant color inside `bbox` as background and the runner-up as
/// foreground.
///
/// Assumes the region is mostly flat background with a minority of glyph
/// pixels. Textured or photographic backgrounds produce arbitrary pairs.
pub fn infer_colors(image: &RgbaImage, bbox: &BBoxPx, fallback: &ColorFallback) -> ColorPair {
    let ranked = rank_colors(image, bbox);
    ColorPair {
        background: ranked.first().copied().unwrap_or(fallback.background),
        foreground: ranked.get(1).copied().unwrap_or(fallback.foreground),
    }
}

fn rank_colors(image: &RgbaImage, bbox: &BBoxPx) -> Vec<Rgba> {
    let area = bbox.clamp_to(image.width(), image.height());
    // color -> (count, first seen)
    let mut counts: HashMap<[u8; 4], (usize, usize)> = HashMap::new();
    let mut seen = 0usize;
    for y in area.y..area.bottom() {
        for x in area.x..area.right() {
            let pixel = image.get_pixel(x, y).0;
            counts.entry(pixel).or_insert((0, seen)).0 += 1;
            seen += 1;
        }
    }
    let mut ranked = counts.into_iter().collect::<Vec<_>>();
    ranked.sort_by_key(|(_, (count, first))| (Reverse(*count), *first));
    ranked
        .into_iter()
        .map(|(color, _)| image::Rgba(color))
        .collect()
}

/// Parses `#rrggbb` or `#rrggbbaa`.
pub fn parse_hex_color(value: &str) -> Result<Rgba> {
    let trimmed = value.trim();
    let hex = trimmed
        .strip_prefix('#')
        .ok_or_else(|| anyhow!("color '{}' must start with '#'", trimmed))?;
    if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
        return Err(anyhow!("color '{}' must be #rrggbb or #rrggbbaa", trimmed));
    }
    let mut channels = [255u8; 4];
    for (idx, channel) in channels.iter_mut().enumerate().take(hex.len() / 2) {
        let part = &hex[idx * 2..idx * 2 + 2];
        *channel = u8::from_str_radix(part, 16)
            .map_err(|_| anyhow!("color '{}' has an invalid channel '{}'", trimmed, part))?;
    }
    Ok(image::Rgba(channels))
}

pub(crate) fn to_svg_color(color: Rgba) -> String {
    let [r, g, b, _] = color.0;
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}
