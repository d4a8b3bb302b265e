use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::{Face, name_id};
use usvg::fontdb;

const FALLBACK_ASCENT_EM: f32 = 0.8;
const FALLBACK_DESCENT_EM: f32 = -0.2;

/// Horizontal and vertical metrics of one parsed face, kept alongside the raw
/// font data so the renderer can load the exact same face.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    face_index: u32,
    units_per_em: u16,
    space_advance: u16,
    ascender: i16,
    descender: i16,
    family: Option<String>,
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("family", &self.family)
            .field("face_index", &self.face_index)
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub(crate) fn ascent_em(&self) -> f32 {
        self.ascender as f32 / self.units_per_em.max(1) as f32
    }

    pub(crate) fn descent_em(&self) -> f32 {
        self.descender as f32 / self.units_per_em.max(1) as f32
    }
}

#[derive(Debug)]
pub struct ResolvedOverlayFont {
    pub metrics: FontMetrics,
    pub family: String,
}

fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(&data, None)
        .map_err(|err| anyhow!("failed to parse font: {} ({})", path.display(), err))
}

/// Finds the overlay font: an explicit file first, then a family name, then
/// the first available family from `fallback`.
pub fn resolve_overlay_font(
    font_path: Option<&Path>,
    font_family: Option<&str>,
    fallback: &[&str],
) -> Result<ResolvedOverlayFont> {
    if let Some(path) = font_path {
        let metrics = load_font_metrics(path)?;
        let family = metrics
            .family()
            .map(|name| name.to_string())
            .or_else(|| font_family.map(|name| name.to_string()))
            .unwrap_or_else(|| "sans-serif".to_string());
        return Ok(ResolvedOverlayFont { metrics, family });
    }

    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    if let Some(family) = font_family {
        return load_font_metrics_from_family(&db, family);
    }

    for candidate in fallback {
        if let Ok(resolved) = load_font_metrics_from_family(&db, candidate) {
            return Ok(resolved);
        }
    }

    Err(anyhow!("no fallback fonts found"))
}

/// Advance width of `text` in pixels at `font_size`. Without a font the
/// width is estimated from character classes.
pub(crate) fn measure_text_width_px(text: &str, font_size: f32, font: Option<&FontMetrics>) -> f32 {
    if let Some(font) = font {
        if let Ok(face) = Face::parse(&font.data, font.face_index) {
            let mut advance = 0u32;
            for ch in text.chars() {
                if ch == '\n' {
                    continue;
                }
                if ch == ' ' {
                    advance = advance.saturating_add(font.space_advance as u32);
                    continue;
                }
                let glyph_advance = face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .unwrap_or(font.space_advance);
                advance = advance.saturating_add(glyph_advance as u32);
            }
            let units = font.units_per_em.max(1) as f32;
            return advance as f32 * (font_size / units);
        }
    }
    estimate_text_width_units(text) * font_size
}

/// `(ascent, descent)` in pixels; descent is negative.
pub(crate) fn vertical_metrics_px(font_size: f32, font: Option<&FontMetrics>) -> (f32, f32) {
    match font {
        Some(font) => (
            font.ascent_em() * font_size,
            font.descent_em() * font_size,
        ),
        None => (
            FALLBACK_ASCENT_EM * font_size,
            FALLBACK_DESCENT_EM * font_size,
        ),
    }
}

fn estimate_char_units_for_width(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_alphanumeric() {
        0.55
    } else if ch.is_ascii() {
        0.35
    } else if matches!(
        ch as u32,
        0x4E00..=0x9FFF | 0x3040..=0x30FF | 0x31F0..=0x31FF
    ) {
        1.0
    } else {
        0.9
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(estimate_char_units_for_width)
        .sum()
}

pub(crate) fn load_font_metrics_from_data(
    data: &[u8],
    preferred_family: Option<&str>,
) -> Result<FontMetrics> {
    let shared = Arc::new(data.to_vec());
    let mut fallback = None;
    let count = ttf_parser::fonts_in_collection(data).unwrap_or(1);
    for index in 0..count {
        if let Ok(face) = Face::parse(data, index) {
            let metrics = face_metrics(&shared, &face, index);
            if let (Some(preferred), Some(found)) = (preferred_family, metrics.family()) {
                if found.eq_ignore_ascii_case(preferred) {
                    return Ok(metrics);
                }
            }
            if fallback.is_none() {
                fallback = Some(metrics);
            }
        }
    }
    fallback.ok_or_else(|| anyhow!("failed to parse font data"))
}

fn face_metrics(data: &Arc<Vec<u8>>, face: &Face<'_>, index: u32) -> FontMetrics {
    let units_per_em = face.units_per_em().max(1);
    let space_advance = face
        .glyph_index(' ')
        .and_then(|id| face.glyph_hor_advance(id))
        .unwrap_or(units_per_em / 2);
    FontMetrics {
        data: Arc::clone(data),
        face_index: index,
        units_per_em,
        space_advance,
        ascender: face.ascender(),
        descender: face.descender(),
        family: extract_family_name(face),
    }
}

/// A face that is present in `db`: the generic sans-serif face when it
/// resolves, else the first face loaded. The family is the name `db` knows
/// the face by, so the renderer finds the same face that was measured.
pub(crate) fn default_overlay_font(db: &fontdb::Database) -> Result<ResolvedOverlayFont> {
    let sans = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        ..Default::default()
    };
    let id = db
        .query(&sans)
        .or_else(|| db.faces().next().map(|face| face.id))
        .ok_or_else(|| anyhow!("no fonts installed"))?;
    let info = db
        .face(id)
        .ok_or_else(|| anyhow!("font face disappeared from database"))?;
    let family = info.families.first().map(|(name, _)| name.clone());
    let (data, index) = db
        .with_face_data(id, |data, index| (data.to_vec(), index))
        .ok_or_else(|| anyhow!("failed to load font data"))?;
    let data = Arc::new(data);
    let face = Face::parse(&data, index)
        .map_err(|err| anyhow!("failed to parse font face {}: {}", index, err))?;
    let metrics = face_metrics(&data, &face, index);
    let family = family
        .or_else(|| metrics.family().map(str::to_string))
        .ok_or_else(|| anyhow!("font face has no family name"))?;
    Ok(ResolvedOverlayFont { metrics, family })
}

fn load_font_metrics_from_family(
    db: &fontdb::Database,
    family: &str,
) -> Result<ResolvedOverlayFont> {
    let is_sans = family.eq_ignore_ascii_case("sans-serif");
    let families = if is_sans {
        vec![fontdb::Family::SansSerif]
    } else {
        vec![fontdb::Family::Name(family)]
    };
    let query = fontdb::Query {
        families: &families,
        ..Default::default()
    };
    let id = db
        .query(&query)
        .ok_or_else(|| anyhow!("font not found: {}", family))?;
    let data = db
        .with_face_data(id, |data, _index| data.to_vec())
        .ok_or_else(|| anyhow!("failed to load font data: {}", family))?;
    let preferred = if is_sans { None } else { Some(family) };
    let metrics = load_font_metrics_from_data(&data, preferred)?;
    let resolved_family = metrics
        .family()
        .map(|name| name.to_string())
        .unwrap_or_else(|| family.to_string());
    Ok(ResolvedOverlayFont {
        metrics,
        family: resolved_family,
    })
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_linearly_with_font_size() {
        let at_one = measure_text_width_px("hello world", 1.0, None);
        let at_thirty_two = measure_text_width_px("hello world", 32.0, None);
        assert!((at_one - (10.0 * 0.55 + 0.25)).abs() < 1e-5);
        assert!((at_thirty_two - at_one * 32.0).abs() < 1e-3);
    }

    #[test]
    fn estimate_treats_cjk_as_full_width() {
        assert!((measure_text_width_px("世界", 10.0, None) - 20.0).abs() < 1e-5);
    }

    #[test]
    fn fallback_vertical_metrics() {
        let (ascent, descent) = vertical_metrics_px(10.0, None);
        assert!((ascent - 8.0).abs() < 1e-5);
        assert!((descent + 2.0).abs() < 1e-5);
    }

    #[test]
    fn default_font_comes_from_the_database() {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let resolved = default_overlay_font(&db).unwrap();
        assert!(!resolved.family.is_empty());
        assert!(resolved.metrics.ascent_em() > 0.0);
        assert!(resolved.metrics.descent_em() <= 0.0);
        let width = measure_text_width_px("hello world", 32.0, Some(&resolved.metrics));
        assert!(width > 0.0);
    }

    #[test]
    fn empty_database_has_no_default_font() {
        let err = default_overlay_font(&fontdb::Database::new()).unwrap_err();
        assert_eq!(err.to_string(), "no fonts installed");
    }

    #[test]
    fn garbage_font_data_is_rejected() {
        assert!(load_font_metrics_from_data(b"not a font", None).is_err());
    }
}
