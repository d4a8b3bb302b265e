use anyhow::{Context, Result, anyhow};

use crate::ocr::{BBoxPx, RawDetection};

const TSV_COLUMNS: usize = 12;
const WORD_LEVEL: u32 = 5;

/// Parses `tesseract ... tsv` output into word-level detections.
///
/// Rows above word level (page/block/paragraph/line) are skipped. A missing
/// header or a row with non-numeric geometry is an error.
pub(super) fn parse_tsv_detections(tsv: &str) -> Result<Vec<RawDetection>> {
    let mut rows = tsv.lines();
    let header = rows.next().unwrap_or_default();
    if !header.trim_start().starts_with("level") {
        return Err(anyhow!("unexpected tesseract TSV header: '{}'", header.trim()));
    }

    let mut detections = Vec::new();
    for (idx, row) in rows.enumerate() {
        if row.trim().is_empty() {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < TSV_COLUMNS - 1 {
            return Err(anyhow!(
                "tesseract TSV row {} has {} columns",
                idx + 2,
                cols.len()
            ));
        }
        let level = parse_col::<u32>(&cols, 0, idx)?;
        if level != WORD_LEVEL {
            continue;
        }
        let word_num = parse_col::<u32>(&cols, 5, idx)?;
        let bbox = BBoxPx {
            x: parse_col(&cols, 6, idx)?,
            y: parse_col(&cols, 7, idx)?,
            w: parse_col(&cols, 8, idx)?,
            h: parse_col(&cols, 9, idx)?,
        };
        let conf = parse_col::<f32>(&cols, 10, idx)?;
        let text = cols.get(11).copied().unwrap_or_default().to_string();
        detections.push(RawDetection {
            bbox,
            conf,
            text,
            word_num,
        });
    }
    Ok(detections)
}

fn parse_col<T>(cols: &[&str], col: usize, row: usize) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    cols[col]
        .trim()
        .parse::<T>()
        .with_context(|| format!("invalid value in tesseract TSV row {} column {}", row + 2, col))
}
