use tracing::debug;

use crate::ocr::{RawDetection, TextFragment};

/// Keeps detections that are confident word hits with at least one
/// alphanumeric character. Input order is preserved.
pub fn normalize_detections(raw: Vec<RawDetection>, threshold: f32) -> Vec<TextFragment> {
    let total = raw.len();
    let fragments = raw
        .into_iter()
        .filter_map(|detection| {
            let text = detection.text.trim();
            if detection.word_num == 0 || detection.conf < threshold || !has_alphanumeric(text) {
                return None;
            }
            Some(TextFragment {
                bbox: detection.bbox,
                text: text.to_string(),
                conf: detection.conf,
            })
        })
        .collect::<Vec<_>>();
    debug!(
        "kept {} of {} detections (threshold {})",
        fragments.len(),
        total,
        threshold
    );
    fragments
}

fn has_alphanumeric(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::BBoxPx;

    fn detection(text: &str, conf: f32, word_num: u32) -> RawDetection {
        RawDetection {
            bbox: BBoxPx::new(1, 2, 3, 4),
            conf,
            text: text.to_string(),
            word_num,
        }
    }

    #[test]
    fn drops_detections_below_threshold() {
        let kept = normalize_detections(
            vec![
                detection("keep", 60.0, 1),
                detection("drop", 59.9, 2),
                detection("high", 96.5, 3),
            ],
            60.0,
        );
        let texts = kept.iter().map(|f| f.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["keep", "high"]);
    }

    #[test]
    fn drops_symbol_only_and_blank_tokens() {
        let kept = normalize_detections(
            vec![
                detection("  ", 90.0, 1),
                detection("—|…", 90.0, 2),
                detection(" (a) ", 90.0, 3),
                detection("世界", 90.0, 4),
            ],
            60.0,
        );
        let texts = kept.iter().map(|f| f.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, vec!["(a)", "世界"]);
    }

    #[test]
    fn drops_non_word_rows() {
        let kept = normalize_detections(vec![detection("block", 95.0, 0)], 60.0);
        assert!(kept.is_empty());
    }

    #[test]
    fn keeps_geometry_and_confidence() {
        let kept = normalize_detections(vec![detection("word", 75.0, 1)], 60.0);
        assert_eq!(kept, vec![TextFragment {
            bbox: BBoxPx::new(1, 2, 3, 4),
            text: "word".to_string(),
            conf: 75.0,
        }]);
    }
}
