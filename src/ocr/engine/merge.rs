use crate::ocr::{TextFragment, TextRegion};

use super::geom::{horizontally_near, union_bbox, vertically_close};

/// Thresholds for the greedy fragment-to-region merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeRules {
    /// Fragments merge when their top edges differ by less than
    /// `max(h) * vertical_ratio`. Default `0.7`.
    pub vertical_ratio: f32,
    /// Horizontal gap in pixels still treated as adjacent. Default `20`.
    pub horizontal_margin: u32,
}

impl Default for MergeRules {
    fn default() -> Self {
        Self {
            vertical_ratio: 0.7,
            horizontal_margin: 20,
        }
    }
}

impl MergeRules {
    fn accepts(&self, region: &TextRegion, fragment: &TextFragment) -> bool {
        vertically_close(&fragment.bbox, &region.bbox, self.vertical_ratio)
            && horizontally_near(&fragment.bbox, &region.bbox, self.horizontal_margin)
    }
}

/// Clusters fragments into regions in `(y, x)` order.
///
/// Each fragment joins the first region that accepts it, else opens a new
/// one. There is no backtracking: a region that grows never absorbs an
/// earlier region.
pub fn merge_fragments(mut fragments: Vec<TextFragment>, rules: &MergeRules) -> Vec<TextRegion> {
    fragments.sort_by_key(|fragment| (fragment.bbox.y, fragment.bbox.x));
    fragments
        .into_iter()
        .fold(Vec::new(), |mut regions: Vec<TextRegion>, fragment| {
            match regions
                .iter()
                .position(|region| rules.accepts(region, &fragment))
            {
                Some(idx) => absorb(&mut regions[idx], fragment),
                None => regions.push(TextRegion::seed(fragment)),
            }
            regions
        })
}

fn absorb(region: &mut TextRegion, fragment: TextFragment) {
    region.bbox = union_bbox(&region.bbox, &fragment.bbox);
    region.text.push(' ');
    region.text.push_str(&fragment.text);
}
