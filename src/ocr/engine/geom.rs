use crate::ocr::BBoxPx;

pub(super) fn union_bbox(a: &BBoxPx, b: &BBoxPx) -> BBoxPx {
    let x1 = a.x.min(b.x);
    let y1 = a.y.min(b.y);
    let x2 = a.right().max(b.right());
    let y2 = a.bottom().max(b.bottom());
    BBoxPx {
        x: x1,
        y: y1,
        w: x2 - x1,
        h: y2 - y1,
    }
}

/// `|a.y - b.y| < max(a.h, b.h) * ratio`
pub(super) fn vertically_close(a: &BBoxPx, b: &BBoxPx, ratio: f32) -> bool {
    let dy = (a.y as i64 - b.y as i64).abs() as f32;
    dy < a.h.max(b.h) as f32 * ratio
}

/// True when the boxes overlap horizontally or their gap is under `margin`.
pub(super) fn horizontally_near(a: &BBoxPx, b: &BBoxPx, margin: u32) -> bool {
    let margin = margin as i64;
    (a.x as i64) < b.right() as i64 + margin && (b.x as i64) < a.right() as i64 + margin
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both_boxes() {
        let a = BBoxPx::new(10, 10, 80, 20);
        let b = BBoxPx::new(95, 12, 60, 20);
        assert_eq!(union_bbox(&a, &b), BBoxPx::new(10, 10, 145, 22));
    }

    #[test]
    fn vertical_closeness_uses_taller_box() {
        let a = BBoxPx::new(0, 0, 10, 10);
        let tall = BBoxPx::new(0, 13, 10, 20);
        let short = BBoxPx::new(0, 13, 10, 10);
        assert!(vertically_close(&a, &tall, 0.7));
        assert!(!vertically_close(&a, &short, 0.7));
    }

    #[test]
    fn horizontal_proximity_is_symmetric_and_signed() {
        let a = BBoxPx::new(0, 0, 10, 10);
        let near = BBoxPx::new(29, 0, 10, 10);
        let far = BBoxPx::new(30, 0, 10, 10);
        assert!(horizontally_near(&a, &near, 20));
        assert!(horizontally_near(&near, &a, 20));
        assert!(!horizontally_near(&a, &far, 20));
        assert!(!horizontally_near(&far, &a, 20));
    }
}
