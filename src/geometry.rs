// src/geometry.rs
use crate::models::BoundingBox;

/// Overlap between two normalized boxes: intersection area divided by the
/// area of the *smaller* box, not the union. A small box fully nested inside
/// a larger one therefore scores near 1.0, which is what catches the same
/// garment detected twice at different granularities.
///
/// Returns 0 when the boxes are disjoint or either has non-positive area,
/// so malformed boxes (left >= right) fall out harmlessly.
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let intersect_left = a.left.max(b.left);
    let intersect_top = a.top.max(b.top);
    let intersect_right = a.right.min(b.right);
    let intersect_bottom = a.bottom.min(b.bottom);

    if intersect_left >= intersect_right || intersect_top >= intersect_bottom {
        return 0.0;
    }

    let intersection = (intersect_right - intersect_left) * (intersect_bottom - intersect_top);

    let smaller = a.area().min(b.area());
    if smaller > 0.0 {
        intersection / smaller
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_is_symmetric() {
        let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        let b = BoundingBox::new(0.25, 0.25, 0.75, 0.75);
        assert_eq!(overlap_ratio(&a, &b), overlap_ratio(&b, &a));
    }

    #[test]
    fn disjoint_boxes_score_zero() {
        let a = BoundingBox::new(0.0, 0.0, 0.2, 0.2);
        let b = BoundingBox::new(0.5, 0.5, 0.7, 0.7);
        assert_eq!(overlap_ratio(&a, &b), 0.0);
    }

    #[test]
    fn identical_boxes_score_one() {
        let a = BoundingBox::new(0.1, 0.1, 0.6, 0.6);
        assert!((overlap_ratio(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn nested_box_scores_one() {
        let outer = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let inner = BoundingBox::new(0.4, 0.4, 0.6, 0.6);
        assert!((overlap_ratio(&outer, &inner) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_box_scores_zero() {
        let flipped = BoundingBox::new(0.5, 0.5, 0.1, 0.1);
        let normal = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(overlap_ratio(&flipped, &normal), 0.0);
    }

    #[test]
    fn partial_overlap_normalizes_by_the_smaller_area() {
        // Intersection is 0.2x0.2 = 0.04; the smaller box is 0.4x0.4 = 0.16.
        let a = BoundingBox::new(0.0, 0.0, 0.5, 0.5);
        let b = BoundingBox::new(0.3, 0.3, 0.7, 0.7);
        assert!((overlap_ratio(&a, &b) - 0.25).abs() < 1e-5);
    }
}
