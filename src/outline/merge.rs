use crate::foundation::core::Rect;

/// Smallest rectangle covering every input rect.
///
/// A single rect comes back as-is. Returns `None` only for an empty slice. If the bounds are not
/// finite (NaN edges), the first rect is returned instead.
pub fn merge_rects(rects: &[Rect]) -> Option<Rect> {
    let (first, rest) = rects.split_first()?;
    if rest.is_empty() {
        return Some(*first);
    }

    let mut min_x = f64::INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for r in rects {
        min_x = min_x.min(r.x);
        min_y = min_y.min(r.y);
        max_x = max_x.max(r.right());
        max_y = max_y.max(r.bottom());
    }

    if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite()) {
        return Some(*first);
    }

    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_rect_is_returned_unchanged() {
        let r = Rect::new(1.5, -2.0, 3.0, 4.25);
        assert_eq!(merge_rects(&[r]), Some(r));
    }

    #[test]
    fn empty_input_has_no_bounds() {
        assert_eq!(merge_rects(&[]), None);
    }

    #[test]
    fn two_disjoint_rects_merge_to_bounding_box() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(20.0, 20.0, 10.0, 10.0);
        assert_eq!(merge_rects(&[a, b]), Some(Rect::new(0.0, 0.0, 30.0, 30.0)));
    }

    #[test]
    fn merged_rect_contains_inputs_and_touches_each_edge() {
        let sets = [
            vec![
                Rect::new(5.0, 5.0, 1.0, 1.0),
                Rect::new(-3.0, 8.0, 2.0, 2.0),
                Rect::new(4.0, -1.0, 10.0, 1.0),
            ],
            vec![Rect::new(0.0, 0.0, 5.0, 5.0), Rect::new(1.0, 1.0, 2.0, 2.0)],
            vec![
                Rect::new(100.0, 40.0, 0.0, 0.0),
                Rect::new(90.0, 70.0, 5.0, 3.0),
            ],
        ];

        for rects in sets {
            let merged = merge_rects(&rects).unwrap();
            for r in &rects {
                assert!(merged.contains_rect(*r), "{merged:?} must contain {r:?}");
            }
            let min_x = rects.iter().map(|r| r.x).fold(f64::INFINITY, f64::min);
            let min_y = rects.iter().map(|r| r.y).fold(f64::INFINITY, f64::min);
            let max_x = rects.iter().map(|r| r.right()).fold(f64::NEG_INFINITY, f64::max);
            let max_y = rects.iter().map(|r| r.bottom()).fold(f64::NEG_INFINITY, f64::max);
            assert_eq!(merged.x, min_x);
            assert_eq!(merged.y, min_y);
            assert_eq!(merged.right(), max_x);
            assert_eq!(merged.bottom(), max_y);
        }
    }

    #[test]
    fn inputs_are_not_mutated() {
        let rects = [Rect::new(1.0, 1.0, 1.0, 1.0), Rect::new(9.0, 9.0, 1.0, 1.0)];
        let before = rects;
        let _ = merge_rects(&rects);
        assert_eq!(rects, before);
    }

    #[test]
    fn non_finite_bounds_fall_back_to_first() {
        let first = Rect::new(1.0, 2.0, 3.0, 4.0);
        let rects = [first, Rect::new(0.0, 0.0, f64::INFINITY, 1.0)];
        assert_eq!(merge_rects(&rects), Some(first));
    }
}
