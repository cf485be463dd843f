use std::cmp::Ordering;

/// Orders indices by descending score; equal scores keep their original index order.
///
/// NaN sorts last. The index tie-break is explicit, so the result does not depend on sort
/// stability.
pub fn rank_indices(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| compare_desc(scores[a], scores[b]).then_with(|| a.cmp(&b)));
    order
}

/// Rearranges `items` into `order` (a permutation of `0..items.len()`).
pub fn apply_order<T>(items: Vec<T>, order: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    order
        .iter()
        .filter_map(|&idx| slots.get_mut(idx).and_then(Option::take))
        .collect()
}

#[inline]
fn compare_desc(a: f32, b: f32) -> Ordering {
    let a = if a.is_nan() { f32::NEG_INFINITY } else { a };
    let b = if b.is_nan() { f32::NEG_INFINITY } else { b };
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}
