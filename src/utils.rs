//! Weighted reductions used for baseline predictions.

use std::cmp::Ordering;

use ndarray::ArrayView1;

use crate::data::WeightsView;

/// Weighted mean of `values`, accumulated in `f64`.
///
/// Returns `None` when the total weight is not positive (including empty input).
pub fn weighted_mean(values: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Option<f64> {
    let (sum_w, sum_wy) = values
        .iter()
        .zip(weights.iter(values.len()))
        .fold((0.0f64, 0.0f64), |(sw, swy), (&y, w)| {
            (sw + w as f64, swy + w as f64 * y as f64)
        });

    (sum_w > 0.0).then(|| sum_wy / sum_w)
}

/// Weighted quantile using a step function.
///
/// No interpolation: returns the value at which the cumulative weight, in
/// sorted order, first reaches `alpha * total_weight`. Returns `f32::NAN` for
/// empty input.
///
/// `scratch` holds the sort permutation and is resized as needed.
pub fn weighted_quantile(
    values: ArrayView1<'_, f32>,
    weights: WeightsView<'_>,
    alpha: f32,
    scratch: &mut Vec<usize>,
) -> f32 {
    let n = values.len();
    if n == 0 {
        return f32::NAN;
    }
    if n == 1 {
        return values[0];
    }

    scratch.clear();
    scratch.extend(0..n);
    scratch.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let total_weight: f32 = weights.iter(n).sum();
    let threshold = total_weight * alpha;

    let mut cumulative = 0.0f32;
    for &idx in scratch.iter() {
        cumulative += weights.get(idx);
        if cumulative >= threshold {
            return values[idx];
        }
    }

    values[scratch[n - 1]]
}
