//! Regression losses.
//!
//! All three are single-output: predictions, gradients and hessians are
//! `[1, n_samples]`.

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2, Axis, Zip};

use super::{chunk_of, debug_check_shapes, LossFn, PredictionKind};
use crate::data::WeightsView;
use crate::executor::Executor;
use crate::utils::{weighted_mean, weighted_quantile};

// =============================================================================
// Squared Loss
// =============================================================================

/// Half squared error (L2) loss.
///
/// - Loss: `0.5 * (pred - target)²`
/// - Gradient: `pred - target`
/// - Hessian: `1.0` (or weight if weighted)
///
/// The unweighted kernel does not write hessians: they are constant, and the
/// caller fills the buffer with ones once (see [`LossFn::hessians_are_constant`]).
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredLoss;

impl LossFn for SquaredLoss {
    fn hessians_are_constant(&self) -> bool {
        true
    }

    fn compute_gradients_into(
        &self,
        executor: &Executor,
        raw_predictions: ArrayView2<'_, f32>,
        y_true: ArrayView1<'_, f32>,
        weights: WeightsView<'_>,
        gradients: ArrayViewMut2<'_, f32>,
        hessians: ArrayViewMut2<'_, f32>,
    ) {
        debug_check_shapes(1, &raw_predictions, &y_true, &weights, &gradients, &hessians);
        let raw = raw_predictions.index_axis_move(Axis(0), 0);

        match weights {
            WeightsView::Uniform => executor.for_each_chunk(gradients, hessians, |mut chunk| {
                let range = chunk.range();
                Zip::from(chunk.gradients.row_mut(0))
                    .and(chunk_of(raw, range.clone()))
                    .and(chunk_of(y_true, range))
                    .for_each(|g, &pred, &y| *g = pred - y);
            }),
            WeightsView::Weighted(w) => executor.for_each_chunk(gradients, hessians, |mut chunk| {
                let range = chunk.range();
                let (g_row, h_row) = (chunk.gradients.row_mut(0), chunk.hessians.row_mut(0));
                Zip::from(g_row)
                    .and(h_row)
                    .and(chunk_of(raw, range.clone()))
                    .and(chunk_of(y_true, range.clone()))
                    .and(chunk_of(w, range))
                    .for_each(|g, h, &pred, &y, &w| {
                        *g = w * (pred - y);
                        *h = w;
                    });
            }),
        }
    }

    fn baseline_prediction(&self, y_true: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Vec<f32> {
        let base = weighted_mean(y_true, weights).map_or(0.0, |m| m as f32);
        vec![base]
    }

    fn transform_predictions_inplace(&self, _predictions: ArrayViewMut2<'_, f32>) -> PredictionKind {
        PredictionKind::Value
    }

    fn name(&self) -> &'static str {
        "squared_error"
    }
}

// =============================================================================
// Absolute Loss (LAD / L1)
// =============================================================================

/// Least absolute deviation (L1) loss.
///
/// - Loss: `|pred - target|`
/// - Gradient: `1` if `target < pred`, else `-1`
/// - Hessian: `1.0` (or weight if weighted)
///
/// A zero residual resolves to `-1`. The hessian is a surrogate: the true
/// second derivative is zero almost everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteLoss;

#[inline]
fn lad_sign(pred: f32, y: f32) -> f32 {
    if y - pred < 0.0 { 1.0 } else { -1.0 }
}

impl LossFn for AbsoluteLoss {
    fn compute_gradients_into(
        &self,
        executor: &Executor,
        raw_predictions: ArrayView2<'_, f32>,
        y_true: ArrayView1<'_, f32>,
        weights: WeightsView<'_>,
        gradients: ArrayViewMut2<'_, f32>,
        hessians: ArrayViewMut2<'_, f32>,
    ) {
        debug_check_shapes(1, &raw_predictions, &y_true, &weights, &gradients, &hessians);
        let raw = raw_predictions.index_axis_move(Axis(0), 0);

        match weights {
            WeightsView::Uniform => executor.for_each_chunk(gradients, hessians, |mut chunk| {
                let range = chunk.range();
                let (g_row, h_row) = (chunk.gradients.row_mut(0), chunk.hessians.row_mut(0));
                Zip::from(g_row)
                    .and(h_row)
                    .and(chunk_of(raw, range.clone()))
                    .and(chunk_of(y_true, range))
                    .for_each(|g, h, &pred, &y| {
                        *g = lad_sign(pred, y);
                        *h = 1.0;
                    });
            }),
            WeightsView::Weighted(w) => executor.for_each_chunk(gradients, hessians, |mut chunk| {
                let range = chunk.range();
                let (g_row, h_row) = (chunk.gradients.row_mut(0), chunk.hessians.row_mut(0));
                Zip::from(g_row)
                    .and(h_row)
                    .and(chunk_of(raw, range.clone()))
                    .and(chunk_of(y_true, range.clone()))
                    .and(chunk_of(w, range))
                    .for_each(|g, h, &pred, &y, &w| {
                        *g = w * lad_sign(pred, y);
                        *h = w;
                    });
            }),
        }
    }

    fn baseline_prediction(&self, y_true: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Vec<f32> {
        if y_true.is_empty() {
            return vec![0.0];
        }
        let mut scratch = Vec::with_capacity(y_true.len());
        vec![weighted_quantile(y_true, weights, 0.5, &mut scratch)]
    }

    fn transform_predictions_inplace(&self, _predictions: ArrayViewMut2<'_, f32>) -> PredictionKind {
        PredictionKind::Value
    }

    fn name(&self) -> &'static str {
        "absolute_error"
    }
}

// =============================================================================
// Poisson Loss
// =============================================================================

/// Half Poisson deviance with a log link.
///
/// Raw predictions are in log-mean space.
///
/// - Gradient: `exp(pred) - target`
/// - Hessian: `exp(pred)`
///
/// No clamping: large raw predictions overflow to infinity.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoissonLoss;

impl LossFn for PoissonLoss {
    fn compute_gradients_into(
        &self,
        executor: &Executor,
        raw_predictions: ArrayView2<'_, f32>,
        y_true: ArrayView1<'_, f32>,
        weights: WeightsView<'_>,
        gradients: ArrayViewMut2<'_, f32>,
        hessians: ArrayViewMut2<'_, f32>,
    ) {
        debug_check_shapes(1, &raw_predictions, &y_true, &weights, &gradients, &hessians);
        let raw = raw_predictions.index_axis_move(Axis(0), 0);

        match weights {
            WeightsView::Uniform => executor.for_each_chunk(gradients, hessians, |mut chunk| {
                let range = chunk.range();
                let (g_row, h_row) = (chunk.gradients.row_mut(0), chunk.hessians.row_mut(0));
                Zip::from(g_row)
                    .and(h_row)
                    .and(chunk_of(raw, range.clone()))
                    .and(chunk_of(y_true, range))
                    .for_each(|g, h, &pred, &y| {
                        let mu = pred.exp();
                        *g = mu - y;
                        *h = mu;
                    });
            }),
            WeightsView::Weighted(w) => executor.for_each_chunk(gradients, hessians, |mut chunk| {
                let range = chunk.range();
                let (g_row, h_row) = (chunk.gradients.row_mut(0), chunk.hessians.row_mut(0));
                Zip::from(g_row)
                    .and(h_row)
                    .and(chunk_of(raw, range.clone()))
                    .and(chunk_of(y_true, range.clone()))
                    .and(chunk_of(w, range))
                    .for_each(|g, h, &pred, &y, &w| {
                        let mu = pred.exp();
                        *g = w * (mu - y);
                        *h = w * mu;
                    });
            }),
        }
    }

    fn baseline_prediction(&self, y_true: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Vec<f32> {
        match weighted_mean(y_true, weights) {
            Some(mean) => vec![(mean as f32).max(f32::EPSILON).ln()],
            None => vec![0.0],
        }
    }

    fn transform_predictions_inplace(&self, mut predictions: ArrayViewMut2<'_, f32>) -> PredictionKind {
        predictions.mapv_inplace(f32::exp);
        PredictionKind::Value
    }

    fn name(&self) -> &'static str {
        "poisson"
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn run<L: LossFn>(
        loss: &L,
        n_threads: usize,
        raw: &[f32],
        y: &[f32],
        w: Option<&[f32]>,
        hess_init: f32,
    ) -> (Vec<f32>, Vec<f32>) {
        let n = y.len();
        let raw = Array2::from_shape_vec((1, n), raw.to_vec()).unwrap();
        let y = ndarray::Array1::from(y.to_vec());
        let mut grads = Array2::<f32>::zeros((1, n));
        let mut hess = Array2::<f32>::from_elem((1, n), hess_init);
        let executor = Executor::new(n_threads).unwrap();
        let weights = w.map_or(WeightsView::Uniform, WeightsView::from_slice);

        loss.compute_gradients_into(&executor, raw.view(), y.view(), weights, grads.view_mut(), hess.view_mut());
        (grads.row(0).to_vec(), hess.row(0).to_vec())
    }

    #[test]
    fn squared_unweighted() {
        let (g, h) = run(&SquaredLoss, 1, &[1.0, 2.0, 3.0], &[0.5, 2.5, 2.5], None, 1.0);
        assert_eq!(g, vec![0.5, -0.5, 0.5]);
        assert_eq!(h, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn squared_unweighted_leaves_hessians_alone() {
        let (_, h) = run(&SquaredLoss, 2, &[1.0, 2.0], &[0.0, 0.0], None, 7.0);
        assert_eq!(h, vec![7.0, 7.0]);
    }

    #[test]
    fn squared_weighted() {
        let (g, h) = run(&SquaredLoss, 1, &[1.0, 2.0], &[0.0, 0.0], Some(&[2.0, 0.5]), 0.0);
        assert_eq!(g, vec![2.0, 1.0]);
        assert_eq!(h, vec![2.0, 0.5]);
    }

    #[test]
    fn absolute_sign_and_ties() {
        // pred > y, pred < y, pred == y
        let (g, h) = run(&AbsoluteLoss, 1, &[2.0, 0.0, 1.0], &[1.0, 1.0, 1.0], None, 0.0);
        assert_eq!(g, vec![1.0, -1.0, -1.0]);
        assert_eq!(h, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn absolute_weighted() {
        let (g, h) = run(&AbsoluteLoss, 1, &[2.0, 0.0], &[1.0, 1.0], Some(&[3.0, 0.25]), 0.0);
        assert_eq!(g, vec![3.0, -0.25]);
        assert_eq!(h, vec![3.0, 0.25]);
    }

    #[test]
    fn poisson_at_zero_raw() {
        let (g, h) = run(&PoissonLoss, 1, &[0.0, 0.0], &[1.0, 3.0], Some(&[1.0, 1.0]), 0.0);
        assert_eq!(g, vec![0.0, -2.0]);
        assert_eq!(h, vec![1.0, 1.0]);
    }

    #[test]
    fn poisson_log_link() {
        let (g, h) = run(&PoissonLoss, 1, &[1.0f32.ln(), 2.0f32.ln()], &[0.0, 0.0], None, 0.0);
        assert!((g[0] - 1.0).abs() < 1e-6);
        assert!((g[1] - 2.0).abs() < 1e-6);
        assert!((h[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn poisson_overflow_propagates() {
        let (g, h) = run(&PoissonLoss, 1, &[1000.0], &[1.0], None, 0.0);
        assert!(g[0].is_infinite());
        assert!(h[0].is_infinite());
    }

    #[test]
    fn nan_propagates() {
        let (g, _) = run(&SquaredLoss, 1, &[f32::NAN], &[1.0], None, 1.0);
        assert!(g[0].is_nan());
    }

    #[test]
    fn baselines() {
        let y = array![1.0f32, 2.0, 3.0, 10.0];
        assert_eq!(SquaredLoss.baseline_prediction(y.view(), WeightsView::Uniform), vec![4.0]);
        assert_eq!(AbsoluteLoss.baseline_prediction(y.view(), WeightsView::Uniform), vec![2.0]);

        let counts = array![1.0f32, 3.0];
        let base = PoissonLoss.baseline_prediction(counts.view(), WeightsView::Uniform);
        assert!((base[0] - 2.0f32.ln()).abs() < 1e-6);
    }

    #[test]
    fn poisson_baseline_of_zero_counts_is_finite() {
        let y = array![0.0f32, 0.0];
        let base = PoissonLoss.baseline_prediction(y.view(), WeightsView::Uniform);
        assert!(base[0].is_finite());
        assert!(base[0] < 0.0);
    }

    #[test]
    fn empty_baselines_are_zero() {
        let y = ndarray::Array1::<f32>::zeros(0);
        for loss in [&SquaredLoss as &dyn LossFn, &AbsoluteLoss, &PoissonLoss] {
            assert_eq!(loss.baseline_prediction(y.view(), WeightsView::Uniform), vec![0.0]);
        }
    }

    #[test]
    fn transforms() {
        let mut preds = array![[0.0f32, 1.0]];
        assert_eq!(SquaredLoss.transform_predictions_inplace(preds.view_mut()), PredictionKind::Value);
        assert_eq!(preds, array![[0.0f32, 1.0]]);

        assert_eq!(PoissonLoss.transform_predictions_inplace(preds.view_mut()), PredictionKind::Value);
        assert!((preds[[0, 0]] - 1.0).abs() < 1e-6);
        assert!((preds[[0, 1]] - std::f32::consts::E).abs() < 1e-5);
    }
}
