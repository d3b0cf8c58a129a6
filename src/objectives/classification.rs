//! Classification losses.
//!
//! Labels are stored as `f32`: `{0, 1}` for binary, class indices
//! `0..n_classes` for multi-class.

use ndarray::{ArrayView1, ArrayView2, ArrayViewMut2, Axis, Zip};

use super::{chunk_of, debug_check_shapes, LossFn, PredictionKind};
use crate::data::WeightsView;
use crate::executor::{Executor, SampleChunk};

/// Probability clip used by baseline scores.
const PROB_EPS: f64 = f32::EPSILON as f64;

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Numerically stable softmax over one sample's scores, in place.
///
/// The row max is subtracted before exponentiating, so the largest term is
/// `exp(0) = 1` and the sum is at least 1.
#[inline]
fn softmax_row(row: &mut [f32]) {
    let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for x in row.iter_mut() {
        *x = (*x - max).exp();
        sum += *x;
    }
    for x in row.iter_mut() {
        *x /= sum;
    }
}

// =============================================================================
// Logistic Loss (binary cross-entropy)
// =============================================================================

/// Binary cross-entropy with a logit link.
///
/// - Gradient: `sigmoid(pred) - label`
/// - Hessian: `sigmoid(pred) * (1 - sigmoid(pred))`
///
/// The hessian is not floored; it underflows towards zero for saturated
/// predictions.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticLoss;

impl LossFn for LogisticLoss {
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
                        let p = sigmoid(pred);
                        *g = p - y;
                        *h = p * (1.0 - p);
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
                        let p = sigmoid(pred);
                        *g = w * (p - y);
                        *h = w * p * (1.0 - p);
                    });
            }),
        }
    }

    fn baseline_prediction(&self, y_true: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Vec<f32> {
        let (pos_weight, total_weight) = y_true
            .iter()
            .zip(weights.iter(y_true.len()))
            .fold((0.0f64, 0.0f64), |(pos, total), (&y, w)| {
                let w = w as f64;
                (pos + w * y as f64, total + w)
            });

        if total_weight <= 0.0 {
            return vec![0.0];
        }
        let p = (pos_weight / total_weight).clamp(PROB_EPS, 1.0 - PROB_EPS);
        vec![(p / (1.0 - p)).ln() as f32]
    }

    fn transform_predictions_inplace(&self, mut predictions: ArrayViewMut2<'_, f32>) -> PredictionKind {
        predictions.mapv_inplace(sigmoid);
        PredictionKind::Probability
    }

    fn name(&self) -> &'static str {
        "binary_crossentropy"
    }
}

// =============================================================================
// Softmax Loss (categorical cross-entropy)
// =============================================================================

/// Categorical cross-entropy over `n_classes` outputs.
///
/// For each sample the K raw scores are gathered into a per-chunk scratch
/// row, normalized with a max-subtracted softmax, and all K derivatives are
/// written before moving to the next sample.
///
/// - Gradient: `p[k] - [label == k]`
/// - Hessian: `p[k] * (1 - p[k])` (diagonal approximation)
#[derive(Debug, Clone, Copy)]
pub struct SoftmaxLoss {
    n_classes: usize,
}

impl SoftmaxLoss {
    pub fn new(n_classes: usize) -> Self {
        Self { n_classes }
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Derivatives for one chunk. `weights` is `None` on the unweighted path.
    fn compute_chunk(
        &self,
        raw: ArrayView2<'_, f32>,
        y_true: ArrayView1<'_, f32>,
        weights: Option<ArrayView1<'_, f32>>,
        mut chunk: SampleChunk<'_>,
    ) {
        let mut probs = vec![0.0f32; self.n_classes];
        let range = chunk.range();

        match weights {
            None => {
                for (j, i) in range.enumerate() {
                    load_probabilities(raw, i, &mut probs);
                    let label = y_true[i];
                    for (c, &p) in probs.iter().enumerate() {
                        let ind = if label == c as f32 { 1.0 } else { 0.0 };
                        chunk.gradients[[c, j]] = p - ind;
                        chunk.hessians[[c, j]] = p * (1.0 - p);
                    }
                }
            }
            Some(w) => {
                for (j, i) in range.enumerate() {
                    load_probabilities(raw, i, &mut probs);
                    let (label, w) = (y_true[i], w[i]);
                    for (c, &p) in probs.iter().enumerate() {
                        let ind = if label == c as f32 { 1.0 } else { 0.0 };
                        chunk.gradients[[c, j]] = w * (p - ind);
                        chunk.hessians[[c, j]] = w * p * (1.0 - p);
                    }
                }
            }
        }
    }
}

/// Gather the scores of sample `i` into `probs` and normalize them.
#[inline]
fn load_probabilities(raw: ArrayView2<'_, f32>, i: usize, probs: &mut [f32]) {
    for (c, p) in probs.iter_mut().enumerate() {
        *p = raw[[c, i]];
    }
    softmax_row(probs);
}

impl LossFn for SoftmaxLoss {
    fn n_outputs(&self) -> usize {
        self.n_classes
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
        debug_check_shapes(self.n_classes, &raw_predictions, &y_true, &weights, &gradients, &hessians);

        match weights {
            WeightsView::Uniform => executor.for_each_chunk(gradients, hessians, |chunk| {
                self.compute_chunk(raw_predictions, y_true, None, chunk)
            }),
            WeightsView::Weighted(w) => executor.for_each_chunk(gradients, hessians, |chunk| {
                self.compute_chunk(raw_predictions, y_true, Some(w), chunk)
            }),
        }
    }

    fn baseline_prediction(&self, y_true: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Vec<f32> {
        let mut class_weights = vec![0.0f64; self.n_classes];
        let mut total_weight = 0.0f64;
        for (&label, w) in y_true.iter().zip(weights.iter(y_true.len())) {
            if let Some(c) = (0..self.n_classes).find(|&c| label == c as f32) {
                class_weights[c] += w as f64;
            }
            total_weight += w as f64;
        }

        if total_weight <= 0.0 {
            return vec![0.0; self.n_classes];
        }
        class_weights
            .into_iter()
            .map(|cw| (cw / total_weight).clamp(PROB_EPS, 1.0 - PROB_EPS).ln() as f32)
            .collect()
    }

    fn transform_predictions_inplace(&self, mut predictions: ArrayViewMut2<'_, f32>) -> PredictionKind {
        let mut scratch = vec![0.0f32; self.n_classes];
        for mut sample in predictions.axis_iter_mut(Axis(1)) {
            for (s, &v) in scratch.iter_mut().zip(sample.iter()) {
                *s = v;
            }
            softmax_row(&mut scratch);
            for (v, &s) in sample.iter_mut().zip(scratch.iter()) {
                *v = s;
            }
        }
        PredictionKind::Probability
    }

    fn name(&self) -> &'static str {
        "categorical_crossentropy"
    }
}

// =============================================================================
// Tests
// =============================================================================
