//! Owned gradient/hessian storage.
//!
//! [`Gradients`] holds the two `[n_outputs, n_samples]` buffers a boosting
//! loop refills every iteration. Each output's row is contiguous, which is
//! what histogram building reads.

use ndarray::{Array2, ArrayView1, ArrayView2, ArrayViewMut2};

use crate::data::WeightsView;
use crate::executor::Executor;
use crate::objectives::LossFn;

/// Structure-of-arrays gradient buffer.
///
/// # Example
///
/// ```
/// use boosters_grad::{Executor, Gradients, Loss, WeightsView};
/// use ndarray::array;
///
/// let loss = Loss::SquaredError;
/// let raw = array![[1.0f32, 2.0, 3.0]];
/// let y = array![0.5f32, 2.5, 2.5];
///
/// let mut buffer = Gradients::for_loss(&loss, 3);
/// buffer.compute(&loss, &Executor::sequential(), raw.view(), y.view(), WeightsView::Uniform);
///
/// assert_eq!(buffer.output_grads(0).to_vec(), vec![0.5, -0.5, 0.5]);
/// assert_eq!(buffer.output_hess(0).to_vec(), vec![1.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct Gradients {
    grads: Array2<f32>,
    hess: Array2<f32>,
}

impl Gradients {
    /// Zero-initialized buffer for `n_outputs` outputs and `n_samples` samples.
    pub fn new(n_samples: usize, n_outputs: usize) -> Self {
        Self {
            grads: Array2::zeros((n_outputs, n_samples)),
            hess: Array2::zeros((n_outputs, n_samples)),
        }
    }

    /// Buffer shaped for `loss`.
    ///
    /// Hessians start at 1 when the loss leaves them untouched, so the buffer
    /// is valid after the first [`compute`](Self::compute) with uniform weights.
    pub fn for_loss(loss: &dyn LossFn, n_samples: usize) -> Self {
        let mut buffer = Self::new(n_samples, loss.n_outputs());
        if loss.hessians_are_constant() {
            buffer.hess.fill(1.0);
        }
        buffer
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.grads.ncols()
    }

    #[inline]
    pub fn n_outputs(&self) -> usize {
        self.grads.nrows()
    }

    /// Total number of gradient pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.grads.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    /// Gradient and hessian of one sample/output pair.
    #[inline]
    pub fn get(&self, sample: usize, output: usize) -> (f32, f32) {
        (self.grads[[output, sample]], self.hess[[output, sample]])
    }

    #[inline]
    pub fn grads(&self) -> ArrayView2<'_, f32> {
        self.grads.view()
    }

    #[inline]
    pub fn hess(&self) -> ArrayView2<'_, f32> {
        self.hess.view()
    }

    /// All samples' gradients for one output.
    #[inline]
    pub fn output_grads(&self, output: usize) -> ArrayView1<'_, f32> {
        self.grads.row(output)
    }

    /// All samples' hessians for one output.
    #[inline]
    pub fn output_hess(&self, output: usize) -> ArrayView1<'_, f32> {
        self.hess.row(output)
    }

    /// Mutable views of both buffers, for calling a kernel directly.
    #[inline]
    pub fn views_mut(&mut self) -> (ArrayViewMut2<'_, f32>, ArrayViewMut2<'_, f32>) {
        (self.grads.view_mut(), self.hess.view_mut())
    }

    /// Refill the buffer from `loss` at the current raw predictions.
    ///
    /// Switching from weighted to uniform weights on a loss with constant
    /// hessians restores them to 1.
    pub fn compute(
        &mut self,
        loss: &dyn LossFn,
        executor: &Executor,
        raw_predictions: ArrayView2<'_, f32>,
        y_true: ArrayView1<'_, f32>,
        weights: WeightsView<'_>,
    ) {
        if loss.hessians_are_constant() && !weights.is_weighted() {
            self.hess.fill(1.0);
        }
        loss.compute_gradients_into(
            executor,
            raw_predictions,
            y_true,
            weights,
            self.grads.view_mut(),
            self.hess.view_mut(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objectives::Loss;
    use ndarray::array;

    #[test]
    fn shape_follows_loss() {
        let buffer = Gradients::for_loss(&Loss::CategoricalCrossEntropy { n_classes: 3 }, 10);
        assert_eq!(buffer.n_outputs(), 3);
        assert_eq!(buffer.n_samples(), 10);
        assert_eq!(buffer.len(), 30);
        assert!(buffer.output_hess(0).iter().all(|&h| h == 0.0));
    }

    #[test]
    fn constant_hessians_prefilled() {
        let buffer = Gradients::for_loss(&Loss::SquaredError, 4);
        assert!(buffer.hess().iter().all(|&h| h == 1.0));
    }

    #[test]
    fn weighted_then_uniform_restores_unit_hessians() {
        let loss = Loss::SquaredError;
        let raw = array![[1.0f32, 1.0]];
        let y = array![0.0f32, 0.0];
        let w = array![3.0f32, 0.5];
        let executor = Executor::sequential();
        let mut buffer = Gradients::for_loss(&loss, 2);

        buffer.compute(&loss, &executor, raw.view(), y.view(), WeightsView::from_array(w.view()));
        assert_eq!(buffer.get(0, 0), (3.0, 3.0));
        assert_eq!(buffer.get(1, 0), (0.5, 0.5));

        buffer.compute(&loss, &executor, raw.view(), y.view(), WeightsView::Uniform);
        assert_eq!(buffer.get(0, 0), (1.0, 1.0));
        assert_eq!(buffer.get(1, 0), (1.0, 1.0));
    }

    #[test]
    fn empty_buffer() {
        let buffer = Gradients::new(0, 1);
        assert!(buffer.is_empty());
    }
}
