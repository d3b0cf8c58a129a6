//! Loss functions and their gradient/hessian kernels.
//!
//! Each loss computes, for every sample, the first and second derivative of
//! the loss with respect to the raw prediction. The tree grower consumes these
//! buffers to fit the next learner.
//!
//! # Layout
//!
//! Raw predictions, gradients and hessians are `[n_outputs, n_samples]`
//! arrays: one row per output, so the output (class) axis has the larger
//! stride. Single-output losses use `n_outputs == 1`; the softmax loss uses
//! one row per class. Labels are a single `[n_samples]` array; for softmax
//! they hold class indices stored as `f32`.
//!
//! # Weighted Training
//!
//! Weights are passed as [`WeightsView`]. Every kernel branches on it once,
//! outside the per-sample loop, so the uniform path never multiplies by one.
//!
//! # Preconditions
//!
//! Shapes are checked with `debug_assert!` only. NaN and infinite values
//! propagate into the outputs unchanged.
//!
//! # Available Losses
//!
//! ## Regression
//! - [`SquaredLoss`]: half squared error
//! - [`AbsoluteLoss`]: least absolute deviation
//! - [`PoissonLoss`]: half Poisson deviance, log link
//!
//! ## Classification
//! - [`LogisticLoss`]: binary cross-entropy, logit link
//! - [`SoftmaxLoss`]: categorical cross-entropy over K classes

mod classification;
mod regression;

pub use classification::{LogisticLoss, SoftmaxLoss};
pub use regression::{AbsoluteLoss, PoissonLoss, SquaredLoss};

use std::ops::Range;

use ndarray::{s, ArrayView1, ArrayView2, ArrayViewMut2};
use serde::{Deserialize, Serialize};

use crate::data::WeightsView;
use crate::error::{ConfigError, Result};
use crate::executor::Executor;

/// What transformed predictions represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionKind {
    /// Values on the target scale (regression).
    Value,
    /// Class probabilities.
    Probability,
}

// =============================================================================
// Loss Trait
// =============================================================================

/// A differentiable loss used by the booster.
pub trait LossFn: Send + Sync {
    /// Number of raw predictions per sample.
    fn n_outputs(&self) -> usize {
        1
    }

    /// Whether the unweighted kernel leaves hessians untouched because they
    /// are identically 1.
    ///
    /// Callers of such losses fill the hessian buffer with ones once.
    fn hessians_are_constant(&self) -> bool {
        false
    }

    /// Compute gradients and hessians into caller-owned buffers.
    ///
    /// # Arguments
    ///
    /// * `executor` - Fork-join executor the per-sample body runs on
    /// * `raw_predictions` - `[n_outputs, n_samples]`
    /// * `y_true` - `[n_samples]`
    /// * `weights` - Sample weights
    /// * `gradients`, `hessians` - `[n_outputs, n_samples]`, overwritten
    fn compute_gradients_into(
        &self,
        executor: &Executor,
        raw_predictions: ArrayView2<'_, f32>,
        y_true: ArrayView1<'_, f32>,
        weights: WeightsView<'_>,
        gradients: ArrayViewMut2<'_, f32>,
        hessians: ArrayViewMut2<'_, f32>,
    );

    /// Optimal constant raw prediction before any tree is fitted.
    ///
    /// Returns one value per output. Empty input gives zeros.
    fn baseline_prediction(&self, y_true: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Vec<f32>;

    /// Apply the inverse link function to raw predictions in place.
    fn transform_predictions_inplace(&self, predictions: ArrayViewMut2<'_, f32>) -> PredictionKind;

    /// Name used in configuration and logs.
    fn name(&self) -> &'static str;
}

/// Slice the per-sample inputs down to one chunk's range.
#[inline]
pub(crate) fn chunk_of<'a>(values: ArrayView1<'a, f32>, range: Range<usize>) -> ArrayView1<'a, f32> {
    values.slice_move(s![range])
}

#[inline]
fn debug_check_shapes(
    n_outputs: usize,
    raw_predictions: &ArrayView2<'_, f32>,
    y_true: &ArrayView1<'_, f32>,
    weights: &WeightsView<'_>,
    gradients: &ArrayViewMut2<'_, f32>,
    hessians: &ArrayViewMut2<'_, f32>,
) {
    let n_samples = y_true.len();
    debug_assert_eq!(raw_predictions.dim(), (n_outputs, n_samples), "raw_predictions shape");
    debug_assert_eq!(gradients.dim(), (n_outputs, n_samples), "gradients shape");
    debug_assert_eq!(hessians.dim(), (n_outputs, n_samples), "hessians shape");
    if let WeightsView::Weighted(w) = weights {
        debug_assert_eq!(w.len(), n_samples, "weights length");
    }
}

// =============================================================================
// Loss Enum
// =============================================================================

/// Loss selection for configuration.
///
/// Serialized with an internal `"loss"` tag:
///
/// ```
/// use boosters_grad::Loss;
///
/// let loss: Loss = serde_json::from_str(
///     r#"{"loss": "categorical_cross_entropy", "n_classes": 3}"#,
/// ).unwrap();
/// assert_eq!(loss, Loss::CategoricalCrossEntropy { n_classes: 3 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "loss", rename_all = "snake_case")]
pub enum Loss {
    /// Half squared error, identity link.
    #[default]
    SquaredError,
    /// Least absolute deviation, identity link.
    AbsoluteError,
    /// Half Poisson deviance, log link.
    Poisson,
    /// Binary cross-entropy, logit link.
    BinaryCrossEntropy,
    /// Categorical cross-entropy over `n_classes` classes, softmax link.
    CategoricalCrossEntropy { n_classes: usize },
}

impl Loss {
    /// Resolve a loss by name.
    ///
    /// `"auto"` picks binary cross-entropy for two classes and categorical
    /// cross-entropy otherwise. `n_classes` is ignored by regression losses.
    pub fn from_name(name: &str, n_classes: usize) -> std::result::Result<Self, ConfigError> {
        let loss = match name {
            "squared_error" | "least_squares" => Self::SquaredError,
            "absolute_error" | "least_absolute_deviation" => Self::AbsoluteError,
            "poisson" => Self::Poisson,
            "binary_crossentropy" | "binary_cross_entropy" => Self::BinaryCrossEntropy,
            "categorical_crossentropy" | "categorical_cross_entropy" => {
                Self::CategoricalCrossEntropy { n_classes }
            }
            "auto" if n_classes == 2 => Self::BinaryCrossEntropy,
            "auto" => Self::CategoricalCrossEntropy { n_classes },
            other => return Err(ConfigError::UnknownLoss(other.to_string())),
        };
        loss.validate()?;
        Ok(loss)
    }

    /// Check loss parameters.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match *self {
            Self::CategoricalCrossEntropy { n_classes } if n_classes < 2 => {
                Err(ConfigError::InvalidClassCount(n_classes))
            }
            _ => Ok(()),
        }
    }

    /// Compute gradients, building a new executor (and rayon pool unless
    /// `n_threads == 1`) on every call. `n_threads == 0` means auto.
    ///
    /// Convenience entry for callers that pass a worker count per call.
    /// Training loops should build one [`Executor`] and call
    /// [`LossFn::compute_gradients_into`] instead; `benches/gradients.rs`
    /// compares the two.
    ///
    /// # Errors
    ///
    /// Fails if the loss parameters are invalid or the thread pool cannot be
    /// built. The kernel itself never fails.
    pub fn compute_gradients(
        &self,
        n_threads: usize,
        raw_predictions: ArrayView2<'_, f32>,
        y_true: ArrayView1<'_, f32>,
        weights: WeightsView<'_>,
        gradients: ArrayViewMut2<'_, f32>,
        hessians: ArrayViewMut2<'_, f32>,
    ) -> Result<()> {
        self.validate()?;
        let executor = Executor::new(n_threads)?;
        self.compute_gradients_into(&executor, raw_predictions, y_true, weights, gradients, hessians);
        Ok(())
    }

    fn with_kernel<R>(&self, f: impl FnOnce(&dyn LossFn) -> R) -> R {
        match *self {
            Self::SquaredError => f(&SquaredLoss),
            Self::AbsoluteError => f(&AbsoluteLoss),
            Self::Poisson => f(&PoissonLoss),
            Self::BinaryCrossEntropy => f(&LogisticLoss),
            Self::CategoricalCrossEntropy { n_classes } => f(&SoftmaxLoss::new(n_classes)),
        }
    }
}

impl LossFn for Loss {
    fn n_outputs(&self) -> usize {
        match *self {
            Self::CategoricalCrossEntropy { n_classes } => n_classes,
            _ => 1,
        }
    }

    fn hessians_are_constant(&self) -> bool {
        self.with_kernel(|k| k.hessians_are_constant())
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
        tracing::trace!(
            loss = self.name(),
            n_samples = y_true.len(),
            n_threads = executor.n_threads(),
            weighted = weights.is_weighted(),
            "computing gradients"
        );
        self.with_kernel(|k| {
            k.compute_gradients_into(executor, raw_predictions, y_true, weights, gradients, hessians)
        })
    }

    fn baseline_prediction(&self, y_true: ArrayView1<'_, f32>, weights: WeightsView<'_>) -> Vec<f32> {
        self.with_kernel(|k| k.baseline_prediction(y_true, weights))
    }

    fn transform_predictions_inplace(&self, predictions: ArrayViewMut2<'_, f32>) -> PredictionKind {
        self.with_kernel(|k| k.transform_predictions_inplace(predictions))
    }

    fn name(&self) -> &'static str {
        self.with_kernel(|k| k.name())
    }
}

// =============================================================================
// Tests
// =============================================================================
