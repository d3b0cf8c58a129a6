//! Seeded problem generators for integration tests.
//!
//! For assertion helpers, use `boosters_grad::testing`.

#![allow(dead_code)]

use boosters_grad::{Executor, Loss, LossFn, WeightsView};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[allow(unused_imports)]
pub use boosters_grad::assert_approx_eq;
#[allow(unused_imports)]
pub use boosters_grad::testing::{assert_buffers_eq, assert_slice_approx_eq, DEFAULT_TOLERANCE};

/// Inputs for one kernel call.
#[derive(Debug, Clone)]
pub struct Problem {
    pub raw: Array2<f32>,
    pub y: Array1<f32>,
    pub weights: Option<Array1<f32>>,
}

impl Problem {
    pub fn weights(&self) -> WeightsView<'_> {
        WeightsView::from_option(self.weights.as_ref().map(|w| w.view()))
    }

    pub fn n_samples(&self) -> usize {
        self.y.len()
    }
}

/// Random labels and raw predictions suited to `loss`.
pub fn random_problem(loss: &Loss, n_samples: usize, weighted: bool, seed: u64) -> Problem {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_outputs = loss.n_outputs();

    let raw = Array2::from_shape_fn((n_outputs, n_samples), |_| rng.gen_range(-3.0f32..3.0));
    let y = Array1::from_shape_fn(n_samples, |_| match *loss {
        Loss::SquaredError | Loss::AbsoluteError => rng.gen_range(-5.0f32..5.0),
        Loss::Poisson => rng.gen_range(0u32..10) as f32,
        Loss::BinaryCrossEntropy => rng.gen_range(0u32..2) as f32,
        Loss::CategoricalCrossEntropy { n_classes } => rng.gen_range(0..n_classes) as f32,
    });
    let weights = weighted.then(|| Array1::from_shape_fn(n_samples, |_| rng.gen_range(0.1f32..3.0)));

    Problem { raw, y, weights }
}

/// Run `loss` on `problem` with `n_threads` workers, returning `(grads, hess)`.
///
/// Hessians start at 1 so losses with constant hessians compare equal.
pub fn run(loss: &Loss, problem: &Problem, n_threads: usize) -> (Array2<f32>, Array2<f32>) {
    let shape = problem.raw.dim();
    let mut grads = Array2::zeros(shape);
    let mut hess = Array2::ones(shape);
    let executor = Executor::new(n_threads).unwrap();

    loss.compute_gradients_into(
        &executor,
        problem.raw.view(),
        problem.y.view(),
        problem.weights(),
        grads.view_mut(),
        hess.view_mut(),
    );
    (grads, hess)
}

/// Every loss, with a three-class softmax.
pub fn all_losses() -> [Loss; 5] {
    [
        Loss::SquaredError,
        Loss::AbsoluteError,
        Loss::Poisson,
        Loss::BinaryCrossEntropy,
        Loss::CategoricalCrossEntropy { n_classes: 3 },
    ]
}
