//! boosters-grad: per-sample gradient and hessian kernels for gradient
//! boosting.
//!
//! Every boosting iteration needs, for each sample, the first and second
//! derivative of the loss with respect to the current raw prediction. This
//! crate computes them for five losses, in parallel, with results that do
//! not depend on the thread count.
//!
//! # Key Types
//!
//! - [`Loss`] / [`LossFn`] - Loss selection and the kernel trait
//! - [`Executor`] - Fork-join executor over static sample chunks
//! - [`Gradients`] - Owned gradient/hessian buffers
//! - [`GradientConfig`] - Validated configuration
//!
//! # Example
//!
//! ```
//! use boosters_grad::{GradientConfig, Gradients, Loss, LossFn, WeightsView};
//! use ndarray::array;
//!
//! let config = GradientConfig::builder()
//!     .loss(Loss::BinaryCrossEntropy)
//!     .n_threads(2)
//!     .build()
//!     .unwrap();
//! let executor = config.executor().unwrap();
//!
//! let y = array![1.0f32, 0.0, 1.0];
//! let raw = array![[0.0f32, 0.0, 0.0]];
//!
//! let mut buffer = Gradients::for_loss(&config.loss, y.len());
//! buffer.compute(&config.loss, &executor, raw.view(), y.view(), WeightsView::Uniform);
//! assert_eq!(buffer.output_grads(0).to_vec(), vec![-0.5, 0.5, -0.5]);
//! ```

// Re-export approx traits for users who want to compare buffers
pub use approx;

pub mod config;
pub mod data;
pub mod error;
pub mod executor;
pub mod gradients;
pub mod objectives;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

pub use config::GradientConfig;
pub use data::WeightsView;
pub use error::{ConfigError, Error, Result};
pub use executor::{Executor, StaticChunks};
pub use gradients::Gradients;
pub use objectives::{
    AbsoluteLoss, LogisticLoss, Loss, LossFn, PoissonLoss, PredictionKind, SoftmaxLoss, SquaredLoss,
};
