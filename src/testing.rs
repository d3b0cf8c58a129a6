//! Testing utilities for boosters-grad.
//!
//! Assertion helpers shared by unit tests, integration tests and doc tests.
//!
//! ```
//! use boosters_grad::assert_approx_eq;
//! use boosters_grad::testing::DEFAULT_TOLERANCE;
//!
//! assert_approx_eq!(0.1f32 + 0.2, 0.3, DEFAULT_TOLERANCE);
//! ```

use approx::AbsDiffEq;
use ndarray::ArrayView2;

/// Default tolerance for floating point comparisons of O(1) values.
pub const DEFAULT_TOLERANCE: f32 = 1e-5;

/// Assert that two f32 values are approximately equal.
///
/// # Panics
///
/// Panics if the absolute difference exceeds tolerance.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $tolerance:expr) => {{
        let left_val = $left;
        let right_val = $right;
        let tol = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                left_val, right_val, diff, tol
            );
        }
    }};
    ($left:expr, $right:expr, $tolerance:expr, $($arg:tt)+) => {{
        let left_val = $left;
        let right_val = $right;
        let tol = $tolerance;
        let diff = (left_val - right_val).abs();
        if diff > tol {
            panic!(
                "assertion failed: `(left ≈ right)` - {}\n  left: `{:?}`\n right: `{:?}`\n  diff: `{:?}` > tolerance `{:?}`",
                format_args!($($arg)+), left_val, right_val, diff, tol
            );
        }
    }};
}

/// Assert that two slices are approximately equal element-wise.
///
/// # Panics
///
/// Panics if lengths differ or any element differs by more than tolerance.
pub fn assert_slice_approx_eq(actual: &[f32], expected: &[f32], tolerance: f32, context: &str) {
    assert_eq!(
        actual.len(),
        expected.len(),
        "{context}: length mismatch - got {}, expected {}",
        actual.len(),
        expected.len()
    );

    for (i, (a, e)) in actual.iter().zip(expected.iter()).enumerate() {
        let diff = (a - e).abs();
        assert!(
            diff <= tolerance,
            "{context}[{i}]: {a} ≠ {e} (diff={diff}, tolerance={tolerance})"
        );
    }
}

/// Per-sample listing of the outputs that differ, one `-`/`+` pair per sample.
fn diff_buffers(actual: &ArrayView2<'_, f32>, expected: &ArrayView2<'_, f32>, epsilon: f32) -> String {
    let mut result = String::new();
    let (n_outputs, n_samples) = actual.dim();
    result.push_str(&format!("Shape: [{n_outputs}, {n_samples}]\n"));
    result.push_str(&format!("Epsilon: {epsilon:.0e}\n\n"));

    for i in 0..n_samples {
        let act = actual.column(i);
        let exp = expected.column(i);
        if act.iter().zip(exp.iter()).all(|(a, e)| a.abs_diff_eq(e, epsilon)) {
            continue;
        }
        result.push_str(&format!("[{i:3}] -"));
        for val in exp {
            result.push_str(&format!(" {val:>12.6}"));
        }
        result.push_str("  (expected)\n      +");
        for val in act {
            result.push_str(&format!(" {val:>12.6}"));
        }
        result.push_str("  (actual)\n");
    }
    result
}

/// Assert that two `[n_outputs, n_samples]` buffers match within `epsilon`.
///
/// NaNs never compare equal. On failure, prints the differing samples.
///
/// # Panics
///
/// Panics if shapes differ or any value differs by more than `epsilon`.
pub fn assert_buffers_eq(actual: ArrayView2<'_, f32>, expected: ArrayView2<'_, f32>, epsilon: f32, context: &str) {
    assert_eq!(actual.dim(), expected.dim(), "{context}: shape mismatch");
    if !actual.abs_diff_eq(&expected, epsilon) {
        panic!(
            "{context}: buffers differ\n{}",
            diff_buffers(&actual, &expected, epsilon)
        );
    }
}
