//! Read-only views over per-sample inputs.
//!
//! Sample weights are a tagged union rather than an optional buffer: kernels
//! match on [`WeightsView`] once, outside their per-sample loop, so the
//! unweighted path never multiplies by one.

use ndarray::ArrayView1;

/// Per-sample weights for one kernel call.
///
/// # Example
///
/// ```
/// use boosters_grad::data::WeightsView;
/// use ndarray::array;
///
/// let w = array![2.0f32, 0.5];
/// let weights = WeightsView::from_array(w.view());
/// assert!(weights.is_weighted());
/// assert_eq!(weights.get(1), 0.5);
///
/// assert_eq!(WeightsView::Uniform.get(7), 1.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub enum WeightsView<'a> {
    /// Every sample has weight 1.
    #[default]
    Uniform,
    /// One weight per sample.
    Weighted(ArrayView1<'a, f32>),
}

impl<'a> WeightsView<'a> {
    /// Wrap a weight array.
    #[inline]
    pub fn from_array(weights: ArrayView1<'a, f32>) -> Self {
        Self::Weighted(weights)
    }

    /// Wrap a weight slice.
    #[inline]
    pub fn from_slice(weights: &'a [f32]) -> Self {
        Self::Weighted(ArrayView1::from(weights))
    }

    /// Build from an optional array, mapping `None` to [`WeightsView::Uniform`].
    #[inline]
    pub fn from_option(weights: Option<ArrayView1<'a, f32>>) -> Self {
        weights.map_or(Self::Uniform, Self::Weighted)
    }

    #[inline]
    pub fn is_weighted(&self) -> bool {
        matches!(self, Self::Weighted(_))
    }

    /// Weight of sample `i`.
    #[inline]
    pub fn get(&self, i: usize) -> f32 {
        match self {
            Self::Uniform => 1.0,
            Self::Weighted(w) => w[i],
        }
    }

    /// Iterate over `n_samples` weights, yielding 1.0 for uniform weights.
    ///
    /// Intended for reductions (baseline scores). Gradient kernels match on
    /// the variant instead.
    #[inline]
    pub fn iter(&self, n_samples: usize) -> WeightsIter<'_, 'a> {
        debug_assert!(match self {
            Self::Uniform => true,
            Self::Weighted(w) => w.len() >= n_samples,
        });
        WeightsIter {
            view: self,
            index: 0,
            len: n_samples,
        }
    }
}

/// Iterator returned by [`WeightsView::iter`].
pub struct WeightsIter<'v, 'a> {
    view: &'v WeightsView<'a>,
    index: usize,
    len: usize,
}

impl Iterator for WeightsIter<'_, '_> {
    type Item = f32;

    #[inline]
    fn next(&mut self) -> Option<f32> {
        if self.index >= self.len {
            return None;
        }
        let w = self.view.get(self.index);
        self.index += 1;
        Some(w)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for WeightsIter<'_, '_> {}
