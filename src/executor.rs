//! Fork-join executor over static sample chunks.
//!
//! The sample axis `[0, n_samples)` is split into contiguous, size-balanced
//! ranges, one per worker. Each range gets disjoint mutable sub-views of the
//! gradient and hessian buffers, so kernels write without locks or atomics.
//! The call returns only after every chunk has finished.
//!
//! Chunking is static rather than work-stealing: every per-sample body costs
//! the same, and a fixed partition keeps each worker on one contiguous block
//! of memory.
//!
//! # Thread count semantics
//!
//! - `0` = auto (rayon's current thread count)
//! - `1` = sequential, runs on the calling thread
//! - `n > 1` = a dedicated rayon pool with exactly `n` threads

use std::ops::Range;

use ndarray::{ArrayViewMut2, Axis};
use rayon::prelude::*;

use crate::error::Result;

// =============================================================================
// Static partitioning
// =============================================================================

/// Partition of `[0, n_samples)` into at most `n_chunks` contiguous ranges.
///
/// The first `n_samples % n_chunks` ranges hold one extra sample. Empty ranges
/// are never produced, so fewer chunks than requested are used when there are
/// fewer samples than workers.
///
/// ```
/// use boosters_grad::executor::StaticChunks;
///
/// let chunks = StaticChunks::new(10, 4);
/// let ranges: Vec<_> = chunks.iter().collect();
/// assert_eq!(ranges, vec![0..3, 3..6, 6..8, 8..10]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticChunks {
    n_samples: usize,
    n_chunks: usize,
}

impl StaticChunks {
    pub fn new(n_samples: usize, n_chunks: usize) -> Self {
        Self {
            n_samples,
            n_chunks: n_chunks.max(1).min(n_samples),
        }
    }

    #[inline]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of non-empty chunks (0 when there are no samples).
    #[inline]
    pub fn n_chunks(&self) -> usize {
        self.n_chunks
    }

    /// Sample range of chunk `chunk`. Empty when there are no samples.
    #[inline]
    pub fn range(&self, chunk: usize) -> Range<usize> {
        debug_assert!(chunk < self.n_chunks.max(1));
        if self.n_chunks == 0 {
            return 0..0;
        }
        let base = self.n_samples / self.n_chunks;
        let extra = self.n_samples % self.n_chunks;
        let start = chunk * base + chunk.min(extra);
        let len = base + usize::from(chunk < extra);
        start..start + len
    }

    pub fn iter(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.n_chunks).map(move |c| self.range(c))
    }
}

// =============================================================================
// Chunk views
// =============================================================================

/// One worker's share of the output buffers.
///
/// `gradients` and `hessians` have shape `[n_outputs, len]` and cover global
/// samples `start..start + len`. Column `j` of either view is sample
/// `start + j`.
#[derive(Debug)]
pub struct SampleChunk<'a> {
    /// First global sample index in this chunk.
    pub start: usize,
    pub gradients: ArrayViewMut2<'a, f32>,
    pub hessians: ArrayViewMut2<'a, f32>,
}

impl SampleChunk<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.gradients.ncols()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global sample range covered by this chunk.
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len()
    }
}

/// Split both buffers along the sample axis following `plan`.
fn split_chunks<'a>(
    plan: &StaticChunks,
    mut gradients: ArrayViewMut2<'a, f32>,
    mut hessians: ArrayViewMut2<'a, f32>,
) -> Vec<SampleChunk<'a>> {
    let mut chunks = Vec::with_capacity(plan.n_chunks());
    for range in plan.iter() {
        let (g_head, g_tail) = gradients.split_at(Axis(1), range.len());
        let (h_head, h_tail) = hessians.split_at(Axis(1), range.len());
        chunks.push(SampleChunk {
            start: range.start,
            gradients: g_head,
            hessians: h_head,
        });
        gradients = g_tail;
        hessians = h_tail;
    }
    chunks
}

// =============================================================================
// Executor
// =============================================================================

/// Synchronous fork-join executor for per-sample kernels.
///
/// Holds its own rayon pool when more than one thread is requested, so the
/// thread count of a call never depends on the global pool.
///
/// ```
/// use boosters_grad::executor::Executor;
/// use ndarray::Array2;
///
/// let executor = Executor::new(2).unwrap();
/// let mut grads = Array2::<f32>::zeros((1, 5));
/// let mut hess = Array2::<f32>::zeros((1, 5));
///
/// executor.for_each_chunk(grads.view_mut(), hess.view_mut(), |mut chunk| {
///     for (j, i) in chunk.range().enumerate() {
///         chunk.gradients[[0, j]] = i as f32;
///     }
/// });
/// assert_eq!(grads.row(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
/// ```
#[derive(Debug)]
pub struct Executor {
    n_threads: usize,
    pool: Option<rayon::ThreadPool>,
}

impl Default for Executor {
    fn default() -> Self {
        Self::sequential()
    }
}

impl Executor {
    /// Create an executor for `n_threads` workers (0 = auto).
    pub fn new(n_threads: usize) -> Result<Self> {
        let n_threads = match n_threads {
            0 => rayon::current_num_threads(),
            n => n,
        };
        if n_threads == 1 {
            return Ok(Self::sequential());
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .thread_name(|i| format!("boosters-grad-{i}"))
            .build()?;
        tracing::debug!(n_threads, "built gradient thread pool");

        Ok(Self {
            n_threads,
            pool: Some(pool),
        })
    }

    /// Executor that runs everything on the calling thread.
    pub fn sequential() -> Self {
        Self {
            n_threads: 1,
            pool: None,
        }
    }

    /// Number of workers (and therefore maximum number of chunks).
    #[inline]
    pub fn n_threads(&self) -> usize {
        self.n_threads
    }

    #[inline]
    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    /// Partition the sample axis of `gradients`/`hessians` into static chunks
    /// and run `body` on every chunk, in parallel when the executor has a pool.
    ///
    /// Both buffers must have shape `[n_outputs, n_samples]`. Blocks until all
    /// chunks are done.
    pub fn for_each_chunk<F>(
        &self,
        mut gradients: ArrayViewMut2<'_, f32>,
        mut hessians: ArrayViewMut2<'_, f32>,
        body: F,
    ) where
        F: Fn(SampleChunk<'_>) + Sync + Send,
    {
        debug_assert_eq!(gradients.dim(), hessians.dim());

        let plan = StaticChunks::new(gradients.ncols(), self.n_threads);
        if plan.n_chunks() == 0 {
            return;
        }
        let chunks = split_chunks(&plan, gradients.view_mut(), hessians.view_mut());

        match &self.pool {
            Some(pool) if chunks.len() > 1 => {
                pool.install(|| chunks.into_par_iter().for_each(&body));
            }
            _ => chunks.into_iter().for_each(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn chunks_are_balanced() {
        let plan = StaticChunks::new(10, 3);
        let ranges: Vec<_> = plan.iter().collect();
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);
    }

    #[test]
    fn chunks_cover_range_without_overlap() {
        for n_samples in 0..40 {
            for n_chunks in 1..10 {
                let plan = StaticChunks::new(n_samples, n_chunks);
                let mut next = 0;
                for r in plan.iter() {
                    assert_eq!(r.start, next);
                    assert!(!r.is_empty());
                    next = r.end;
                }
                assert_eq!(next, n_samples);

                let sizes: Vec<usize> = plan.iter().map(|r| r.len()).collect();
                if let (Some(min), Some(max)) = (sizes.iter().min(), sizes.iter().max()) {
                    assert!(max - min <= 1);
                }
            }
        }
    }

    #[test]
    fn fewer_samples_than_chunks() {
        let plan = StaticChunks::new(3, 8);
        assert_eq!(plan.n_chunks(), 3);
        assert!(plan.iter().all(|r| r.len() == 1));
    }

    #[test]
    fn zero_samples_has_no_chunks() {
        assert_eq!(StaticChunks::new(0, 4).n_chunks(), 0);
    }

    #[test]
    fn zero_samples_range_is_empty() {
        let plan = StaticChunks::new(0, 4);
        assert_eq!(plan.range(0), 0..0);
        assert_eq!(plan.iter().count(), 0);
    }

    #[test]
    fn zero_chunks_requested_is_one() {
        let plan = StaticChunks::new(5, 0);
        assert_eq!(plan.n_chunks(), 1);
        assert_eq!(plan.range(0), 0..5);
    }

    #[test]
    fn sequential_executor() {
        let ex = Executor::sequential();
        assert_eq!(ex.n_threads(), 1);
        assert!(!ex.is_parallel());
        assert!(!Executor::new(1).unwrap().is_parallel());
    }

    #[test]
    fn explicit_thread_count() {
        let ex = Executor::new(3).unwrap();
        assert_eq!(ex.n_threads(), 3);
        assert!(ex.is_parallel());
    }

    #[test]
    fn auto_thread_count() {
        let ex = Executor::new(0).unwrap();
        assert_eq!(ex.n_threads(), rayon::current_num_threads());
    }

    #[test]
    fn every_sample_written_once() {
        for n_threads in [1, 2, 3, 8] {
            let ex = Executor::new(n_threads).unwrap();
            let n = 37;
            let mut grads = Array2::<f32>::zeros((2, n));
            let mut hess = Array2::<f32>::zeros((2, n));

            ex.for_each_chunk(grads.view_mut(), hess.view_mut(), |mut chunk| {
                for (j, i) in chunk.range().enumerate() {
                    for k in 0..2 {
                        chunk.gradients[[k, j]] += (k * 100 + i) as f32;
                        chunk.hessians[[k, j]] += 1.0;
                    }
                }
            });

            for i in 0..n {
                assert_eq!(grads[[0, i]], i as f32);
                assert_eq!(grads[[1, i]], (100 + i) as f32);
                assert_eq!(hess[[0, i]], 1.0);
                assert_eq!(hess[[1, i]], 1.0);
            }
        }
    }

    #[test]
    fn chunk_count_follows_threads() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let ex = Executor::new(4).unwrap();
        let calls = AtomicUsize::new(0);
        let mut grads = Array2::<f32>::zeros((1, 100));
        let mut hess = Array2::<f32>::zeros((1, 100));

        ex.for_each_chunk(grads.view_mut(), hess.view_mut(), |chunk| {
            assert_eq!(chunk.len(), 25);
            calls.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(calls.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn separately_borrowed_buffers() {
        fn fill(ex: &Executor, grads: ArrayViewMut2<'_, f32>, hess: ArrayViewMut2<'_, f32>) {
            ex.for_each_chunk(grads, hess, |mut chunk| {
                chunk.gradients.fill(2.0);
                chunk.hessians.fill(3.0);
            });
        }

        let ex = Executor::new(2).unwrap();
        let mut grads = Array2::<f32>::zeros((1, 9));
        let mut hess = Array2::<f32>::zeros((1, 9));
        fill(&ex, grads.view_mut(), hess.view_mut());
        assert!(grads.iter().all(|&g| g == 2.0));
        assert!(hess.iter().all(|&h| h == 3.0));
    }

    #[test]
    fn empty_buffers_are_a_noop() {
        let ex = Executor::new(2).unwrap();
        let mut grads = Array2::<f32>::zeros((1, 0));
        let mut hess = Array2::<f32>::zeros((1, 0));
        ex.for_each_chunk(grads.view_mut(), hess.view_mut(), |_| {
            panic!("no chunk expected");
        });
    }
}
