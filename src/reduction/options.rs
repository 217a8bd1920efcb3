//! reduction::options — execution configuration for the vectorized drivers.
//!
//! Purpose
//! -------
//! Collect the knobs that change *how* a driver runs without changing *what*
//! it computes: the order in which accumulators are combined along a
//! reduction axis and whether independent slots are processed in parallel.
//!
//! Key behaviors
//! -------------
//! - [`ReduceStrategy::Sequential`] folds left in index order; it is the
//!   default and reproduces a streaming accumulation bit for bit.
//! - [`ReduceStrategy::Tree`] combines balanced halves (split at `n / 2`),
//!   which bounds the depth of the merge tree at `⌈log2 n⌉`.
//! - `parallel = true` runs slot-wise kernels through `rayon` when the crate
//!   is built with the `parallel` feature. Without the feature the request is
//!   logged at `warn` level and execution stays serial.
//!
//! Invariants & assumptions
//! ------------------------
//! - Within one slot the order of recurrence steps never depends on
//!   `parallel`; only the scheduling of independent slots does. Results are
//!   therefore identical with and without parallelism.
//!
//! Testing notes
//! -------------
//! - Unit tests check defaults and builder methods; strategy effects are
//!   covered in `reduction::reduce`.
use log::warn;

/// Order in which accumulators along a reduction axis are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReduceStrategy {
    /// Left fold: `((z ⊕ a0) ⊕ a1) ⊕ …`.
    #[default]
    Sequential,
    /// Balanced pairwise merge, splitting each range at its midpoint.
    Tree,
}

/// ExecOptions — scheduling configuration shared by all drivers.
///
/// Fields
/// ------
/// - `strategy`: [`ReduceStrategy`]
///   Merge order used by `reduce` and the resampling drivers.
/// - `parallel`: `bool`
///   Process independent batch slots on the `rayon` thread pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecOptions {
    pub strategy: ReduceStrategy,
    pub parallel: bool,
}

impl ExecOptions {
    pub fn new(strategy: ReduceStrategy, parallel: bool) -> Self {
        ExecOptions { strategy, parallel }
    }

    /// Copy of `self` with the given strategy.
    pub fn with_strategy(mut self, strategy: ReduceStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Copy of `self` with parallel execution switched on or off.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Effective options for one driver call: `parallel` is cleared (with a
    /// warning) when the crate was built without the `parallel` feature.
    pub(crate) fn resolve(&self) -> ExecOptions {
        if self.parallel && !cfg!(feature = "parallel") {
            warn!("parallel execution requested but the `parallel` feature is disabled; running serially");
            return ExecOptions { parallel: false, ..*self };
        }
        *self
    }
}
