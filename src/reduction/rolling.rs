//! reduction::rolling — moving-window accumulators along a batch axis.
//!
//! Purpose
//! -------
//! Compute, for every position `i` along an axis, the accumulator of the
//! trailing window `i + 1 − window ..= i`, without re-merging the whole
//! window at each step.
//!
//! Key behaviors
//! -------------
//! - Each step merges the entering entry and removes the leaving one through
//!   a `-1` scaled merge (a negative-weight push for raw values).
//! - If the leaving weight is not strictly below the running weight, the
//!   running accumulator is reset to empty instead of subtracting. This is
//!   the case where the window drops its last non-empty member.
//! - Entries with zero weight are not counted. Positions whose window holds
//!   fewer than `min_count` non-empty entries are filled with NaN;
//!   `min_count` defaults to `window` and is clamped to at least 1.
//!
//! Invariants & assumptions
//! ------------------------
//! - Removal is exact in exact arithmetic only; long windows over data with
//!   widely varying means accumulate rounding error from the subtractions.
//! - The rolling axis stays in place in the output.
use crate::{
    moments::{
        binomial::BinomialTable,
        errors::{MomentError, MomentResult},
        spec::MomentSpec,
        validation::{validate_axis, validate_second_variable, validate_weights},
    },
    reduction::{
        options::ExecOptions,
        reduce::axis_layouts,
        slots::{Slot, SlotLayout, SlotMut, combine_slot, for_each_slot, push_slot, without_axis},
    },
};
use log::debug;
use ndarray::{ArrayD, ArrayViewD, ArrayViewMutD, Axis, Zip};

/// Moving-window accumulators from an accumulator array.
///
/// Parameters
/// ----------
/// - `accs`: accumulator array `batch_shape ++ mom_shape`.
/// - `axis`: batch axis to roll along.
/// - `window`: number of entries per window (`>= 1`).
/// - `min_count`: minimum number of non-empty entries for a valid output;
///   `None` means `window`.
///
/// # Errors
/// - [`MomentError::InvalidWindow`] for `window == 0`, plus accumulator
///   shape and axis errors.
pub fn rolling_data(
    accs: ArrayViewD<'_, f64>, spec: MomentSpec, axis: usize, window: usize,
    min_count: Option<usize>, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let opts = opts.resolve();
    validate_window(window)?;
    let (layout, inner) = axis_layouts(&accs, spec, axis)?;
    let min_count = min_count.unwrap_or(window).max(1);
    let binom = layout.binomials();
    let n = accs.len_of(Axis(axis));
    debug!("rolling_data: {n} entries, window {window}, min_count {min_count}");

    let mut window_state = WindowState::new(&inner);
    let mut out = layout.zeros();
    for i in 0..n {
        window_state.add_data(&accs.index_axis(Axis(axis), i), &binom, &opts);
        if i >= window {
            window_state.remove_data(&accs.index_axis(Axis(axis), i - window), &binom, &opts);
        }
        window_state.emit(&mut out.index_axis_mut(Axis(axis), i), min_count, &opts);
    }
    Ok(out)
}

/// Moving-window accumulators from raw observations along `axis` of `x`.
///
/// The output has shape `x.shape() ++ mom_shape`; `weights` and `y`
/// broadcast onto the shape of `x`.
///
/// # Errors
/// - [`MomentError::InvalidWindow`], [`MomentError::AxisOutOfRange`],
///   broadcast, second-variable and negative-weight errors.
pub fn rolling_vals(
    spec: MomentSpec, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
    y: Option<ArrayViewD<'_, f64>>, axis: usize, window: usize, min_count: Option<usize>,
    opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let opts = opts.resolve();
    validate_window(window)?;
    validate_second_variable(&spec, y.is_some())?;
    validate_axis(axis, x.ndim())?;
    let w_full = weights.broadcast(x.raw_dim()).ok_or_else(|| MomentError::NotBroadcastable {
        name: "weights",
        from: weights.shape().to_vec(),
        to: x.shape().to_vec(),
    })?;
    let y_full = match &y {
        Some(y) => y.broadcast(x.raw_dim()).ok_or_else(|| MomentError::NotBroadcastable {
            name: "y",
            from: y.shape().to_vec(),
            to: x.shape().to_vec(),
        })?,
        None => x.view(),
    };
    validate_weights(&weights)?;

    let layout = SlotLayout::from_batch(x.shape(), spec);
    let inner = SlotLayout::from_batch(&without_axis(x.shape(), axis), spec);
    let min_count = min_count.unwrap_or(window).max(1);
    let binom = layout.binomials();
    let has_y = y.is_some();
    let n = x.len_of(Axis(axis));
    debug!("rolling_vals: {n} samples, window {window}, min_count {min_count}");

    let at = |i: usize| Observations {
        weights: w_full.index_axis(Axis(axis), i),
        x: x.index_axis(Axis(axis), i),
        y: y_full.index_axis(Axis(axis), i),
        has_y,
    };
    let mut window_state = WindowState::new(&inner);
    let mut out = layout.zeros();
    for i in 0..n {
        window_state.add_vals(&at(i), 1.0, &binom, &opts);
        if i >= window {
            window_state.add_vals(&at(i - window), -1.0, &binom, &opts);
        }
        window_state.emit(&mut out.index_axis_mut(Axis(axis), i), min_count, &opts);
    }
    Ok(out)
}

fn validate_window(window: usize) -> MomentResult<()> {
    if window == 0 {
        return Err(MomentError::InvalidWindow { window });
    }
    Ok(())
}

/// One sample position of raw inputs, already broadcast to the inner batch.
struct Observations<'a> {
    weights: ArrayViewD<'a, f64>,
    x: ArrayViewD<'a, f64>,
    y: ArrayViewD<'a, f64>,
    has_y: bool,
}

/// Running accumulator and non-empty entry count per slot.
struct WindowState<'l> {
    layout: &'l SlotLayout,
    running: ArrayD<f64>,
    count: ArrayD<usize>,
}

impl<'l> WindowState<'l> {
    fn new(layout: &'l SlotLayout) -> Self {
        WindowState { layout, running: layout.zeros(), count: ArrayD::zeros(layout.zip_dim()) }
    }

    fn add_data(&mut self, entering: &ArrayViewD<'_, f64>, binom: &BinomialTable, opts: &ExecOptions) {
        let batch_ndim = self.layout.batch_ndim();
        let chunk = self.layout.chunk();
        for_each_slot!(
            opts,
            Zip::from(self.running.exact_chunks_mut(chunk.clone()))
                .and(&mut self.count)
                .and(entering.exact_chunks(chunk)),
            |run, count, src| {
                let src = Slot::from_chunk(src, batch_ndim);
                if src.weight() != 0.0 {
                    *count += 1;
                    combine_slot(SlotMut::from_chunk(run, batch_ndim), &src, 1.0, binom);
                }
            }
        );
    }

    fn remove_data(&mut self, leaving: &ArrayViewD<'_, f64>, binom: &BinomialTable, opts: &ExecOptions) {
        let batch_ndim = self.layout.batch_ndim();
        let chunk = self.layout.chunk();
        for_each_slot!(
            opts,
            Zip::from(self.running.exact_chunks_mut(chunk.clone()))
                .and(&mut self.count)
                .and(leaving.exact_chunks(chunk)),
            |run, count, src| {
                let src = Slot::from_chunk(src, batch_ndim);
                let w_old = src.weight();
                if w_old != 0.0 {
                    *count -= 1;
                    let mut run = SlotMut::from_chunk(run, batch_ndim);
                    if w_old < run.weight() {
                        combine_slot(run, &src, -1.0, binom);
                    } else {
                        run.fill(0.0);
                    }
                }
            }
        );
    }

    /// `sign = 1.0` pushes the observations; `sign = -1.0` removes them.
    fn add_vals(&mut self, obs: &Observations<'_>, sign: f64, binom: &BinomialTable, opts: &ExecOptions) {
        let batch_ndim = self.layout.batch_ndim();
        let w_lifted = self.layout.lift(obs.weights.view());
        let x_lifted = self.layout.lift(obs.x.view());
        let y_lifted = self.layout.lift(obs.y.view());
        let (Ok(w), Ok(x), Ok(y)) = (
            self.layout.broadcast("weights", &w_lifted),
            self.layout.broadcast("x", &x_lifted),
            self.layout.broadcast("y", &y_lifted),
        ) else {
            unreachable!("per-sample slices have the inner batch shape");
        };
        let has_y = obs.has_y;
        for_each_slot!(
            opts,
            Zip::from(self.running.exact_chunks_mut(self.layout.chunk()))
                .and(&mut self.count)
                .and(&w)
                .and(&x)
                .and(&y),
            |run, count, &w, &x, &y| {
                if w == 0.0 {
                    return;
                }
                let y = if has_y { Some(y) } else { None };
                let mut run = SlotMut::from_chunk(run, batch_ndim);
                if sign > 0.0 {
                    *count += 1;
                    push_slot(run, w, x, y, binom);
                } else {
                    *count -= 1;
                    if w < run.weight() {
                        push_slot(run, -w, x, y, binom);
                    } else {
                        run.fill(0.0);
                    }
                }
            }
        );
    }

    /// Write the running accumulators, or NaN where too few entries count.
    fn emit(&self, dst: &mut ArrayViewMutD<'_, f64>, min_count: usize, opts: &ExecOptions) {
        let batch_ndim = self.layout.batch_ndim();
        let chunk = self.layout.chunk();
        for_each_slot!(
            opts,
            Zip::from(dst.exact_chunks_mut(chunk.clone()))
                .and(self.running.exact_chunks(chunk))
                .and(&self.count),
            |out, run, &count| {
                let mut out = SlotMut::from_chunk(out, batch_ndim);
                if count >= min_count {
                    out.assign(&Slot::from_chunk(run, batch_ndim));
                } else {
                    out.fill(f64::NAN);
                }
            }
        );
    }
}
