//! reduction::reduce — collapse accumulators along a batch axis.
//!
//! Purpose
//! -------
//! Combine the accumulators laid out along one batch axis into a single
//! accumulator per remaining index, and provide the related grouped,
//! cumulative and from-values variants.
//!
//! Key behaviors
//! -------------
//! - [`reduce`] honors [`ReduceStrategy`]: a left fold in index order, or a
//!   balanced tree split at `n / 2` (recursed with `rayon::join` when
//!   parallel execution is enabled).
//! - [`reduce_grouped`] merges each index into the output row named by its
//!   group label; `None` labels are skipped. Within a group, indices are
//!   merged in increasing order.
//! - [`cumulative`] returns the running merge `a0, a0 ⊕ a1, …` along the
//!   axis. With `inverse` it undoes that: entry `i` becomes `c_i ⊖ c_(i-1)`,
//!   a `-1` scaled merge of the previous running accumulator.
//! - [`reduce_vals`] accumulates raw observations along a sample axis from
//!   the empty accumulator.
//!
//! Invariants & assumptions
//! ------------------------
//! - The reduction axis must be a batch axis, never a moment axis.
//! - Reducing an empty axis yields empty accumulators (weight 0).
//! - All checks complete before any accumulation starts.
use crate::{
    moments::{
        binomial::BinomialTable,
        errors::{MomentError, MomentResult},
        spec::MomentSpec,
        validation::validate_axis,
    },
    reduction::{
        batch::{combine_validated, push_batch_into},
        options::{ExecOptions, ReduceStrategy},
        slots::{SlotLayout, without_axis},
    },
};
use log::debug;
use ndarray::{ArrayD, ArrayViewD, Axis};

/// Combine all accumulators along batch axis `axis`.
///
/// Parameters
/// ----------
/// - `accs`: accumulator array `batch_shape ++ mom_shape`.
/// - `spec`: moment configuration of `accs`.
/// - `axis`: batch axis to collapse.
/// - `opts`: merge order and parallelism.
///
/// Returns
/// -------
/// Accumulator array with `axis` removed from the batch shape.
///
/// # Errors
/// - Accumulator shape errors, and [`MomentError::AxisOutOfRange`] if `axis`
///   is not a batch axis.
pub fn reduce(
    accs: ArrayViewD<'_, f64>, spec: MomentSpec, axis: usize, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let opts = opts.resolve();
    let (layout, out_layout) = axis_layouts(&accs, spec, axis)?;
    let binom = layout.binomials();
    debug!(
        "reduce: {} accumulators along axis {axis}, strategy {:?}",
        accs.len_of(Axis(axis)),
        opts.strategy
    );
    Ok(reduce_along(accs, axis, &out_layout, &binom, &opts))
}

/// Accumulate raw observations along `axis` of `x`, starting from empty
/// accumulators. The batch shape is the shape of `x` without `axis`.
///
/// # Errors
/// - As [`push_batch_into`](crate::reduction::push_batch_into).
pub fn reduce_vals(
    spec: MomentSpec, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
    y: Option<ArrayViewD<'_, f64>>, axis: usize, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    validate_axis(axis, x.ndim())?;
    let mut out = SlotLayout::from_batch(&without_axis(x.shape(), axis), spec).zeros();
    push_batch_into(out.view_mut(), spec, weights, x, y, axis, opts)?;
    Ok(out)
}

/// Combine accumulators along `axis` into `ngroup` groups.
///
/// `groups[i]` names the output group of index `i` along `axis`; `None`
/// drops that index. The output has `ngroup` entries along `axis`; groups
/// with no members stay empty.
///
/// # Errors
/// - [`MomentError::LengthMismatch`] if `groups.len()` differs from the
///   axis length.
/// - [`MomentError::GroupOutOfRange`] for a label `>= ngroup`.
pub fn reduce_grouped(
    accs: ArrayViewD<'_, f64>, spec: MomentSpec, axis: usize, groups: &[Option<usize>],
    ngroup: usize, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let opts = opts.resolve();
    let (layout, inner) = axis_layouts(&accs, spec, axis)?;
    let n = accs.len_of(Axis(axis));
    if groups.len() != n {
        return Err(MomentError::LengthMismatch { name: "groups", expected: n, actual: groups.len() });
    }
    if let Some((index, group)) =
        groups.iter().enumerate().find_map(|(i, g)| g.filter(|&g| g >= ngroup).map(|g| (i, g)))
    {
        return Err(MomentError::GroupOutOfRange { index, group, ngroup });
    }

    let mut batch = layout.batch_shape().to_vec();
    batch[axis] = ngroup;
    let mut out = SlotLayout::from_batch(&batch, spec).zeros();
    let binom = layout.binomials();
    debug!("reduce_grouped: {n} accumulators into {ngroup} groups along axis {axis}");
    for (i, group) in groups.iter().enumerate() {
        if let Some(g) = *group {
            let src = accs.index_axis(Axis(axis), i);
            combine_validated(
                &mut out.index_axis_mut(Axis(axis), g),
                &src,
                &inner,
                1.0,
                &binom,
                &opts,
            );
        }
    }
    Ok(out)
}

/// Running merge along `axis`: entry `i` of the output is the combination of
/// entries `0..=i` of the input.
///
/// With `inverse = true` the input is taken to be such a running merge and
/// the per-entry accumulators are recovered: entry `i` is entry `i` of the
/// input with entry `i - 1` removed. `cumulative(…, true)` after
/// `cumulative(…, false)` returns the original entries up to rounding.
///
/// # Errors
/// - Accumulator shape errors and [`MomentError::AxisOutOfRange`].
pub fn cumulative(
    accs: ArrayViewD<'_, f64>, spec: MomentSpec, axis: usize, inverse: bool, opts: &ExecOptions,
) -> MomentResult<ArrayD<f64>> {
    let opts = opts.resolve();
    let (layout, inner) = axis_layouts(&accs, spec, axis)?;
    let binom = layout.binomials();
    let mut out = layout.zeros();
    debug!("cumulative (inverse = {inverse}) over {} slots ({spec})", layout.n_slots());
    if inverse {
        for (i, src) in accs.axis_iter(Axis(axis)).enumerate() {
            let mut target = out.index_axis_mut(Axis(axis), i);
            target.assign(&src);
            if i > 0 {
                let prev = accs.index_axis(Axis(axis), i - 1);
                combine_validated(&mut target, &prev, &inner, -1.0, &binom, &opts);
            }
        }
        return Ok(out);
    }
    let mut running = inner.zeros();
    for (i, src) in accs.axis_iter(Axis(axis)).enumerate() {
        combine_validated(&mut running.view_mut(), &src, &inner, 1.0, &binom, &opts);
        out.index_axis_mut(Axis(axis), i).assign(&running);
    }
    Ok(out)
}

/// Layout of `accs` and of one slice along batch axis `axis`.
pub(crate) fn axis_layouts(
    accs: &ArrayViewD<'_, f64>, spec: MomentSpec, axis: usize,
) -> MomentResult<(SlotLayout, SlotLayout)> {
    let layout = SlotLayout::new(accs.shape(), spec)?;
    validate_axis(axis, layout.batch_ndim())?;
    let inner = SlotLayout::from_batch(&without_axis(layout.batch_shape(), axis), spec);
    Ok((layout, inner))
}

/// Reduce along `axis` with already validated inputs.
pub(crate) fn reduce_along(
    accs: ArrayViewD<'_, f64>, axis: usize, out_layout: &SlotLayout, binom: &BinomialTable,
    opts: &ExecOptions,
) -> ArrayD<f64> {
    match opts.strategy {
        ReduceStrategy::Sequential => {
            let mut out = out_layout.zeros();
            for src in accs.axis_iter(Axis(axis)) {
                combine_validated(&mut out.view_mut(), &src, out_layout, 1.0, binom, opts);
            }
            out
        }
        ReduceStrategy::Tree => tree_reduce(accs, axis, out_layout, binom, opts),
    }
}

fn tree_reduce(
    accs: ArrayViewD<'_, f64>, axis: usize, out_layout: &SlotLayout, binom: &BinomialTable,
    opts: &ExecOptions,
) -> ArrayD<f64> {
    let n = accs.len_of(Axis(axis));
    match n {
        0 => out_layout.zeros(),
        1 => {
            let mut out = out_layout.zeros();
            let src = accs.index_axis(Axis(axis), 0);
            combine_validated(&mut out.view_mut(), &src, out_layout, 1.0, binom, opts);
            out
        }
        _ => {
            let (left, right) = accs.split_at(Axis(axis), n / 2);
            let (mut merged, rhs) = join(
                opts.parallel,
                || tree_reduce(left, axis, out_layout, binom, opts),
                || tree_reduce(right, axis, out_layout, binom, opts),
            );
            combine_validated(&mut merged.view_mut(), &rhs.view(), out_layout, 1.0, binom, opts);
            merged
        }
    }
}

fn join<A, B, RA, RB>(parallel: bool, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return rayon::join(a, b);
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;
    (a(), b())
}
