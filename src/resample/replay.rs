//! resample::replay — replay data through Push/Combine under a frequency table.
//!
//! Purpose
//! -------
//! Produce one accumulator per replicate by merging each observation (or
//! pre-reduced accumulator) into the replicate as many times as the
//! frequency table says, and provide the leave-one-out jackknife.
//!
//! Key behaviors
//! -------------
//! - [`resample_data`] merges entry `s` along `axis` into replicate `r` with
//!   scale `freq[r, s]`; zero frequencies are skipped. A frequency `k` is
//!   merged as one scaled operand, equivalent to merging the entry `k` times.
//! - [`resample_vals`] pushes observation `s` with weight `w_s · freq[r, s]`.
//! - [`jackknife_data`] / [`jackknife_vals`] start every replicate from the
//!   full reduction and remove entry `i` with a `-1` scaled merge; the full
//!   reduction may be supplied to avoid recomputing it.
//! - The replicate axis takes the place of the resampled axis in the output.
//!
//! Invariants & assumptions
//! ------------------------
//! - Within a replicate, entries are merged in increasing index order.
//! - Everything is validated before the first replicate is written.
use crate::{
    moments::{
        errors::MomentError,
        spec::MomentSpec,
        validation::{validate_axis, validate_same_shape, validate_second_variable, validate_weights},
    },
    reduction::{
        batch::{combine_validated, push_validated},
        options::ExecOptions,
        reduce::{axis_layouts, reduce_along, reduce_vals},
        slots::{SlotLayout, without_axis},
    },
    resample::{errors::ResampleResult, freq::validate_freq},
};
use log::debug;
use ndarray::{ArrayD, ArrayView2, ArrayViewD, Axis};

/// Bootstrap replicates of pre-reduced accumulators along `axis`.
///
/// Parameters
/// ----------
/// - `accs`: accumulator array; `axis` (a batch axis) indexes observations.
/// - `freq`: `(nrep, ndat)` frequency table with `ndat = accs.len_of(axis)`.
///
/// Returns
/// -------
/// Accumulators with `axis` resized to `nrep`.
///
/// # Errors
/// - Accumulator shape/axis errors wrapped in `ResampleError::Moment`,
///   and frequency table errors.
pub fn resample_data(
    accs: ArrayViewD<'_, f64>, spec: MomentSpec, freq: ArrayView2<'_, f64>, axis: usize,
    opts: &ExecOptions,
) -> ResampleResult<ArrayD<f64>> {
    let opts = opts.resolve();
    let (layout, inner) = axis_layouts(&accs, spec, axis)?;
    let ndat = accs.len_of(Axis(axis));
    validate_freq(&freq, ndat)?;
    let nrep = freq.nrows();

    let mut batch = layout.batch_shape().to_vec();
    batch[axis] = nrep;
    let mut out = SlotLayout::from_batch(&batch, spec).zeros();
    let binom = layout.binomials();
    debug!("resample_data: {nrep} replicates of {ndat} entries along axis {axis}");
    for (rep, row) in freq.rows().into_iter().enumerate() {
        let mut target = out.index_axis_mut(Axis(axis), rep);
        for (s, &f) in row.iter().enumerate() {
            if f != 0.0 {
                let src = accs.index_axis(Axis(axis), s);
                combine_validated(&mut target, &src, &inner, f, &binom, &opts);
            }
        }
    }
    Ok(out)
}

/// Bootstrap replicates of raw observations along `axis` of `x`.
///
/// `weights` and `y` broadcast onto the shape of `x`. The output batch shape
/// is the shape of `x` with `axis` resized to `nrep`.
///
/// # Errors
/// - Broadcast, second-variable, axis and negative-weight errors wrapped in
///   `ResampleError::Moment`, and frequency table errors.
pub fn resample_vals(
    spec: MomentSpec, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
    y: Option<ArrayViewD<'_, f64>>, freq: ArrayView2<'_, f64>, axis: usize, opts: &ExecOptions,
) -> ResampleResult<ArrayD<f64>> {
    let opts = opts.resolve();
    validate_second_variable(&spec, y.is_some())?;
    validate_axis(axis, x.ndim())?;
    let ndat = x.len_of(Axis(axis));
    validate_freq(&freq, ndat)?;
    let w_full = broadcast_to(&weights, &x, "weights")?;
    let y_full = match &y {
        Some(y) => Some(broadcast_to(y, &x, "y")?),
        None => None,
    };
    validate_weights(&weights)?;

    let nrep = freq.nrows();
    let inner = SlotLayout::from_batch(&without_axis(x.shape(), axis), spec);
    let mut batch = x.shape().to_vec();
    batch[axis] = nrep;
    let mut out = SlotLayout::from_batch(&batch, spec).zeros();
    let binom = inner.binomials();
    debug!("resample_vals: {nrep} replicates of {ndat} samples along axis {axis}");
    for (rep, row) in freq.rows().into_iter().enumerate() {
        let mut target = out.index_axis_mut(Axis(axis), rep);
        for (s, &f) in row.iter().enumerate() {
            if f != 0.0 {
                let w = &w_full.index_axis(Axis(axis), s) * f;
                push_validated(
                    &mut target,
                    &inner,
                    w.view(),
                    x.index_axis(Axis(axis), s),
                    y_full.as_ref().map(|y| y.index_axis(Axis(axis), s)),
                    &binom,
                    &opts,
                )?;
            }
        }
    }
    Ok(out)
}

/// Leave-one-out replicates of accumulators along `axis`.
///
/// Replicate `i` is the full reduction along `axis` with entry `i` removed.
/// `reduced`, if given, must be that full reduction (shape of `accs`
/// without `axis`); otherwise it is computed with `opts.strategy`.
///
/// # Errors
/// - Accumulator shape/axis errors, and `OperandShapeMismatch` for a
///   `reduced` of the wrong shape (wrapped in `ResampleError::Moment`).
pub fn jackknife_data(
    accs: ArrayViewD<'_, f64>, spec: MomentSpec, axis: usize, reduced: Option<ArrayViewD<'_, f64>>,
    opts: &ExecOptions,
) -> ResampleResult<ArrayD<f64>> {
    let opts = opts.resolve();
    let (layout, inner) = axis_layouts(&accs, spec, axis)?;
    let binom = layout.binomials();
    let reduced = match reduced {
        Some(r) => {
            validate_same_shape(&inner.full_shape(), r.shape())?;
            r.to_owned()
        }
        None => reduce_along(accs.view(), axis, &inner, &binom, &opts),
    };

    let n = accs.len_of(Axis(axis));
    debug!("jackknife_data: {n} leave-one-out replicates along axis {axis}");
    let mut out = layout.zeros();
    for (i, src) in accs.axis_iter(Axis(axis)).enumerate() {
        let mut target = out.index_axis_mut(Axis(axis), i);
        target.assign(&reduced);
        combine_validated(&mut target, &src, &inner, -1.0, &binom, &opts);
    }
    Ok(out)
}

/// Leave-one-out replicates of raw observations along `axis` of `x`.
///
/// The output has shape `x.shape() ++ mom_shape` broadcast batch-wise, with
/// entry `i` along `axis` holding all observations except observation `i`.
///
/// # Errors
/// - As [`resample_vals`], and `OperandShapeMismatch` for a `reduced` of
///   the wrong shape.
pub fn jackknife_vals(
    spec: MomentSpec, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
    y: Option<ArrayViewD<'_, f64>>, axis: usize, reduced: Option<ArrayViewD<'_, f64>>,
    opts: &ExecOptions,
) -> ResampleResult<ArrayD<f64>> {
    validate_second_variable(&spec, y.is_some())?;
    validate_axis(axis, x.ndim())?;
    let w_full = broadcast_to(&weights, &x, "weights")?;
    let y_full = match &y {
        Some(y) => Some(broadcast_to(y, &x, "y")?),
        None => None,
    };
    validate_weights(&weights)?;

    let inner = SlotLayout::from_batch(&without_axis(x.shape(), axis), spec);
    let reduced = match reduced {
        Some(r) => {
            validate_same_shape(&inner.full_shape(), r.shape())?;
            r.to_owned()
        }
        None => reduce_vals(spec, weights.view(), x.view(), y.as_ref().map(|y| y.view()), axis, opts)?,
    };

    let opts = opts.resolve();
    let n = x.len_of(Axis(axis));
    let binom = inner.binomials();
    debug!("jackknife_vals: {n} leave-one-out replicates along axis {axis}");
    let mut out = SlotLayout::from_batch(x.shape(), spec).zeros();
    for i in 0..n {
        let mut target = out.index_axis_mut(Axis(axis), i);
        target.assign(&reduced);
        let w = -&w_full.index_axis(Axis(axis), i);
        push_validated(
            &mut target,
            &inner,
            w.view(),
            x.index_axis(Axis(axis), i),
            y_full.as_ref().map(|y| y.index_axis(Axis(axis), i)),
            &binom,
            &opts,
        )?;
    }
    Ok(out)
}

fn broadcast_to<'b>(
    values: &'b ArrayViewD<'_, f64>, x: &ArrayViewD<'_, f64>, name: &'static str,
) -> Result<ArrayViewD<'b, f64>, MomentError> {
    values.broadcast(x.raw_dim()).ok_or_else(|| MomentError::NotBroadcastable {
        name,
        from: values.shape().to_vec(),
        to: x.shape().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        reduction::{ReduceStrategy, reduce},
        resample::{errors::ResampleError, freq::jackknife_freq},
    };
    use approx::assert_relative_eq;
    use ndarray::{arr0, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Frequency replay of values against explicit index replay.
    // - Agreement of the data and values forms.
    // - Jackknife against the leave-one-out frequency table.
    // - Frequency table validation.
    // -------------------------------------------------------------------------

    fn uni(order: usize) -> MomentSpec {
        MomentSpec::univariate(order).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Check a frequency replay equals pushing the selected observations.
    //
    // Given
    // -----
    // - `x = [1, 4, 6, 10]` and the replicate `freq = [[2, 0, 1, 0]]`.
    //
    // Expect
    // ------
    // - The replicate equals accumulating `[1, 1, 6]` directly.
    fn resample_vals_matches_explicit_selection() {
        // Arrange
        let spec = uni(3);
        let x = array![1.0, 4.0, 6.0, 10.0].into_dyn();
        let freq = array![[2.0, 0.0, 1.0, 0.0]];
        let one = arr0(1.0).into_dyn();
        let opts = ExecOptions::default();
        let chosen = array![1.0, 1.0, 6.0].into_dyn();
        let direct = reduce_vals(spec, one.view(), chosen.view(), None, 0, &opts).unwrap();

        // Act
        let out = resample_vals(spec, one.view(), x.view(), None, freq.view(), 0, &opts).unwrap();

        // Assert
        assert_eq!(out.shape(), &[1, 4]);
        for k in 0..4 {
            assert_relative_eq!(out[[0, k]], direct[[k]], epsilon = 1e-12, max_relative = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Verify the data form agrees with the values form.
    //
    // Given
    // -----
    // - Five observations turned into one-point accumulators and a
    //   two-replicate frequency table.
    //
    // Expect
    // ------
    // - Both forms give the same replicates to tight tolerance.
    fn resample_data_agrees_with_resample_vals() {
        // Arrange
        let spec = uni(4);
        let xs = array![0.3, -1.2, 2.5, 4.0, 0.9];
        let mut data = crate::reduction::zeros(spec, &[5]);
        for (i, &x) in xs.iter().enumerate() {
            data[[i, 0]] = 1.0;
            data[[i, 1]] = x;
        }
        let freq = array![[1.0, 2.0, 0.0, 1.0, 1.0], [0.0, 0.0, 3.0, 1.0, 1.0]];
        let opts = ExecOptions::default();

        // Act
        let from_data = resample_data(data.view(), spec, freq.view(), 0, &opts).unwrap();
        let from_vals = resample_vals(
            spec,
            arr0(1.0).into_dyn().view(),
            xs.view().into_dyn(),
            None,
            freq.view(),
            0,
            &opts,
        )
        .unwrap();

        // Assert
        for (a, b) in from_data.iter().zip(from_vals.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12, max_relative = 1e-10);
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure jackknife matches resampling with the leave-one-out table, for
    // both forms and with a supplied reduction.
    //
    // Given
    // -----
    // - Six observations, order 3.
    //
    // Expect
    // ------
    // - `jackknife_vals`, `jackknife_data` (with and without `reduced`) and
    //   `resample_vals(jackknife_freq)` all agree.
    fn jackknife_matches_leave_one_out_table() {
        // Arrange
        let spec = uni(3);
        let xs = array![2.0, 3.5, -0.5, 1.0, 8.0, 4.5];
        let x = xs.view().into_dyn();
        let one = arr0(1.0).into_dyn();
        let opts = ExecOptions::default();
        let mut data = crate::reduction::zeros(spec, &[6]);
        for (i, &v) in xs.iter().enumerate() {
            data[[i, 0]] = 1.0;
            data[[i, 1]] = v;
        }
        let reduced = reduce(data.view(), spec, 0, &opts.with_strategy(ReduceStrategy::Tree)).unwrap();
        let table = jackknife_freq(6).unwrap();

        // Act
        let expected = resample_vals(spec, one.view(), x.clone(), None, table.view(), 0, &opts).unwrap();
        let vals = jackknife_vals(spec, one.view(), x.clone(), None, 0, None, &opts).unwrap();
        let data_own = jackknife_data(data.view(), spec, 0, None, &opts).unwrap();
        let data_given = jackknife_data(data.view(), spec, 0, Some(reduced.view()), &opts).unwrap();

        // Assert
        for result in [&vals, &data_own, &data_given] {
            for (a, b) in result.iter().zip(expected.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-10, max_relative = 1e-9);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Validate frequency table checks in the replay drivers.
    //
    // Given
    // -----
    // - A table with the wrong number of columns and an out-of-range axis.
    //
    // Expect
    // ------
    // - `FreqShapeMismatch` and a wrapped `AxisOutOfRange`.
    fn resample_data_validates_inputs() {
        // Arrange
        let spec = uni(2);
        let data = crate::reduction::zeros(spec, &[4]);
        let freq = array![[1.0, 1.0, 1.0]];
        let opts = ExecOptions::default();

        // Act
        let wrong_cols = resample_data(data.view(), spec, freq.view(), 0, &opts);
        let bad_axis = resample_data(data.view(), spec, freq.view(), 1, &opts);

        // Assert
        assert_eq!(wrong_cols, Err(ResampleError::FreqShapeMismatch { expected: 4, actual: 3 }));
        assert_eq!(
            bad_axis,
            Err(ResampleError::Moment(MomentError::AxisOutOfRange { axis: 1, ndim: 1 }))
        );
    }
}
