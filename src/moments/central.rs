//! moments::central — owned, validated accumulator arrays.
//!
//! Purpose
//! -------
//! Bundle an accumulator array with the [`MomentSpec`] it was built with, so
//! that callers stop threading the order configuration through every driver call and can
//! read derived statistics (mean, variance, covariance, …) per slot.
//!
//! Key behaviors
//! -------------
//! - Construction validates the trailing moment axes once; every method can
//!   then rely on the layout.
//! - Mutators (`push`, `push_batch`, `combine`, `subtract`, `scale`) update
//!   in place; `pushed`, `combined`, `subtracted` and `scaled` return
//!   updated copies.
//! - `to_comoments` turns a univariate accumulator into the co-moment table
//!   of its variable with itself.
//! - Axis operations (`reduce`, `cumulative`, `reduce_grouped`, `rolling`,
//!   `resample_and_reduce`, `jackknife_and_reduce`) return new wrappers.
//! - Statistics read as NaN in zero-weight slots.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data.shape() == spec.full_shape(batch_shape)` at all times.
//! - Binary operations require equal specs, not only equal shapes: a
//!   univariate order-2 batch of 3 and a `(2, 2)` co-moment scalar share the
//!   shape `[3, 3]` but are not combinable.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the statistics on small closed-form samples and the
//!   spec check on `combine`. Driver semantics are tested in `reduction`.
use crate::{
    moments::{
        convert::{central_to_raw, moments_to_comoments, raw_to_central},
        errors::{MomentError, MomentResult},
        spec::{MEAN, MomentSpec, WEIGHT},
        validation::validate_accumulator,
    },
    reduction::{
        batch::{combine_into, push_batch_into, push_into, scale_into, subtract_into},
        options::ExecOptions,
        reduce::{cumulative, reduce, reduce_grouped, reduce_vals},
        rolling::rolling_data,
        slots::{Slot, SlotLayout, SlotMut, for_each_slot},
    },
    resample::{
        errors::ResampleResult,
        replay::{jackknife_data, resample_data},
    },
};
use ndarray::{ArrayD, ArrayView2, ArrayViewD, Axis, Zip, stack};

/// CentralMoments — an accumulator array together with its spec.
///
/// Fields
/// ------
/// - `data`: `ArrayD<f64>` of shape `batch_shape ++ mom_shape`, holding
///   `[w, mean, S_2, …]` (or the co-moment table) per slot.
/// - `spec`: [`MomentSpec`] describing the trailing moment axes.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::{arr0, array};
/// # use rust_moments::moments::{CentralMoments, MomentSpec};
/// # use rust_moments::reduction::ExecOptions;
/// let spec = MomentSpec::univariate(2).unwrap();
/// let x = array![1.0, 2.0, 3.0, 4.0, 5.0].into_dyn();
/// let one = arr0(1.0).into_dyn();
/// let cm = CentralMoments::from_vals(spec, one.view(), x.view(), None, 0, &ExecOptions::default())
///     .unwrap();
/// assert!((cm.mean().first().unwrap() - 3.0).abs() < 1e-12);
/// assert!((cm.var().unwrap().first().unwrap() - 2.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CentralMoments {
    data: ArrayD<f64>,
    spec: MomentSpec,
}

impl CentralMoments {
    /// Empty accumulators for `batch_shape`.
    pub fn zeros(spec: MomentSpec, batch_shape: &[usize]) -> Self {
        CentralMoments { data: SlotLayout::from_batch(batch_shape, spec).zeros(), spec }
    }

    /// Wrap an existing accumulator array.
    ///
    /// # Errors
    /// - Shape-family errors if the trailing axes do not match `spec`.
    pub fn from_array(data: ArrayD<f64>, spec: MomentSpec) -> MomentResult<Self> {
        validate_accumulator(data.shape(), &spec)?;
        Ok(CentralMoments { data, spec })
    }

    /// Accumulate raw observations along `axis` of `x`.
    ///
    /// # Errors
    /// - As [`reduce_vals`].
    pub fn from_vals(
        spec: MomentSpec, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
        y: Option<ArrayViewD<'_, f64>>, axis: usize, opts: &ExecOptions,
    ) -> MomentResult<Self> {
        let data = reduce_vals(spec, weights, x, y, axis, opts)?;
        Ok(CentralMoments { data, spec })
    }

    /// Rebuild accumulators from a raw moment array.
    ///
    /// # Errors
    /// - As [`raw_to_central`].
    pub fn from_raw(raw: ArrayViewD<'_, f64>, spec: MomentSpec) -> MomentResult<Self> {
        let data = raw_to_central(raw, spec)?;
        Ok(CentralMoments { data, spec })
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn view(&self) -> ArrayViewD<'_, f64> {
        self.data.view()
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn spec(&self) -> MomentSpec {
        self.spec
    }

    pub fn batch_shape(&self) -> &[usize] {
        let ndim = self.data.ndim() - self.spec.mom_ndim();
        &self.data.shape()[..ndim]
    }

    // ---- Mutators ----------------------------------------------------------

    /// Push one observation per slot, in place.
    ///
    /// # Errors
    /// - As [`push_into`]; on error `self` is unchanged.
    pub fn push(
        &mut self, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
        y: Option<ArrayViewD<'_, f64>>, opts: &ExecOptions,
    ) -> MomentResult<()> {
        push_into(self.data.view_mut(), self.spec, weights, x, y, opts)
    }

    /// Copy-mode [`push`](Self::push).
    pub fn pushed(
        &self, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
        y: Option<ArrayViewD<'_, f64>>, opts: &ExecOptions,
    ) -> MomentResult<Self> {
        let mut out = self.clone();
        out.push(weights, x, y, opts)?;
        Ok(out)
    }

    /// Push a sample axis of `x` into every slot, in place.
    ///
    /// # Errors
    /// - As [`push_batch_into`].
    pub fn push_batch(
        &mut self, weights: ArrayViewD<'_, f64>, x: ArrayViewD<'_, f64>,
        y: Option<ArrayViewD<'_, f64>>, axis: usize, opts: &ExecOptions,
    ) -> MomentResult<()> {
        push_batch_into(self.data.view_mut(), self.spec, weights, x, y, axis, opts)
    }

    /// Merge `other` into `self`, in place.
    ///
    /// # Errors
    /// - [`MomentError::OperandShapeMismatch`] if the moment orders or shapes differ.
    pub fn combine(&mut self, other: &CentralMoments, opts: &ExecOptions) -> MomentResult<()> {
        self.require_same_spec(other)?;
        combine_into(self.data.view_mut(), other.view(), self.spec, opts)
    }

    /// Copy-mode [`combine`](Self::combine).
    pub fn combined(&self, other: &CentralMoments, opts: &ExecOptions) -> MomentResult<Self> {
        let mut out = self.clone();
        out.combine(other, opts)?;
        Ok(out)
    }

    /// Remove `other`, previously merged into `self`, in place.
    ///
    /// # Errors
    /// - As [`combine`](Self::combine), plus
    ///   [`MomentError::RemovalExceedsWeight`] if `other` outweighs `self` in
    ///   any slot.
    pub fn subtract(&mut self, other: &CentralMoments, opts: &ExecOptions) -> MomentResult<()> {
        self.require_same_spec(other)?;
        subtract_into(self.data.view_mut(), other.view(), self.spec, opts)
    }

    /// Copy-mode [`subtract`](Self::subtract).
    pub fn subtracted(&self, other: &CentralMoments, opts: &ExecOptions) -> MomentResult<Self> {
        let mut out = self.clone();
        out.subtract(other, opts)?;
        Ok(out)
    }

    /// Multiply every slot's weight by `factor`, in place. Means and
    /// normalized moments are unchanged.
    ///
    /// # Errors
    /// - [`MomentError::InvalidScale`] unless `factor` is finite and `>= 0`.
    pub fn scale(&mut self, factor: f64, opts: &ExecOptions) -> MomentResult<()> {
        scale_into(self.data.view_mut(), self.spec, factor, opts)
    }

    /// Copy-mode [`scale`](Self::scale).
    pub fn scaled(&self, factor: f64, opts: &ExecOptions) -> MomentResult<Self> {
        let mut out = self.clone();
        out.scale(factor, opts)?;
        Ok(out)
    }

    /// Co-moments `(order0, order1)` of each slot's variable with itself.
    ///
    /// # Errors
    /// - As [`moments_to_comoments`].
    pub fn to_comoments(&self, order0: usize, order1: usize) -> MomentResult<Self> {
        let (spec, data) = moments_to_comoments(self.view(), self.spec, order0, order1)?;
        Ok(CentralMoments { data, spec })
    }

    // ---- Axis operations ---------------------------------------------------

    pub fn reduce(&self, axis: usize, opts: &ExecOptions) -> MomentResult<Self> {
        self.wrap(reduce(self.view(), self.spec, axis, opts)?)
    }

    /// Running merge along `axis`, or its inverse; see [`cumulative`].
    pub fn cumulative(
        &self, axis: usize, inverse: bool, opts: &ExecOptions,
    ) -> MomentResult<Self> {
        self.wrap(cumulative(self.view(), self.spec, axis, inverse, opts)?)
    }

    pub fn reduce_grouped(
        &self, axis: usize, groups: &[Option<usize>], ngroup: usize, opts: &ExecOptions,
    ) -> MomentResult<Self> {
        self.wrap(reduce_grouped(self.view(), self.spec, axis, groups, ngroup, opts)?)
    }

    pub fn rolling(
        &self, axis: usize, window: usize, min_count: Option<usize>, opts: &ExecOptions,
    ) -> MomentResult<Self> {
        self.wrap(rolling_data(self.view(), self.spec, axis, window, min_count, opts)?)
    }

    /// Bootstrap replicates along `axis`; the replicate axis replaces it.
    pub fn resample_and_reduce(
        &self, freq: ArrayView2<'_, f64>, axis: usize, opts: &ExecOptions,
    ) -> ResampleResult<Self> {
        Ok(self.wrap(resample_data(self.view(), self.spec, freq, axis, opts)?)?)
    }

    /// Leave-one-out replicates along `axis`.
    pub fn jackknife_and_reduce(&self, axis: usize, opts: &ExecOptions) -> ResampleResult<Self> {
        Ok(self.wrap(jackknife_data(self.view(), self.spec, axis, None, opts)?)?)
    }

    // ---- Statistics --------------------------------------------------------

    /// Total weight per slot.
    pub fn weight(&self) -> ArrayD<f64> {
        self.component(WEIGHT, 0).to_owned()
    }

    /// Mean per slot. Bivariate specs append an axis of length 2 holding the
    /// means of `x` and `y`.
    pub fn mean(&self) -> ArrayD<f64> {
        if self.spec.is_bivariate() {
            self.stack_xy(self.per_weight(MEAN, 0, 0.0), self.per_weight(0, MEAN, 0.0))
        } else {
            self.per_weight(MEAN, 0, 0.0)
        }
    }

    /// Population variance `S_2 / w` per slot (`[var_x, var_y]` for
    /// bivariate specs).
    ///
    /// # Errors
    /// - [`MomentError::InvalidOrder`] if a variable is tracked below order 2.
    pub fn var(&self) -> MomentResult<ArrayD<f64>> {
        self.require_order(2, "variance needs order >= 2 in every variable.")?;
        if self.spec.is_bivariate() {
            Ok(self.stack_xy(self.per_weight(2, 0, 1.0), self.per_weight(0, 2, 1.0)))
        } else {
            Ok(self.per_weight(2, 0, 1.0))
        }
    }

    /// Population standard deviation, `sqrt(var)`.
    ///
    /// # Errors
    /// - As [`var`](Self::var).
    pub fn std(&self) -> MomentResult<ArrayD<f64>> {
        Ok(self.var()?.mapv(f64::sqrt))
    }

    /// Population covariance `S_11 / w` per slot.
    ///
    /// # Errors
    /// - [`MomentError::MissingSecondVariable`] for univariate specs.
    pub fn cov(&self) -> MomentResult<ArrayD<f64>> {
        if !self.spec.is_bivariate() {
            return Err(MomentError::MissingSecondVariable);
        }
        Ok(self.per_weight(1, 1, 1.0))
    }

    /// Pearson correlation `S_11 / sqrt(S_20 S_02)` per slot.
    ///
    /// # Errors
    /// - [`MomentError::MissingSecondVariable`] for univariate specs.
    /// - [`MomentError::InvalidOrder`] if a variable is tracked below order 2.
    pub fn corr(&self) -> MomentResult<ArrayD<f64>> {
        if !self.spec.is_bivariate() {
            return Err(MomentError::MissingSecondVariable);
        }
        self.require_order(2, "correlation needs order >= 2 in both variables.")?;
        let mut out = self.component(1, 1).to_owned();
        Zip::from(&mut out)
            .and(&self.component(2, 0))
            .and(&self.component(0, 2))
            .for_each(|c, &sxx, &syy| *c /= (sxx * syy).sqrt());
        Ok(out)
    }

    /// Normalized central moments: slot `k` holds `E[(X - m)^k]`, with
    /// slot 0 set to 1 and the mean slots set to 0.
    pub fn cmom(&self) -> ArrayD<f64> {
        let mut out = self.data.clone();
        self.normalize(&mut out, false);
        out
    }

    /// Normalized raw moments: slot `k` holds `E[X^k]`, with slot 0 set to 1.
    ///
    /// # Errors
    /// - As [`central_to_raw`].
    pub fn rmom(&self) -> MomentResult<ArrayD<f64>> {
        let mut raw = self.to_raw()?;
        self.normalize(&mut raw, true);
        Ok(raw)
    }

    /// Raw moment array `[w, m, E[X^2], …]`, see [`central_to_raw`].
    ///
    /// # Errors
    /// - As [`central_to_raw`].
    pub fn to_raw(&self) -> MomentResult<ArrayD<f64>> {
        central_to_raw(self.view(), self.spec)
    }

    // ---- Helpers -----------------------------------------------------------

    fn wrap(&self, data: ArrayD<f64>) -> MomentResult<Self> {
        CentralMoments::from_array(data, self.spec)
    }

    /// Batch-shaped view of moment slot `(i, j)`; `j` is ignored for
    /// univariate specs.
    fn component(&self, i: usize, j: usize) -> ArrayViewD<'_, f64> {
        let batch_ndim = self.data.ndim() - self.spec.mom_ndim();
        let view = self.data.view().index_axis_move(Axis(batch_ndim), i);
        if self.spec.is_bivariate() {
            view.index_axis_move(Axis(batch_ndim), j)
        } else {
            view
        }
    }

    /// Slot `(i, j)` divided by `w^power`, NaN where the weight is zero.
    fn per_weight(&self, i: usize, j: usize, power: f64) -> ArrayD<f64> {
        let mut out = self.component(i, j).to_owned();
        Zip::from(&mut out).and(&self.component(WEIGHT, 0)).for_each(|v, &w| {
            *v = if w == 0.0 { f64::NAN } else { *v / w.powf(power) };
        });
        out
    }

    fn stack_xy(&self, x: ArrayD<f64>, y: ArrayD<f64>) -> ArrayD<f64> {
        let axis = Axis(x.ndim());
        stack(axis, &[x.view(), y.view()]).expect("x and y statistics share the batch shape")
    }

    fn require_same_spec(&self, other: &CentralMoments) -> MomentResult<()> {
        if self.spec != other.spec {
            return Err(MomentError::OperandShapeMismatch {
                left: self.data.shape().to_vec(),
                right: other.data.shape().to_vec(),
            });
        }
        Ok(())
    }

    fn require_order(&self, min: usize, reason: &'static str) -> MomentResult<()> {
        let order = self.spec.order().min(self.spec.order1().unwrap_or(usize::MAX));
        if order < min {
            return Err(MomentError::InvalidOrder { order, reason });
        }
        Ok(())
    }

    /// Normalize every slot of `arr` against the weight read from `self`;
    /// empty slots become NaN. A central `arr` is divided by `w` and its mean
    /// entries zeroed. A `raw` array already holds `E[X^k]`, so only its
    /// weight entry is replaced.
    fn normalize(&self, arr: &mut ArrayD<f64>, raw: bool) {
        let layout = SlotLayout::from_batch(self.batch_shape(), self.spec);
        let batch_ndim = layout.batch_ndim();
        let chunk = layout.chunk();
        let opts = ExecOptions::default();
        for_each_slot!(
            opts,
            Zip::from(arr.exact_chunks_mut(chunk.clone())).and(self.data.exact_chunks(chunk)),
            |dst, src| {
                let w = Slot::from_chunk(src, batch_ndim).weight();
                match SlotMut::from_chunk(dst, batch_ndim) {
                    mut slot if w == 0.0 => slot.fill(f64::NAN),
                    SlotMut::Uni(mut s) => {
                        if !raw {
                            s.mapv_inplace(|v| v / w);
                            s[MEAN] = 0.0;
                        }
                        s[WEIGHT] = 1.0;
                    }
                    SlotMut::Bi(mut s) => {
                        if !raw {
                            s.mapv_inplace(|v| v / w);
                            s[[1, 0]] = 0.0;
                            s[[0, 1]] = 0.0;
                        }
                        s[[0, 0]] = 1.0;
                    }
                }
            }
        );
    }
}
