//! reduction::slots — per-slot views over a batched accumulator array.
//!
//! Purpose
//! -------
//! An accumulator array of shape `batch_shape ++ mom_shape` is an arena of
//! independent slots, one per batch index. This module turns such an array
//! into an `ndarray` producer of slot views so drivers can run the moment
//! kernels with `Zip`, optionally in parallel, with no locking.
//!
//! Key behaviors
//! -------------
//! - [`SlotLayout`] records the batch shape and spec, and derives:
//!   - the chunk shape `[1; batch_ndim] ++ mom_shape` that covers one slot,
//!   - the zip dimension `batch_shape ++ [1; mom_ndim]`, which is the
//!     producer dimension of `exact_chunks` over the full array.
//! - Per-slot side inputs (weights, values) with batch-broadcastable shape
//!   are lifted by appending `mom_ndim` unit axes and broadcast to the zip
//!   dimension, so they line up element-for-slot with the chunks.
//! - [`SlotMut`] / [`Slot`] squeeze a chunk down to the 1-D or 2-D slot that
//!   the kernels operate on.
//!
//! Invariants & assumptions
//! ------------------------
//! - Callers validate the array shape before building chunk producers; the
//!   squeeze to `Ix1`/`Ix2` then cannot fail.
//! - Nothing here assumes a contiguous layout; strided and transposed views
//!   work through the same chunking.
use crate::moments::{
    binomial::BinomialTable,
    combine::{combine_comoments, combine_moments},
    errors::{MomentError, MomentResult},
    push::{push_pair, push_value},
    source::Scaled,
    spec::MomentSpec,
    validation::validate_accumulator,
};
use ndarray::{
    ArrayD, ArrayView1, ArrayView2, ArrayViewD, ArrayViewMut1, ArrayViewMut2, ArrayViewMutD, Axis,
    Ix1, Ix2, IxDyn,
};

/// Batch shape and moment spec of an accumulator array.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SlotLayout {
    spec: MomentSpec,
    batch_shape: Vec<usize>,
}

impl SlotLayout {
    /// Validate `shape` against `spec` and record its batch shape.
    pub(crate) fn new(shape: &[usize], spec: MomentSpec) -> MomentResult<Self> {
        let batch_shape = validate_accumulator(shape, &spec)?.to_vec();
        Ok(SlotLayout { spec, batch_shape })
    }

    pub(crate) fn from_batch(batch_shape: &[usize], spec: MomentSpec) -> Self {
        SlotLayout { spec, batch_shape: batch_shape.to_vec() }
    }

    pub(crate) fn batch_shape(&self) -> &[usize] {
        &self.batch_shape
    }

    pub(crate) fn batch_ndim(&self) -> usize {
        self.batch_shape.len()
    }

    pub(crate) fn n_slots(&self) -> usize {
        self.batch_shape.iter().product()
    }

    pub(crate) fn full_shape(&self) -> Vec<usize> {
        self.spec.full_shape(&self.batch_shape)
    }

    /// Chunk shape covering exactly one slot.
    pub(crate) fn chunk(&self) -> IxDyn {
        let mut chunk = vec![1; self.batch_ndim()];
        chunk.extend(self.spec.mom_shape());
        IxDyn(&chunk)
    }

    /// Producer dimension of `exact_chunks(self.chunk())`.
    pub(crate) fn zip_dim(&self) -> IxDyn {
        let mut dim = self.batch_shape.clone();
        dim.extend(std::iter::repeat(1).take(self.spec.mom_ndim()));
        IxDyn(&dim)
    }

    /// Empty accumulators for every slot.
    pub(crate) fn zeros(&self) -> ArrayD<f64> {
        ArrayD::zeros(IxDyn(&self.full_shape()))
    }

    pub(crate) fn binomials(&self) -> BinomialTable {
        BinomialTable::new(self.spec.max_order())
    }

    /// Append the unit moment axes to a batch-shaped side input.
    pub(crate) fn lift<'a>(&self, values: ArrayViewD<'a, f64>) -> ArrayViewD<'a, f64> {
        let mut lifted = values;
        for _ in 0..self.spec.mom_ndim() {
            let end = lifted.ndim();
            lifted = lifted.insert_axis(Axis(end));
        }
        lifted
    }

    /// Broadcast a lifted side input to the zip dimension.
    ///
    /// # Errors
    /// - [`MomentError::NotBroadcastable`] naming `name`, reporting the
    ///   un-lifted shape against the batch shape.
    pub(crate) fn broadcast<'b>(
        &self, name: &'static str, lifted: &'b ArrayViewD<'_, f64>,
    ) -> MomentResult<ArrayViewD<'b, f64>> {
        lifted.broadcast(self.zip_dim()).ok_or_else(|| {
            let mom_ndim = self.spec.mom_ndim();
            let from = lifted.shape()[..lifted.ndim().saturating_sub(mom_ndim)].to_vec();
            MomentError::NotBroadcastable { name, from, to: self.batch_shape.clone() }
        })
    }
}

/// Check that `from` broadcasts onto `to` (trailing alignment, unit axes
/// stretch).
pub(crate) fn check_broadcast(name: &'static str, from: &[usize], to: &[usize]) -> MomentResult<()> {
    let ok = from.len() <= to.len()
        && from.iter().rev().zip(to.iter().rev()).all(|(&f, &t)| f == t || f == 1);
    if !ok {
        return Err(MomentError::NotBroadcastable { name, from: from.to_vec(), to: to.to_vec() });
    }
    Ok(())
}

/// `shape` with entry `axis` removed.
pub(crate) fn without_axis(shape: &[usize], axis: usize) -> Vec<usize> {
    shape.iter().enumerate().filter(|&(i, _)| i != axis).map(|(_, &n)| n).collect()
}

/// Mutable view of one accumulator slot.
pub(crate) enum SlotMut<'a> {
    Uni(ArrayViewMut1<'a, f64>),
    Bi(ArrayViewMut2<'a, f64>),
}

/// Read-only view of one accumulator slot.
pub(crate) enum Slot<'a> {
    Uni(ArrayView1<'a, f64>),
    Bi(ArrayView2<'a, f64>),
}

impl<'a> SlotMut<'a> {
    /// Drop the leading unit batch axes of an `exact_chunks_mut` item.
    pub(crate) fn from_chunk(chunk: ArrayViewMutD<'a, f64>, batch_ndim: usize) -> Self {
        let mut view = chunk;
        for _ in 0..batch_ndim {
            view = view.index_axis_move(Axis(0), 0);
        }
        match view.ndim() {
            1 => SlotMut::Uni(view.into_dimensionality::<Ix1>().expect("slot has one moment axis")),
            _ => SlotMut::Bi(view.into_dimensionality::<Ix2>().expect("slot has two moment axes")),
        }
    }

    pub(crate) fn weight(&self) -> f64 {
        match self {
            SlotMut::Uni(v) => v[0],
            SlotMut::Bi(v) => v[[0, 0]],
        }
    }

    pub(crate) fn fill(&mut self, value: f64) {
        match self {
            SlotMut::Uni(v) => v.fill(value),
            SlotMut::Bi(v) => v.fill(value),
        }
    }

    /// Overwrite this slot with `src`.
    pub(crate) fn assign(&mut self, src: &Slot<'_>) {
        match (self, src) {
            (SlotMut::Uni(dst), Slot::Uni(src)) => dst.assign(src),
            (SlotMut::Bi(dst), Slot::Bi(src)) => dst.assign(src),
            _ => unreachable!("slot layouts of one driver call always agree"),
        }
    }
}

impl<'a> Slot<'a> {
    /// Drop the leading unit batch axes of an `exact_chunks` item.
    pub(crate) fn from_chunk(chunk: ArrayViewD<'a, f64>, batch_ndim: usize) -> Self {
        let mut view = chunk;
        for _ in 0..batch_ndim {
            view = view.index_axis_move(Axis(0), 0);
        }
        match view.ndim() {
            1 => Slot::Uni(view.into_dimensionality::<Ix1>().expect("slot has one moment axis")),
            _ => Slot::Bi(view.into_dimensionality::<Ix2>().expect("slot has two moment axes")),
        }
    }

    pub(crate) fn weight(&self) -> f64 {
        match self {
            Slot::Uni(v) => v[0],
            Slot::Bi(v) => v[[0, 0]],
        }
    }
}

/// Merge `src` scaled by `factor` into `acc`.
///
/// `factor == 1.0` takes the unscaled path so that reductions and Push feed
/// identical operands into the recurrence.
pub(crate) fn combine_slot(acc: SlotMut<'_>, src: &Slot<'_>, factor: f64, binom: &BinomialTable) {
    match (acc, src) {
        (SlotMut::Uni(a), Slot::Uni(b)) => {
            if factor == 1.0 {
                combine_moments(a, b, binom);
            } else {
                combine_moments(a, &Scaled::new(b, factor), binom);
            }
        }
        (SlotMut::Bi(a), Slot::Bi(b)) => {
            if factor == 1.0 {
                combine_comoments(a, b, binom);
            } else {
                combine_comoments(a, &Scaled::new(b, factor), binom);
            }
        }
        _ => unreachable!("slot layouts of one driver call always agree"),
    }
}

/// Push one observation into `acc`; `y` is `Some` exactly for bivariate slots.
pub(crate) fn push_slot(acc: SlotMut<'_>, weight: f64, x: f64, y: Option<f64>, binom: &BinomialTable) {
    match acc {
        SlotMut::Uni(a) => push_value(a, weight, x, binom),
        SlotMut::Bi(a) => push_pair(a, weight, x, y.unwrap_or(f64::NAN), binom),
    }
}

/// Run a `Zip` serially or on the `rayon` pool, according to the `parallel`
/// flag of already resolved [`ExecOptions`](crate::reduction::options::ExecOptions).
macro_rules! for_each_slot {
    ($opts:expr, $zip:expr, $f:expr) => {{
        let zip = $zip;
        let parallel = $opts.parallel;
        #[cfg(feature = "parallel")]
        {
            if parallel {
                zip.par_for_each($f);
            } else {
                zip.for_each($f);
            }
        }
        #[cfg(not(feature = "parallel"))]
        {
            let _ = parallel;
            zip.for_each($f);
        }
    }};
}

pub(crate) use for_each_slot;

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, Zip, array};

    #[test]
    // Purpose
    // -------
    // Check chunk and zip shapes for a bivariate layout.
    //
    // Given
    // -----
    // - Batch shape `[4, 3]` with a `(2, 1)` co-moment spec.
    //
    // Expect
    // ------
    // - Chunk `[1, 1, 3, 2]`, zip dimension `[4, 3, 1, 1]`.
    fn slot_layout_chunk_and_zip_dims() {
        // Arrange
        let layout = SlotLayout::from_batch(&[4, 3], MomentSpec::bivariate(2, 1).unwrap());

        // Act / Assert
        assert_eq!(layout.chunk(), IxDyn(&[1, 1, 3, 2]));
        assert_eq!(layout.zip_dim(), IxDyn(&[4, 3, 1, 1]));
        assert_eq!(layout.full_shape(), vec![4, 3, 3, 2]);
        assert_eq!(layout.n_slots(), 12);
    }

    #[test]
    // Purpose
    // -------
    // Verify that chunked slots line up with lifted side inputs.
    //
    // Given
    // -----
    // - A `(3, 2)` batch of order-1 accumulators and per-column values
    //   `[10, 20]` broadcast over rows.
    //
    // Expect
    // ------
    // - Writing the side input into each slot's mean fills column-wise.
    fn slot_chunks_align_with_broadcast_inputs() {
        // Arrange
        let layout = SlotLayout::from_batch(&[3, 2], MomentSpec::univariate(1).unwrap());
        let mut acc = layout.zeros();
        let values = array![10.0, 20.0].into_dyn();
        let lifted = layout.lift(values.view());
        let bcast = layout.broadcast("values", &lifted).unwrap();
        let batch_ndim = layout.batch_ndim();

        // Act
        Zip::from(acc.exact_chunks_mut(layout.chunk())).and(&bcast).for_each(|chunk, &v| {
            if let SlotMut::Uni(mut slot) = SlotMut::from_chunk(chunk, batch_ndim) {
                slot[1] = v;
            }
        });

        // Assert
        let means = acc.index_axis(Axis(2), 1).to_owned();
        assert_eq!(means, Array::from_shape_vec(IxDyn(&[3, 2]), vec![10., 20., 10., 20., 10., 20.]).unwrap());
    }

    #[test]
    // Purpose
    // -------
    // Ensure a non-broadcastable side input is reported by name.
    //
    // Given
    // -----
    // - Batch shape `[3]` and a length-2 input.
    //
    // Expect
    // ------
    // - `NotBroadcastable { name: "x", from: [2], to: [3] }`.
    fn slot_layout_broadcast_reports_shapes() {
        // Arrange
        let layout = SlotLayout::from_batch(&[3], MomentSpec::univariate(2).unwrap());
        let x = array![1.0, 2.0].into_dyn();
        let lifted = layout.lift(x.view());

        // Act
        let err = layout.broadcast("x", &lifted).unwrap_err();

        // Assert
        assert_eq!(err, MomentError::NotBroadcastable { name: "x", from: vec![2], to: vec![3] });
    }
}
