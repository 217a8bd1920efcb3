//! Integration tests for the moment accumulation pipeline.
//!
//! Purpose
//! -------
//! - Validate the public API end to end: accumulate raw observations,
//!   merge and reduce accumulators, convert to raw moments, and resample.
//! - Check the algebraic properties the accumulator layout promises
//!   (identity, associativity, partition equivalence) on random data.
//!
//! Coverage
//! --------
//! - `reduction`: `push`, `push_into`, `push_batch`, `combine`, `reduce`,
//!   `reduce_vals`, `single_point`, `zeros`, and `ExecOptions` variants.
//! - `moments`: `central_to_raw` / `raw_to_central`, `CentralMoments`.
//! - `resample`: `resample_weights`, `resample_vals`, `resample_data`.
//!
//! Exclusions
//! ----------
//! - Per-kernel edge cases and error variants; those are unit-tested next to
//!   the code.
use approx::{assert_relative_eq, relative_eq};
use ndarray::{Array1, Array2, ArrayD, Axis, arr0, array, stack};
use proptest::prelude::*;
use rust_moments::{
    CentralMoments, ExecOptions, MomentSpec, ReduceStrategy, central_to_raw, combine, push,
    push_batch, push_into, raw_to_central, reduce, reduce_vals, resample_data, resample_vals,
    resample_weights, single_point, zeros,
};

/// Accumulate `(x, w)` pairs into one univariate slot.
fn accumulate(spec: MomentSpec, data: &[(f64, f64)]) -> ArrayD<f64> {
    let x = Array1::from_iter(data.iter().map(|&(x, _)| x)).into_dyn();
    let w = Array1::from_iter(data.iter().map(|&(_, w)| w)).into_dyn();
    reduce_vals(spec, w.view(), x.view(), None, 0, &ExecOptions::default())
        .expect("reduce_vals should accept matching 1-D inputs")
}

/// Accumulate `(x, y, w)` triples into one co-moment slot.
fn accumulate_pairs(spec: MomentSpec, data: &[(f64, f64, f64)]) -> ArrayD<f64> {
    let x = Array1::from_iter(data.iter().map(|t| t.0)).into_dyn();
    let y = Array1::from_iter(data.iter().map(|t| t.1)).into_dyn();
    let w = Array1::from_iter(data.iter().map(|t| t.2)).into_dyn();
    reduce_vals(spec, w.view(), x.view(), Some(y.view()), 0, &ExecOptions::default())
        .expect("reduce_vals should accept matching 1-D inputs")
}

fn all_close(a: &ArrayD<f64>, b: &ArrayD<f64>, epsilon: f64, max_relative: f64) -> bool {
    a.shape() == b.shape()
        && a.iter()
            .zip(b.iter())
            .all(|(x, y)| relative_eq!(*x, *y, epsilon = epsilon, max_relative = max_relative))
}

fn samples(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-10.0f64..10.0, 0.1f64..5.0), 1..max_len)
}

fn pair_samples(max_len: usize) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0, 0.1f64..5.0), 1..max_len)
}

#[test]
// Purpose
// -------
// Reference sample through the public API.
//
// Given
// -----
// - `x = [1, 2, 3, 4, 5]`, unit weights, order 4.
//
// Expect
// ------
// - Mean 3, `S_2 = 10`; `CentralMoments` reports variance 2.
fn reference_sample_mean_and_second_moment() {
    // Arrange
    let spec = MomentSpec::univariate(4).unwrap();
    let x = array![1.0, 2.0, 3.0, 4.0, 5.0].into_dyn();

    // Act
    let one = arr0(1.0).into_dyn();
    let acc = push_batch(
        zeros(spec, &[]).view(),
        spec,
        one.view(),
        x.view(),
        None,
        0,
        &ExecOptions::default(),
    )
    .unwrap();
    let cm = CentralMoments::from_array(acc.clone(), spec).unwrap();

    // Assert
    assert_eq!(acc[[0]], 5.0);
    assert_relative_eq!(acc[[1]], 3.0, max_relative = 1e-15);
    assert_relative_eq!(acc[[2]], 10.0, max_relative = 1e-14);
    assert_relative_eq!(*cm.var().unwrap().first().unwrap(), 2.0, max_relative = 1e-14);
}

#[test]
// Purpose
// -------
// The empty accumulator is a two-sided identity of Combine, bitwise.
//
// Given
// -----
// - A populated batch of two order-3 slots and an all-zero batch.
//
// Expect
// ------
// - `combine(a, 0) == a` and `combine(0, a) == a` exactly.
fn zero_accumulator_is_identity_on_both_sides() {
    // Arrange
    let spec = MomentSpec::univariate(3).unwrap();
    let a = array![[3.0, 1.25, 4.5, -0.75], [0.5, -2.0, 0.1, 0.02]].into_dyn();
    let empty = zeros(spec, &[2]);
    let opts = ExecOptions::default();

    // Act
    let right = combine(a.view(), empty.view(), spec, &opts).unwrap();
    let left = combine(empty.view(), a.view(), spec, &opts).unwrap();

    // Assert
    assert_eq!(right, a);
    assert_eq!(left, a);
}

#[test]
// Purpose
// -------
// Push equals Combine with a one-point accumulator, bitwise.
//
// Given
// -----
// - A populated batch of three slots and one observation per slot.
//
// Expect
// ------
// - `push(acc, w, x)` and `combine(acc, single_point(w, x))` are identical.
fn push_equals_combine_with_single_point() {
    // Arrange
    let spec = MomentSpec::univariate(4).unwrap();
    let opts = ExecOptions::default();
    let start = accumulate(spec, &[(0.3, 1.0), (2.2, 0.5), (-1.1, 2.0)]);
    let batch = stack(Axis(0), &[start.view(), start.view(), start.view()]).unwrap();
    let w = array![0.7, 1.0, 3.5].into_dyn();
    let x = array![-4.0, 0.25, 9.0].into_dyn();

    // Act
    let pushed = push(batch.view(), spec, w.view(), x.view(), None, &opts).unwrap();
    let point = single_point(spec, w.view(), x.view(), None).unwrap();
    let combined = combine(batch.view(), point.view(), spec, &opts).unwrap();

    // Assert
    assert_eq!(pushed, combined);
}

#[test]
// Purpose
// -------
// A zero-weight push changes nothing, in place or copied.
//
// Given
// -----
// - A bivariate accumulator and a zero-weight pair.
//
// Expect
// ------
// - Both modes return the input bit for bit.
fn zero_weight_push_is_noop_in_both_modes() {
    // Arrange
    let spec = MomentSpec::bivariate(2, 2).unwrap();
    let start = accumulate_pairs(spec, &[(1.0, 2.0, 1.0), (3.0, -1.0, 2.0), (0.5, 0.5, 0.5)]);
    let w = arr0(0.0).into_dyn();
    let x = arr0(1e6).into_dyn();
    let y = arr0(-1e6).into_dyn();
    let opts = ExecOptions::default();

    // Act
    let copied = push(start.view(), spec, w.view(), x.view(), Some(y.view()), &opts).unwrap();
    let mut in_place = start.clone();
    push_into(in_place.view_mut(), spec, w.view(), x.view(), Some(y.view()), &opts).unwrap();

    // Assert
    assert_eq!(copied, start);
    assert_eq!(in_place, start);
}

#[test]
// Purpose
// -------
// NaN observations stay in their own slot through push and reduce.
//
// Given
// -----
// - A `(4, 3)` sample array whose column 1 contains one NaN.
//
// Expect
// ------
// - Column 1's accumulator is NaN beyond the weight; columns 0 and 2 match
//   clean single-column accumulators.
fn nan_is_isolated_across_slots() {
    // Arrange
    let spec = MomentSpec::univariate(3).unwrap();
    let x = array![[1.0, 1.0, 5.0], [2.0, f64::NAN, 6.0], [4.0, 4.0, 7.0], [8.0, 8.0, 9.0]];
    let opts = ExecOptions::default();

    // Act
    let one = arr0(1.0).into_dyn();
    let out = reduce_vals(spec, one.view(), x.view().into_dyn(), None, 0, &opts).unwrap();
    let clean0 = accumulate(spec, &[(1.0, 1.0), (2.0, 1.0), (4.0, 1.0), (8.0, 1.0)]);
    let clean2 = accumulate(spec, &[(5.0, 1.0), (6.0, 1.0), (7.0, 1.0), (9.0, 1.0)]);

    // Assert
    assert_eq!(out[[1, 0]], 4.0);
    assert!((1..4).all(|k| out[[1, k]].is_nan()));
    for k in 0..4 {
        assert_eq!(out[[0, k]], clean0[[k]]);
        assert_eq!(out[[2, k]], clean2[[k]]);
    }
}

#[test]
// Purpose
// -------
// A NaN accumulator entry stays in its own slot through combine and reduce.
//
// Given
// -----
// - One-point accumulators of a `(4, 3)` sample, once clean and once with
//   a NaN in entry `[1, 1]`.
//
// Expect
// ------
// - Slot 1 of the poisoned results is NaN beyond the weight; slots 0 and 2
//   are bitwise equal to the clean run, for combine and for both reduction
//   strategies.
fn nan_is_isolated_through_combine_and_reduce() {
    // Arrange
    let spec = MomentSpec::univariate(3).unwrap();
    let clean_x = array![[1.0, 1.0, 5.0], [2.0, 3.0, 6.0], [4.0, 4.0, 7.0], [8.0, 8.0, 9.0]];
    let mut dirty_x = clean_x.clone();
    dirty_x[[1, 1]] = f64::NAN;
    let one = arr0(1.0).into_dyn();
    let clean = single_point(spec, one.view(), clean_x.view().into_dyn(), None).unwrap();
    let dirty = single_point(spec, one.view(), dirty_x.view().into_dyn(), None).unwrap();
    let seq = ExecOptions::default();
    let tree = ExecOptions::default().with_strategy(ReduceStrategy::Tree);

    // Act
    let merge = |accs: &ArrayD<f64>| {
        let first = accs.index_axis(Axis(0), 0).to_owned();
        let second = accs.index_axis(Axis(0), 1).to_owned();
        combine(first.view(), second.view(), spec, &seq).unwrap()
    };
    let pairs = [
        (merge(&clean), merge(&dirty)),
        (
            reduce(clean.view(), spec, 0, &seq).unwrap(),
            reduce(dirty.view(), spec, 0, &seq).unwrap(),
        ),
        (
            reduce(clean.view(), spec, 0, &tree).unwrap(),
            reduce(dirty.view(), spec, 0, &tree).unwrap(),
        ),
    ];

    // Assert
    for (clean_out, dirty_out) in &pairs {
        assert!(dirty_out.index_axis(Axis(0), 1).iter().skip(1).all(|v| v.is_nan()));
        for slot in [0, 2] {
            assert_eq!(dirty_out.index_axis(Axis(0), slot), clean_out.index_axis(Axis(0), slot));
        }
    }
}

#[test]
// Purpose
// -------
// Execution options change scheduling only: parallel requests give the
// same bits as serial ones, and the tree strategy stays within tolerance.
//
// Given
// -----
// - 64 one-point accumulators in an `(8, 8)` batch, reduced along axis 0.
//
// Expect
// ------
// - Parallel sequential == serial sequential exactly; parallel tree ==
//   serial tree exactly; tree ~= sequential.
fn exec_options_do_not_change_results() {
    // Arrange
    let spec = MomentSpec::univariate(4).unwrap();
    let x = Array2::from_shape_fn((8, 8), |(i, j)| ((i * 8 + j) as f64 * 0.37).sin() * 5.0);
    let x = x.into_dyn();
    let points = single_point(spec, arr0(1.0).into_dyn().view(), x.view(), None).unwrap();
    let serial = ExecOptions::default();
    let parallel = ExecOptions::default().with_parallel(true);
    let tree = ExecOptions::default().with_strategy(ReduceStrategy::Tree);

    // Act
    let seq = reduce(points.view(), spec, 0, &serial).unwrap();
    let seq_par = reduce(points.view(), spec, 0, &parallel).unwrap();
    let tree_ser = reduce(points.view(), spec, 0, &tree).unwrap();
    let tree_par = reduce(points.view(), spec, 0, &tree.with_parallel(true)).unwrap();

    // Assert
    assert_eq!(seq, seq_par);
    assert_eq!(tree_ser, tree_par);
    assert!(all_close(&seq, &tree_ser, 1e-9, 1e-10));
}

#[test]
// Purpose
// -------
// Seeded bootstrap end to end: values and one-point data agree.
//
// Given
// -----
// - 12 observations, `resample_weights(12, 25, Some(2024))`.
//
// Expect
// ------
// - `resample_vals` and `resample_data` on one-point accumulators agree;
//   every replicate has total weight 12.
fn seeded_bootstrap_values_and_data_agree() {
    // Arrange
    let spec = MomentSpec::univariate(3).unwrap();
    let x = Array1::from_iter((0..12).map(|i| (i as f64 * 1.3).cos() * 3.0 + 1.0)).into_dyn();
    let one = arr0(1.0).into_dyn();
    let freq = resample_weights(12, 25, Some(2024)).unwrap();
    let opts = ExecOptions::default();
    let points = single_point(spec, one.view(), x.view(), None).unwrap();

    // Act
    let from_vals = resample_vals(spec, one.view(), x.view(), None, freq.view(), 0, &opts).unwrap();
    let from_data = resample_data(points.view(), spec, freq.view(), 0, &opts).unwrap();
    let cm = CentralMoments::from_array(points, spec)
        .unwrap()
        .resample_and_reduce(freq.view(), 0, &opts)
        .unwrap();

    // Assert
    assert_eq!(from_vals.shape(), &[25, 4]);
    assert!(all_close(&from_vals, &from_data, 1e-12, 1e-10));
    assert_eq!(cm.data(), &from_data);
    assert!(cm.weight().iter().all(|&w| w == 12.0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // --- Combine is associative ---
    #[test]
    fn combine_is_associative(a in samples(20), b in samples(20), c in samples(20)) {
        let spec = MomentSpec::univariate(4).unwrap();
        let opts = ExecOptions::default();
        let (a, b, c) = (accumulate(spec, &a), accumulate(spec, &b), accumulate(spec, &c));

        let ab = combine(a.view(), b.view(), spec, &opts).unwrap();
        let bc = combine(b.view(), c.view(), spec, &opts).unwrap();
        let left = combine(ab.view(), c.view(), spec, &opts).unwrap();
        let right = combine(a.view(), bc.view(), spec, &opts).unwrap();

        prop_assert!(all_close(&left, &right, 1e-8, 1e-10), "{:?} != {:?}", left, right);
    }

    // --- Streaming push == partitioned push + combine (co-moments) ---
    #[test]
    fn partitioned_push_matches_streaming(data in pair_samples(40), split in 0.0f64..1.0) {
        let spec = MomentSpec::bivariate(3, 2).unwrap();
        let opts = ExecOptions::default();
        let k = ((data.len() as f64) * split) as usize;

        let whole = accumulate_pairs(spec, &data);
        let parts = combine(
            accumulate_pairs(spec, &data[..k]).view(),
            accumulate_pairs(spec, &data[k..]).view(),
            spec,
            &opts,
        ).unwrap();

        prop_assert!(all_close(&whole, &parts, 1e-7, 1e-10), "{:?} != {:?}", whole, parts);
    }

    // --- raw_to_central inverts central_to_raw ---
    #[test]
    fn raw_central_round_trip(data in samples(30)) {
        let spec = MomentSpec::univariate(4).unwrap();
        let acc = accumulate(spec, &data);

        let back = raw_to_central(central_to_raw(acc.view(), spec).unwrap().view(), spec).unwrap();

        prop_assert!(all_close(&acc, &back, 1e-6, 1e-8), "acc {:?} != back {:?}", acc, back);
    }
}
