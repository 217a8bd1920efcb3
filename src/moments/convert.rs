//! moments::convert — central ↔ raw moment conversion.
//!
//! Purpose
//! -------
//! Translate between the weight-scaled central layout used by accumulators
//! and normalized raw moments `E[X^k]` (`E[X^i Y^j]` for co-moments).
//!
//! Key behaviors
//! -------------
//! - Central → raw: `ν_k = Σ_{i=0}^{k} C(k,i) μ_i m^(k−i)` with `μ_0 = 1`,
//!   `μ_1 = 0` and `μ_k = S_k / w`.
//! - Raw → central: `μ_k = Σ_{i=0}^{k} C(k,i) ν_i (−m)^(k−i)` with `ν_0 = 1`,
//!   `ν_1 = m`; the output stores `S_k = w · μ_k`.
//! - Co-moments use the double expansion with cross factors `mX^a mY^b`.
//! - Slots 0 (weight) and 1 (means) are carried through unchanged in both
//!   directions.
//! - [`moments_to_comoments`] reads a univariate accumulator as the
//!   co-moments of a variable with itself: entry `[i, j]` is entry `i + j`.
//!
//! Invariants & assumptions
//! ------------------------
//! - A zero-weight slot converts to raw moments of NaN through `0 / 0`; it
//!   is not an error.
//! - Both conversions are exact inverses in exact arithmetic. In floating
//!   point the round trip degrades when `|m|` is large relative to the
//!   spread, because raw moments suffer cancellation.
use crate::{
    moments::{
        binomial::BinomialTable,
        errors::{MomentError, MomentResult},
        spec::MomentSpec,
    },
    reduction::{
        options::ExecOptions,
        slots::{Slot, SlotLayout, SlotMut, for_each_slot},
    },
};
use log::trace;
use ndarray::{ArrayD, ArrayView1, ArrayView2, ArrayViewD, ArrayViewMut1, ArrayViewMut2, Zip};

/// Convert one univariate central slot into raw moments.
pub fn central_to_raw_moments(
    central: ArrayView1<'_, f64>, mut raw: ArrayViewMut1<'_, f64>, binom: &BinomialTable,
) {
    let order = central.len() - 1;
    let w = central[0];
    let m = central[1];
    let mu = |i: usize| match i {
        0 => 1.0,
        1 => 0.0,
        _ => central[i] / w,
    };
    raw[0] = w;
    raw[1] = m;
    for k in 2..=order {
        let mut sum = 0.0;
        let mut pm = 1.0;
        for i in (0..=k).rev() {
            if i != 1 {
                sum += binom.get(k, i) * mu(i) * pm;
            }
            pm *= m;
        }
        raw[k] = sum;
    }
}

/// Convert one univariate raw slot into weight-scaled central moments.
pub fn raw_to_central_moments(
    raw: ArrayView1<'_, f64>, mut central: ArrayViewMut1<'_, f64>, binom: &BinomialTable,
) {
    let order = raw.len() - 1;
    let w = raw[0];
    let m = raw[1];
    let nu = |i: usize| match i {
        0 => 1.0,
        _ => raw[i],
    };
    central[0] = w;
    central[1] = m;
    for k in 2..=order {
        let mut sum = 0.0;
        let mut pm = 1.0;
        for i in (0..=k).rev() {
            sum += binom.get(k, i) * nu(i) * pm;
            pm *= -m;
        }
        central[k] = w * sum;
    }
}

/// Convert one bivariate central slot into raw co-moments `E[X^i Y^j]`.
pub fn central_to_raw_comoments(
    central: ArrayView2<'_, f64>, mut raw: ArrayViewMut2<'_, f64>, binom: &BinomialTable,
) {
    let (n0, n1) = central.dim();
    let w = central[[0, 0]];
    let mx = central[[1, 0]];
    let my = central[[0, 1]];
    let mu = |a: usize, b: usize| match (a, b) {
        (0, 0) => 1.0,
        (1, 0) | (0, 1) => 0.0,
        _ => central[[a, b]] / w,
    };
    for i in 0..n0 {
        for j in 0..n1 {
            raw[[i, j]] = match (i, j) {
                (0, 0) => w,
                (1, 0) => mx,
                (0, 1) => my,
                _ => double_expansion(i, j, mx, my, &mu, binom),
            };
        }
    }
}

/// Convert one bivariate raw slot into weight-scaled central co-moments.
pub fn raw_to_central_comoments(
    raw: ArrayView2<'_, f64>, mut central: ArrayViewMut2<'_, f64>, binom: &BinomialTable,
) {
    let (n0, n1) = raw.dim();
    let w = raw[[0, 0]];
    let mx = raw[[1, 0]];
    let my = raw[[0, 1]];
    let nu = |a: usize, b: usize| match (a, b) {
        (0, 0) => 1.0,
        _ => raw[[a, b]],
    };
    for i in 0..n0 {
        for j in 0..n1 {
            central[[i, j]] = match (i, j) {
                (0, 0) => w,
                (1, 0) => mx,
                (0, 1) => my,
                _ => w * double_expansion(i, j, -mx, -my, &nu, binom),
            };
        }
    }
}

/// `Σ_a Σ_b C(i,a) C(j,b) f(a, b) sx^(i−a) sy^(j−b)`.
fn double_expansion<F: Fn(usize, usize) -> f64>(
    i: usize, j: usize, sx: f64, sy: f64, f: &F, binom: &BinomialTable,
) -> f64 {
    let mut sum = 0.0;
    let mut px = 1.0;
    for a in (0..=i).rev() {
        let mut py = 1.0;
        for b in (0..=j).rev() {
            sum += binom.get(i, a) * binom.get(j, b) * f(a, b) * px * py;
            py *= sy;
        }
        px *= sx;
    }
    sum
}

/// Raw moments of every slot of a central accumulator array.
///
/// Parameters
/// ----------
/// - `central`: accumulator array of shape `batch_shape ++ mom_shape`.
/// - `spec`: moment configuration the array was built with.
///
/// Returns
/// -------
/// Array of the same shape holding `[w, m, E[X^2], …]` per slot (co-moment
/// layout analogous). Zero-weight slots hold NaN beyond the mean.
///
/// # Errors
/// - Shape-family [`MomentError`](crate::moments::MomentError) variants if
///   the trailing axes do not match `spec`.
pub fn central_to_raw(central: ArrayViewD<'_, f64>, spec: MomentSpec) -> MomentResult<ArrayD<f64>> {
    convert_array(central, spec, Direction::ToRaw)
}

/// Weight-scaled central moments from a raw moment array; inverse of
/// [`central_to_raw`].
///
/// # Errors
/// - Shape-family [`MomentError`](crate::moments::MomentError) variants if
///   the trailing axes do not match `spec`.
pub fn raw_to_central(raw: ArrayViewD<'_, f64>, spec: MomentSpec) -> MomentResult<ArrayD<f64>> {
    convert_array(raw, spec, Direction::ToCentral)
}

/// Co-moment accumulators of each slot's variable paired with itself.
///
/// Parameters
/// ----------
/// - `data`: univariate accumulator array `batch_shape ++ [order + 1]`.
/// - `spec`: its univariate configuration.
/// - `order0`, `order1`: orders of the co-moment table to build.
///
/// Returns
/// -------
/// The bivariate spec `(order0, order1)` and an array of shape
/// `batch_shape ++ [order0 + 1, order1 + 1]` with `[i, j] = data[i + j]`.
///
/// # Errors
/// - [`MomentError::UnexpectedSecondVariable`] if `spec` is bivariate.
/// - [`MomentError::InvalidOrder`] if either order is zero or
///   `order0 + order1 > order`.
/// - Accumulator shape errors for `data`.
pub fn moments_to_comoments(
    data: ArrayViewD<'_, f64>, spec: MomentSpec, order0: usize, order1: usize,
) -> MomentResult<(MomentSpec, ArrayD<f64>)> {
    if spec.is_bivariate() {
        return Err(MomentError::UnexpectedSecondVariable);
    }
    let target = MomentSpec::bivariate(order0, order1)?;
    if order0 + order1 > spec.order() {
        return Err(MomentError::InvalidOrder {
            order: order0 + order1,
            reason: "co-moment orders must sum to at most the tracked order.",
        });
    }
    let layout = SlotLayout::new(data.shape(), spec)?;
    let out_layout = SlotLayout::from_batch(layout.batch_shape(), target);
    let batch_ndim = layout.batch_ndim();
    let mut out = out_layout.zeros();
    trace!("expanding {} slots to {target}", layout.n_slots());

    for_each_slot!(
        ExecOptions::default(),
        Zip::from(out.exact_chunks_mut(out_layout.chunk())).and(data.exact_chunks(layout.chunk())),
        |dst, src| match (SlotMut::from_chunk(dst, batch_ndim), Slot::from_chunk(src, batch_ndim)) {
            (SlotMut::Bi(mut o), Slot::Uni(i)) => {
                o.indexed_iter_mut().for_each(|((a, b), v)| *v = i[a + b]);
            }
            _ => unreachable!("univariate input, bivariate output"),
        }
    );
    Ok((target, out))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    ToRaw,
    ToCentral,
}

fn convert_array(
    input: ArrayViewD<'_, f64>, spec: MomentSpec, direction: Direction,
) -> MomentResult<ArrayD<f64>> {
    let layout = SlotLayout::new(input.shape(), spec)?;
    trace!("converting {} slots ({direction:?}, {spec})", layout.n_slots());
    let binom = layout.binomials();
    let batch_ndim = layout.batch_ndim();
    let mut out = layout.zeros();

    for_each_slot!(
        ExecOptions::default(),
        Zip::from(out.exact_chunks_mut(layout.chunk())).and(input.exact_chunks(layout.chunk())),
        |dst, src| {
            match (SlotMut::from_chunk(dst, batch_ndim), Slot::from_chunk(src, batch_ndim)) {
                (SlotMut::Uni(o), Slot::Uni(i)) => match direction {
                    Direction::ToRaw => central_to_raw_moments(i, o, &binom),
                    Direction::ToCentral => raw_to_central_moments(i, o, &binom),
                },
                (SlotMut::Bi(o), Slot::Bi(i)) => match direction {
                    Direction::ToRaw => central_to_raw_comoments(i, o, &binom),
                    Direction::ToCentral => raw_to_central_comoments(i, o, &binom),
                },
                _ => unreachable!("input and output share one layout"),
            }
        }
    );
    Ok(out)
}
