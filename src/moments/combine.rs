//! moments::combine — numerically stable merge of two moment accumulators.
//!
//! Purpose
//! -------
//! Implement the pairwise Combine recurrence for one accumulator slot. The
//! first operand is updated in place; the second is any [`MomentSource`] or
//! [`CoMomentSource`], which lets Push and scaled removal reuse this code.
//!
//! Key behaviors
//! -------------
//! - With `w = wa + wb`, `δ = mb − ma`, `da = −wb·δ/w` and `db = wa·δ/w`
//!   (per variable in the bivariate case), each weight-scaled central moment
//!   is rebuilt from the binomial expansion of both operands around the
//!   merged mean. No raw power sums are formed.
//! - Short-circuits:
//!   - `wb == 0`: the slot is left bit-for-bit unchanged.
//!   - `wa + wb == 0`: the slot is reset to the empty accumulator (this is
//!     the exact removal of everything that was merged in).
//!   - `wa == 0`: the operand is copied verbatim.
//!
//! Invariants & assumptions
//! ------------------------
//! - Slots are updated from the highest order downwards (lexicographically
//!   descending for co-moments), so every term read on the right-hand side
//!   still holds the pre-merge value.
//! - The binomial table must cover the slot's largest order.
//! - No validation happens here; drivers check shapes and weights first.
//!
//! Testing notes
//! -------------
//! - Unit tests compare merged slots against direct two-pass moments,
//!   check the identity short-circuits bitwise, and check scaled removal.
use crate::moments::{
    binomial::BinomialTable,
    source::{CoMomentSource, MomentSource},
};
use ndarray::{ArrayViewMut1, ArrayViewMut2};

/// Merge `src` into the univariate slot `acc` (length `order + 1`).
pub fn combine_moments<S: MomentSource + ?Sized>(
    mut acc: ArrayViewMut1<'_, f64>, src: &S, binom: &BinomialTable,
) {
    let wb = src.weight();
    if wb == 0.0 {
        return;
    }
    let wa = acc[0];
    let w = wa + wb;
    if w == 0.0 {
        acc.fill(0.0);
        return;
    }
    let order = acc.len() - 1;
    if wa == 0.0 {
        acc[0] = wb;
        acc[1] = src.mean();
        for k in 2..=order {
            acc[k] = src.central(k);
        }
        return;
    }

    let ma = acc[1];
    let delta_w = (src.mean() - ma) / w;
    let da = -wb * delta_w;
    let db = wa * delta_w;

    for k in (2..=order).rev() {
        let mut sum = acc[k] + src.central(k);
        let mut pa = 1.0;
        let mut pb = 1.0;
        for i in 1..=k - 2 {
            pa *= da;
            pb *= db;
            let c = binom.get(k, i);
            sum += c * (acc[k - i] * pa + src.central(k - i) * pb);
        }
        // i = k - 1 multiplies the first central moment, which is zero.
        pa *= da * da;
        pb *= db * db;
        sum += wa * pa + wb * pb;
        acc[k] = sum;
    }

    acc[1] = ma + wb * delta_w;
    acc[0] = w;
}

/// Merge `src` into the bivariate slot `acc` (shape `(order0 + 1, order1 + 1)`).
pub fn combine_comoments<S: CoMomentSource + ?Sized>(
    mut acc: ArrayViewMut2<'_, f64>, src: &S, binom: &BinomialTable,
) {
    let wb = src.weight();
    if wb == 0.0 {
        return;
    }
    let wa = acc[[0, 0]];
    let w = wa + wb;
    if w == 0.0 {
        acc.fill(0.0);
        return;
    }
    let (n0, n1) = acc.dim();
    if wa == 0.0 {
        for i in 0..n0 {
            for j in 0..n1 {
                acc[[i, j]] = source_term(src, wb, i, j, true);
            }
        }
        return;
    }

    let mxa = acc[[1, 0]];
    let mya = acc[[0, 1]];
    let dx_w = (src.mean_x() - mxa) / w;
    let dy_w = (src.mean_y() - mya) / w;
    let (dax, dbx) = (-wb * dx_w, wa * dx_w);
    let (day, dby) = (-wb * dy_w, wa * dy_w);

    for i in (0..n0).rev() {
        for j in (0..n1).rev() {
            if i + j < 2 {
                continue;
            }
            let mut sum = 0.0;
            let mut pax = 1.0;
            let mut pbx = 1.0;
            for a in 0..=i {
                let cx = binom.get(i, a);
                let mut pay = 1.0;
                let mut pby = 1.0;
                for b in 0..=j {
                    let r = i - a;
                    let s = j - b;
                    let c = cx * binom.get(j, b);
                    let ta = slot_term(&acc, wa, r, s);
                    let tb = source_term(src, wb, r, s, false);
                    sum += c * (ta * pax * pay + tb * pbx * pby);
                    pay *= day;
                    pby *= dby;
                }
                pax *= dax;
                pbx *= dbx;
            }
            acc[[i, j]] = sum;
        }
    }

    acc[[1, 0]] = mxa + wb * dx_w;
    acc[[0, 1]] = mya + wb * dy_w;
    acc[[0, 0]] = w;
}

/// Expansion term of the in-place operand: `A_00 = w`, first moments are 0.
#[inline]
fn slot_term(acc: &ArrayViewMut2<'_, f64>, w: f64, r: usize, s: usize) -> f64 {
    match (r, s) {
        (0, 0) => w,
        (1, 0) | (0, 1) => 0.0,
        _ => acc[[r, s]],
    }
}

/// Expansion term of the source operand. With `raw_layout` the means are
/// returned in the first-moment positions (used when copying a source into
/// an empty slot).
#[inline]
fn source_term<S: CoMomentSource + ?Sized>(
    src: &S, w: f64, r: usize, s: usize, raw_layout: bool,
) -> f64 {
    match (r, s) {
        (0, 0) => w,
        (1, 0) if raw_layout => src.mean_x(),
        (0, 1) if raw_layout => src.mean_y(),
        (1, 0) | (0, 1) => 0.0,
        _ => src.central(r, s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moments::source::Scaled;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Agreement of merged univariate and bivariate slots with two-pass
    //   moments of the pooled data.
    // - The zero-weight short-circuits.
    // - Removal through a `-1` scaled operand.
    // -------------------------------------------------------------------------

    fn two_pass(xs: &[f64], ws: &[f64], order: usize) -> Array1<f64> {
        let w: f64 = ws.iter().sum();
        let m = xs.iter().zip(ws).map(|(x, wi)| x * wi).sum::<f64>() / w;
        let mut out = Array1::zeros(order + 1);
        out[0] = w;
        out[1] = m;
        for k in 2..=order {
            out[k] = xs.iter().zip(ws).map(|(x, wi)| wi * (x - m).powi(k as i32)).sum();
        }
        out
    }

    fn two_pass_co(xs: &[f64], ys: &[f64], order: (usize, usize)) -> Array2<f64> {
        let n = xs.len() as f64;
        let mx = xs.iter().sum::<f64>() / n;
        let my = ys.iter().sum::<f64>() / n;
        let mut out = Array2::zeros((order.0 + 1, order.1 + 1));
        for i in 0..=order.0 {
            for j in 0..=order.1 {
                out[[i, j]] = xs
                    .iter()
                    .zip(ys)
                    .map(|(x, y)| (x - mx).powi(i as i32) * (y - my).powi(j as i32))
                    .sum();
            }
        }
        out[[0, 0]] = n;
        out[[1, 0]] = mx;
        out[[0, 1]] = my;
        out
    }

    #[test]
    // Purpose
    // -------
    // Verify that merging two groups matches the pooled two-pass moments.
    //
    // Given
    // -----
    // - Weighted groups `{1, 2, 4}` and `{7, 11}` summarized to order 4.
    //
    // Expect
    // ------
    // - Every slot of the merged accumulator matches the pooled result.
    fn combine_moments_matches_pooled_two_pass() {
        // Arrange
        let (xa, wa) = (vec![1.0, 2.0, 4.0], vec![1.0, 0.5, 2.0]);
        let (xb, wb) = (vec![7.0, 11.0], vec![3.0, 1.0]);
        let mut acc = two_pass(&xa, &wa, 4);
        let other = two_pass(&xb, &wb, 4);
        let pooled = two_pass(
            &[xa.clone(), xb.clone()].concat(),
            &[wa.clone(), wb.clone()].concat(),
            4,
        );
        let binom = BinomialTable::new(4);

        // Act
        combine_moments(acc.view_mut(), &other.view(), &binom);

        // Assert
        for k in 0..=4 {
            assert_relative_eq!(acc[k], pooled[k], max_relative = 1e-12);
        }
    }

    #[test]
    // Purpose
    // -------
    // Ensure the zero-weight short-circuits are exact.
    //
    // Given
    // -----
    // - A populated slot and an all-zero slot.
    //
    // Expect
    // ------
    // - Merging zero into the slot leaves it bitwise unchanged; merging the
    //   slot into zero reproduces it bitwise.
    fn combine_moments_zero_weight_is_identity() {
        // Arrange
        let populated = array![3.0, 0.25, 1.75, -0.5];
        let empty = Array1::<f64>::zeros(4);
        let binom = BinomialTable::new(3);

        // Act
        let mut left = populated.clone();
        combine_moments(left.view_mut(), &empty.view(), &binom);
        let mut right = empty.clone();
        combine_moments(right.view_mut(), &populated.view(), &binom);

        // Assert
        assert_eq!(left, populated);
        assert_eq!(right, populated);
    }

    #[test]
    // Purpose
    // -------
    // Check that a `-1` scaled merge undoes a previous merge.
    //
    // Given
    // -----
    // - `A` merged with `B`, then `B` merged back with factor `-1`.
    //
    // Expect
    // ------
    // - The result matches `A` to tight tolerance; removing everything
    //   resets to zero exactly.
    fn combine_moments_scaled_removal_restores_operand() {
        // Arrange
        let a = two_pass(&[0.5, 1.5, 2.0, 5.0], &[1.0, 1.0, 2.0, 1.0], 3);
        let b = two_pass(&[3.0, -1.0], &[2.0, 1.0], 3);
        let binom = BinomialTable::new(3);
        let mut acc = a.clone();
        combine_moments(acc.view_mut(), &b.view(), &binom);

        // Act
        let b_view = b.view();
        combine_moments(acc.view_mut(), &Scaled::new(&b_view, -1.0), &binom);
        let mut only_b = b.clone();
        combine_moments(only_b.view_mut(), &Scaled::new(&b_view, -1.0), &binom);

        // Assert
        for k in 0..=3 {
            assert_relative_eq!(acc[k], a[k], epsilon = 1e-12, max_relative = 1e-10);
        }
        assert!(only_b.iter().all(|&v| v == 0.0));
    }

    #[test]
    // Purpose
    // -------
    // Verify the bivariate merge against pooled two-pass co-moments.
    //
    // Given
    // -----
    // - Two groups of `(x, y)` pairs with unit weights, orders `(3, 2)`.
    //
    // Expect
    // ------
    // - Every `[i, j]` slot matches the pooled computation.
    fn combine_comoments_matches_pooled_two_pass() {
        // Arrange
        let (xa, ya) = (vec![1.0, 2.0, 4.0], vec![0.5, -1.0, 3.0]);
        let (xb, yb) = (vec![6.0, 0.0, 2.5, 1.0], vec![2.0, 2.0, -0.5, 1.5]);
        let mut acc = two_pass_co(&xa, &ya, (3, 2));
        let other = two_pass_co(&xb, &yb, (3, 2));
        let pooled = two_pass_co(&[xa, xb].concat(), &[ya, yb].concat(), (3, 2));
        let binom = BinomialTable::new(3);

        // Act
        combine_comoments(acc.view_mut(), &other.view(), &binom);

        // Assert
        for ((i, j), v) in acc.indexed_iter() {
            assert_relative_eq!(*v, pooled[[i, j]], epsilon = 1e-12, max_relative = 1e-10);
        }
    }
}
