//! Fixed-order periodic finite-difference operators.
//!
//! The spatial order is a compile-time property: 4th order by default,
//! 2nd order with the `second-order-stencils` cargo feature. All operators
//! wrap periodically through [`GridArray::offset`]; there is no halo.
//!
//! Mixed second derivatives are the tensor product of two first-derivative
//! stencils. The advective derivative is one-sided, with the stencil shift
//! chosen by the sign of the advecting velocity component.

use crate::grid::GridArray;

/// Spatial order of every stencil in the build.
#[cfg(not(feature = "second-order-stencils"))]
pub const STENCIL_ORDER: usize = 4;
#[cfg(feature = "second-order-stencils")]
pub const STENCIL_ORDER: usize = 2;

/// First partial derivative along `axis` (0, 1, 2).
#[inline]
pub fn diff_1st(f: &GridArray, i: usize, j: usize, k: usize, axis: usize, dx: f64) -> f64 {
    #[cfg(not(feature = "second-order-stencils"))]
    {
        (8.0 * (f.offset(i, j, k, axis, 1) - f.offset(i, j, k, axis, -1))
            - (f.offset(i, j, k, axis, 2) - f.offset(i, j, k, axis, -2)))
            / (12.0 * dx)
    }
    #[cfg(feature = "second-order-stencils")]
    {
        (f.offset(i, j, k, axis, 1) - f.offset(i, j, k, axis, -1)) / (2.0 * dx)
    }
}

/// Second partial derivative along `axis`.
#[inline]
pub fn diff_2nd(f: &GridArray, i: usize, j: usize, k: usize, axis: usize, dx: f64) -> f64 {
    #[cfg(not(feature = "second-order-stencils"))]
    {
        (-(f.offset(i, j, k, axis, 2) + f.offset(i, j, k, axis, -2))
            + 16.0 * (f.offset(i, j, k, axis, 1) + f.offset(i, j, k, axis, -1))
            - 30.0 * f.get(i, j, k))
            / (12.0 * dx * dx)
    }
    #[cfg(feature = "second-order-stencils")]
    {
        (f.offset(i, j, k, axis, 1) - 2.0 * f.get(i, j, k) + f.offset(i, j, k, axis, -1))
            / (dx * dx)
    }
}

/// Offsets and weights of the first-derivative stencil (dx factored out).
#[cfg(not(feature = "second-order-stencils"))]
const D1_TAPS: [(isize, f64); 4] = [
    (-2, 1.0 / 12.0),
    (-1, -8.0 / 12.0),
    (1, 8.0 / 12.0),
    (2, -1.0 / 12.0),
];
#[cfg(feature = "second-order-stencils")]
const D1_TAPS: [(isize, f64); 2] = [(-1, -0.5), (1, 0.5)];

/// Mixed second derivative `d_a d_b f` for distinct axes.
#[inline]
pub fn diff_mixed(
    f: &GridArray,
    i: usize,
    j: usize,
    k: usize,
    axis_a: usize,
    axis_b: usize,
    dx: f64,
) -> f64 {
    debug_assert_ne!(axis_a, axis_b, "use diff_2nd for a repeated axis");
    let mut sum = 0.0;
    for &(da, wa) in D1_TAPS.iter() {
        for &(db, wb) in D1_TAPS.iter() {
            let (mut ii, mut jj, mut kk) = (i as isize, j as isize, k as isize);
            match axis_a {
                0 => ii += da,
                1 => jj += da,
                _ => kk += da,
            }
            match axis_b {
                0 => ii += db,
                1 => jj += db,
                _ => kk += db,
            }
            sum += wa * wb * f.get_wrapped(ii, jj, kk);
        }
    }
    sum / (dx * dx)
}

/// Second derivative for an arbitrary axis pair: `diff_2nd` on the
/// diagonal, the tensor-product stencil off it.
#[inline]
pub fn diff_2nd_pair(
    f: &GridArray,
    i: usize,
    j: usize,
    k: usize,
    axis_a: usize,
    axis_b: usize,
    dx: f64,
) -> f64 {
    if axis_a == axis_b {
        diff_2nd(f, i, j, k, axis_a, dx)
    } else {
        diff_mixed(f, i, j, k, axis_a, axis_b, dx)
    }
}

/// Laplacian: sum of the three second derivatives.
#[inline]
pub fn laplacian(f: &GridArray, i: usize, j: usize, k: usize, dx: f64) -> f64 {
    diff_2nd(f, i, j, k, 0, dx) + diff_2nd(f, i, j, k, 1, dx) + diff_2nd(f, i, j, k, 2, dx)
}

/// Upwind first derivative along `axis`; the sign of the advecting
/// velocity component selects the one-sided stencil.
#[inline]
pub fn diff_adv(
    f: &GridArray,
    i: usize,
    j: usize,
    k: usize,
    axis: usize,
    velocity: f64,
    dx: f64,
) -> f64 {
    #[cfg(not(feature = "second-order-stencils"))]
    {
        if velocity >= 0.0 {
            (f.offset(i, j, k, axis, -2) - 6.0 * f.offset(i, j, k, axis, -1)
                + 3.0 * f.get(i, j, k)
                + 2.0 * f.offset(i, j, k, axis, 1))
                / (6.0 * dx)
        } else {
            (-f.offset(i, j, k, axis, 2) + 6.0 * f.offset(i, j, k, axis, 1)
                - 3.0 * f.get(i, j, k)
                - 2.0 * f.offset(i, j, k, axis, -1))
                / (6.0 * dx)
        }
    }
    #[cfg(feature = "second-order-stencils")]
    {
        if velocity >= 0.0 {
            (3.0 * f.get(i, j, k) - 4.0 * f.offset(i, j, k, axis, -1)
                + f.offset(i, j, k, axis, -2))
                / (2.0 * dx)
        } else {
            (-3.0 * f.get(i, j, k) + 4.0 * f.offset(i, j, k, axis, 1)
                - f.offset(i, j, k, axis, 2))
                / (2.0 * dx)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
