//! Complex spherical harmonics.
//!
//! Standard physics normalization with the Condon-Shortley phase folded
//! into the associated Legendre recurrence:
//!
//! ```text
//! Y_lm(theta, phi) = sqrt((2l+1)/(4 pi) (l-m)!/(l+m)!) P_l^m(cos theta) e^{i m phi}
//! Y_{l,-m} = (-1)^m conj(Y_lm)
//! ```

use num_complex::Complex64;
use std::f64::consts::PI;

/// Associated Legendre `P_l^m(x)` for `m >= 0`, Condon-Shortley included.
fn legendre_p(l: usize, m: usize, x: f64) -> f64 {
    debug_assert!(m <= l);
    debug_assert!(x.abs() <= 1.0 + 1e-12);

    // P_m^m = (-1)^m (2m-1)!! (1 - x^2)^{m/2}
    let mut pmm = 1.0;
    if m > 0 {
        let somx2 = ((1.0 - x) * (1.0 + x)).max(0.0).sqrt();
        let mut fact = 1.0;
        for _ in 0..m {
            pmm *= -fact * somx2;
            fact += 2.0;
        }
    }
    if l == m {
        return pmm;
    }
    // P_{m+1}^m = x (2m+1) P_m^m
    let mut pmmp1 = x * (2.0 * m as f64 + 1.0) * pmm;
    if l == m + 1 {
        return pmmp1;
    }
    // Upward recurrence in l.
    let mut pll = 0.0;
    for ll in (m + 2)..=l {
        pll = (x * (2.0 * ll as f64 - 1.0) * pmmp1 - (ll + m - 1) as f64 * pmm)
            / (ll - m) as f64;
        pmm = pmmp1;
        pmmp1 = pll;
    }
    pll
}

/// `(l-m)!/(l+m)!` for `m >= 0`, as a product to avoid factorial overflow.
fn factorial_ratio(l: usize, m: usize) -> f64 {
    let mut ratio = 1.0;
    for i in (l - m + 1)..=(l + m) {
        ratio /= i as f64;
    }
    ratio
}

/// Complex spherical harmonic `Y_lm(theta, phi)`; `m` may be negative.
pub fn spherical_harmonic(l: usize, m: i64, theta: f64, phi: f64) -> Complex64 {
    let am = m.unsigned_abs() as usize;
    debug_assert!(am <= l);

    let norm = ((2.0 * l as f64 + 1.0) / (4.0 * PI) * factorial_ratio(l, am)).sqrt();
    let p = legendre_p(l, am, theta.cos());
    let magnitude = norm * p;
    let phase = Complex64::from_polar(1.0, m as f64 * phi);
    if m >= 0 {
        magnitude * phase
    } else {
        // Y_{l,-m} = (-1)^m conj(Y_lm)
        let sign = if am % 2 == 0 { 1.0 } else { -1.0 };
        sign * magnitude * phase
    }
}

// =============================================================================
// Tests
// =============================================================================
