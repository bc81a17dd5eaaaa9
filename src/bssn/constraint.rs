//! Hamiltonian and momentum constraint evaluation.
//!
//! The constraints are not evolved; they are monitored. Each evaluator
//! returns both the local violation and a local normalization scale built
//! from the Euclidean sum of the individual terms, so the dimensionless
//! ratio goes to zero only when every term does (a cancellation-free
//! measure of relative violation).

use crate::bssn::fields::{sym, FieldId, SYM_PAIRS, SYM_WEIGHT};
use crate::bssn::point::PointData;
use crate::bssn::BssnFields;
use crate::grid::stencil::diff_1st;

use std::f64::consts::PI;

/// Local Hamiltonian constraint and its normalization scale.
///
/// `H = R + (2/3) K^2 - A_ij A^{ij} - 16 pi rho`.
pub fn hamiltonian(pd: &PointData) -> (f64, f64) {
    let t_r = pd.ricci_scalar;
    let t_k = 2.0 / 3.0 * pd.trk * pd.trk;
    let t_a = pd.a2;
    let t_rho = 16.0 * PI * pd.rho_full();
    let h = t_r + t_k - t_a - t_rho;
    let scale = (t_r * t_r + t_k * t_k + t_a * t_a + t_rho * t_rho).sqrt();
    (h, scale)
}

/// Local momentum constraint components and normalization scales.
///
/// `M^i = D_j A^{ij} + 6 A^{ij} d_j phi - (2/3) gamma^{ij} d_j K
///        - 8 pi gamma^{ij} S_j`
///
/// computed against the conformal metric; the conformal divergence needs
/// first derivatives of the extrinsic-curvature components and of the
/// inverse metric, which are taken here rather than stored in the record
/// (constraints run only on diagnostic sweeps).
pub fn momentum(fields: &BssnFields, pd: &PointData, dx: f64) -> ([f64; 3], [f64; 3]) {
    let (i, j, k) = (pd.i, pd.j, pd.k);

    // d_a A_p for the six components.
    let mut d_a_comp = [[0.0; 6]; 3];
    for axis in 0..3 {
        for p in 0..6 {
            d_a_comp[axis][p] = diff_1st(fields.a(FieldId::A_IJ[p]), i, j, k, axis, dx);
        }
    }
    // d_a gi_p from d_a g_p: d(gi^{mn}) = -gi^{mc} gi^{nd} d(g_cd).
    let mut d_gi = [[0.0; 6]; 3];
    for axis in 0..3 {
        for (p, &(pm, pn)) in SYM_PAIRS.iter().enumerate() {
            let mut acc = 0.0;
            for c in 0..3 {
                for d in 0..3 {
                    acc -= pd.gi[sym(pm, c)] * pd.gi[sym(pn, d)] * pd.d_g[axis][sym(c, d)];
                }
            }
            d_gi[axis][p] = acc;
        }
    }

    let mut m = [0.0; 3];
    let mut scale = [0.0; 3];
    for d in 0..3 {
        // partial_j A^{dj}, by the product rule on gi^{dk} gi^{jl} A_kl.
        let mut div = 0.0;
        for jj in 0..3 {
            for kk in 0..3 {
                for ll in 0..3 {
                    div += d_gi[jj][sym(d, kk)] * pd.gi[sym(jj, ll)] * pd.a[sym(kk, ll)]
                        + pd.gi[sym(d, kk)] * d_gi[jj][sym(jj, ll)] * pd.a[sym(kk, ll)]
                        + pd.gi[sym(d, kk)] * pd.gi[sym(jj, ll)] * d_a_comp[jj][sym(kk, ll)];
                }
            }
        }
        // Christoffel completion of the conformal divergence; the second
        // contraction vanishes because det(gamma) = 1.
        let mut chris_term = 0.0;
        for q in 0..6 {
            chris_term += SYM_WEIGHT[q] * pd.chris[d][q] * pd.a_con[q];
        }
        let mut t_phi = 0.0;
        let mut t_k = 0.0;
        let mut t_s = 0.0;
        for c in 0..3 {
            t_phi += 6.0 * pd.a_con[sym(d, c)] * pd.d_phi[c];
            t_k += 2.0 / 3.0 * pd.gi[sym(d, c)] * pd.d_trk[c];
            t_s += 8.0 * PI * pd.gi[sym(d, c)] * pd.s_i[c];
        }
        let t_div = div + chris_term;
        m[d] = t_div + t_phi - t_k - t_s;
        scale[d] = (t_div * t_div + t_phi * t_phi + t_k * t_k + t_s * t_s).sqrt();
    }
    (m, scale)
}

/// Aggregate constraint-violation statistics over the grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintStats {
    /// Mean of the violation magnitude.
    pub mean: f64,
    /// Sample standard deviation of the magnitude.
    pub stdev: f64,
    /// Largest magnitude.
    pub max: f64,
    /// Mean of the normalized (dimensionless) magnitude.
    pub mean_norm: f64,
    /// Largest normalized magnitude.
    pub max_norm: f64,
}

/// Streaming accumulator for [`ConstraintStats`], mergeable across workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsAccum {
    pub n: usize,
    pub sum: f64,
    pub sum_sq: f64,
    pub max: f64,
    pub sum_norm: f64,
    pub max_norm: f64,
}

impl StatsAccum {
    pub fn push(&mut self, violation: f64, scale: f64) {
        let mag = violation.abs();
        let norm = if scale > 0.0 { mag / scale } else { 0.0 };
        self.n += 1;
        self.sum += mag;
        self.sum_sq += mag * mag;
        if mag > self.max {
            self.max = mag;
        }
        self.sum_norm += norm;
        if norm > self.max_norm {
            self.max_norm = norm;
        }
    }

    pub fn merge(mut self, other: StatsAccum) -> StatsAccum {
        self.n += other.n;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.max = self.max.max(other.max);
        self.sum_norm += other.sum_norm;
        self.max_norm = self.max_norm.max(other.max_norm);
        self
    }

    pub fn finish(self) -> ConstraintStats {
        if self.n == 0 {
            return ConstraintStats::default();
        }
        let n = self.n as f64;
        let mean = self.sum / n;
        let var = if self.n > 1 {
            (self.sum_sq - n * mean * mean).max(0.0) / (n - 1.0)
        } else {
            0.0
        };
        ConstraintStats {
            mean,
            stdev: var.sqrt(),
            max: self.max,
            mean_norm: self.sum_norm / n,
            max_norm: self.max_norm,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
