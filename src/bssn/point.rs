//! Per-cell work record for the BSSN right-hand sides.
//!
//! [`PointData`] is a flat, value-only snapshot of everything the evolution
//! equations and constraints need at one cell: local field values, the full
//! and inverse conformal metric, first and second partial derivatives,
//! Christoffel symbols, the Ricci tensor, covariant double derivatives of
//! the lapse and conformal factor, matter sources, and the reference
//! background. It lives on the worker's stack (roughly three hundred f64
//! slots) and is zero-initialized so that slots belonging to disabled
//! sectors can be read unconditionally.
//!
//! Symmetric rank-2 tensors are packed into six-component arrays in the
//! pair order of [`crate::bssn::fields::SYM_PAIRS`].

use nalgebra::Matrix3;

use crate::bssn::fields::{sym, FieldId, FLAT_METRIC, SYM_PAIRS, SYM_WEIGHT};
use crate::bssn::{BssnFields, BssnOptions, SourceSlots};
use crate::grid::stencil::{diff_1st, diff_2nd_pair, diff_adv};
use crate::grid::GridArray;
use crate::solver::FrwRef;

/// Everything the per-point evaluator knows about one cell.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointData {
    // Cell location.
    pub i: usize,
    pub j: usize,
    pub k: usize,
    pub idx: usize,

    // Evolved deviations at the cell.
    pub phi_dev: f64,
    pub trk_dev: f64,
    pub alpha_dev: f64,
    pub gamma_dev: [f64; 6],
    pub a: [f64; 6],
    pub big_gamma: [f64; 3],
    pub beta: [f64; 3],
    pub aux_b: [f64; 3],
    pub theta: f64,

    // Matter source slots at the cell (deviations, like the fields).
    pub rho: f64,
    pub s: f64,
    pub s_i: [f64; 3],
    pub stf: [f64; 6],

    // Undifferenced geometry with the background folded in.
    pub phi: f64,
    pub trk: f64,
    pub alpha: f64,
    pub em4phi: f64,
    pub ep4phi: f64,
    pub g: [f64; 6],
    pub gi: [f64; 6],
    pub det_g: f64,

    // First partial derivatives.
    pub d_phi: [f64; 3],
    pub d_alpha: [f64; 3],
    pub d_trk: [f64; 3],
    pub d_theta: [f64; 3],
    /// `d_beta[a][i] = partial_a beta^i`.
    pub d_beta: [[f64; 3]; 3],
    /// `d_big_gamma[a][i] = partial_a Gamma^i`.
    pub d_big_gamma: [[f64; 3]; 3],
    /// `d_g[a][p] = partial_a gamma_p`.
    pub d_g: [[f64; 6]; 3],

    // Second partial derivatives (leading index in pair order).
    pub dd_phi: [f64; 6],
    pub dd_alpha: [f64; 6],
    /// `dd_g[ab][ij]`: derivative pair x component pair.
    pub dd_g: [[f64; 6]; 6],
    /// `dd_beta[i][ab] = partial_a partial_b beta^i`.
    pub dd_beta: [[f64; 6]; 3],

    // Contracted upwind advection terms, `beta^a partial_a X`.
    pub adv_phi: f64,
    pub adv_trk: f64,
    pub adv_alpha: f64,
    pub adv_theta: f64,
    pub adv_gamma: [f64; 6],
    pub adv_a: [f64; 6],
    pub adv_big_gamma: [f64; 3],
    pub adv_beta: [f64; 3],
    pub adv_aux_b: [f64; 3],

    // Christoffel symbols of the conformal metric.
    /// `chris[c][p] = Gamma^c_{ij}` with `(i, j)` the pair `p`.
    pub chris: [[f64; 6]; 3],
    /// Lowered first index, `Gamma_{c ij}`.
    pub chris_l: [[f64; 6]; 3],
    /// Contraction `gamma^{jk} Gamma^i_{jk}`.
    pub gammad: [f64; 3],

    // Curvature.
    /// Physical Ricci tensor (conformal part plus phi corrections).
    pub ricci: [f64; 6],
    pub ricci_tf: [f64; 6],
    pub ricci_scalar: f64,

    // Covariant second derivatives.
    /// Conformal `D_i D_j phi`.
    pub cd_phi: [f64; 6],
    /// Physical `D_i D_j alpha`.
    pub cd_alpha: [f64; 6],
    pub cd_alpha_tf: [f64; 6],
    /// Physical trace `gamma^{ij} D_i D_j alpha`.
    pub cd_alpha_tr: f64,

    // Extrinsic-curvature contractions.
    /// `A^i_j`.
    pub a_mixed: [[f64; 3]; 3],
    /// `A^{ij}` in pair order.
    pub a_con: [f64; 6],
    /// `A_ij A^{ij}`.
    pub a2: f64,

    // Reference background at this stage.
    pub phi_frw: f64,
    pub k_frw: f64,
    pub rho_frw: f64,
    pub s_frw: f64,

    // Constraint scratch.
    pub ham: f64,
}

impl PointData {
    /// Full energy density (background plus deviation slot).
    #[inline]
    pub fn rho_full(&self) -> f64 {
        self.rho_frw + self.rho
    }

    /// Full stress trace.
    #[inline]
    pub fn s_full(&self) -> f64 {
        self.s_frw + self.s
    }
}

/// Build the work record for cell `(i, j, k)` from the `a` banks.
///
/// `src` may be `None` for callers that only need the geometric part
/// (e.g. the scalar sector computing its own stress-energy); source slots
/// then read zero.
pub fn assemble(
    fields: &BssnFields,
    src: Option<&SourceSlots>,
    opts: &BssnOptions,
    frw: &FrwRef,
    i: usize,
    j: usize,
    k: usize,
) -> PointData {
    let dx = opts.dx;
    let mut pd = PointData {
        i,
        j,
        k,
        idx: fields.a(FieldId::Phi).linear_index(i, j, k),
        ..PointData::default()
    };

    // ---- local evolved values -------------------------------------------
    pd.phi_dev = fields.a(FieldId::Phi).get(i, j, k);
    pd.trk_dev = fields.a(FieldId::K).get(i, j, k);
    pd.alpha_dev = fields.a(FieldId::Alpha).get(i, j, k);
    for p in 0..6 {
        pd.gamma_dev[p] = fields.a(FieldId::GAMMA_IJ[p]).get(i, j, k);
        pd.a[p] = fields.a(FieldId::A_IJ[p]).get(i, j, k);
    }
    for d in 0..3 {
        pd.big_gamma[d] = fields.a(FieldId::GAMMA_I[d]).get(i, j, k);
    }
    if opts.use_shift {
        for d in 0..3 {
            pd.beta[d] = fields.a(FieldId::BETA_I[d]).get(i, j, k);
            pd.aux_b[d] = fields.a(FieldId::B_I[d]).get(i, j, k);
        }
    }
    if opts.use_z4c {
        pd.theta = fields.a(FieldId::Theta).get(i, j, k);
    }

    // ---- reference background -------------------------------------------
    pd.phi_frw = frw.phi;
    pd.k_frw = frw.k;
    pd.rho_frw = frw.rho;
    pd.s_frw = frw.s;

    // ---- undifferenced geometry -----------------------------------------
    pd.phi = pd.phi_frw + pd.phi_dev;
    pd.trk = pd.k_frw + pd.trk_dev;
    pd.alpha = 1.0 + pd.alpha_dev;
    pd.em4phi = (-4.0 * pd.phi).exp();
    pd.ep4phi = (4.0 * pd.phi).exp();
    for p in 0..6 {
        pd.g[p] = FLAT_METRIC[p] + pd.gamma_dev[p];
    }

    let m = Matrix3::new(
        pd.g[0], pd.g[1], pd.g[2], //
        pd.g[1], pd.g[3], pd.g[4], //
        pd.g[2], pd.g[4], pd.g[5],
    );
    pd.det_g = m.determinant();
    // A singular metric is a blowup in progress; let NaN flow to the
    // detector at the next diagnostic boundary rather than panicking
    // inside a worker.
    let mi = m
        .try_inverse()
        .unwrap_or_else(|| Matrix3::from_element(f64::NAN));
    pd.gi = [
        mi[(0, 0)],
        mi[(0, 1)],
        mi[(0, 2)],
        mi[(1, 1)],
        mi[(1, 2)],
        mi[(2, 2)],
    ];

    // ---- partial derivatives --------------------------------------------
    let phi_arr = fields.a(FieldId::Phi);
    let trk_arr = fields.a(FieldId::K);
    let alpha_arr = fields.a(FieldId::Alpha);
    for axis in 0..3 {
        pd.d_phi[axis] = diff_1st(phi_arr, i, j, k, axis, dx);
        pd.d_trk[axis] = diff_1st(trk_arr, i, j, k, axis, dx);
        pd.d_alpha[axis] = diff_1st(alpha_arr, i, j, k, axis, dx);
        for p in 0..6 {
            pd.d_g[axis][p] = diff_1st(fields.a(FieldId::GAMMA_IJ[p]), i, j, k, axis, dx);
        }
        for d in 0..3 {
            pd.d_big_gamma[axis][d] = diff_1st(fields.a(FieldId::GAMMA_I[d]), i, j, k, axis, dx);
        }
        if opts.use_shift {
            for d in 0..3 {
                pd.d_beta[axis][d] = diff_1st(fields.a(FieldId::BETA_I[d]), i, j, k, axis, dx);
            }
        }
        if opts.use_z4c {
            pd.d_theta[axis] = diff_1st(fields.a(FieldId::Theta), i, j, k, axis, dx);
        }
    }

    for (pab, &(a, b)) in SYM_PAIRS.iter().enumerate() {
        pd.dd_phi[pab] = diff_2nd_pair(phi_arr, i, j, k, a, b, dx);
        pd.dd_alpha[pab] = diff_2nd_pair(alpha_arr, i, j, k, a, b, dx);
        for pij in 0..6 {
            pd.dd_g[pab][pij] = diff_2nd_pair(fields.a(FieldId::GAMMA_IJ[pij]), i, j, k, a, b, dx);
        }
        if opts.use_shift {
            for d in 0..3 {
                pd.dd_beta[d][pab] =
                    diff_2nd_pair(fields.a(FieldId::BETA_I[d]), i, j, k, a, b, dx);
            }
        }
    }

    // ---- upwind advection terms -----------------------------------------
    if opts.use_shift {
        let beta = pd.beta;
        let adv = |arr: &GridArray| -> f64 {
            let mut acc = 0.0;
            for (axis, &v) in beta.iter().enumerate() {
                if v != 0.0 {
                    acc += v * diff_adv(arr, i, j, k, axis, v, dx);
                }
            }
            acc
        };
        pd.adv_phi = adv(phi_arr);
        pd.adv_trk = adv(trk_arr);
        pd.adv_alpha = adv(alpha_arr);
        for p in 0..6 {
            pd.adv_gamma[p] = adv(fields.a(FieldId::GAMMA_IJ[p]));
            pd.adv_a[p] = adv(fields.a(FieldId::A_IJ[p]));
        }
        for d in 0..3 {
            pd.adv_big_gamma[d] = adv(fields.a(FieldId::GAMMA_I[d]));
            pd.adv_beta[d] = adv(fields.a(FieldId::BETA_I[d]));
            pd.adv_aux_b[d] = adv(fields.a(FieldId::B_I[d]));
        }
        if opts.use_z4c {
            pd.adv_theta = adv(fields.a(FieldId::Theta));
        }
    }

    // ---- Christoffel symbols --------------------------------------------
    for c in 0..3 {
        for (p, &(pi, pj)) in SYM_PAIRS.iter().enumerate() {
            pd.chris_l[c][p] =
                0.5 * (pd.d_g[pi][sym(c, pj)] + pd.d_g[pj][sym(c, pi)] - pd.d_g[c][p]);
        }
    }
    for c in 0..3 {
        for p in 0..6 {
            let mut acc = 0.0;
            for l in 0..3 {
                acc += pd.gi[sym(c, l)] * pd.chris_l[l][p];
            }
            pd.chris[c][p] = acc;
        }
    }
    for c in 0..3 {
        let mut acc = 0.0;
        for p in 0..6 {
            acc += SYM_WEIGHT[p] * pd.gi[p] * pd.chris[c][p];
        }
        pd.gammad[c] = acc;
    }

    // ---- covariant second derivative of phi (conformal) -----------------
    for p in 0..6 {
        let mut acc = pd.dd_phi[p];
        for l in 0..3 {
            acc -= pd.chris[l][p] * pd.d_phi[l];
        }
        pd.cd_phi[p] = acc;
    }

    // ---- Ricci tensor ----------------------------------------------------
    let cd_phi_tr: f64 = (0..6).map(|q| SYM_WEIGHT[q] * pd.gi[q] * pd.cd_phi[q]).sum();
    let dphi2 = contract_vv(&pd.gi, &pd.d_phi, &pd.d_phi);

    for (p, &(pi, pj)) in SYM_PAIRS.iter().enumerate() {
        // Conformal part.
        let mut r = 0.0;
        for q in 0..6 {
            r -= 0.5 * SYM_WEIGHT[q] * pd.gi[q] * pd.dd_g[q][p];
        }
        for c in 0..3 {
            r += 0.5
                * (pd.g[sym(c, pi)] * pd.d_big_gamma[pj][c]
                    + pd.g[sym(c, pj)] * pd.d_big_gamma[pi][c]);
            r += 0.5 * pd.gammad[c] * (pd.chris_l[pi][sym(pj, c)] + pd.chris_l[pj][sym(pi, c)]);
        }
        for l in 0..3 {
            for mm in 0..3 {
                let gilm = pd.gi[sym(l, mm)];
                let mut t = 0.0;
                for c in 0..3 {
                    t += pd.chris[c][sym(l, pi)] * pd.chris_l[pj][sym(c, mm)]
                        + pd.chris[c][sym(l, pj)] * pd.chris_l[pi][sym(c, mm)]
                        + pd.chris[c][sym(pi, mm)] * pd.chris_l[c][sym(l, pj)];
                }
                r += gilm * t;
            }
        }
        // Conformal-factor corrections.
        pd.ricci[p] = r - 2.0 * pd.cd_phi[p] - 2.0 * pd.g[p] * cd_phi_tr
            + 4.0 * pd.d_phi[pi] * pd.d_phi[pj]
            - 4.0 * pd.g[p] * dphi2;
    }
    let mut rs = 0.0;
    for p in 0..6 {
        rs += SYM_WEIGHT[p] * pd.gi[p] * pd.ricci[p];
    }
    pd.ricci_scalar = pd.em4phi * rs;
    for p in 0..6 {
        pd.ricci_tf[p] = pd.ricci[p] - pd.ep4phi * pd.g[p] * pd.ricci_scalar / 3.0;
    }

    // ---- covariant second derivative of the lapse (physical) ------------
    let dphi_dalpha = contract_vv(&pd.gi, &pd.d_phi, &pd.d_alpha);
    for (p, &(pi, pj)) in SYM_PAIRS.iter().enumerate() {
        let mut acc = pd.dd_alpha[p];
        for l in 0..3 {
            acc -= pd.chris[l][p] * pd.d_alpha[l];
        }
        acc -= 2.0
            * (pd.d_phi[pi] * pd.d_alpha[pj] + pd.d_phi[pj] * pd.d_alpha[pi]
                - pd.g[p] * dphi_dalpha);
        pd.cd_alpha[p] = acc;
    }
    let mut tr = 0.0;
    for p in 0..6 {
        tr += SYM_WEIGHT[p] * pd.gi[p] * pd.cd_alpha[p];
    }
    pd.cd_alpha_tr = pd.em4phi * tr;
    for p in 0..6 {
        pd.cd_alpha_tf[p] = pd.cd_alpha[p] - pd.ep4phi * pd.g[p] * pd.cd_alpha_tr / 3.0;
    }

    // ---- extrinsic-curvature contractions -------------------------------
    for r in 0..3 {
        for cidx in 0..3 {
            let mut acc = 0.0;
            for l in 0..3 {
                acc += pd.gi[sym(r, l)] * pd.a[sym(l, cidx)];
            }
            pd.a_mixed[r][cidx] = acc;
        }
    }
    for (p, &(pi, pj)) in SYM_PAIRS.iter().enumerate() {
        let mut acc = 0.0;
        for l in 0..3 {
            acc += pd.a_mixed[pi][l] * pd.gi[sym(l, pj)];
        }
        pd.a_con[p] = acc;
    }
    let mut a2 = 0.0;
    for p in 0..6 {
        a2 += SYM_WEIGHT[p] * pd.a[p] * pd.a_con[p];
    }
    pd.a2 = a2;

    // ---- matter sources --------------------------------------------------
    if let Some(src) = src {
        pd.rho = src.r.get(i, j, k);
        pd.s = src.s.get(i, j, k);
        for d in 0..3 {
            pd.s_i[d] = src.s_i[d].get(i, j, k);
        }
        for p in 0..6 {
            pd.stf[p] = src.stf[p].get(i, j, k);
        }
    }

    pd
}

/// `gi^{ab} u_a v_b` with `gi` in pair order.
#[inline]
fn contract_vv(gi: &[f64; 6], u: &[f64; 3], v: &[f64; 3]) -> f64 {
    let mut acc = 0.0;
    for a in 0..3 {
        for b in 0..3 {
            acc += gi[sym(a, b)] * u[a] * v[b];
        }
    }
    acc
}

// =============================================================================
// Tests
// =============================================================================
