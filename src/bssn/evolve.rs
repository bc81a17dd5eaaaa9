//! BSSN evolution equations, evaluated per cell.
//!
//! [`rhs`] maps one assembled [`PointData`] record to the time derivative of
//! every evolved field, in [`FieldId`] order. The equations are the standard
//! conformal-traceless set with the moving-puncture gauge family; `phi` and
//! `K` evolve as deviations from the reference FRW background, so the
//! analytic background flow is subtracted from their right-hand sides (it is
//! identically zero for every other field).
//!
//! Conventions: geometric units `G = c = 1`; the full lapse is
//! `alpha = 1 + alpha_dev`; the conformal metric has unit determinant so
//! contracted conformal Christoffels vanish from divergence identities.

use crate::bssn::fields::{sym, FieldId, N_FIELDS, SYM_PAIRS};
use crate::bssn::point::PointData;
use crate::bssn::BssnOptions;
use crate::config::LapseGauge;

use std::f64::consts::PI;

/// Time derivatives of all evolved fields at one cell, in field order.
pub fn rhs(pd: &PointData, opts: &BssnOptions) -> [f64; N_FIELDS] {
    let mut out = [0.0; N_FIELDS];

    let alpha = pd.alpha;
    let trk = pd.trk;
    let div_beta = pd.d_beta[0][0] + pd.d_beta[1][1] + pd.d_beta[2][2];

    // ---- conformal factor ------------------------------------------------
    // d_t phi = beta.grad(phi) + (div beta - alpha K)/6, minus the FRW flow
    // d_t phi_FRW = -K_FRW / 6.
    out[FieldId::Phi.index()] =
        pd.adv_phi + (div_beta - alpha * trk) / 6.0 + pd.k_frw / 6.0;

    // ---- conformal metric ------------------------------------------------
    for (p, &(pi, pj)) in SYM_PAIRS.iter().enumerate() {
        let mut lie = 0.0;
        for c in 0..3 {
            lie += pd.g[sym(pi, c)] * pd.d_beta[pj][c] + pd.g[sym(pj, c)] * pd.d_beta[pi][c];
        }
        out[FieldId::GAMMA_IJ[p].index()] =
            pd.adv_gamma[p] - 2.0 * alpha * pd.a[p] + lie - 2.0 / 3.0 * pd.g[p] * div_beta;
    }

    // ---- mean curvature --------------------------------------------------
    // Full: d_t K = beta.grad(K) - D^2 alpha + alpha (A^2 + K^2/3)
    //               + 4 pi alpha (rho + S)
    // FRW:  d_t K_FRW = K_FRW^2 / 3 + 4 pi (rho_FRW + S_FRW)
    let mut dt_k = pd.adv_trk - pd.cd_alpha_tr
        + alpha * (pd.a2 + trk * trk / 3.0)
        + 4.0 * PI * alpha * (pd.rho_full() + pd.s_full())
        - pd.k_frw * pd.k_frw / 3.0
        - 4.0 * PI * (pd.rho_frw + pd.s_frw);
    if opts.use_z4c {
        dt_k += alpha * opts.z4c_k1 * (1.0 - opts.z4c_k2) * pd.theta;
    }
    out[FieldId::K.index()] = dt_k;

    // ---- trace-free extrinsic curvature ----------------------------------
    // The stress slots hold the full S_ij; project the trace out here so
    // the whole curvature bracket stays trace-free.
    let mut s_trace = 0.0;
    for q in 0..6 {
        let (qa, qb) = SYM_PAIRS[q];
        let w = if qa == qb { 1.0 } else { 2.0 };
        s_trace += w * pd.gi[q] * pd.stf[q];
    }
    for (p, &(pi, pj)) in SYM_PAIRS.iter().enumerate() {
        let stf_tf = pd.stf[p] - pd.g[p] * s_trace / 3.0;
        let mut aa = 0.0;
        for l in 0..3 {
            aa += pd.a[sym(pi, l)] * pd.a_mixed[l][pj];
        }
        let mut lie = 0.0;
        for c in 0..3 {
            lie += pd.a[sym(pi, c)] * pd.d_beta[pj][c] + pd.a[sym(pj, c)] * pd.d_beta[pi][c];
        }
        out[FieldId::A_IJ[p].index()] = pd.adv_a[p]
            + pd.em4phi * (alpha * (pd.ricci_tf[p] - 8.0 * PI * stf_tf) - pd.cd_alpha_tf[p])
            + alpha * (trk * pd.a[p] - 2.0 * aa)
            + lie
            - 2.0 / 3.0 * pd.a[p] * div_beta;
    }

    // ---- conformal connection vector -------------------------------------
    let mut dt_big_gamma = [0.0; 3];
    for d in 0..3 {
        let mut v = pd.adv_big_gamma[d];
        // Shift-generated terms.
        for c in 0..3 {
            v -= pd.big_gamma[c] * pd.d_beta[c][d];
        }
        v += 2.0 / 3.0 * pd.big_gamma[d] * div_beta;
        if opts.use_shift {
            // gamma^{jk} d_j d_k beta^d + (1/3) gamma^{dj} d_j div(beta)
            for (q, &(qa, qb)) in SYM_PAIRS.iter().enumerate() {
                let w = if qa == qb { 1.0 } else { 2.0 };
                v += w * pd.gi[q] * pd.dd_beta[d][q];
            }
            for c in 0..3 {
                let mut ddiv = 0.0;
                for l in 0..3 {
                    ddiv += pd.dd_beta[l][sym(c, l)];
                }
                v += pd.gi[sym(d, c)] * ddiv / 3.0;
            }
        }
        // Curvature and matter terms.
        for c in 0..3 {
            v -= 2.0 * pd.a_con[sym(d, c)] * pd.d_alpha[c];
        }
        let mut chris_a = 0.0;
        for (q, &(qa, qb)) in SYM_PAIRS.iter().enumerate() {
            let w = if qa == qb { 1.0 } else { 2.0 };
            chris_a += w * pd.chris[d][q] * pd.a_con[q];
        }
        let mut rest = chris_a;
        for c in 0..3 {
            rest += 6.0 * pd.a_con[sym(d, c)] * pd.d_phi[c]
                - 2.0 / 3.0 * pd.gi[sym(d, c)] * pd.d_trk[c]
                - 8.0 * PI * pd.gi[sym(d, c)] * pd.s_i[c];
        }
        v += 2.0 * alpha * rest;
        dt_big_gamma[d] = v;
        out[FieldId::GAMMA_I[d].index()] = v;
    }

    // ---- gauge ------------------------------------------------------------
    if opts.lapse == LapseGauge::OnePlusLog {
        out[FieldId::Alpha.index()] = pd.adv_alpha - 2.0 * alpha * trk;
    }
    if opts.use_shift {
        for d in 0..3 {
            out[FieldId::BETA_I[d].index()] = pd.adv_beta[d] + 0.75 * pd.aux_b[d];
            out[FieldId::B_I[d].index()] =
                pd.adv_aux_b[d] + dt_big_gamma[d] - opts.gd_eta * pd.aux_b[d];
        }
    }

    // ---- Z4c damping scalar ----------------------------------------------
    if opts.use_z4c {
        out[FieldId::Theta.index()] = pd.adv_theta
            + 0.5
                * alpha
                * (pd.ricci_scalar + 2.0 / 3.0 * trk * trk - pd.a2
                    - 16.0 * PI * pd.rho_full())
            - alpha * opts.z4c_k1 * (2.0 + opts.z4c_k2) * pd.theta;
    }

    out
}

// =============================================================================
// Tests
// =============================================================================
