//! Real scalar field sector.
//!
//! A minimally coupled scalar with potential `V(phi) = V0 + m^2 phi^2 / 2`,
//! evolved in first-order form: the field `phi`, its conjugate momentum
//! `Pi = -n^mu d_mu phi`, and three auxiliary fields `psi_i` designed to
//! equal `d_i phi`. The `psi_i = d_i phi` relation is *not* enforced
//! dynamically; it is monitored through [`ScalarField::constraint_max`].
//!
//! The sector owns its five RK registers and participates in the stage
//! protocol alongside the BSSN fields. Its right-hand sides read the
//! geometric part of the per-point work record (lapse, shift, inverse
//! metric, conformal factor, connection vector) plus its own first
//! derivatives; its stress-energy contributions go into the shared source
//! slots like every other matter component.

use ndarray::Zip;
use rayon::prelude::*;

use crate::bssn::fields::sym;
use crate::bssn::point::{self, PointData};
use crate::bssn::{BssnFields, BssnOptions, SourceSlots};
use crate::error::{Result, SimError};
use crate::grid::stencil::diff_1st;
use crate::physics::MatterComponent;
use crate::solver::{FrwRef, Rk4Register, RkStage};

/// Local scalar-sector values and derivatives at one cell.
#[derive(Debug, Clone, Copy, Default)]
struct ScalarData {
    phi: f64,
    pi: f64,
    psi: [f64; 3],
    d_phi: [f64; 3],
    d_pi: [f64; 3],
    /// `d_psi[a][i] = partial_a psi_i`.
    d_psi: [[f64; 3]; 3],
}

/// Per-cell stress-energy contribution, staged before the additive scatter.
#[derive(Debug, Clone, Copy, Default)]
struct SourceContrib {
    rho: f64,
    s: f64,
    s_i: [f64; 3],
    stf: [f64; 6],
}

/// The scalar matter sector.
#[derive(Debug)]
pub struct ScalarField {
    opts: BssnOptions,
    mass: f64,
    v0: f64,
    nx: usize,
    ny: usize,
    nz: usize,
    phi: Rk4Register,
    pi: Rk4Register,
    psi: [Rk4Register; 3],
    rhs_ws: Vec<[f64; 5]>,
    src_ws: Vec<SourceContrib>,
}

impl ScalarField {
    /// Construct the sector; rejects incompatible build options.
    pub fn new(
        nx: usize,
        ny: usize,
        nz: usize,
        dt: f64,
        opts: BssnOptions,
        mass: f64,
        v0: f64,
    ) -> Result<Self> {
        if !opts.use_shift {
            return Err(SimError::FeatureMismatch(
                "the scalar sector requires the BSSN shift".into(),
            ));
        }
        if opts.use_reference_frw {
            return Err(SimError::FeatureMismatch(
                "the scalar sector does not support the reference FRW background".into(),
            ));
        }
        let points = nx * ny * nz;
        Ok(Self {
            opts,
            mass,
            v0,
            nx,
            ny,
            nz,
            phi: Rk4Register::new("scalar_phi", nx, ny, nz, dt),
            pi: Rk4Register::new("scalar_Pi", nx, ny, nz, dt),
            psi: std::array::from_fn(|d| {
                Rk4Register::new(format!("scalar_psi{}", d + 1), nx, ny, nz, dt)
            }),
            rhs_ws: vec![[0.0; 5]; points],
            src_ws: vec![SourceContrib::default(); points],
        })
    }

    /// Registers for initial-condition writers, `(phi, Pi, psi)`.
    pub fn registers_mut(&mut self) -> (&mut Rk4Register, &mut Rk4Register, &mut [Rk4Register; 3]) {
        (&mut self.phi, &mut self.pi, &mut self.psi)
    }

    pub fn phi(&self) -> &Rk4Register {
        &self.phi
    }

    fn v(&self, phi: f64) -> f64 {
        self.v0 + 0.5 * self.mass * self.mass * phi * phi
    }

    fn dv(&self, phi: f64) -> f64 {
        self.mass * self.mass * phi
    }

    fn data_at(&self, i: usize, j: usize, k: usize) -> ScalarData {
        let dx = self.opts.dx;
        let mut sd = ScalarData {
            phi: self.phi.a.get(i, j, k),
            pi: self.pi.a.get(i, j, k),
            ..ScalarData::default()
        };
        for d in 0..3 {
            sd.psi[d] = self.psi[d].a.get(i, j, k);
        }
        for axis in 0..3 {
            sd.d_phi[axis] = diff_1st(&self.phi.a, i, j, k, axis, dx);
            sd.d_pi[axis] = diff_1st(&self.pi.a, i, j, k, axis, dx);
            for d in 0..3 {
                sd.d_psi[axis][d] = diff_1st(&self.psi[d].a, i, j, k, axis, dx);
            }
        }
        sd
    }

    fn dt_phi(bd: &PointData, sd: &ScalarData) -> f64 {
        let mut v = -bd.alpha * sd.pi;
        for a in 0..3 {
            v += bd.beta[a] * sd.d_phi[a];
        }
        v
    }

    fn dt_pi(&self, bd: &PointData, sd: &ScalarData) -> f64 {
        let mut v = 0.0;
        for a in 0..3 {
            v += bd.beta[a] * sd.d_pi[a];
        }
        // -e^{-4 phi_g} gamma^{ij} (alpha d_i psi_j + psi_i d_j alpha)
        let mut grad = 0.0;
        for a in 0..3 {
            for b in 0..3 {
                grad += bd.gi[sym(a, b)] * (bd.alpha * sd.d_psi[a][b] + sd.psi[a] * bd.d_alpha[b]);
            }
        }
        v -= bd.em4phi * grad;
        // alpha [ (Gamma^i - 2 gamma^{ij} d_j phi_g) psi_i + K Pi + V'(phi) ]
        let mut conn = 0.0;
        for a in 0..3 {
            let mut g_dphi = 0.0;
            for b in 0..3 {
                g_dphi += bd.gi[sym(a, b)] * bd.d_phi[b];
            }
            conn += (bd.big_gamma[a] - 2.0 * g_dphi) * sd.psi[a];
        }
        v + bd.alpha * (conn + bd.trk * sd.pi + self.dv(sd.phi))
    }

    fn dt_psi(bd: &PointData, sd: &ScalarData, dir: usize) -> f64 {
        let mut v = -bd.alpha * sd.d_pi[dir] - sd.pi * bd.d_alpha[dir];
        for a in 0..3 {
            v += bd.beta[a] * sd.d_psi[a][dir];
            v += sd.psi[a] * bd.d_beta[dir][a];
        }
        v
    }

    #[inline]
    fn decode(&self, idx: usize) -> (usize, usize, usize) {
        let k = idx % self.nz;
        let j = (idx / self.nz) % self.ny;
        let i = idx / (self.ny * self.nz);
        (i, j, k)
    }
}

impl MatterComponent for ScalarField {
    fn name(&self) -> &'static str {
        "scalar"
    }

    /// Stress-energy of the minimally coupled scalar:
    ///
    /// ```text
    /// rho  = (n^mu d_mu phi)^2 / 2 + e^{-4 phi_g} (d phi)^2 / 2 + V
    /// S    = 3 (n^mu d_mu phi)^2 / 2 - e^{-4 phi_g} (d phi)^2 / 2 - 3 V
    /// S_i  = -e^{-4 phi_g} (n^mu d_mu phi) gamma_ij gamma^{jk} d_k phi
    /// S_ij = d_i phi d_j phi + e^{4 phi_g} gamma_ij
    ///          [ (n^mu d_mu phi)^2 / 2 - e^{-4 phi_g} (d phi)^2 / 2 - V ]
    /// ```
    fn add_bssn_source(&mut self, fields: &BssnFields, src: &mut SourceSlots, frw: &FrwRef) {
        let (ny, nz) = (self.ny, self.nz);
        // Stage contributions into the owned workspace (taken out to keep
        // the borrow checker happy; no allocation, the buffer is reused).
        let mut ws = std::mem::take(&mut self.src_ws);
        {
            let this = &*self;
            let frw = *frw;
            ws.par_iter_mut()
                .enumerate()
                .for_each(|(idx, out)| {
                    let (i, j, k) = this.decode(idx);
                    let bd = point::assemble(fields, None, &this.opts, &frw, i, j, k);
                    let sd = this.data_at(i, j, k);

                    // n^mu d_mu phi, recovered from dt(phi) minus advection.
                    let mut adv = 0.0;
                    for a in 0..3 {
                        adv += bd.beta[a] * sd.d_phi[a];
                    }
                    let nmudmuphi = (Self::dt_phi(&bd, &sd) - adv) / bd.alpha;

                    // gamma^{ij} d_i phi d_j phi.
                    let mut dphi2 = 0.0;
                    for a in 0..3 {
                        for b in 0..3 {
                            dphi2 += bd.gi[sym(a, b)] * sd.d_phi[a] * sd.d_phi[b];
                        }
                    }

                    let v_pot = this.v(sd.phi);
                    let kinetic = 0.5 * nmudmuphi * nmudmuphi;
                    let gradient = 0.5 * bd.em4phi * dphi2;

                    out.rho = kinetic + gradient + v_pot;
                    out.s = 3.0 * kinetic - gradient - 3.0 * v_pot;
                    for d in 0..3 {
                        // gamma_dj d_j phi (index lowered with the full
                        // conformal metric).
                        let mut g_dphi = 0.0;
                        for b in 0..3 {
                            g_dphi += bd.g[sym(d, b)] * sd.d_phi[b];
                        }
                        out.s_i[d] = -bd.em4phi * nmudmuphi * g_dphi;
                    }
                    let sij_factor = kinetic - gradient - v_pot;
                    for (p, &(pi, pj)) in crate::bssn::fields::SYM_PAIRS.iter().enumerate() {
                        out.stf[p] =
                            sd.d_phi[pi] * sd.d_phi[pj] + bd.ep4phi * bd.g[p] * sij_factor;
                    }
                });
        }
        self.src_ws = ws;

        // Additive scatter into the shared slots.
        let ws = &self.src_ws;
        Zip::indexed(src.r.view_mut()).par_for_each(|(i, j, k), v| {
            *v += ws[(i * ny + j) * nz + k].rho;
        });
        Zip::indexed(src.s.view_mut()).par_for_each(|(i, j, k), v| {
            *v += ws[(i * ny + j) * nz + k].s;
        });
        for d in 0..3 {
            Zip::indexed(src.s_i[d].view_mut()).par_for_each(|(i, j, k), v| {
                *v += ws[(i * ny + j) * nz + k].s_i[d];
            });
        }
        for p in 0..6 {
            Zip::indexed(src.stf[p].view_mut()).par_for_each(|(i, j, k), v| {
                *v += ws[(i * ny + j) * nz + k].stf[p];
            });
        }
    }

    fn step_init(&mut self) {
        self.phi.step_init();
        self.pi.step_init();
        for r in &mut self.psi {
            r.step_init();
        }
    }

    fn evolve_stage(&mut self, fields: &BssnFields, frw: &FrwRef) {
        let (ny, nz) = (self.ny, self.nz);
        let mut ws = std::mem::take(&mut self.rhs_ws);
        {
            let this = &*self;
            let frw = *frw;
            ws.par_iter_mut().enumerate().for_each(|(idx, out)| {
                let (i, j, k) = this.decode(idx);
                let bd = point::assemble(fields, None, &this.opts, &frw, i, j, k);
                let sd = this.data_at(i, j, k);
                *out = [
                    Self::dt_phi(&bd, &sd),
                    this.dt_pi(&bd, &sd),
                    Self::dt_psi(&bd, &sd, 0),
                    Self::dt_psi(&bd, &sd, 1),
                    Self::dt_psi(&bd, &sd, 2),
                ];
            });
        }
        self.rhs_ws = ws;
        let ws = &self.rhs_ws;
        Zip::indexed(self.phi.c.view_mut()).par_for_each(|(i, j, k), c| {
            *c = ws[(i * ny + j) * nz + k][0];
        });
        Zip::indexed(self.pi.c.view_mut()).par_for_each(|(i, j, k), c| {
            *c = ws[(i * ny + j) * nz + k][1];
        });
        for d in 0..3 {
            Zip::indexed(self.psi[d].c.view_mut()).par_for_each(|(i, j, k), c| {
                *c = ws[(i * ny + j) * nz + k][2 + d];
            });
        }
    }

    fn rk_finalize(&mut self, stage: RkStage) {
        self.phi.finalize(stage);
        self.pi.finalize(stage);
        for r in &mut self.psi {
            r.finalize(stage);
        }
    }

    fn step_term(&mut self) {
        self.phi.step_term();
        self.pi.step_term();
        for r in &mut self.psi {
            r.step_term();
        }
    }

    fn nan_count(&self) -> usize {
        self.phi.p.nan_count()
            + self.pi.p.nan_count()
            + self.psi.iter().map(|r| r.p.nan_count()).sum::<usize>()
    }

    /// Largest `|psi_i - d_i phi|` over the grid: the auxiliary fields are
    /// monitored against the gradient they are designed to track.
    fn constraint_max(&self) -> Option<f64> {
        let dx = self.opts.dx;
        let max = (0..self.nx * self.ny * self.nz)
            .into_par_iter()
            .map(|idx| {
                let (i, j, k) = self.decode(idx);
                let mut worst = 0.0_f64;
                for d in 0..3 {
                    let viol =
                        (diff_1st(&self.phi.a, i, j, k, d, dx) - self.psi[d].a.get(i, j, k)).abs();
                    worst = worst.max(viol);
                }
                worst
            })
            .reduce(|| 0.0, f64::max);
        Some(max)
    }
}

// =============================================================================
// Tests
// =============================================================================
