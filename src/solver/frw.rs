//! Reference FRW background integrator.
//!
//! A spatially homogeneous Friedmann universe described by the conformal
//! factor `phi`, the mean curvature `K`, and a set of perfect fluids
//! `(rho_i, w_i)`. The state is stepped with the same four-stage bank
//! algebra as the lattice fields, as a single "scalar of scalars" register,
//! so the background stays in lockstep with the BSSN stages.
//!
//! Evolution (geometric units, `alpha = 1`):
//!
//! ```text
//! d phi / dt   = -K / 6
//! d K / dt     = K^2 / 3 + 4 pi sum_i rho_i (1 + 3 w_i)
//! d rho_i / dt = (1 + w_i) rho_i K
//! ```
//!
//! The BSSN evaluator subtracts these background values from its fields for
//! numerical conditioning; when the reference background is disabled the
//! driver feeds the evaluator a zero [`FrwRef`] instead.

use crate::solver::rk4::RkStage;

/// Background values read by the per-point evaluator at one stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrwRef {
    pub phi: f64,
    pub k: f64,
    pub rho: f64,
    /// Trace of stress, `S = 3 sum_i w_i rho_i`.
    pub s: f64,
}

/// Homogeneous FRW state in four RK banks.
///
/// The state vector layout is `[phi, K, rho_0, rho_1, ...]`; the equation
/// of state parameters `w_i` are constants of the run, not evolved.
#[derive(Debug, Clone)]
pub struct FrwIntegrator {
    dt: f64,
    w: Vec<f64>,
    p: Vec<f64>,
    a: Vec<f64>,
    c: Vec<f64>,
    f: Vec<f64>,
}

impl FrwIntegrator {
    pub fn new(dt: f64, phi: f64, k: f64) -> Self {
        let state = vec![phi, k];
        Self {
            dt,
            w: Vec::new(),
            p: state.clone(),
            a: state.clone(),
            c: state.clone(),
            f: state,
        }
    }

    /// Register a fluid with energy density `rho` and equation of state `w`.
    /// Must be called before the loop starts; the matter content of the
    /// background is fixed thereafter.
    pub fn add_fluid(&mut self, rho: f64, w: f64) {
        self.w.push(w);
        self.p.push(rho);
        self.a.push(rho);
        self.c.push(rho);
        self.f.push(rho);
    }

    pub fn set_phi(&mut self, phi: f64) {
        self.p[0] = phi;
    }

    pub fn set_k(&mut self, k: f64) {
        self.p[1] = k;
    }

    /// Committed state (the `p` bank).
    pub fn state(&self) -> FrwRef {
        Self::view(&self.w, &self.p)
    }

    /// Stage input state (the `a` bank), what the RHS sweeps should read.
    pub fn stage_state(&self) -> FrwRef {
        Self::view(&self.w, &self.a)
    }

    fn view(w: &[f64], bank: &[f64]) -> FrwRef {
        let rho: f64 = bank[2..].iter().sum();
        let s: f64 = bank[2..]
            .iter()
            .zip(w.iter())
            .map(|(rho_i, w_i)| 3.0 * w_i * rho_i)
            .sum();
        FrwRef {
            phi: bank[0],
            k: bank[1],
            rho,
            s,
        }
    }

    fn rhs(w: &[f64], a: &[f64], c: &mut [f64]) {
        let k = a[1];
        c[0] = -k / 6.0;
        c[1] = k * k / 3.0
            + 4.0
                * std::f64::consts::PI
                * a[2..]
                    .iter()
                    .zip(w.iter())
                    .map(|(rho_i, w_i)| rho_i * (1.0 + 3.0 * w_i))
                    .sum::<f64>();
        for (ci, (rho_i, w_i)) in c[2..].iter_mut().zip(a[2..].iter().zip(w.iter())) {
            *ci = (1.0 + w_i) * rho_i * k;
        }
    }

    pub fn step_init(&mut self) {
        self.a.copy_from_slice(&self.p);
        self.f.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Evaluate the background RHS from the `a` bank into `c`.
    pub fn evolve_stage(&mut self) {
        Self::rhs(&self.w, &self.a, &mut self.c);
    }

    pub fn finalize(&mut self, stage: RkStage) {
        let h = self.dt;
        match stage {
            RkStage::One => {
                for n in 0..self.p.len() {
                    self.c[n] = self.p[n] + 0.5 * h * self.c[n];
                    self.f[n] += self.c[n];
                }
            }
            RkStage::Two => {
                for n in 0..self.p.len() {
                    self.c[n] = self.p[n] + 0.5 * h * self.c[n];
                    self.f[n] += 2.0 * self.c[n];
                }
            }
            RkStage::Three => {
                for n in 0..self.p.len() {
                    self.c[n] = self.p[n] + h * self.c[n];
                    self.f[n] += self.c[n];
                }
            }
            RkStage::Four => {
                for n in 0..self.p.len() {
                    self.f[n] = h * self.c[n] / 6.0 + (self.f[n] - self.p[n]) / 3.0;
                }
            }
        }
        std::mem::swap(&mut self.a, &mut self.c);
    }

    pub fn step_term(&mut self) {
        std::mem::swap(&mut self.p, &mut self.f);
    }

    /// Advance one full step (used standalone in tests and diagnostics).
    pub fn step(&mut self) {
        self.step_init();
        for stage in RkStage::ALL {
            self.evolve_stage();
            self.finalize(stage);
        }
        self.step_term();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// Matter-dominated (Einstein-de Sitter) closed form:
    /// with K0 = -sqrt(24 pi rho0), K(t) = K0 / (1 - K0 t / 2).
    fn eds_k(k0: f64, t: f64) -> f64 {
        k0 / (1.0 - k0 * t / 2.0)
    }

    #[test]
    fn dust_background_tracks_closed_form() {
        let rho0 = 3.0 / (8.0 * PI);
        let k0 = -(24.0 * PI * rho0).sqrt();
        let dt = 1e-3;
        let mut frw = FrwIntegrator::new(dt, 0.0, k0);
        frw.add_fluid(rho0, 0.0);

        let steps = 200;
        for _ in 0..steps {
            frw.step();
        }
        let t = steps as f64 * dt;
        let got = frw.state().k;
        let expected = eds_k(k0, t);
        assert_relative_eq!(got, expected, epsilon = 1e-10);
    }

    #[test]
    fn friedmann_constraint_is_preserved() {
        // H^2 = 8 pi rho / 3  <=>  K^2 = 24 pi rho, conserved by the flow.
        let rho0 = 0.1;
        let k0 = -(24.0 * PI * rho0).sqrt();
        let mut frw = FrwIntegrator::new(1e-3, 0.0, k0);
        frw.add_fluid(rho0, 0.0);

        for _ in 0..500 {
            frw.step();
        }
        let st = frw.state();
        let residual = st.k * st.k - 24.0 * PI * st.rho;
        assert!(residual.abs() < 1e-9, "constraint residual {residual}");
    }

    #[test]
    fn cosmological_constant_keeps_density_constant() {
        // w = -1: d rho / dt = 0, de Sitter expansion.
        let rho_l = 0.03;
        let k0 = -(24.0 * PI * rho_l).sqrt();
        let mut frw = FrwIntegrator::new(1e-3, 0.0, k0);
        frw.add_fluid(rho_l, -1.0);

        for _ in 0..300 {
            frw.step();
        }
        let st = frw.state();
        assert!((st.rho - rho_l).abs() < 1e-12);
        // K stays at its de Sitter fixed point.
        assert!((st.k - k0).abs() < 1e-9);
        // S = 3 w rho = -3 rho.
        assert!((st.s + 3.0 * rho_l).abs() < 1e-12);
    }

    #[test]
    fn mixed_fluids_report_summed_sources() {
        let mut frw = FrwIntegrator::new(0.1, 0.0, -1.0);
        frw.add_fluid(0.2, 0.0);
        frw.add_fluid(0.05, -1.0);
        let st = frw.state();
        assert!((st.rho - 0.25).abs() < 1e-15);
        assert!((st.s + 0.15).abs() < 1e-15);
    }

    #[test]
    fn stage_state_reads_the_active_bank() {
        let mut frw = FrwIntegrator::new(0.1, 0.0, -3.0);
        frw.add_fluid(3.0 / (8.0 * PI), 0.0);
        frw.step_init();
        frw.evolve_stage();
        frw.finalize(RkStage::One);
        // After finalize the active bank holds the intermediate state,
        // which differs from the committed one.
        assert!((frw.stage_state().k - frw.state().k).abs() > 0.0);
    }
}
