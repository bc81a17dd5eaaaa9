//! Spherical shell of perturbations around a central observer.
//!
//! A Gaussian-profile shell of conformal-factor fluctuations at radius
//! `N dx / 5`, with the angular structure drawn from random spherical-
//! harmonic coefficients at a single fixed `l`. The negative-m
//! coefficients are constructed as `a_{l,-m} = (-1)^m conj(a_{lm})`, the
//! combination that makes `sum_m a_lm Y_lm` real; the reconstruction is
//! still checked pointwise and aborts if an imaginary residue above 1e-6
//! survives.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::bssn::Bssn;
use crate::config::RunConfig;
use crate::error::{Result, SimError};
use crate::grid::GridArray;
use crate::ics::harmonics::spherical_harmonic;
use crate::output::IoContext;
use crate::physics::Dust;
use crate::solver::FrwIntegrator;

use std::f64::consts::PI;

/// The `sphere` preset.
pub fn set_sphere(
    bssn: &mut Bssn,
    dust: &mut Dust,
    frw: &mut FrwIntegrator,
    cfg: &RunConfig,
    io: &mut IoContext,
) -> Result<()> {
    let amp = cfg.shell_amplitude;
    let l = cfg.shell_angular_scale_l;
    io.log(&format!(
        "Generating shell ICs with angular scale l = {l}, amplitude = {amp:e}"
    ));

    let (nx, ny, nz) = bssn.shape();
    let dx = cfg.dx;

    // Shell around the box center, radius a third of the way out.
    let x0 = (nx as f64 - 0.5) * dx / 2.0;
    let y0 = (ny as f64 - 0.5) * dx / 2.0;
    let z0 = (nz as f64 - 0.5) * dx / 2.0;
    let r_shell = nx as f64 * dx / 5.0;
    let shell_width = nx as f64 * dx / 10.0;

    // Random a_lm with the conjugate symmetry of a real field.
    let m_idx = |m: i64| (l as i64 + m) as usize;
    let mut alms = vec![Complex64::default(); 2 * l + 1];
    let mut rng = StdRng::seed_from_u64(cfg.ic_seed);
    alms[m_idx(0)] = Complex64::new(rng.sample(StandardNormal), 0.0);
    for m in 1..=l as i64 {
        let phase: f64 = rng.gen_range(0.0..2.0 * PI);
        let amp_m: f64 = rng.sample(StandardNormal);
        alms[m_idx(m)] = Complex64::from_polar(amp_m, phase);
        let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
        alms[m_idx(-m)] = sign * alms[m_idx(m)].conj();
    }

    let mut xi = GridArray::zeros("xi", nx, ny, nz);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let x = i as f64 * dx - x0;
                let y = j as f64 * dx - y0;
                let z = k as f64 * dx - z0;
                let r = (x * x + y * y + z * z).sqrt();
                let theta = (z / r).acos();
                let phi = y.atan2(x);

                let mut sum = Complex64::default();
                for m in -(l as i64)..=(l as i64) {
                    sum += alms[m_idx(m)] * spherical_harmonic(l, m, theta, phi);
                }
                if sum.im.abs() > 1e-6 {
                    return Err(SimError::InitialConditions(format!(
                        "significant imaginary component {:e} in shell reconstruction",
                        sum.im
                    )));
                }

                // Gaussian radial profile of the shell.
                let arg = (r - r_shell) / (2.0 * (4.0 * shell_width));
                let u_r = amp * (-arg * arg).exp();
                xi.set(i, j, k, u_r * sum.re);
            }
        }
    }

    super::finalize_conformal_density(bssn, dust, frw, &xi, cfg, io)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bssn::BssnOptions;
    use crate::fourier::Fourier;
    use crate::ics::tests::test_run_config;

    #[test]
    fn shell_reconstruction_is_real_for_every_l() {
        for l in 1..=3 {
            let cfg = test_run_config(
                8,
                &format!("ICs=sphere\nshell_angular_scale_l={l}\nshell_amplitude=1e-5\n"),
            );
            let mut bssn = Bssn::new(8, 8, 8, 0.1, BssnOptions::synchronous(1.0));
            let mut dust = Dust::new(8, 8, 8);
            let mut frw = FrwIntegrator::new(0.1, 0.0, 0.0);
            let mut fourier = Fourier::new(8, 8, 8);
            let tmp = tempfile::tempdir().unwrap();
            let mut io = IoContext::new(tmp.path()).unwrap();
            crate::ics::apply(&mut bssn, &mut dust, &mut frw, &mut fourier, &cfg, &mut io)
                .unwrap_or_else(|e| panic!("l = {l}: {e}"));
        }
    }

    #[test]
    fn perturbation_is_confined_to_the_shell() {
        let cfg = test_run_config(
            16,
            "ICs=sphere\nshell_angular_scale_l=2\nshell_amplitude=1e-4\n",
        );
        let mut bssn = Bssn::new(16, 16, 16, 0.1, BssnOptions::synchronous(1.0));
        let mut dust = Dust::new(16, 16, 16);
        let mut frw = FrwIntegrator::new(0.1, 0.0, 0.0);
        let tmp = tempfile::tempdir().unwrap();
        let mut io = IoContext::new(tmp.path()).unwrap();
        set_sphere(&mut bssn, &mut dust, &mut frw, &cfg, &mut io).unwrap();

        use crate::bssn::fields::FieldId;
        let phi = bssn.fields().p(FieldId::Phi);
        // Perturbations exist...
        assert!(phi.max_abs() > 0.0);
        // ...and are bounded by the shell amplitude times the largest
        // harmonic magnitude (order one for small l).
        assert!(phi.max_abs() < 1e-2);
    }
}
