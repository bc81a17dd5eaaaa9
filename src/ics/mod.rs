//! Initial-condition presets.
//!
//! Every preset writes the committed (`p`) banks of the BSSN fields and
//! the dust density, and configures the reference FRW integrator; the
//! driver's first `step_init` then propagates the state into the active
//! banks. Failures here (negative density, NaN, a shell that fails its
//! reality check) abort before the evolution loop is entered.

pub mod apples;
pub mod harmonics;
pub mod random;
pub mod sphere;

use std::f64::consts::PI;

use crate::bssn::fields::FieldId;
use crate::bssn::Bssn;
use crate::config::{IcKind, RunConfig};
use crate::error::{Result, SimError};
use crate::fourier::Fourier;
use crate::grid::stencil::laplacian;
use crate::grid::GridArray;
use crate::output::IoContext;
use crate::physics::Dust;
use crate::solver::FrwIntegrator;

/// Dispatch to the configured preset.
pub fn apply(
    bssn: &mut Bssn,
    dust: &mut Dust,
    frw: &mut FrwIntegrator,
    fourier: &mut Fourier,
    cfg: &RunConfig,
    io: &mut IoContext,
) -> Result<()> {
    match cfg.ics {
        IcKind::Conformal => random::set_conformal(bssn, dust, frw, fourier, cfg, io),
        IcKind::Sphere => sphere::set_sphere(bssn, dust, frw, cfg, io),
        IcKind::ApplesStability => apples::set_stability(bssn, cfg, io),
        IcKind::ApplesLinwave => apples::set_linwave(bssn, cfg, io),
    }
}

/// Turn a conformal perturbation `xi` (with `psi = 1 + xi` the conformal
/// factor) into consistent `phi`, dust density, and `K` data.
///
/// The constraint-solving chain shared by the `conformal` and `sphere`
/// presets:
///
/// ```text
/// delta_rho = -lap(1 + xi) / (2 pi (1 + xi)^5)
/// phi       = ln(1 + xi)
/// D         = rho_FRW expm1(6 phi) + e^{6 phi} delta_rho
/// K         = -sqrt(24 pi rho_FRW)        (uniform)
/// ```
///
/// With the reference background enabled, the FRW parts stay in the
/// integrator and the grid holds deviations; otherwise they are folded
/// into the grid fields.
pub(crate) fn finalize_conformal_density(
    bssn: &mut Bssn,
    dust: &mut Dust,
    frw: &mut FrwIntegrator,
    xi: &GridArray,
    cfg: &RunConfig,
    io: &mut IoContext,
) -> Result<()> {
    let (nx, ny, nz) = bssn.shape();
    let dx = cfg.dx;
    let rho_frw = cfg.rho_k_matter;
    let k_frw = -(24.0 * PI * rho_frw).sqrt();
    let use_ref = bssn.options().use_reference_frw;

    let mut min_rho = rho_frw;
    let mut max_rho = rho_frw;

    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                let x = xi.get(i, j, k);
                // delta_rho from the same discrete Laplacian the evolution
                // will see.
                let delta_rho =
                    -0.5 / PI / (1.0 + x).powi(5) * laplacian(xi, i, j, k, dx);
                let phi = x.ln_1p();
                let rho = rho_frw + delta_rho;

                if rho.is_nan() {
                    return Err(SimError::InitialConditions(
                        "NaN energy density".into(),
                    ));
                }
                min_rho = min_rho.min(rho);
                max_rho = max_rho.max(rho);

                let mut d = rho_frw * (6.0 * phi).exp_m1() + (6.0 * phi).exp() * delta_rho;
                bssn.fields_mut().p_mut(FieldId::Phi).set(i, j, k, phi);
                if !use_ref {
                    bssn.fields_mut().p_mut(FieldId::K).set(i, j, k, k_frw);
                    d += rho_frw;
                }
                dust.density_mut().set(i, j, k, d);
            }
        }
    }

    io.log(&format!("Minimum fluid density: {min_rho:.6e}"));
    io.log(&format!("Maximum fluid density: {max_rho:.6e}"));
    io.log(&format!(
        "Average / st.dev conserved density: {:.6e} / {:.6e}",
        dust.density().mean(),
        dust.density().stdev()
    ));
    if min_rho < 0.0 {
        return Err(SimError::InitialConditions(
            "negative density in some regions".into(),
        ));
    }

    // The background integrator always tracks the homogeneous solution;
    // when disabled as a reference it still serves as a diagnostic.
    frw.set_phi(0.0);
    frw.set_k(k_frw);
    frw.add_fluid(rho_frw, 0.0);
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bssn::BssnOptions;
    use crate::config::ConfigFile;

    pub(crate) fn test_run_config(nx: usize, extra: &str) -> RunConfig {
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        write!(
            f,
            "steps=1\nNX={nx}\nNY={nx}\nNZ={nx}\ndx=1.0\ndt=0.1\noutput_dir=o\n{extra}"
        )
        .unwrap();
        let cfg = ConfigFile::parse(f.path()).unwrap();
        RunConfig::from_file(&cfg).unwrap()
    }

    #[test]
    fn zero_perturbation_reduces_to_uniform_dust() {
        let cfg = test_run_config(4, "");
        let mut bssn = Bssn::new(4, 4, 4, 0.1, BssnOptions::synchronous(1.0));
        let mut dust = Dust::new(4, 4, 4);
        let mut frw = FrwIntegrator::new(0.1, 0.0, 0.0);
        let xi = GridArray::zeros("xi", 4, 4, 4);
        let tmp = tempfile::tempdir().unwrap();
        let mut io = IoContext::new(tmp.path()).unwrap();

        finalize_conformal_density(&mut bssn, &mut dust, &mut frw, &xi, &cfg, &mut io).unwrap();

        let rho = cfg.rho_k_matter;
        let k_expect = -(24.0 * PI * rho).sqrt();
        assert_eq!(bssn.fields().p(FieldId::Phi).max_abs(), 0.0);
        assert!((bssn.fields().p(FieldId::K).get(1, 2, 3) - k_expect).abs() < 1e-14);
        assert!((dust.density().get(0, 0, 0) - rho).abs() < 1e-15);
        assert!((frw.state().k - k_expect).abs() < 1e-15);
    }

    #[test]
    fn preset_dispatch_covers_every_selector() {
        for (sel, nx) in [
            ("conformal", 8),
            ("sphere", 8),
            ("apples_stability", 4),
            ("apples_linwave", 8),
        ] {
            let cfg = test_run_config(nx, &format!("ICs={sel}\npeak_k=2\npeak_amplitude=1e-8\n"));
            let mut bssn = Bssn::new(nx, nx, nx, 0.1, BssnOptions::synchronous(1.0));
            let mut dust = Dust::new(nx, nx, nx);
            let mut frw = FrwIntegrator::new(0.1, 0.0, 0.0);
            let mut fourier = Fourier::new(nx, nx, nx);
            let tmp = tempfile::tempdir().unwrap();
            let mut io = IoContext::new(tmp.path()).unwrap();
            apply(&mut bssn, &mut dust, &mut frw, &mut fourier, &cfg, &mut io)
                .unwrap_or_else(|e| panic!("preset {sel} failed: {e}"));
        }
    }
}
