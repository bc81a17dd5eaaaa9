//! Conformally-flat Gaussian-random-field initial conditions with dust.
//!
//! The conformal factor in front of the metric solves
//! `lap(psi) = -2 pi psi^5 delta_rho` with `psi = 1 + xi`; instead of
//! solving for `psi` we synthesize a random `xi` with a prescribed power
//! spectrum and read the matching density perturbation off the discrete
//! Laplacian, so the Hamiltonian constraint is satisfied to stencil
//! accuracy by construction.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::bssn::Bssn;
use crate::config::RunConfig;
use crate::error::Result;
use crate::fourier::Fourier;
use crate::grid::GridArray;
use crate::output::IoContext;
use crate::physics::Dust;
use crate::solver::FrwIntegrator;

/// Fill `out` with a Gaussian random field whose power spectrum is
/// `P(k) ~ A^2 (k/k*)^3 exp(-4 k/k*)`, peaked near the integer wavenumber
/// `k*`. White noise is shaped in Fourier space by a real function of
/// `|k|`, which preserves Hermitian symmetry, so the result is real by
/// construction.
pub fn gaussian_random_field(
    out: &mut GridArray,
    fourier: &mut Fourier,
    peak_k: f64,
    peak_amplitude: f64,
    seed: u64,
) {
    let (nx, ny, nz) = out.shape();
    let mut rng = StdRng::seed_from_u64(seed);
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                out.set(i, j, k, rng.sample(StandardNormal));
            }
        }
    }
    fourier.forward(out);
    fourier.map_modes(|mag, c| {
        if mag == 0.0 {
            // No mean offset.
            *c = Default::default();
        } else {
            let x = mag / peak_k;
            let sqrt_p = peak_amplitude * x.powf(1.5) * (-2.0 * x).exp();
            *c *= sqrt_p;
        }
    });
    fourier.inverse(out);
}

/// The `conformal` preset.
pub fn set_conformal(
    bssn: &mut Bssn,
    dust: &mut Dust,
    frw: &mut FrwIntegrator,
    fourier: &mut Fourier,
    cfg: &RunConfig,
    io: &mut IoContext,
) -> Result<()> {
    io.log(&format!(
        "Generating ICs with peak at k = {} and peak amplitude = {:e}",
        cfg.peak_k, cfg.peak_amplitude
    ));

    let (nx, ny, nz) = bssn.shape();
    let mut xi = GridArray::zeros("xi", nx, ny, nz);
    gaussian_random_field(&mut xi, fourier, cfg.peak_k, cfg.peak_amplitude, cfg.ic_seed);

    super::finalize_conformal_density(bssn, dust, frw, &xi, cfg, io)
}

// =============================================================================
// Tests
// =============================================================================
