//! Standardized vacuum testbed presets.
//!
//! - `apples_stability`: random noise of tiny amplitude on every dynamical
//!   geometric field, on a flat vacuum background. A stable scheme keeps
//!   the noise bounded for many light-crossing times.
//! - `apples_linwave`: a linearized + polarized gravitational wave
//!   traveling along x, exact to linear order, for convergence tests
//!   against the analytic solution.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bssn::fields::FieldId;
use crate::bssn::Bssn;
use crate::config::RunConfig;
use crate::error::Result;
use crate::output::IoContext;

use std::f64::consts::PI;

/// Fields perturbed by the robust-stability preset: the dynamical
/// geometric sector (gauge fields start unperturbed).
const STABILITY_FIELDS: [FieldId; 17] = [
    FieldId::Phi,
    FieldId::Gamma11,
    FieldId::Gamma12,
    FieldId::Gamma13,
    FieldId::Gamma22,
    FieldId::Gamma23,
    FieldId::Gamma33,
    FieldId::K,
    FieldId::A11,
    FieldId::A12,
    FieldId::A13,
    FieldId::A22,
    FieldId::A23,
    FieldId::A33,
    FieldId::Gamma1,
    FieldId::Gamma2,
    FieldId::Gamma3,
];

/// The `apples_stability` preset.
pub fn set_stability(bssn: &mut Bssn, cfg: &RunConfig, io: &mut IoContext) -> Result<()> {
    let amp = cfg.stability_amplitude;
    io.log(&format!(
        "Robust-stability ICs: noise amplitude {amp:e} on {} fields",
        STABILITY_FIELDS.len()
    ));
    let (nx, ny, nz) = bssn.shape();
    let mut rng = StdRng::seed_from_u64(cfg.ic_seed);
    for f in STABILITY_FIELDS {
        let arr = bssn.fields_mut().p_mut(f);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    arr.set(i, j, k, rng.gen_range(-amp..=amp));
                }
            }
        }
    }
    Ok(())
}

/// The `apples_linwave` preset.
///
/// To linear order the traveling + wave along x with period the box size
/// `L = NX dx` is
///
/// ```text
/// gamma_22 = 1 + b,  gamma_33 = 1 - b,  b = A sin(2 pi (x - t)/L)
/// A_22 = -A_33 = (pi A / L) cos(2 pi (x - t)/L)
/// ```
///
/// written here at `t = 0`. Everything else (including matter) is zero.
pub fn set_linwave(bssn: &mut Bssn, cfg: &RunConfig, io: &mut IoContext) -> Result<()> {
    let amp = cfg.linwave_amplitude;
    let (nx, ny, nz) = bssn.shape();
    let boxlen = nx as f64 * cfg.dx;
    io.log(&format!(
        "Linear-wave ICs: amplitude {amp:e}, wavelength {boxlen}"
    ));
    for i in 0..nx {
        let x = i as f64 * cfg.dx;
        let arg = 2.0 * PI * x / boxlen;
        let b = amp * arg.sin();
        let kk = PI * amp / boxlen * arg.cos();
        for j in 0..ny {
            for k in 0..nz {
                bssn.fields_mut().p_mut(FieldId::Gamma22).set(i, j, k, b);
                bssn.fields_mut().p_mut(FieldId::Gamma33).set(i, j, k, -b);
                bssn.fields_mut().p_mut(FieldId::A22).set(i, j, k, kk);
                bssn.fields_mut().p_mut(FieldId::A33).set(i, j, k, -kk);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
