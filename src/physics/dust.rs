//! Pressureless dust.
//!
//! The dust carries one conserved density field `D`, the energy density
//! rescaled by the conformal volume element, `D = e^{6 phi} rho`. In the
//! comoving synchronous gauge used for dust cosmology the fluid has no
//! coordinate velocity, so `D` is constant in time and the component needs
//! no RK registers of its own; all time dependence of `rho` enters through
//! the conformal factor.

use ndarray::Zip;

use crate::bssn::fields::FieldId;
use crate::bssn::{BssnFields, SourceSlots};
use crate::grid::GridArray;
use crate::physics::MatterComponent;
use crate::solver::FrwRef;

/// Dust (w = 0) matter component.
#[derive(Debug)]
pub struct Dust {
    d: GridArray,
}

impl Dust {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            d: GridArray::zeros("D", nx, ny, nz),
        }
    }

    /// The conserved density field (initial-condition writers).
    pub fn density_mut(&mut self) -> &mut GridArray {
        &mut self.d
    }

    pub fn density(&self) -> &GridArray {
        &self.d
    }
}

impl MatterComponent for Dust {
    fn name(&self) -> &'static str {
        "dust"
    }

    /// `rho = e^{-6 phi} D`, contributed as a deviation from the background:
    ///
    /// ```text
    /// r += e^{-6 phi_FRW} [ D_FRW expm1(-6 dphi) + e^{-6 dphi} D_dev ]
    /// ```
    ///
    /// with `D_FRW = rho_FRW e^{6 phi_FRW}` (conserved along the background
    /// flow). The `expm1` form keeps the near-cancellation between the
    /// background and deviation parts at full precision. Dust is
    /// pressureless and at rest: no `S`, `S_i`, or trace-free stress.
    fn add_bssn_source(&mut self, fields: &BssnFields, src: &mut SourceSlots, frw: &FrwRef) {
        let d_frw = frw.rho * (6.0 * frw.phi).exp();
        let bg_scale = (-6.0 * frw.phi).exp();
        Zip::from(src.r.view_mut())
            .and(fields.a(FieldId::Phi).view())
            .and(self.d.view())
            .par_for_each(|r, &phi_dev, &d| {
                *r += bg_scale * (d_frw * (-6.0 * phi_dev).exp_m1() + (-6.0 * phi_dev).exp() * d);
            });
    }

    fn nan_count(&self) -> usize {
        self.d.nan_count()
    }
}

// =============================================================================
// Tests
// =============================================================================
