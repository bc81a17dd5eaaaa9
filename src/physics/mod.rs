//! Matter components coupling to the BSSN source slots.
//!
//! # Design Philosophy
//!
//! The geometry does not know what matter it carries. Every matter sector
//! implements [`MatterComponent`] and *adds* its stress-energy into the
//! shared source slots (energy density, stress trace, momentum density,
//! trace-free stress); because contributions are additive, components
//! compose without ordering requirements, and the driver runs them one at
//! a time between stages.
//!
//! Components with their own evolved state (the scalar sector) additionally
//! participate in the RK stage protocol through the default-empty hooks;
//! stateless components (the cosmological constant) implement only the
//! source contribution.

pub mod dust;
pub mod lambda;
pub mod scalar;

pub use dust::Dust;
pub use lambda::Lambda;
pub use scalar::ScalarField;

use crate::bssn::{BssnFields, SourceSlots};
use crate::solver::{FrwRef, RkStage};

/// Capability contract of a matter sector.
pub trait MatterComponent: Send {
    /// Display name for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Add this component's stress-energy into the BSSN source slots.
    ///
    /// Reads the `a` banks of the geometry (and the component's own `a`
    /// banks where it has evolved state); must only ever *accumulate* into
    /// `src`, never overwrite, so that components commute.
    fn add_bssn_source(&mut self, fields: &BssnFields, src: &mut SourceSlots, frw: &FrwRef);

    // ---- RK stage protocol (only for components with evolved state) ----

    fn step_init(&mut self) {}

    /// Compute this component's RHS into its own `c` banks.
    fn evolve_stage(&mut self, _fields: &BssnFields, _frw: &FrwRef) {}

    fn rk_finalize(&mut self, _stage: RkStage) {}

    fn step_term(&mut self) {}

    /// NaN count over the component's committed state.
    fn nan_count(&self) -> usize {
        0
    }

    /// Largest violation of the component's internal consistency
    /// diagnostic, if it has one (e.g. `psi_i - d_i phi` for the scalar).
    fn constraint_max(&self) -> Option<f64> {
        None
    }
}
