//! cosmo-rs: BSSN evolution of cosmological spacetimes
//!
//! A numerical relativity code that evolves Einstein's field equations on a
//! uniform periodic 3D Cartesian grid using the BSSN conformal
//! decomposition, coupled to matter sources (pressureless dust, a
//! cosmological constant, a real scalar field) for cosmological
//! simulations.
//!
//! # Architecture
//!
//! The crate is built on two separations:
//!
//! 1. **Geometry vs matter** — the BSSN core ([`bssn`]) evolves the metric
//!    variables and exposes additive source slots; matter sectors
//!    ([`physics`]) implement one contract, `add_bssn_source`, and compose
//!    without ordering requirements.
//! 2. **State vs stepping** — every evolved field lives in a four-bank RK
//!    register ([`solver::Rk4Register`]) so the classical RK4 scheme runs
//!    with O(1) bank swaps instead of grid copies; a homogeneous FRW
//!    background ([`solver::FrwIntegrator`]) is stepped in lockstep and
//!    subtracted from the fields for numerical conditioning.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cosmo_rs::driver::Simulation;
//!
//! let mut sim = Simulation::from_config(std::path::Path::new("config.txt"))?;
//! sim.run()?;
//! # Ok::<(), cosmo_rs::error::SimError>(())
//! ```
//!
//! The config file is flat `key = value` text; see [`config`] for the
//! recognized keys and [`ics`] for the initial-condition presets.
//!
//! # Modules
//!
//! - [`grid`]: periodic lattice buffers and finite-difference stencils
//! - [`solver`]: the four-bank RK4 register and the FRW background
//! - [`bssn`]: field registry, per-point evaluator, constraints
//! - [`physics`]: matter components
//! - [`ics`]: initial-condition presets
//! - [`fourier`]: FFTs and power spectra
//! - [`output`]: logging, data streams, charts
//! - [`driver`]: the step loop

pub mod bssn;
pub mod config;
pub mod driver;
pub mod error;
pub mod fourier;
pub mod grid;
pub mod ics;
pub mod output;
pub mod physics;
pub mod solver;

pub mod prelude {
    //! Convenient imports for common usage.
    pub use crate::bssn::{Bssn, BssnOptions};
    pub use crate::config::{ConfigFile, RunConfig};
    pub use crate::driver::Simulation;
    pub use crate::error::{Result, SimError};
    pub use crate::grid::GridArray;
    pub use crate::physics::MatterComponent;
    pub use crate::solver::{FrwIntegrator, Rk4Register, RkStage};
}
