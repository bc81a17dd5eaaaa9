//! Method-of-lines time integration.
//!
//! The crate integrates every evolved quantity with the classical 4th-order
//! Runge-Kutta scheme expressed through four storage banks per field
//! ([`rk4::Rk4Register`]), and steps the homogeneous reference background
//! with the identical bank algebra over a small state vector
//! ([`frw::FrwIntegrator`]).

pub mod frw;
pub mod rk4;

pub use frw::{FrwIntegrator, FrwRef};
pub use rk4::{Rk4Register, RkStage};
