//! Uniform periodic 3D lattice storage and finite-difference stencils.
//!
//! # Core Concepts
//!
//! - [`GridArray`]: a named, fixed-size buffer over the lattice with
//!   periodic index arithmetic and the handful of reductions the
//!   diagnostics need.
//! - [`stencil`]: fixed-order periodic centered differences plus the
//!   upwind derivative used by shift-advection terms.
//!
//! # Index mapping
//!
//! Every array in the program shares one linear index mapping:
//! `(i, j, k)` is row-major with `k` fastest, `idx = (i*ny + j)*nz + k`.
//! No component may observe a different layout; the stencils, the Fourier
//! transform, and the RK register banks all rely on it.

pub mod array;
pub mod stencil;

pub use array::GridArray;
