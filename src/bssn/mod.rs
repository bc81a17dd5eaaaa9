//! BSSN core: field registry, per-point evaluation, stage orchestration.
//!
//! # Architecture
//!
//! The evolved state is a fixed set of 25 scalar lattice fields
//! ([`fields::FieldId`]), each held in a four-bank RK register. A step
//! proceeds through four stages; in each stage a parallel sweep assembles a
//! per-cell work record ([`point::PointData`]) from the `a` banks and the
//! matter source slots, evaluates the evolution equations
//! ([`evolve::rhs`]) and writes the result into the `c` banks, after which
//! the registers are finalized in lockstep.
//!
//! Matter couples through the [`SourceSlots`]: non-evolved arrays that are
//! cleared and additively rebuilt from every matter component before each
//! stage, so components compose without ordering requirements.
//!
//! # Concurrency
//!
//! Within a stage the RHS at each cell reads only `a` banks, never `c`;
//! writes into the per-cell workspace and then into `c` are disjoint, so
//! the sweep is a race-free parallel-for. Bank swaps happen between stages,
//! single-threaded, in O(1).

pub mod constraint;
pub mod evolve;
pub mod fields;
pub mod point;

use ndarray::Zip;
use rayon::prelude::*;

use crate::config::{LapseGauge, RunConfig};
use crate::error::{Result, SimError};
use crate::grid::GridArray;
use crate::solver::{FrwRef, Rk4Register, RkStage};

use constraint::{ConstraintStats, StatsAccum};
use fields::{FieldId, N_FIELDS};

// =============================================================================
// Options
// =============================================================================

/// Resolved knobs of the BSSN sector, fixed for the lifetime of a run.
///
/// Constructed through [`BssnOptions::from_run`], which enforces the
/// feature-compatibility rules, or [`BssnOptions::synchronous`] for the
/// minimal gauge used by most tests.
#[derive(Debug, Clone, Copy)]
pub struct BssnOptions {
    pub dx: f64,
    pub use_shift: bool,
    pub use_z4c: bool,
    pub use_reference_frw: bool,
    pub lapse: LapseGauge,
    pub gd_eta: f64,
    pub z4c_k1: f64,
    pub z4c_k2: f64,
}

impl BssnOptions {
    /// Synchronous gauge, no optional sectors. The workhorse configuration
    /// for dust cosmology.
    pub fn synchronous(dx: f64) -> Self {
        Self {
            dx,
            use_shift: false,
            use_z4c: false,
            use_reference_frw: false,
            lapse: LapseGauge::Static,
            gd_eta: 2.0,
            z4c_k1: 0.1,
            z4c_k2: 0.0,
        }
    }

    /// Build from the run configuration, rejecting incompatible sectors.
    pub fn from_run(cfg: &RunConfig) -> Result<Self> {
        if cfg.use_reference_frw && cfg.lapse != LapseGauge::Static {
            return Err(SimError::FeatureMismatch(
                "an evolved lapse is incompatible with the reference FRW background".into(),
            ));
        }
        if cfg.use_reference_frw && cfg.use_z4c {
            return Err(SimError::FeatureMismatch(
                "Z4c damping is incompatible with the reference FRW background".into(),
            ));
        }
        Ok(Self {
            dx: cfg.dx,
            use_shift: cfg.use_bssn_shift,
            use_z4c: cfg.use_z4c,
            use_reference_frw: cfg.use_reference_frw,
            lapse: cfg.lapse,
            gd_eta: cfg.gd_eta,
            z4c_k1: cfg.z4c_k1,
            z4c_k2: cfg.z4c_k2,
        })
    }
}

// =============================================================================
// Field registry
// =============================================================================

/// The 25 evolved registers, indexed by [`FieldId`].
#[derive(Debug)]
pub struct BssnFields {
    regs: Vec<Rk4Register>,
}

impl BssnFields {
    fn new(nx: usize, ny: usize, nz: usize, dt: f64) -> Self {
        let regs = FieldId::ALL
            .iter()
            .map(|f| Rk4Register::new(f.name(), nx, ny, nz, dt))
            .collect();
        Self { regs }
    }

    /// Active bank of a field (what RHS sweeps read).
    #[inline]
    pub fn a(&self, f: FieldId) -> &GridArray {
        &self.regs[f.index()].a
    }

    #[inline]
    pub fn a_mut(&mut self, f: FieldId) -> &mut GridArray {
        &mut self.regs[f.index()].a
    }

    /// Committed state of a field.
    #[inline]
    pub fn p(&self, f: FieldId) -> &GridArray {
        &self.regs[f.index()].p
    }

    #[inline]
    pub fn p_mut(&mut self, f: FieldId) -> &mut GridArray {
        &mut self.regs[f.index()].p
    }

    #[inline]
    pub fn c_mut(&mut self, f: FieldId) -> &mut GridArray {
        &mut self.regs[f.index()].c
    }

    /// Register lookup by diagnostic name.
    pub fn by_name(&self, name: &str) -> Option<&Rk4Register> {
        FieldId::from_name(name).map(|f| &self.regs[f.index()])
    }

    pub fn register_mut(&mut self, f: FieldId) -> &mut Rk4Register {
        &mut self.regs[f.index()]
    }
}

// =============================================================================
// Source slots
// =============================================================================

/// Matter source fields: energy density, stress trace, momentum density,
/// and trace-free spatial stress. Overwritten (cleared, then additively
/// filled) every stage; never resized.
#[derive(Debug)]
pub struct SourceSlots {
    pub r: GridArray,
    pub s: GridArray,
    pub s_i: [GridArray; 3],
    pub stf: [GridArray; 6],
}

impl SourceSlots {
    fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            r: GridArray::zeros("r", nx, ny, nz),
            s: GridArray::zeros("S", nx, ny, nz),
            s_i: std::array::from_fn(|d| GridArray::zeros(format!("S{}", d + 1), nx, ny, nz)),
            stf: std::array::from_fn(|p| {
                let (i, j) = fields::SYM_PAIRS[p];
                GridArray::zeros(format!("STF{}{}", i + 1, j + 1), nx, ny, nz)
            }),
        }
    }

    /// Zero every slot.
    pub fn clear(&mut self) {
        self.r.fill_zero();
        self.s.fill_zero();
        for a in &mut self.s_i {
            a.fill_zero();
        }
        for a in &mut self.stf {
            a.fill_zero();
        }
    }
}

// =============================================================================
// BSSN core
// =============================================================================

/// The BSSN sector: registry, sources, and stage orchestration.
pub struct Bssn {
    nx: usize,
    ny: usize,
    nz: usize,
    opts: BssnOptions,
    fields: BssnFields,
    sources: SourceSlots,
    /// Per-cell RHS workspace, one slot vector per cell; sized once.
    rhs_ws: Vec<[f64; N_FIELDS]>,
}

impl Bssn {
    pub fn new(nx: usize, ny: usize, nz: usize, dt: f64, opts: BssnOptions) -> Self {
        Self {
            nx,
            ny,
            nz,
            opts,
            fields: BssnFields::new(nx, ny, nz, dt),
            sources: SourceSlots::new(nx, ny, nz),
            rhs_ws: vec![[0.0; N_FIELDS]; nx * ny * nz],
        }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.nx, self.ny, self.nz)
    }

    pub fn points(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    pub fn options(&self) -> &BssnOptions {
        &self.opts
    }

    pub fn fields(&self) -> &BssnFields {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut BssnFields {
        &mut self.fields
    }

    pub fn sources(&self) -> &SourceSlots {
        &self.sources
    }

    pub fn sources_mut(&mut self) -> &mut SourceSlots {
        &mut self.sources
    }

    /// Simultaneous read access to the fields and write access to the
    /// source slots, for the matter aggregation pass.
    pub fn split_sources_mut(&mut self) -> (&BssnFields, &mut SourceSlots) {
        (&self.fields, &mut self.sources)
    }

    #[inline]
    fn decode(&self, idx: usize) -> (usize, usize, usize) {
        let k = idx % self.nz;
        let j = (idx / self.nz) % self.ny;
        let i = idx / (self.ny * self.nz);
        (i, j, k)
    }

    // ---- bank orchestration ---------------------------------------------

    /// `a <- p`, `f <- 0` on every register.
    pub fn step_init(&mut self) {
        for f in FieldId::ALL {
            self.fields.register_mut(f).step_init();
        }
    }

    /// Finalize the given stage on every register (swaps `a <-> c`).
    pub fn rk_finalize(&mut self, stage: RkStage) {
        for f in FieldId::ALL {
            self.fields.register_mut(f).finalize(stage);
        }
    }

    /// Commit the step: `p <-> f` on every register.
    pub fn step_term(&mut self) {
        for f in FieldId::ALL {
            self.fields.register_mut(f).step_term();
        }
    }

    /// Zero the source slots (before re-aggregation).
    pub fn clear_sources(&mut self) {
        self.sources.clear();
    }

    // ---- stage sweep ------------------------------------------------------

    /// Parallel grid sweep: assemble the work record at every cell from the
    /// `a` banks and write the evolution RHS into the `c` banks.
    pub fn evolve_stage(&mut self, frw: &FrwRef) {
        let (ny, nz) = (self.ny, self.nz);
        {
            let fields = &self.fields;
            let sources = &self.sources;
            let opts = &self.opts;
            let frw = *frw;
            self.rhs_ws
                .par_iter_mut()
                .enumerate()
                .for_each(|(idx, out)| {
                    let k = idx % nz;
                    let j = (idx / nz) % ny;
                    let i = idx / (ny * nz);
                    let pd = point::assemble(fields, Some(sources), opts, &frw, i, j, k);
                    *out = evolve::rhs(&pd, opts);
                });
        }
        // Scatter the workspace into the per-field `c` banks.
        for f in FieldId::ALL {
            let ws = &self.rhs_ws;
            Zip::indexed(self.fields.regs[f.index()].c.view_mut()).par_for_each(
                |(i, j, k), c| {
                    *c = ws[(i * ny + j) * nz + k][f.index()];
                },
            );
        }
    }

    // ---- diagnostics ------------------------------------------------------

    /// NaN count across the committed (`p`) banks of every field.
    pub fn nan_count(&self) -> usize {
        FieldId::ALL
            .iter()
            .map(|f| self.fields.p(*f).nan_count())
            .sum()
    }

    /// Hamiltonian and momentum constraint statistics over the grid,
    /// evaluated from the `a` banks (call after `step_init`).
    pub fn constraint_stats(&self, frw: &FrwRef) -> (ConstraintStats, ConstraintStats) {
        let dx = self.opts.dx;
        let (h_acc, m_acc) = (0..self.points())
            .into_par_iter()
            .map(|idx| {
                let (i, j, k) = self.decode(idx);
                let pd = point::assemble(
                    &self.fields,
                    Some(&self.sources),
                    &self.opts,
                    frw,
                    i,
                    j,
                    k,
                );
                let (h, h_scale) = constraint::hamiltonian(&pd);
                let (m, m_scale) = constraint::momentum(&self.fields, &pd, dx);
                let mut ha = StatsAccum::default();
                ha.push(h, h_scale);
                let mut ma = StatsAccum::default();
                for d in 0..3 {
                    ma.push(m[d], m_scale[d]);
                }
                (ha, ma)
            })
            .reduce(
                || (StatsAccum::default(), StatsAccum::default()),
                |(a1, a2), (b1, b2)| (a1.merge(b1), a2.merge(b2)),
            );
        (h_acc.finish(), m_acc.finish())
    }
}

// =============================================================================
// Tests
// =============================================================================
