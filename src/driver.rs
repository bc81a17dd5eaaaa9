//! Simulation driver: wiring, the step loop, and diagnostics cadence.
//!
//! One step:
//!
//! 1. `step_init` every register (BSSN, matter with evolved state, FRW);
//!    clear and re-aggregate the matter sources.
//! 2. At the diagnostic interval: constraint statistics, field statistics,
//!    strips/slices/snapshots, power spectra, progress, NaN abort.
//! 3. Four RK stages, each: parallel BSSN RHS sweep, matter RHS sweeps,
//!    FRW stage, finalize every register in lockstep, re-aggregate sources
//!    from the intermediate state.
//! 4. `step_term` commits the step.
//!
//! All allocation happens in [`Simulation::from_config`]; the loop itself
//! allocates nothing.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::bssn::fields::FieldId;
use crate::bssn::{Bssn, BssnOptions};
use crate::config::{ConfigFile, RunConfig};
use crate::error::{Result, SimError};
use crate::fourier::Fourier;
use crate::ics;
use crate::output::visualization::{render_constraint_history, ConstraintSample};
use crate::output::{export, IoContext};
use crate::physics::{Dust, Lambda, MatterComponent, ScalarField};
use crate::solver::{FrwIntegrator, FrwRef, RkStage};

#[derive(Debug, Default)]
struct Timers {
    init: Duration,
    rk: Duration,
    output: Duration,
}

/// A fully wired simulation run.
pub struct Simulation {
    cfg: RunConfig,
    io: IoContext,
    bssn: Bssn,
    matter: Vec<Box<dyn MatterComponent>>,
    frw: FrwIntegrator,
    fourier: Fourier,
    history: Vec<ConstraintSample>,
    timers: Timers,
}

impl Simulation {
    /// Parse the config file, allocate every buffer, and set initial data.
    pub fn from_config(config_path: &Path) -> Result<Self> {
        let file = ConfigFile::parse(config_path)?;
        let cfg = RunConfig::from_file(&file)?;

        if cfg.num_threads > 0 {
            // A pool may already exist (tests, repeated construction); the
            // run proceeds with whatever pool is in place.
            let _ = rayon::ThreadPoolBuilder::new()
                .num_threads(cfg.num_threads)
                .build_global();
        }

        let mut io = IoContext::new(&cfg.output_dir)?;
        io.config_backup(config_path);
        io.log(&format!(
            "Grid {}x{}x{}  dx = {}  dt = {}  steps = {}",
            cfg.nx, cfg.ny, cfg.nz, cfg.dx, cfg.dt, cfg.steps
        ));

        let t0 = Instant::now();
        let opts = BssnOptions::from_run(&cfg)?;
        let mut bssn = Bssn::new(cfg.nx, cfg.ny, cfg.nz, cfg.dt, opts);
        let mut dust = Dust::new(cfg.nx, cfg.ny, cfg.nz);
        let mut frw = FrwIntegrator::new(cfg.dt, 0.0, 0.0);
        let mut fourier = Fourier::new(cfg.nx, cfg.ny, cfg.nz);

        io.log("Creating initial conditions...");
        ics::apply(&mut bssn, &mut dust, &mut frw, &mut fourier, &cfg, &mut io)?;

        let mut matter: Vec<Box<dyn MatterComponent>> = vec![Box::new(dust)];
        if cfg.lambda != 0.0 {
            io.log(&format!("Adding cosmological constant: {:e}", cfg.lambda));
            matter.push(Box::new(Lambda::new(cfg.lambda)));
        }
        if cfg.use_scalar {
            io.log("Adding scalar field sector");
            matter.push(Box::new(ScalarField::new(
                cfg.nx,
                cfg.ny,
                cfg.nz,
                cfg.dt,
                opts,
                cfg.scalar_mass,
                cfg.scalar_v0,
            )?));
        }

        let mut timers = Timers::default();
        timers.init = t0.elapsed();

        let history = Vec::with_capacity(cfg.steps / cfg.meta_output_interval + 1);
        Ok(Self {
            cfg,
            io,
            bssn,
            matter,
            frw,
            fourier,
            history,
            timers,
        })
    }

    fn frw_ref(&self) -> FrwRef {
        if self.bssn.options().use_reference_frw {
            self.frw.stage_state()
        } else {
            FrwRef::default()
        }
    }

    fn aggregate_sources(&mut self) {
        let fr = self.frw_ref();
        let (fields, src) = self.bssn.split_sources_mut();
        src.clear();
        for m in self.matter.iter_mut() {
            m.add_bssn_source(fields, src, &fr);
        }
    }

    /// Run the configured number of steps.
    pub fn run(&mut self) -> Result<()> {
        self.io.log("Running simulation...");
        let steps = self.cfg.steps;

        for s in 0..steps {
            // Stage input state and fresh sources for this step.
            self.bssn.step_init();
            for m in self.matter.iter_mut() {
                m.step_init();
            }
            self.frw.step_init();
            self.aggregate_sources();

            if s % self.cfg.meta_output_interval == 0 {
                let t0 = Instant::now();
                self.diagnostics(s)?;
                self.timers.output += t0.elapsed();
            }

            let t0 = Instant::now();
            for stage in RkStage::ALL {
                let fr = self.frw_ref();
                self.bssn.evolve_stage(&fr);
                for m in self.matter.iter_mut() {
                    m.evolve_stage(self.bssn.fields(), &fr);
                }
                self.frw.evolve_stage();

                self.bssn.rk_finalize(stage);
                for m in self.matter.iter_mut() {
                    m.rk_finalize(stage);
                }
                self.frw.finalize(stage);

                // The next stage reads the intermediate state; rebuild the
                // sources from it. After the fourth stage the step is about
                // to be committed instead.
                if stage != RkStage::Four {
                    self.aggregate_sources();
                }
            }
            self.bssn.step_term();
            for m in self.matter.iter_mut() {
                m.step_term();
            }
            self.frw.step_term();
            self.timers.rk += t0.elapsed();
        }

        self.finish(steps)
    }

    /// Per-interval diagnostics; aborts the run on NaN.
    fn diagnostics(&mut self, s: usize) -> Result<()> {
        self.io.show_progress(s, self.cfg.steps);

        let fr = self.frw_ref();
        let (h, m) = self.bssn.constraint_stats(&fr);
        self.history.push(ConstraintSample {
            step: s,
            h_mean_norm: h.mean_norm,
            m_mean_norm: m.mean_norm,
        });
        self.dump(
            "H_violations.dat",
            &[h.mean, h.stdev, h.max, h.mean_norm, h.max_norm],
        );
        self.dump(
            "M_violations.dat",
            &[m.mean, m.stdev, m.max, m.mean_norm, m.max_norm],
        );

        for (f, stream) in [
            (FieldId::Phi, "phi_stats.dat"),
            (FieldId::K, "K_stats.dat"),
            (FieldId::Gamma11, "g11_violations.dat"),
        ] {
            let res = export::dump_field_stats(&self.io, self.bssn.fields().p(f), stream);
            if let Err(e) = res {
                self.io.log(&format!("warning: stats dump {stream}: {e}"));
            }
        }

        if s % self.cfg.slice_output_interval == 0 {
            let res = export::dump_strip(
                &self.io,
                self.bssn.fields().p(FieldId::Phi),
                "phi_strip.dat",
                0,
                0,
                0,
            );
            if let Err(e) = res {
                self.io.log(&format!("warning: strip dump: {e}"));
            }
            let res =
                export::dump_slice(&self.io, self.bssn.fields().p(FieldId::Phi), "phi_slice.dat");
            if let Err(e) = res {
                self.io.log(&format!("warning: slice dump: {e}"));
            }
            for (f, name) in [(FieldId::Phi, "phi"), (FieldId::K, "K")] {
                let file = format!("{name}_{s:06}.dat");
                let res = export::dump_snapshot(&self.io, self.bssn.fields().p(f), &file);
                if let Err(e) = res {
                    self.io.log(&format!("warning: snapshot dump {file}: {e}"));
                }
            }
        }

        if s % self.cfg.spec_output_interval == 0 {
            let bins = self
                .fourier
                .power_spectrum(self.bssn.fields().p(FieldId::Phi));
            let res = export::dump_spectrum(&self.io, "phi_spec.dat", s, &bins);
            if let Err(e) = res {
                self.io.log(&format!("warning: spectrum dump: {e}"));
            }
        }

        // Component-internal consistency monitors.
        for idx in 0..self.matter.len() {
            let monitor = self.matter[idx].constraint_max();
            if let Some(v) = monitor {
                self.dump("scalar_constraint.dat", &[s as f64, v]);
            }
        }

        // Reference-background comparison: grid means against the
        // homogeneous integrator.
        let frw_state = self.frw.state();
        let phi_mean = self.bssn.fields().p(FieldId::Phi).mean();
        let k_mean = self.bssn.fields().p(FieldId::K).mean();
        self.dump(
            "frw_comparison.dat",
            &[s as f64, phi_mean, frw_state.phi, k_mean, frw_state.k],
        );

        let nans = self.bssn.nan_count()
            + self.matter.iter().map(|m| m.nan_count()).sum::<usize>();
        if nans > 0 {
            self.io
                .log(&format!("\nNaN detected at step {s} ({nans} entries)"));
            // Everything written so far is already on disk (streams are
            // opened per write); finish the chart before dying.
            self.render_chart();
            return Err(SimError::NumericalBlowup { step: s });
        }
        Ok(())
    }

    fn dump(&mut self, name: &str, values: &[f64]) {
        if let Err(e) = export::dump_values(&self.io, name, values) {
            self.io.log(&format!("warning: dump {name}: {e}"));
        }
    }

    fn render_chart(&mut self) {
        let path = self.io.dir().join("constraints.png");
        if let Err(e) = render_constraint_history(&path, &self.history) {
            self.io.log(&format!("warning: constraint chart: {e}"));
        }
    }

    fn finish(&mut self, steps: usize) -> Result<()> {
        self.io.show_progress(steps, steps);
        println!();
        let mean_phi = self.bssn.fields().p(FieldId::Phi).mean();
        self.io
            .log(&format!("Average conformal factor reached {mean_phi:.6e}"));
        self.render_chart();
        self.io.log(&format!(
            "Timing: init {:.3?}, RK steps {:.3?}, output {:.3?}",
            self.timers.init, self.timers.rk, self.timers.output
        ));
        self.io.log("Ending simulation.");
        Ok(())
    }

    /// Committed mean of a field (post-run inspection).
    pub fn field_mean(&self, name: &str) -> Option<f64> {
        FieldId::from_name(name).map(|f| self.bssn.fields().p(f).mean())
    }

    /// Committed value of a field along the x-axis at `(j, k) = (0, 0)`.
    pub fn field_profile_x(&self, name: &str, i: usize) -> Option<f64> {
        FieldId::from_name(name).map(|f| self.bssn.fields().p(f).get(i, 0, 0))
    }

    /// The reference/diagnostic FRW state.
    pub fn frw_state(&self) -> FrwRef {
        self.frw.state()
    }
}
