//! Flat `key = value` configuration files.
//!
//! The on-disk format is deliberately primitive: one assignment per line,
//! `#` starts a comment, whitespace around keys and values is ignored.
//! Every recognized key except the grid/stepping block has a default, so a
//! minimal config looks like:
//!
//! ```text
//! steps      = 1000
//! NX         = 64
//! NY         = 64
//! NZ         = 64
//! dx         = 1.0
//! dt         = 0.1
//! output_dir = run_01
//! ICs        = conformal
//! ```
//!
//! Parsing happens once, before any allocation; a malformed value or an
//! unknown `ICs` selector aborts the run with a [`SimError::Config`].

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, SimError};

// =============================================================================
// Raw key/value store
// =============================================================================

/// String-keyed dictionary read from a config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    values: HashMap<String, String>,
    /// Path the file was read from, kept for the verbatim backup copy.
    pub path: PathBuf,
}

impl ConfigFile {
    /// Parse a config file from disk.
    pub fn parse(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SimError::Config(format!("cannot read config file {}: {e}", path.display()))
        })?;
        let mut values = HashMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| {
                SimError::Config(format!(
                    "{}:{}: expected `key = value`, got `{line}`",
                    path.display(),
                    lineno + 1
                ))
            })?;
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self {
            values,
            path: path.to_path_buf(),
        })
    }

    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Required typed value; missing or malformed keys are config errors.
    pub fn require<T: FromStr>(&self, key: &str) -> Result<T>
    where
        T::Err: fmt::Display,
    {
        let raw = self
            .get(key)
            .ok_or_else(|| SimError::Config(format!("missing required key `{key}`")))?;
        raw.parse()
            .map_err(|e| SimError::Config(format!("key `{key}`: cannot parse `{raw}`: {e}")))
    }

    /// Typed value with a default used when the key is absent.
    pub fn get_or<T: FromStr>(&self, key: &str, default: T) -> Result<T>
    where
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e| SimError::Config(format!("key `{key}`: cannot parse `{raw}`: {e}"))),
        }
    }

    /// Boolean flags are written as `0`/`1` (or `true`/`false`).
    pub fn get_flag(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            None => Ok(default),
            Some("0") | Some("false") => Ok(false),
            Some("1") | Some("true") => Ok(true),
            Some(other) => Err(SimError::Config(format!(
                "key `{key}`: expected 0/1, got `{other}`"
            ))),
        }
    }
}

// =============================================================================
// Typed run configuration
// =============================================================================

/// Initial-condition preset selector (`ICs` key).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcKind {
    /// Conformally-flat Gaussian random field with dust.
    Conformal,
    /// Robust-stability preset: tiny random noise on every evolved field.
    ApplesStability,
    /// Traveling linear gravitational wave along x.
    ApplesLinwave,
    /// Spherical shell of fluctuations at a single angular scale.
    Sphere,
}

impl FromStr for IcKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "conformal" => Ok(IcKind::Conformal),
            "apples_stability" => Ok(IcKind::ApplesStability),
            "apples_linwave" => Ok(IcKind::ApplesLinwave),
            "sphere" => Ok(IcKind::Sphere),
            other => Err(format!(
                "unknown ICs selector `{other}` \
                 (expected conformal | apples_stability | apples_linwave | sphere)"
            )),
        }
    }
}

/// Lapse evolution choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LapseGauge {
    /// Synchronous gauge: the lapse stays at its initial value.
    #[default]
    Static,
    /// 1+log slicing, `d alpha / dt = -2 alpha K` plus shift advection.
    OnePlusLog,
}

impl FromStr for LapseGauge {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "static" => Ok(LapseGauge::Static),
            "onepluslog" => Ok(LapseGauge::OnePlusLog),
            other => Err(format!(
                "unknown lapse gauge `{other}` (expected static | onepluslog)"
            )),
        }
    }
}

/// Fully-typed run parameters, resolved from a [`ConfigFile`].
///
/// Constructed once at startup and passed by reference into the components
/// that need it; nothing on the hot path reads configuration.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub steps: usize,
    pub num_threads: usize,
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    pub dx: f64,
    pub dt: f64,
    pub output_dir: PathBuf,
    pub ics: IcKind,

    // Diagnostic cadence (in steps).
    pub meta_output_interval: usize,
    pub slice_output_interval: usize,
    pub spec_output_interval: usize,

    // Initial-condition parameters.
    pub peak_k: f64,
    pub peak_amplitude: f64,
    pub ic_seed: u64,
    pub rho_k_matter: f64,
    pub shell_amplitude: f64,
    pub shell_angular_scale_l: usize,
    pub stability_amplitude: f64,
    pub linwave_amplitude: f64,

    // Optional sectors.
    pub lambda: f64,
    pub use_bssn_shift: bool,
    pub use_z4c: bool,
    pub use_reference_frw: bool,
    pub use_scalar: bool,
    pub lapse: LapseGauge,
    pub gd_eta: f64,
    pub z4c_k1: f64,
    pub z4c_k2: f64,
    pub scalar_mass: f64,
    pub scalar_v0: f64,
}

impl RunConfig {
    /// Resolve every recognized key, applying defaults.
    pub fn from_file(cfg: &ConfigFile) -> Result<Self> {
        let run = Self {
            steps: cfg.require("steps")?,
            num_threads: cfg.get_or("omp_num_threads", 0)?,
            nx: cfg.require("NX")?,
            ny: cfg.require("NY")?,
            nz: cfg.require("NZ")?,
            dx: cfg.require("dx")?,
            dt: cfg.require("dt")?,
            output_dir: PathBuf::from(
                cfg.get("output_dir")
                    .ok_or_else(|| SimError::Config("missing required key `output_dir`".into()))?,
            ),
            ics: cfg.get_or("ICs", IcKind::Conformal)?,
            meta_output_interval: cfg.get_or("meta_output_interval", 10)?,
            slice_output_interval: cfg.get_or("slice_output_interval", 100)?,
            spec_output_interval: cfg.get_or("spec_output_interval", 100)?,
            peak_k: cfg.get_or("peak_k", 6.0)?,
            peak_amplitude: cfg.get_or("peak_amplitude", 1e-5)?,
            ic_seed: cfg.get_or("ic_seed", 7)?,
            rho_k_matter: cfg.get_or("rho_K_matter", 3.0 / (8.0 * std::f64::consts::PI))?,
            shell_amplitude: cfg.get_or("shell_amplitude", 1e-5)?,
            shell_angular_scale_l: cfg.get_or("shell_angular_scale_l", 1)?,
            stability_amplitude: cfg.get_or("stability_amplitude", 1e-10)?,
            linwave_amplitude: cfg.get_or("linwave_amplitude", 1e-8)?,
            lambda: cfg.get_or("lambda", 0.0)?,
            use_bssn_shift: cfg.get_flag("use_bssn_shift", false)?,
            use_z4c: cfg.get_flag("use_z4c", false)?,
            use_reference_frw: cfg.get_flag("use_reference_frw", false)?,
            use_scalar: cfg.get_flag("use_scalar", false)?,
            lapse: cfg.get_or("lapse", LapseGauge::Static)?,
            gd_eta: cfg.get_or("gd_eta", 2.0)?,
            z4c_k1: cfg.get_or("z4c_k1", 0.1)?,
            z4c_k2: cfg.get_or("z4c_k2", 0.0)?,
            scalar_mass: cfg.get_or("scalar_mass", 0.0)?,
            scalar_v0: cfg.get_or("scalar_V0", 0.0)?,
        };
        run.validate()?;
        Ok(run)
    }

    fn validate(&self) -> Result<()> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(SimError::Config("grid extents must be positive".into()));
        }
        if self.dx <= 0.0 || self.dt <= 0.0 {
            return Err(SimError::Config("dx and dt must be positive".into()));
        }
        if self.meta_output_interval == 0 {
            return Err(SimError::Config("meta_output_interval must be >= 1".into()));
        }
        Ok(())
    }

    /// Total number of lattice points.
    pub fn points(&self) -> usize {
        self.nx * self.ny * self.nz
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    const MINIMAL: &str = "
        steps = 10
        NX = 8
        NY = 8
        NZ = 8
        dx = 1.0
        dt = 0.1
        output_dir = out
    ";

    #[test]
    fn parses_minimal_config_with_defaults() {
        let f = write_config(MINIMAL);
        let cfg = ConfigFile::parse(f.path()).unwrap();
        let run = RunConfig::from_file(&cfg).unwrap();

        assert_eq!(run.steps, 10);
        assert_eq!((run.nx, run.ny, run.nz), (8, 8, 8));
        assert_eq!(run.ics, IcKind::Conformal);
        assert_eq!(run.meta_output_interval, 10);
        assert!(!run.use_bssn_shift);
        assert_eq!(run.lapse, LapseGauge::Static);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let f = write_config("# header\n\nsteps = 3 # trailing\nNX=4\nNY=4\nNZ=4\ndx=1\ndt=0.1\noutput_dir=o\n");
        let cfg = ConfigFile::parse(f.path()).unwrap();
        assert_eq!(cfg.get("steps"), Some("3"));
        let run = RunConfig::from_file(&cfg).unwrap();
        assert_eq!(run.steps, 3);
    }

    #[test]
    fn unknown_ic_selector_is_a_config_error() {
        let f = write_config(&format!("{MINIMAL}\nICs = wormhole\n"));
        let cfg = ConfigFile::parse(f.path()).unwrap();
        let err = RunConfig::from_file(&cfg).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
        assert!(err.to_string().contains("wormhole"));
    }

    #[test]
    fn missing_required_key_is_reported_by_name() {
        let f = write_config("steps = 10\n");
        let cfg = ConfigFile::parse(f.path()).unwrap();
        let err = RunConfig::from_file(&cfg).unwrap_err();
        assert!(err.to_string().contains("NX"));
    }

    #[test]
    fn malformed_line_points_at_line_number() {
        let f = write_config("steps 10\n");
        let err = ConfigFile::parse(f.path()).unwrap_err();
        assert!(err.to_string().contains(":1:"));
    }

    #[test]
    fn missing_file_is_a_config_error_not_a_panic() {
        let err = ConfigFile::parse(Path::new("/nonexistent/config.txt")).unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }
}
