//! Error taxonomy for the simulation crate.
//!
//! All fatal conditions funnel into [`SimError`]; the binary reports the
//! message and exits non-zero. Diagnostic-output write failures are *not*
//! routed through here as fatal errors — the driver logs them and keeps
//! stepping, since losing a dump is preferable to losing the run.

use std::path::PathBuf;

use thiserror::Error;

/// Possible failure modes of a simulation run.
///
/// The variants mirror the points where a run can die:
/// before allocation (configuration), at component construction
/// (feature mismatch), before the loop (initial conditions), or
/// inside the loop (numerical blowup).
#[derive(Debug, Error)]
pub enum SimError {
    /// Missing config file, unparseable value, or unknown selector.
    #[error("configuration error: {0}")]
    Config(String),

    /// Incompatible feature combination detected at component construction,
    /// e.g. the scalar sector without an evolved shift.
    #[error("feature mismatch: {0}")]
    FeatureMismatch(String),

    /// Initial data failed a sanity check (negative density, NaN) before
    /// the evolution loop was entered.
    #[error("initial condition failure: {0}")]
    InitialConditions(String),

    /// A NaN appeared in a primary field at a diagnostic boundary.
    /// State accumulated up to `step` has been flushed to disk.
    #[error("numerical blowup: NaN detected at step {step}")]
    NumericalBlowup { step: usize },

    /// Filesystem error while setting up the output directory or log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The output directory could not be created or written to.
    #[error("cannot use output path {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_actionable() {
        let e = SimError::Config("missing key `steps`".to_string());
        assert!(e.to_string().contains("steps"));

        let e = SimError::NumericalBlowup { step: 42 };
        assert!(e.to_string().contains("42"));
    }

    #[test]
    fn io_errors_convert() {
        fn fails() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        assert!(matches!(fails(), Err(SimError::Io(_))));
    }
}
