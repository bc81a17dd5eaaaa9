//! Helper functions for integration tests.

use std::io::Write;
use std::path::PathBuf;

/// Compute relative error: |actual - expected| / |expected|.
pub fn relative_error(actual: f64, expected: f64) -> f64 {
    if expected.abs() < 1e-10 {
        (actual - expected).abs()
    } else {
        (actual - expected).abs() / expected.abs()
    }
}

/// Matter-dominated closed form: with `K0 = -sqrt(24 pi rho0)`,
/// `K(t) = K0 / (1 - K0 t / 2)`.
pub fn eds_k(k0: f64, t: f64) -> f64 {
    k0 / (1.0 - k0 * t / 2.0)
}

/// Write a config file into `dir` and return its path. The grid and
/// stepping block is filled in; `extra` appends preset-specific keys.
pub fn write_config(
    dir: &std::path::Path,
    n: usize,
    dx: f64,
    dt: f64,
    steps: usize,
    extra: &str,
) -> PathBuf {
    let path = dir.join("config.txt");
    let out = dir.join("out");
    let mut f = std::fs::File::create(&path).unwrap();
    write!(
        f,
        "steps = {steps}\n\
         NX = {n}\nNY = {n}\nNZ = {n}\n\
         dx = {dx}\ndt = {dt}\n\
         output_dir = {}\n\
         meta_output_interval = 1\n\
         {extra}",
        out.display()
    )
    .unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_error() {
        assert!((relative_error(1.0, 1.0) - 0.0).abs() < 1e-10);
        assert!((relative_error(1.1, 1.0) - 0.1).abs() < 1e-10);
        assert!((relative_error(0.9, 1.0) - 0.1).abs() < 1e-10);
    }

    #[test]
    fn test_eds_closed_form_at_t_zero() {
        assert_eq!(eds_k(-3.0, 0.0), -3.0);
    }
}
