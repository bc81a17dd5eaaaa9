//! Plain-text exports: value streams, strips, slices, snapshots, spectra.
//!
//! # Produced format
//!
//! Everything is whitespace-delimited floating point in scientific
//! notation, directly loadable with `numpy.loadtxt` and friends:
//!
//! - **streams** append one whitespace-joined row per call
//!   (`H_violations.dat` gets `mean stdev max mean_norm max_norm`),
//! - **strips** append one row per call holding a 1D line of a field,
//! - **slices** write the mid-plane of a field, one `j`-row per line,
//! - **snapshots** write a full field, one `(i, j)`-line per row with `k`
//!   varying fastest (the linear index order),
//! - **spectra** append `step bin amplitude` rows.
//!
//! File names derive from the field identifier, which plays the role the
//! dataset name would in a binary container.

use std::io::Write;

use crate::grid::GridArray;
use crate::output::IoContext;

/// Append one row of values to a named stream.
pub fn dump_values(io: &IoContext, name: &str, values: &[f64]) -> std::io::Result<()> {
    let mut w = io.append_stream(name)?;
    let mut first = true;
    for v in values {
        if !first {
            write!(w, " ")?;
        }
        write!(w, "{v:.12e}")?;
        first = false;
    }
    writeln!(w)?;
    Ok(())
}

/// Append a 1D strip of `field` along `axis` through `(n1, n2)`.
///
/// `n1`/`n2` are the fixed indices of the two remaining axes in cyclic
/// order (axis 0 fixes `(j, k)`, axis 1 fixes `(k, i)`, axis 2 fixes
/// `(i, j)`).
pub fn dump_strip(
    io: &IoContext,
    field: &GridArray,
    name: &str,
    axis: usize,
    n1: usize,
    n2: usize,
) -> std::io::Result<()> {
    let (nx, ny, nz) = field.shape();
    let n = [nx, ny, nz][axis];
    let mut w = io.append_stream(name)?;
    for t in 0..n {
        let v = match axis {
            0 => field.get(t, n1, n2),
            1 => field.get(n2, t, n1),
            _ => field.get(n1, n2, t),
        };
        if t > 0 {
            write!(w, " ")?;
        }
        write!(w, "{v:.12e}")?;
    }
    writeln!(w)?;
    Ok(())
}

/// Write the `k = nz/2` plane of a field, one `i`-row per line.
pub fn dump_slice(io: &IoContext, field: &GridArray, name: &str) -> std::io::Result<()> {
    let (nx, ny, nz) = field.shape();
    let kmid = nz / 2;
    let mut w = io.create_file(name)?;
    for i in 0..nx {
        for j in 0..ny {
            if j > 0 {
                write!(w, " ")?;
            }
            write!(w, "{:.12e}", field.get(i, j, kmid))?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Write a full 3D snapshot: one line per `(i, j)` with `k` fastest.
pub fn dump_snapshot(io: &IoContext, field: &GridArray, name: &str) -> std::io::Result<()> {
    let (nx, ny, nz) = field.shape();
    let mut w = io.create_file(name)?;
    for i in 0..nx {
        for j in 0..ny {
            for k in 0..nz {
                if k > 0 {
                    write!(w, " ")?;
                }
                write!(w, "{:.12e}", field.get(i, j, k))?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

/// Append a binned power spectrum as `step bin amplitude` rows.
pub fn dump_spectrum(
    io: &IoContext,
    name: &str,
    step: usize,
    bins: &[(usize, f64)],
) -> std::io::Result<()> {
    let mut w = io.append_stream(name)?;
    for (bin, amp) in bins {
        writeln!(w, "{step} {bin} {amp:.12e}")?;
    }
    Ok(())
}

/// Append the standard statistics row of one field: mean, stdev, min, max.
pub fn dump_field_stats(io: &IoContext, field: &GridArray, name: &str) -> std::io::Result<()> {
    dump_values(
        io,
        name,
        &[field.mean(), field.stdev(), field.min(), field.max()],
    )
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(nx: usize, ny: usize, nz: usize) -> GridArray {
        let mut f = GridArray::zeros("f", nx, ny, nz);
        for i in 0..nx {
            for j in 0..ny {
                for k in 0..nz {
                    f.set(i, j, k, (i * 100 + j * 10 + k) as f64);
                }
            }
        }
        f
    }

    #[test]
    fn value_stream_appends_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let io = IoContext::new(tmp.path()).unwrap();
        dump_values(&io, "H_violations.dat", &[1.0, 2.0, 3.0]).unwrap();
        dump_values(&io, "H_violations.dat", &[4.0, 5.0, 6.0]).unwrap();
        let text = std::fs::read_to_string(tmp.path().join("H_violations.dat")).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].split_whitespace().count() == 3);
        let v: f64 = rows[1].split_whitespace().next().unwrap().parse().unwrap();
        assert_eq!(v, 4.0);
    }

    #[test]
    fn strip_follows_the_requested_axis() {
        let tmp = tempfile::tempdir().unwrap();
        let io = IoContext::new(tmp.path()).unwrap();
        let f = ramp(4, 3, 2);
        dump_strip(&io, &f, "phi_strip.dat", 0, 1, 1).unwrap();
        let text = std::fs::read_to_string(tmp.path().join("phi_strip.dat")).unwrap();
        let vals: Vec<f64> = text
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_eq!(vals, vec![11.0, 111.0, 211.0, 311.0]);
    }

    #[test]
    fn slice_is_row_per_i() {
        let tmp = tempfile::tempdir().unwrap();
        let io = IoContext::new(tmp.path()).unwrap();
        let f = ramp(3, 2, 4);
        dump_slice(&io, &f, "phi_slice.dat").unwrap();
        let text = std::fs::read_to_string(tmp.path().join("phi_slice.dat")).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3);
        // k = 2 plane.
        let first: Vec<f64> = rows[0]
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_eq!(first, vec![2.0, 12.0]);
    }

    #[test]
    fn snapshot_round_trips_through_loadtxt_order() {
        let tmp = tempfile::tempdir().unwrap();
        let io = IoContext::new(tmp.path()).unwrap();
        let f = ramp(2, 2, 3);
        dump_snapshot(&io, &f, "phi_000.dat").unwrap();
        let text = std::fs::read_to_string(tmp.path().join("phi_000.dat")).unwrap();
        let vals: Vec<f64> = text
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_eq!(vals.len(), 12);
        // Linear index order: (i*ny + j)*nz + k.
        assert_eq!(vals[0], 0.0);
        assert_eq!(vals[3], 10.0);
        assert_eq!(vals[6], 100.0);
    }

    #[test]
    fn spectrum_rows_carry_the_step() {
        let tmp = tempfile::tempdir().unwrap();
        let io = IoContext::new(tmp.path()).unwrap();
        dump_spectrum(&io, "phi_spec.dat", 7, &[(0, 1.0), (1, 0.5)]).unwrap();
        let text = std::fs::read_to_string(tmp.path().join("phi_spec.dat")).unwrap();
        assert!(text.lines().all(|l| l.starts_with("7 ")));
    }
}
