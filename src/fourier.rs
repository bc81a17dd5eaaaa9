//! 3D Fourier transforms and binned power spectra.
//!
//! A thin wrapper over `rustfft`, planned once per grid shape at
//! initialization. The transform is complex-to-complex applied axis by
//! axis; the only contract the core relies on is `inverse(forward(x)) ~ x`
//! (the inverse carries the `1/N` normalization). Used for random-field
//! initial conditions and diagnostic power-spectrum dumps, never inside
//! the stepping loop.

use std::sync::Arc;

use num_complex::Complex64;
use rustfft::{Fft, FftPlanner};

use crate::grid::GridArray;

/// FFT plans and the mode buffer for one grid shape.
pub struct Fourier {
    nx: usize,
    ny: usize,
    nz: usize,
    forward: [Arc<dyn Fft<f64>>; 3],
    inverse: [Arc<dyn Fft<f64>>; 3],
    /// Mode buffer in the same row-major layout as the grid.
    buf: Vec<Complex64>,
    /// Gather/scatter line for the strided axes.
    line: Vec<Complex64>,
}

impl Fourier {
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = [
            planner.plan_fft_forward(nx),
            planner.plan_fft_forward(ny),
            planner.plan_fft_forward(nz),
        ];
        let inverse = [
            planner.plan_fft_inverse(nx),
            planner.plan_fft_inverse(ny),
            planner.plan_fft_inverse(nz),
        ];
        Self {
            nx,
            ny,
            nz,
            forward,
            inverse,
            buf: vec![Complex64::default(); nx * ny * nz],
            line: vec![Complex64::default(); nx.max(ny).max(nz)],
        }
    }

    #[inline]
    fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (i * self.ny + j) * self.nz + k
    }

    /// Transform the buffer along one axis, gathering strided lines.
    fn transform_axis(&mut self, axis: usize, fwd: bool) {
        let (nx, ny, nz) = (self.nx, self.ny, self.nz);
        let plan = if fwd {
            Arc::clone(&self.forward[axis])
        } else {
            Arc::clone(&self.inverse[axis])
        };
        let n = [nx, ny, nz][axis];
        let (outer_a, outer_b) = match axis {
            0 => (ny, nz),
            1 => (nx, nz),
            _ => (nx, ny),
        };
        for a in 0..outer_a {
            for b in 0..outer_b {
                for t in 0..n {
                    let idx = match axis {
                        0 => self.index(t, a, b),
                        1 => self.index(a, t, b),
                        _ => self.index(a, b, t),
                    };
                    self.line[t] = self.buf[idx];
                }
                plan.process(&mut self.line[..n]);
                for t in 0..n {
                    let idx = match axis {
                        0 => self.index(t, a, b),
                        1 => self.index(a, t, b),
                        _ => self.index(a, b, t),
                    };
                    self.buf[idx] = self.line[t];
                }
            }
        }
    }

    /// Forward transform of a real field into the internal mode buffer.
    pub fn forward(&mut self, field: &GridArray) {
        for i in 0..self.nx {
            for j in 0..self.ny {
                for k in 0..self.nz {
                    let idx = (i * self.ny + j) * self.nz + k;
                    self.buf[idx] = Complex64::new(field.get(i, j, k), 0.0);
                }
            }
        }
        for axis in 0..3 {
            self.transform_axis(axis, true);
        }
    }

    /// Inverse transform of the mode buffer into a real field, applying
    /// the `1/N` normalization; imaginary residue is dropped.
    pub fn inverse(&mut self, field: &mut GridArray) {
        for axis in 0..3 {
            self.transform_axis(axis, false);
        }
        let norm = 1.0 / (self.nx * self.ny * self.nz) as f64;
        for i in 0..self.nx {
            for j in 0..self.ny {
                for k in 0..self.nz {
                    let idx = (i * self.ny + j) * self.nz + k;
                    field.set(i, j, k, self.buf[idx].re * norm);
                }
            }
        }
    }

    /// Visit every mode with its integer wavenumber magnitude.
    ///
    /// Wavenumbers follow the usual wraparound convention: index `i` maps
    /// to `i` below the Nyquist frequency and `i - n` above it. Applying a
    /// real-valued function of `|k|` preserves the Hermitian symmetry of a
    /// real field's spectrum.
    pub fn map_modes(&mut self, mut f: impl FnMut(f64, &mut Complex64)) {
        let (nx, ny, nz) = (self.nx, self.ny, self.nz);
        for i in 0..nx {
            let kx = wavenumber(i, nx);
            for j in 0..ny {
                let ky = wavenumber(j, ny);
                for k in 0..nz {
                    let kz = wavenumber(k, nz);
                    let mag = ((kx * kx + ky * ky + kz * kz) as f64).sqrt();
                    let idx = (i * ny + j) * nz + k;
                    f(mag, &mut self.buf[idx]);
                }
            }
        }
    }

    /// Forward transform and bin `|f_k|^2` by integer wavenumber.
    ///
    /// Returns `(bin, mean amplitude)` pairs up to the largest resolved
    /// bin; amplitudes carry the `1/N^2` normalization so Parseval holds
    /// against the mean-square of the field.
    pub fn power_spectrum(&mut self, field: &GridArray) -> Vec<(usize, f64)> {
        self.forward(field);
        let n = (self.nx * self.ny * self.nz) as f64;
        let max_bin = self.nx.max(self.ny).max(self.nz);
        let mut power = vec![0.0_f64; max_bin + 1];
        let mut count = vec![0usize; max_bin + 1];
        self.map_modes(|mag, c| {
            let bin = mag.round() as usize;
            if bin < power.len() {
                power[bin] += c.norm_sqr() / (n * n);
                count[bin] += 1;
            }
        });
        power
            .into_iter()
            .zip(count)
            .enumerate()
            .filter(|(_, (_, cnt))| *cnt > 0)
            .map(|(bin, (p, cnt))| (bin, p / cnt as f64))
            .collect()
    }
}

#[inline]
fn wavenumber(i: usize, n: usize) -> i64 {
    if i <= n / 2 {
        i as i64
    } else {
        i as i64 - n as i64
    }
}

// =============================================================================
// Tests
// =============================================================================
