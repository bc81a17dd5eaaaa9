//! Named lattice buffers with periodic indexing.

use ndarray::Array3;

/// A named, fixed-size 3D buffer over the simulation lattice.
///
/// # Periodic indexing
///
/// Reads through [`GridArray::get_wrapped`] accept any `isize` index and
/// wrap modulo the axis extent, so stencil code never special-cases the
/// boundary; there is no halo region. Writes go through the in-bounds
/// accessors or bulk operations.
///
/// # Swap semantics
///
/// [`GridArray::swap`] exchanges the backing storage of two same-shape
/// arrays in O(1) (a pointer move, no element copies). The RK register
/// banks rely on this to rotate state between stages at zero cost.
#[derive(Debug, Clone)]
pub struct GridArray {
    name: String,
    data: Array3<f64>,
}

impl GridArray {
    /// Allocate a zero-filled `(nx, ny, nz)` array.
    pub fn zeros(name: impl Into<String>, nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            name: name.into(),
            data: Array3::zeros((nx, ny, nz)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename (diagnostic labels only; storage is untouched).
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        let s = self.data.dim();
        (s.0, s.1, s.2)
    }

    pub fn points(&self) -> usize {
        self.data.len()
    }

    /// Linear index for `(i, j, k)` under the global row-major mapping.
    #[inline]
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        let (_, ny, nz) = self.shape();
        (i * ny + j) * nz + k
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f64 {
        self.data[[i, j, k]]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f64) {
        self.data[[i, j, k]] = value;
    }

    /// Read with periodic wrap on every axis. Out-of-range indices never
    /// fail; `-1` resolves to `n - 1` and `n` resolves to `0`.
    #[inline]
    pub fn get_wrapped(&self, i: isize, j: isize, k: isize) -> f64 {
        let (nx, ny, nz) = self.shape();
        let i = i.rem_euclid(nx as isize) as usize;
        let j = j.rem_euclid(ny as isize) as usize;
        let k = k.rem_euclid(nz as isize) as usize;
        self.data[[i, j, k]]
    }

    /// Read at `(i, j, k)` displaced by `d` cells along `axis`, wrapping.
    #[inline]
    pub fn offset(&self, i: usize, j: usize, k: usize, axis: usize, d: isize) -> f64 {
        let (mut ii, mut jj, mut kk) = (i as isize, j as isize, k as isize);
        match axis {
            0 => ii += d,
            1 => jj += d,
            _ => kk += d,
        }
        self.get_wrapped(ii, jj, kk)
    }

    /// O(1) exchange of backing storage with a same-shape array.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ; banks of one field always match.
    pub fn swap(&mut self, other: &mut GridArray) {
        assert_eq!(self.shape(), other.shape(), "swap requires equal shapes");
        std::mem::swap(&mut self.data, &mut other.data);
    }

    /// Overwrite every element with zero.
    pub fn fill_zero(&mut self) {
        self.data.fill(0.0);
    }

    /// Borrow the backing ndarray (bulk elementwise operations).
    pub fn view(&self) -> &Array3<f64> {
        &self.data
    }

    /// Mutably borrow the backing ndarray.
    pub fn view_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    // ======================================= Reductions =======================================

    /// Arithmetic mean over all points.
    pub fn mean(&self) -> f64 {
        self.data.sum() / self.points() as f64
    }

    /// Sample standard deviation over all points.
    pub fn stdev(&self) -> f64 {
        let n = self.points();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let ssq: f64 = self.data.iter().map(|v| (v - mean) * (v - mean)).sum();
        (ssq / (n - 1) as f64).sqrt()
    }

    /// Minimum value (NaNs are skipped).
    pub fn min(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .fold(f64::INFINITY, |m, v| if v < m { v } else { m })
    }

    /// Maximum value (NaNs are skipped).
    pub fn max(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, |m, v| if v > m { v } else { m })
    }

    /// Largest absolute value over all points.
    pub fn max_abs(&self) -> f64 {
        self.data
            .iter()
            .copied()
            .fold(0.0_f64, |m, v| if v.abs() > m { v.abs() } else { m })
    }

    /// Number of NaN entries.
    pub fn nan_count(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_zero_filled() {
        let a = GridArray::zeros("phi", 4, 3, 2);
        assert_eq!(a.shape(), (4, 3, 2));
        assert_eq!(a.points(), 24);
        assert_eq!(a.mean(), 0.0);
        assert_eq!(a.max_abs(), 0.0);
    }

    #[test]
    fn linear_index_is_row_major_k_fastest() {
        let a = GridArray::zeros("x", 4, 3, 2);
        assert_eq!(a.linear_index(0, 0, 0), 0);
        assert_eq!(a.linear_index(0, 0, 1), 1);
        assert_eq!(a.linear_index(0, 1, 0), 2);
        assert_eq!(a.linear_index(1, 0, 0), 6);
        assert_eq!(a.linear_index(3, 2, 1), 23);
    }

    #[test]
    fn periodic_wrap_resolves_negative_and_overflow() {
        let mut a = GridArray::zeros("x", 4, 4, 4);
        a.set(3, 0, 0, 7.0);
        a.set(0, 3, 2, -2.5);

        // -1 is the same cell as n-1 on every axis.
        assert_eq!(a.get_wrapped(-1, 0, 0), a.get(3, 0, 0));
        assert_eq!(a.get_wrapped(0, -1, 2), a.get(0, 3, 2));
        assert_eq!(a.get_wrapped(4, 0, 0), a.get(0, 0, 0));
        assert_eq!(a.get_wrapped(-5, 0, 0), a.get(3, 0, 0));
    }

    #[test]
    fn offset_moves_along_one_axis_only() {
        let mut a = GridArray::zeros("x", 4, 4, 4);
        a.set(1, 2, 3, 9.0);
        assert_eq!(a.offset(0, 2, 3, 0, 1), 9.0);
        assert_eq!(a.offset(1, 3, 3, 1, -1), 9.0);
        assert_eq!(a.offset(1, 2, 0, 2, -1), 9.0);
    }

    #[test]
    fn swap_exchanges_contents() {
        let mut a = GridArray::zeros("a", 2, 2, 2);
        let mut b = GridArray::zeros("b", 2, 2, 2);
        a.set(0, 0, 0, 1.0);
        b.set(0, 0, 0, 2.0);

        a.swap(&mut b);
        assert_eq!(a.get(0, 0, 0), 2.0);
        assert_eq!(b.get(0, 0, 0), 1.0);
        // Names stay with the handle, not the storage.
        assert_eq!(a.name(), "a");
    }

    #[test]
    fn reductions() {
        let mut a = GridArray::zeros("x", 1, 1, 4);
        for (k, v) in [1.0, 2.0, 3.0, 6.0].iter().enumerate() {
            a.set(0, 0, k, *v);
        }
        assert_eq!(a.mean(), 3.0);
        assert_eq!(a.min(), 1.0);
        assert_eq!(a.max(), 6.0);
        assert_eq!(a.max_abs(), 6.0);
        // Sample stdev of [1,2,3,6]: variance = (4+1+0+9)/3
        let expected = (14.0_f64 / 3.0).sqrt();
        assert!((a.stdev() - expected).abs() < 1e-14);
    }

    #[test]
    fn nan_count_and_nan_safe_extrema() {
        let mut a = GridArray::zeros("x", 1, 1, 3);
        a.set(0, 0, 0, f64::NAN);
        a.set(0, 0, 1, 5.0);
        a.set(0, 0, 2, -1.0);
        assert_eq!(a.nan_count(), 1);
        assert_eq!(a.min(), -1.0);
        assert_eq!(a.max(), 5.0);
    }
}
