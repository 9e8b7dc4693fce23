//! Backend-agnostic random access to matrix rows and columns.
//!
//! The smoother and the variance adjuster only ever pull whole rows or whole
//! columns into caller-owned buffers, so any storage that can fill a slice
//! satisfies [`MatrixAccessor`]: dense `ndarray` arrays and views (including
//! transposed views), compressed sparse matrices from `sprs`, or an
//! out-of-core reader implemented downstream.
use ndarray::{ArrayBase, Data, Ix2};
use sprs::CsMatBase;

/// Uniform row/column reads over an `f64` matrix.
///
/// Implementations must be `Sync` so a single backend can be shared by the
/// rayon workers that drive the outer loops.
pub trait MatrixAccessor: Sync {
    /// `(rows, cols)`
    fn dimensions(&self) -> (usize, usize);

    /// Fill `buffer` (length = cols) with row `row`.
    fn read_row(&self, row: usize, buffer: &mut [f64]);

    /// Fill `buffer` (length = rows) with column `col`.
    fn read_column(&self, col: usize, buffer: &mut [f64]);

    fn nrows(&self) -> usize {
        self.dimensions().0
    }

    fn ncols(&self) -> usize {
        self.dimensions().1
    }
}

impl<S> MatrixAccessor for ArrayBase<S, Ix2>
where
    S: Data<Elem = f64> + Sync,
{
    fn dimensions(&self) -> (usize, usize) {
        self.dim()
    }

    fn read_row(&self, row: usize, buffer: &mut [f64]) {
        for (b, v) in buffer.iter_mut().zip(self.row(row)) {
            *b = *v;
        }
    }

    fn read_column(&self, col: usize, buffer: &mut [f64]) {
        for (b, v) in buffer.iter_mut().zip(self.column(col)) {
            *b = *v;
        }
    }
}

impl<IptrS, IndS, DataS> MatrixAccessor for CsMatBase<f64, usize, IptrS, IndS, DataS, usize>
where
    IptrS: std::ops::Deref<Target = [usize]> + Sync,
    IndS: std::ops::Deref<Target = [usize]> + Sync,
    DataS: std::ops::Deref<Target = [f64]> + Sync,
{
    fn dimensions(&self) -> (usize, usize) {
        (self.rows(), self.cols())
    }

    fn read_row(&self, row: usize, buffer: &mut [f64]) {
        read_sparse_lane(self, row, self.is_csr(), buffer);
    }

    fn read_column(&self, col: usize, buffer: &mut [f64]) {
        read_sparse_lane(self, col, self.is_csc(), buffer);
    }
}

/// Densify one row or column of a compressed matrix into `buffer`.
///
/// When the requested lane matches the storage orientation the stored outer
/// vector is scattered directly; otherwise every outer vector is probed.
fn read_sparse_lane<IptrS, IndS, DataS>(
    mat: &CsMatBase<f64, usize, IptrS, IndS, DataS, usize>,
    lane: usize,
    is_outer: bool,
    buffer: &mut [f64],
) where
    IptrS: std::ops::Deref<Target = [usize]>,
    IndS: std::ops::Deref<Target = [usize]>,
    DataS: std::ops::Deref<Target = [f64]>,
{
    buffer.iter_mut().for_each(|b| *b = 0.0);

    if is_outer {
        if let Some(vec) = mat.outer_view(lane) {
            for (idx, &val) in vec.iter() {
                buffer[idx] = val;
            }
        }
    } else {
        for (outer, vec) in mat.outer_iterator().enumerate() {
            if let Some(&val) = vec.get(lane) {
                buffer[outer] = val;
            }
        }
    }
}
