//! Per-anchor mean correction vectors.
//!
//! Anchor identifiers are sample indices in the population being corrected, so
//! the averages are kept in a dense table indexed by identifier together with
//! the sorted list of identifiers that actually occurred. Identifiers that
//! never appear are absent rather than zero-filled, which keeps "no anchor
//! here" distinct from "anchor whose mean correction is zero".
use ndarray::{Array2, ArrayView1};

use crate::error::{CorrectionError, Result};
use crate::math::MatrixAccessor;

#[derive(Debug, Clone, PartialEq)]
pub struct AverageMap {
    /// Row `i` holds the mean vector of anchor `i` when `counts[i] > 0`.
    means: Array2<f64>,
    counts: Vec<usize>,
    /// Identifiers with at least one contributing row, ascending.
    anchors: Vec<usize>,
}

impl AverageMap {
    /// Average the rows of `vectors` (npairs x G) grouped by `index`.
    ///
    /// With `n_samples`, the table holds exactly that many identifiers and any
    /// id at or beyond it is rejected before allocation. Without it, the table
    /// is sized to `max(index) + 1`.
    pub fn build<M: MatrixAccessor + ?Sized>(
        vectors: &M,
        index: &[usize],
        n_samples: Option<usize>,
    ) -> Result<Self> {
        let (npairs, ngenes) = vectors.dimensions();
        if index.len() != npairs {
            return Err(CorrectionError::DimensionMismatch {
                what: "anchor index length vs correction vector rows",
                expected: npairs,
                got: index.len(),
            });
        }

        let capacity = match n_samples {
            Some(len) => {
                if let Some(&index) = index.iter().find(|&&i| i >= len) {
                    return Err(CorrectionError::IndexOutOfBounds {
                        what: "anchor",
                        index,
                        len,
                    });
                }
                len
            }
            None => match index.iter().max() {
                Some(&max) => max.checked_add(1).ok_or(CorrectionError::IndexOutOfBounds {
                    what: "anchor",
                    index: max,
                    len: usize::MAX,
                })?,
                None => 0,
            },
        };

        let mut means = Array2::<f64>::zeros((capacity, ngenes));
        let mut counts = vec![0usize; capacity];
        let mut currow = vec![0.0; ngenes];

        for (row, &anchor) in index.iter().enumerate() {
            vectors.read_row(row, &mut currow);
            for (t, v) in means.row_mut(anchor).iter_mut().zip(&currow) {
                *t += v;
            }
            counts[anchor] += 1;
        }

        let anchors: Vec<usize> = counts
            .iter()
            .enumerate()
            .filter(|&(_, &n)| n > 0)
            .map(|(i, _)| i)
            .collect();

        for &anchor in &anchors {
            let num = counts[anchor] as f64;
            means.row_mut(anchor).mapv_inplace(|t| t / num);
        }

        log::debug!(
            "Averaged {} correction vectors onto {} anchors ({} features)",
            npairs,
            anchors.len(),
            ngenes
        );

        Ok(Self {
            means,
            counts,
            anchors,
        })
    }

    /// Present anchor identifiers in ascending order.
    pub fn anchors(&self) -> &[usize] {
        &self.anchors
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Length of each mean vector (G).
    pub fn ngenes(&self) -> usize {
        self.means.ncols()
    }

    /// Number of identifier slots; every present anchor is below this.
    pub fn capacity(&self) -> usize {
        self.counts.len()
    }

    pub fn contains(&self, anchor: usize) -> bool {
        self.count(anchor) > 0
    }

    pub fn count(&self, anchor: usize) -> usize {
        self.counts.get(anchor).copied().unwrap_or(0)
    }

    pub fn mean(&self, anchor: usize) -> Option<ArrayView1<'_, f64>> {
        if self.contains(anchor) {
            Some(self.means.row(anchor))
        } else {
            None
        }
    }

    /// Row of the dense table; only meaningful for present anchors.
    pub(crate) fn row(&self, anchor: usize) -> ArrayView1<'_, f64> {
        self.means.row(anchor)
    }

    /// `(anchor, mean vector, count)` for every present anchor, ascending.
    pub fn iter(&self) -> impl Iterator<Item = (usize, ArrayView1<'_, f64>, usize)> + '_ {
        self.anchors
            .iter()
            .map(move |&a| (a, self.means.row(a), self.counts[a]))
    }
}
