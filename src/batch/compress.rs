use crate::defaults::NUM_GRADIENT_SLICES;
use crate::types::{centers_of, is_same_center};
use ndarray::prelude::*;

/// Subset of the AOs of a grid block that is relevant for one center/derivative
/// selection. Only the first `count()` rows of every slice are meaningful.
#[derive(Debug, Clone)]
pub struct CompressedAos {
    indices: Vec<usize>,
    values: Array3<f64>,
    n_slices: usize,
}

impl CompressedAos {
    pub fn new() -> Self {
        Self {
            indices: Vec::new(),
            values: Array3::zeros((NUM_GRADIENT_SLICES, 0, 0)),
            n_slices: 0,
        }
    }

    /// Make room for `num_aos` functions on a block of length `block_length`. Returns `true`
    /// if the value tensor had to be reallocated.
    pub fn reserve(&mut self, num_aos: usize, block_length: usize) -> bool {
        if self.values.dim() == (NUM_GRADIENT_SLICES, num_aos, block_length) {
            return false;
        }
        self.values = Array3::zeros((NUM_GRADIENT_SLICES, num_aos, block_length));
        self.indices.clear();
        self.n_slices = 0;
        true
    }

    /// Drop the selection but keep the allocation.
    pub fn clear(&mut self) {
        self.indices.clear();
        self.n_slices = 0;
    }

    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Original (uncompressed) AO indices, strictly ascending.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of slices that were filled by the last compression.
    pub fn n_slices(&self) -> usize {
        self.n_slices
    }

    pub fn block_length(&self) -> usize {
        self.values.dim().2
    }

    /// Compressed values of slice `islice` (value, d/dx, d/dy, d/dz), one row per AO.
    pub fn slice(&self, islice: usize) -> ArrayView2<f64> {
        self.values.slice(s![islice, ..self.count(), ..])
    }
}

impl Default for CompressedAos {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of slices that have to be compressed. The tau contribution reuses the three
/// derivative slices, so they are needed as soon as either the gradient or tau is used.
pub fn num_slices(use_gradient: bool, use_tau: bool) -> usize {
    if use_gradient || use_tau {
        NUM_GRADIENT_SLICES
    } else {
        1
    }
}

/// Select all AOs that sit on the center of the perturbation tuple `coor` (all AOs for an
/// empty tuple) and that are not negligible on the grid block, and copy `n_slices` slices
/// of their values into `compressed`.
///
/// `aos` holds the full AO tensor with one row per (derivative block, AO) pair and
/// `slice_offsets[islice]` is the first row of the derivative block that is copied into
/// slice `islice`. Screening is always done on the undifferentiated values, i.e. on the
/// first `ao_centers.len()` rows.
///
/// Tuples that contain the "no derivative" label 0 must be filtered out by the caller,
/// decoding that label panics.
pub fn compress(
    n_slices: usize,
    compressed: &mut CompressedAos,
    aos: ArrayView2<f64>,
    ao_centers: &[usize],
    coor: &[usize],
    slice_offsets: &[usize],
    screening_threshold: f64,
) {
    assert!(n_slices <= NUM_GRADIENT_SLICES);
    assert!(slice_offsets.len() >= n_slices);
    let num_aos: usize = ao_centers.len();
    compressed.reserve(num_aos, aos.ncols());

    let centers: Vec<usize> = centers_of(coor);

    compressed.indices.clear();
    compressed.n_slices = n_slices;
    for (i, center) in ao_centers.iter().enumerate() {
        if is_same_center(*center, &centers) {
            let tmax: f64 = aos.row(i).fold(0.0, |acc: f64, x| acc.max(x.abs()));
            if tmax > screening_threshold {
                compressed.indices.push(i);
            }
        }
    }

    if compressed.indices.is_empty() {
        return;
    }

    for (ic, iu) in compressed.indices.iter().enumerate() {
        for islice in 0..n_slices {
            compressed
                .values
                .slice_mut(s![islice, ic, ..])
                .assign(&aos.row(slice_offsets[islice] + *iu));
        }
    }
}
