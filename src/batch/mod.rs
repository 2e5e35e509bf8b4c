mod compress;
mod density;
mod distribute;
mod geo_derivatives;
mod parallel;

pub use compress::{compress, num_slices, CompressedAos};
pub use density::{get_density, local_density_matrix};
pub use distribute::distribute_matrix;
pub use geo_derivatives::{partitions, sign_factor, Partition};
pub use parallel::{par_distribute_matrix, par_get_density, GridBlock};

use crate::errors::AoBatchError;
use crate::evaluator::{AoEvaluator, BasisSet};
use crate::io::BatchConfig;
use crate::types::axis_counts;
use log::{debug, trace};
use ndarray::prelude::*;

/// Evaluates the AOs of one grid block and contracts them with density or
/// potential matrices.
///
/// The engine owns the AO evaluator and all scratch buffers. Buffers are allocated
/// on the first call to [get_ao](AoBatch::get_ao) and only reallocated if the
/// required length changes. An engine must not be shared between threads that work
/// on different grid blocks, every worker needs its own instance.
pub struct AoBatch<E: AoEvaluator> {
    evaluator: E,
    config: BatchConfig,
    ao: Array2<f64>,
    ao_centers: Vec<usize>,
    max_geo_order_evaluated: Option<usize>,
    ao_compressed: CompressedAos,
    k_ao_compressed: CompressedAos,
    l_ao_compressed: CompressedAos,
}

impl<E: AoEvaluator> AoBatch<E> {
    /// Fails if `config` is not usable, e.g. for a block length of zero.
    pub fn new(evaluator: E, config: BatchConfig) -> Result<Self, AoBatchError> {
        config.validate()?;
        Ok(Self {
            evaluator,
            config,
            ao: Array2::zeros((0, config.block_length)),
            ao_centers: Vec::new(),
            max_geo_order_evaluated: None,
            ao_compressed: CompressedAos::new(),
            k_ao_compressed: CompressedAos::new(),
            l_ao_compressed: CompressedAos::new(),
        })
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn block_length(&self) -> usize {
        self.config.block_length
    }

    /// Undifferentiated compressed AOs of the current grid block.
    pub fn compressed(&self) -> &CompressedAos {
        &self.ao_compressed
    }

    /// Compressed bra and ket AOs of the last derivative partition.
    pub fn compressed_pair(&self) -> (&CompressedAos, &CompressedAos) {
        (&self.k_ao_compressed, &self.l_ao_compressed)
    }

    /// Full AO tensor of the current grid block, one row per (derivative block, AO) pair.
    pub fn ao_values(&self) -> ArrayView2<f64> {
        self.ao.view()
    }

    pub fn set_basis(&mut self, basis: &BasisSet) -> Result<(), AoBatchError> {
        // values of a previous basis must not be reused
        self.invalidate();
        let status: i32 = self.evaluator.set_basis(basis);
        if status != 0 {
            return Err(AoBatchError::Evaluator {
                routine: "set_basis",
                status,
            });
        }
        debug!(
            "basis set with {} shells on {} centers: {} AOs",
            basis.shells.len(),
            basis.n_centers(),
            self.evaluator.num_aos()
        );
        Ok(())
    }

    /// Evaluate all AOs and their geometric derivatives up to `max_ao_geo_order` on the
    /// grid points of one block and compress the undifferentiated AOs.
    ///
    /// `points` has one row per grid point with the x, y and z coordinates in the first
    /// three columns; a weight in a fourth column is ignored. Blocks shorter than the
    /// block length are padded with zeros.
    pub fn get_ao(
        &mut self,
        use_gradient: bool,
        max_ao_geo_order: usize,
        points: ArrayView2<f64>,
    ) -> Result<(), AoBatchError> {
        if max_ao_geo_order > self.config.max_geo_order {
            panic!(
                "get_ao: AO derivatives of order {} requested, the maximum is {}",
                max_ao_geo_order, self.config.max_geo_order
            );
        }
        assert!(points.ncols() >= 3, "grid points need x, y and z coordinates");
        // nothing of the previous block may survive a failed call
        self.invalidate();

        let block_length: usize = self.config.block_length;
        if points.nrows() > block_length {
            return Err(AoBatchError::BlockTooLong {
                points: points.nrows(),
                block_length,
            });
        }
        // the derivative slices are also kept if only tau needs them later on
        let n_slices: usize = num_slices(use_gradient, max_ao_geo_order > 0);
        if use_gradient && max_ao_geo_order == 0 {
            return Err(AoBatchError::DerivativeOrderNotEvaluated {
                requested: 1,
                evaluated: 0,
            });
        }

        let num_aos: usize = self.evaluator.num_aos();
        let buffer_len: usize = self.evaluator.buffer_len(max_ao_geo_order, block_length);
        if buffer_len % block_length != 0 || buffer_len < num_aos * block_length {
            return Err(AoBatchError::Evaluator {
                routine: "buffer_len",
                status: -1,
            });
        }
        let n_rows: usize = buffer_len / block_length;
        if self.ao.dim() != (n_rows, block_length) {
            self.ao = Array2::zeros((n_rows, block_length));
            debug!("allocated AO buffer of {} values", buffer_len);
        } else {
            self.ao.fill(0.0);
        }
        for compressed in [
            &mut self.ao_compressed,
            &mut self.k_ao_compressed,
            &mut self.l_ao_compressed,
        ]
        .iter_mut()
        {
            if compressed.reserve(num_aos, block_length) {
                debug!("allocated compressed AO buffer for {} AOs", num_aos);
            }
        }

        let x: Vec<f64> = points.column(0).to_vec();
        let y: Vec<f64> = points.column(1).to_vec();
        let z: Vec<f64> = points.column(2).to_vec();
        let buffer: &mut [f64] = self
            .ao
            .as_slice_mut()
            .expect("AO buffer is allocated in standard layout");
        let status: i32 = self.evaluator.get_ao(max_ao_geo_order, &x, &y, &z, buffer);
        if status != 0 {
            return Err(AoBatchError::Evaluator {
                routine: "get_ao",
                status,
            });
        }
        let evaluator: &E = &self.evaluator;
        self.ao_centers = (0..num_aos).map(|i| evaluator.ao_center(i)).collect();

        self.max_geo_order_evaluated = Some(max_ao_geo_order);
        let offsets: Vec<usize> = match self.slice_offsets(n_slices, &[]) {
            Ok(offsets) => offsets,
            Err(err) => {
                self.max_geo_order_evaluated = None;
                return Err(err);
            }
        };
        compress(
            n_slices,
            &mut self.ao_compressed,
            self.ao.view(),
            &self.ao_centers,
            &[],
            &offsets,
            self.config.screening_threshold,
        );
        trace!(
            "{} of {} AOs survive the screening",
            self.ao_compressed.count(),
            num_aos
        );
        Ok(())
    }

    /// Forget the AOs of the last grid block. Contractions on the undifferentiated set do
    /// nothing afterwards and derivative contractions report `AoNotEvaluated`.
    fn invalidate(&mut self) {
        self.max_geo_order_evaluated = None;
        self.ao_compressed.clear();
        self.k_ao_compressed.clear();
        self.l_ao_compressed.clear();
    }

    /// Rows of the AO tensor that are copied into the slices of a compressed set for the
    /// perturbation tuple `coor`. Slice 0 holds the derivative described by the tuple,
    /// slices 1..4 the same derivative differentiated once more along x, y and z.
    fn slice_offsets(&self, n_slices: usize, coor: &[usize]) -> Result<Vec<usize>, AoBatchError> {
        let evaluated: usize = self
            .max_geo_order_evaluated
            .ok_or(AoBatchError::AoNotEvaluated)?;
        let num_aos: usize = self.ao_centers.len();
        let n_rows: usize = self.ao.nrows();
        let kp: [usize; 3] = axis_counts(coor);
        let mut offsets: Vec<usize> = Vec::with_capacity(n_slices);
        for islice in 0..n_slices {
            let mut d: [usize; 3] = kp;
            if islice > 0 {
                d[islice - 1] += 1;
            }
            let order: usize = d.iter().sum();
            let offset: usize = self.evaluator.geo_offset(d[0], d[1], d[2]);
            if order > evaluated || offset + num_aos > n_rows {
                return Err(AoBatchError::DerivativeOrderNotEvaluated {
                    requested: order,
                    evaluated,
                });
            }
            offsets.push(offset);
        }
        Ok(offsets)
    }

    /// Compress the bra AOs for `k_coor` and the ket AOs for `l_coor`.
    fn compress_pair(
        &mut self,
        n_slices: usize,
        k_coor: &[usize],
        l_coor: &[usize],
    ) -> Result<(), AoBatchError> {
        let k_offsets: Vec<usize> = self.slice_offsets(n_slices, k_coor)?;
        let l_offsets: Vec<usize> = self.slice_offsets(n_slices, l_coor)?;
        compress(
            n_slices,
            &mut self.k_ao_compressed,
            self.ao.view(),
            &self.ao_centers,
            k_coor,
            &k_offsets,
            self.config.screening_threshold,
        );
        compress(
            n_slices,
            &mut self.l_ao_compressed,
            self.ao.view(),
            &self.ao_centers,
            l_coor,
            &l_offsets,
            self.config.screening_threshold,
        );
        trace!(
            "partition {:?} | {:?}: {} bra and {} ket AOs",
            k_coor,
            l_coor,
            self.k_ao_compressed.count(),
            self.l_ao_compressed.count()
        );
        Ok(())
    }

    /// Density, gradient and tau of the current grid block, see
    /// [get_density](crate::batch::density::get_density).
    pub fn get_density_undiff(
        &self,
        use_gradient: bool,
        use_tau: bool,
        prefactors: &[f64; 5],
        density: ArrayViewMut2<f64>,
        dmat: ArrayView2<f64>,
        dmat_is_symmetric: bool,
        kl_match: bool,
    ) {
        get_density(
            use_gradient,
            use_tau,
            prefactors,
            density,
            dmat,
            dmat_is_symmetric,
            kl_match,
            &self.ao_compressed,
            &self.ao_compressed,
        );
    }

    /// Distribute the weights `u` of the current grid block over `fmat`, see
    /// [distribute_matrix](crate::batch::distribute::distribute_matrix).
    pub fn distribute_matrix_undiff(
        &self,
        use_gradient: bool,
        use_tau: bool,
        prefactors: &[f64; 5],
        u: ArrayView2<f64>,
        fmat: ArrayViewMut2<f64>,
    ) {
        distribute_matrix(
            use_gradient,
            use_tau,
            prefactors,
            u,
            fmat,
            &self.ao_compressed,
            &self.ao_compressed,
        );
    }
}
