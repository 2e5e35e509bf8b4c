use crate::batch::compress::num_slices;
use crate::batch::density::get_density;
use crate::batch::distribute::distribute_matrix;
use crate::batch::AoBatch;
use crate::defaults::MAX_GEO_DIFF_ORDER;
use crate::errors::AoBatchError;
use crate::evaluator::AoEvaluator;
use crate::types::NO_DERIVATIVE;
use ndarray::prelude::*;

/// Positions (within a perturbation tuple) of the labels that act on the bra
/// and on the ket AOs.
pub type Partition = (&'static [usize], &'static [usize]);

//  1st                        a,0
//  2nd            ab,0                    a,b
//  3rd     abc,0        ab,c        ac,b        a,bc
const PARTITIONS_1: &[Partition] = &[(&[0], &[])];
const PARTITIONS_2: &[Partition] = &[(&[0, 1], &[]), (&[0], &[1])];
const PARTITIONS_3: &[Partition] = &[
    (&[0, 1, 2], &[]),
    (&[0, 1], &[2]),
    (&[0], &[1, 2]),
    (&[0, 2], &[1]),
];
// the list contains a, bcd twice and no abd, c
const PARTITIONS_4: &[Partition] = &[
    (&[0, 1, 2, 3], &[]),
    (&[0, 1, 2], &[3]),
    (&[0, 1], &[2, 3]),
    (&[0], &[1, 2, 3]),
    (&[0, 2, 3], &[1]),
    (&[1, 2, 3], &[0]),
    (&[0, 2], &[1, 3]),
    (&[0, 3], &[1, 2]),
    (&[0], &[1, 2, 3]),
];

/// Bra/ket partitions that are evaluated for a perturbation tuple of length `size`.
/// Aborts for empty tuples and for tuples longer than four.
pub fn partitions(size: usize) -> &'static [Partition] {
    match size {
        1 => PARTITIONS_1,
        2 => PARTITIONS_2,
        3 => PARTITIONS_3,
        4 => PARTITIONS_4,
        _ => panic!(
            "geometric derivatives need between 1 and {} center-components, got {}",
            MAX_GEO_DIFF_ORDER, size
        ),
    }
}

/// Overall factor 2 (-1)^size of a derivative contribution. The factor 2 appears
/// because the derivative of a center can act on the left or on the right AO.
pub fn sign_factor(size: usize) -> f64 {
    2.0 * (-1.0_f64).powi(size as i32)
}

fn split_tuple(coor: &[usize], partition: &Partition) -> (Vec<usize>, Vec<usize>) {
    let k_coor: Vec<usize> = partition.0.iter().map(|i| coor[*i]).collect();
    let l_coor: Vec<usize> = partition.1.iter().map(|i| coor[*i]).collect();
    (k_coor, l_coor)
}

impl<E: AoEvaluator> AoBatch<E> {
    /// Geometric derivative of the density (and gradient and tau) of the current grid block
    /// with respect to the center-components in `coor`, accumulated into `density`.
    /// `mat` is the (not necessarily symmetric) density matrix.
    ///
    /// The AOs have to be evaluated up to order `coor.len()`, or one order higher if the
    /// gradient or tau is requested. A tuple that contains the label 0 is skipped.
    pub fn get_dens_geo_derv(
        &mut self,
        use_gradient: bool,
        use_tau: bool,
        coor: &[usize],
        mut density: ArrayViewMut2<f64>,
        mat: ArrayView2<f64>,
    ) -> Result<(), AoBatchError> {
        if coor.iter().any(|label| *label == NO_DERIVATIVE) {
            return Ok(());
        }
        let f: f64 = sign_factor(coor.len());
        for partition in partitions(coor.len()).iter() {
            let (k_coor, l_coor) = split_tuple(coor, partition);
            self.diff_u_wrt_center_tuple(
                use_gradient,
                use_tau,
                f,
                &k_coor,
                &l_coor,
                density.view_mut(),
                mat,
            )?;
        }
        Ok(())
    }

    /// Geometric derivative of the matrix that is obtained by distributing the weights `u`
    /// of the current grid block, accumulated into `mat`.
    pub fn get_mat_geo_derv(
        &mut self,
        use_gradient: bool,
        use_tau: bool,
        coor: &[usize],
        u: ArrayView2<f64>,
        mut mat: ArrayViewMut2<f64>,
    ) -> Result<(), AoBatchError> {
        if coor.iter().any(|label| *label == NO_DERIVATIVE) {
            return Ok(());
        }
        let f: f64 = sign_factor(coor.len());
        for partition in partitions(coor.len()).iter() {
            let (k_coor, l_coor) = split_tuple(coor, partition);
            self.diff_m_wrt_center_tuple(
                use_gradient,
                use_tau,
                f,
                &k_coor,
                &l_coor,
                u,
                mat.view_mut(),
            )?;
        }
        Ok(())
    }

    fn diff_u_wrt_center_tuple(
        &mut self,
        use_gradient: bool,
        use_tau: bool,
        f: f64,
        k_coor: &[usize],
        l_coor: &[usize],
        mut u: ArrayViewMut2<f64>,
        m: ArrayView2<f64>,
    ) -> Result<(), AoBatchError> {
        self.compress_pair(num_slices(use_gradient, use_tau), k_coor, l_coor)?;

        let mut prefactors: [f64; 5] = [f, f, f, f, 0.5 * f];

        get_density(
            use_gradient,
            use_tau,
            &prefactors,
            u.view_mut(),
            m,
            false,
            false,
            &self.k_ao_compressed,
            &self.l_ao_compressed,
        );
        // the value term is complete, only the gradient needs the mirrored contribution
        if use_gradient {
            prefactors[0] = 0.0;
            get_density(
                use_gradient,
                false,
                &prefactors,
                u,
                m,
                false,
                false,
                &self.l_ao_compressed,
                &self.k_ao_compressed,
            );
        }
        Ok(())
    }

    fn diff_m_wrt_center_tuple(
        &mut self,
        use_gradient: bool,
        use_tau: bool,
        f: f64,
        k_coor: &[usize],
        l_coor: &[usize],
        u: ArrayView2<f64>,
        mut m: ArrayViewMut2<f64>,
    ) -> Result<(), AoBatchError> {
        self.compress_pair(num_slices(use_gradient, use_tau), k_coor, l_coor)?;

        let mut prefactors: [f64; 5] = [f, f, f, f, 0.5 * f];

        distribute_matrix(
            use_gradient,
            use_tau,
            &prefactors,
            u,
            m.view_mut(),
            &self.k_ao_compressed,
            &self.l_ao_compressed,
        );
        if use_gradient {
            prefactors[0] = 0.0;
            distribute_matrix(
                use_gradient,
                false,
                &prefactors,
                u,
                m,
                &self.l_ao_compressed,
                &self.k_ao_compressed,
            );
        }
        Ok(())
    }
}
