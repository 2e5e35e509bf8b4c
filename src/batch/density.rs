use crate::batch::compress::{num_slices, CompressedAos};
use ndarray::linalg::general_mat_mul;
use ndarray::prelude::*;

/// Local density matrix D(k, l) for the AOs of the two compressed sets.
///
/// Off-diagonal contributions are counted twice: with matching bra/ket sets
/// and a symmetric density matrix only the lower triangle is read and
/// mirrored, otherwise the block is either doubled (symmetric matrix or
/// matching sets) or symmetrized as dmat(k, l) + dmat(l, k).
pub fn local_density_matrix(
    dmat: ArrayView2<f64>,
    dmat_is_symmetric: bool,
    kl_match: bool,
    k_indices: &[usize],
    l_indices: &[usize],
) -> Array2<f64> {
    let mut d: Array2<f64> = Array2::zeros((k_indices.len(), l_indices.len()));
    match (kl_match, dmat_is_symmetric) {
        (true, true) => {
            assert_eq!(
                k_indices.len(),
                l_indices.len(),
                "matching bra and ket sets need the same number of AOs"
            );
            for (k, kc) in k_indices.iter().enumerate() {
                for (l, lc) in l_indices.iter().enumerate().take(k + 1) {
                    let value: f64 = 2.0 * dmat[[*kc, *lc]];
                    d[[k, l]] = value;
                    d[[l, k]] = value;
                }
            }
        }
        (true, false) | (false, true) => {
            for (k, kc) in k_indices.iter().enumerate() {
                for (l, lc) in l_indices.iter().enumerate() {
                    d[[k, l]] = 2.0 * dmat[[*kc, *lc]];
                }
            }
        }
        (false, false) => {
            for (k, kc) in k_indices.iter().enumerate() {
                for (l, lc) in l_indices.iter().enumerate() {
                    d[[k, l]] = dmat[[*kc, *lc]] + dmat[[*lc, *kc]];
                }
            }
        }
    }
    d
}

/// Assemble the density (and its gradient and tau) on the grid block
///
///           ⎲  ⎲
/// n(b) +=   ⎳  ⎳  AO_k(k, b) D(k, l) AO_l(l, b)
///           k  l
///
/// in two steps: X(k, b) = D(k, l) AO_l(l, b) followed by n(b) += AO_k(k, b) X(k, b).
/// Rows 0..4 of `density` receive the value and gradient contributions (scaled by
/// `prefactors[0..4]`), row 4 the tau contribution (scaled by `prefactors[4]`).
/// Slices with a vanishing prefactor are skipped. Nothing happens if one of the
/// compressed sets is empty.
pub fn get_density(
    use_gradient: bool,
    use_tau: bool,
    prefactors: &[f64; 5],
    mut density: ArrayViewMut2<f64>,
    dmat: ArrayView2<f64>,
    dmat_is_symmetric: bool,
    kl_match: bool,
    k_aoc: &CompressedAos,
    l_aoc: &CompressedAos,
) {
    if k_aoc.is_empty() || l_aoc.is_empty() {
        return;
    }
    let n_slices: usize = if use_gradient { 4 } else { 1 };
    let required_slices: usize = num_slices(use_gradient, use_tau);
    assert!(
        k_aoc.n_slices() >= required_slices && l_aoc.n_slices() >= required_slices,
        "the compressed AOs do not contain all slices that are needed"
    );
    assert!(density.nrows() >= if use_tau { 5 } else { n_slices });
    assert_eq!(density.ncols(), k_aoc.block_length());

    let d: Array2<f64> = local_density_matrix(
        dmat,
        dmat_is_symmetric,
        kl_match,
        k_aoc.indices(),
        l_aoc.indices(),
    );

    // form X(k, b)
    let mut x: Array2<f64> = Array2::zeros((k_aoc.count(), k_aoc.block_length()));
    general_mat_mul(1.0, &d, &l_aoc.slice(0), 0.0, &mut x);

    // assemble density and possibly gradient
    for islice in 0..n_slices {
        if prefactors[islice].abs() > 0.0 {
            let contribution: Array1<f64> = (&x * &k_aoc.slice(islice)).sum_axis(Axis(0));
            density
                .row_mut(islice)
                .scaled_add(prefactors[islice], &contribution);
        }
    }

    if use_tau && prefactors[4].abs() > 0.0 {
        for ixyz in 1..4 {
            general_mat_mul(1.0, &d, &l_aoc.slice(ixyz), 0.0, &mut x);
            let contribution: Array1<f64> = (&x * &k_aoc.slice(ixyz)).sum_axis(Axis(0));
            density.row_mut(4).scaled_add(prefactors[4], &contribution);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::compress::compress;
    use crate::utils::tests::{random_matrix, random_symmetric};
    use approx::AbsDiffEq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn compressed_from(aos: ArrayView2<f64>, centers: &[usize], coor: &[usize], n_slices: usize) -> CompressedAos {
        let n_aos: usize = centers.len();
        let offsets: Vec<usize> = (0..n_slices).map(|i| i * n_aos).collect();
        let mut compressed: CompressedAos = CompressedAos::new();
        compress(n_slices, &mut compressed, aos, centers, coor, &offsets, 1.0e-15);
        compressed
    }

    /// value and first derivative rows of `n_aos` AOs
    fn random_aos(n_aos: usize, block_length: usize, seed: u64) -> Array2<f64> {
        let mut rng: StdRng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((4 * n_aos, block_length), |_| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn two_aos_on_a_single_point() {
        let aos: Array2<f64> = array![[3.0], [4.0]];
        let set: CompressedAos = compressed_from(aos.view(), &[0, 1], &[], 1);
        let dmat: Array2<f64> = Array2::eye(2);
        let mut density: Array2<f64> = Array2::zeros((1, 1));
        get_density(
            false,
            false,
            &[1.0, 0.0, 0.0, 0.0, 0.0],
            density.view_mut(),
            dmat.view(),
            true,
            true,
            &set,
            &set,
        );
        assert!((density[[0, 0]] - 50.0).abs() < 1e-12);
    }

    #[test]
    fn symmetric_and_general_path_agree() {
        let n_aos: usize = 7;
        let aos: Array2<f64> = random_aos(n_aos, 16, 1);
        let set: CompressedAos = compressed_from(aos.view(), &[0, 0, 1, 1, 2, 2, 2], &[], 4);
        let dmat: Array2<f64> = random_symmetric(n_aos, 2);
        let prefactors: [f64; 5] = [1.0, 2.0, 2.0, 2.0, 0.5];
        let mut symmetric: Array2<f64> = Array2::zeros((5, 16));
        let mut general: Array2<f64> = Array2::zeros((5, 16));
        get_density(true, true, &prefactors, symmetric.view_mut(), dmat.view(), true, true, &set, &set);
        get_density(true, true, &prefactors, general.view_mut(), dmat.view(), false, true, &set, &set);
        assert!(symmetric.abs_diff_eq(&general, 1e-12));
        assert!(symmetric.iter().any(|x| x.abs() > 1e-3));
    }

    #[test]
    fn matches_explicit_sum() {
        let n_aos: usize = 5;
        let block_length: usize = 6;
        let aos: Array2<f64> = random_aos(n_aos, block_length, 3);
        let centers: Vec<usize> = vec![0, 1, 0, 1, 1];
        // bra on center 1, ket on all centers
        let k_set: CompressedAos = compressed_from(aos.view(), &centers, &[4], 4);
        let l_set: CompressedAos = compressed_from(aos.view(), &centers, &[], 4);
        let dmat: Array2<f64> = random_matrix(n_aos, 4);
        let prefactors: [f64; 5] = [0.7, -1.3, 0.4, 2.0, 0.25];
        let mut density: Array2<f64> = Array2::zeros((5, block_length));
        get_density(true, true, &prefactors, density.view_mut(), dmat.view(), false, false, &k_set, &l_set);

        let mut reference: Array2<f64> = Array2::zeros((5, block_length));
        for kc in [1, 3, 4].iter() {
            for lc in 0..n_aos {
                let dkl: f64 = dmat[[*kc, lc]] + dmat[[lc, *kc]];
                for ib in 0..block_length {
                    for islice in 0..4 {
                        reference[[islice, ib]] += prefactors[islice]
                            * aos[[islice * n_aos + kc, ib]]
                            * dkl
                            * aos[[lc, ib]];
                    }
                    for ixyz in 1..4 {
                        reference[[4, ib]] += prefactors[4]
                            * aos[[ixyz * n_aos + kc, ib]]
                            * dkl
                            * aos[[ixyz * n_aos + lc, ib]];
                    }
                }
            }
        }
        assert!(density.abs_diff_eq(&reference, 1e-12));
    }

    #[test]
    fn zero_prefactor_leaves_slice_untouched() {
        let aos: Array2<f64> = random_aos(3, 4, 5);
        let set: CompressedAos = compressed_from(aos.view(), &[0, 1, 2], &[], 4);
        let dmat: Array2<f64> = random_symmetric(3, 6);
        let mut density: Array2<f64> = Array2::from_elem((4, 4), 0.125);
        get_density(
            true,
            false,
            &[1.0, 0.0, 1.0, 0.0, 0.0],
            density.view_mut(),
            dmat.view(),
            true,
            true,
            &set,
            &set,
        );
        assert!(density.row(1).iter().all(|x| *x == 0.125));
        assert!(density.row(3).iter().all(|x| *x == 0.125));
        assert!(density.row(0).iter().any(|x| *x != 0.125));
    }

    #[test]
    fn empty_set_is_a_no_op() {
        let aos: Array2<f64> = random_aos(3, 4, 7);
        let full: CompressedAos = compressed_from(aos.view(), &[0, 1, 2], &[], 4);
        // no AO on center 5
        let empty: CompressedAos = compressed_from(aos.view(), &[0, 1, 2], &[16], 4);
        assert!(empty.is_empty());
        let dmat: Array2<f64> = random_matrix(3, 8);
        let before: Array2<f64> = Array2::from_shape_fn((5, 4), |(i, j)| (i * 4 + j) as f64 * 0.3);
        let mut density: Array2<f64> = before.clone();
        get_density(true, true, &[1.0; 5], density.view_mut(), dmat.view(), false, false, &full, &empty);
        get_density(true, true, &[1.0; 5], density.view_mut(), dmat.view(), false, false, &empty, &full);
        assert_eq!(density, before);
    }

    #[test]
    fn local_density_matrix_conventions() {
        let dmat: Array2<f64> = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let lower: Array2<f64> = local_density_matrix(dmat.view(), true, true, &[0, 2], &[0, 2]);
        assert_eq!(lower, array![[2.0, 14.0], [14.0, 18.0]]);
        let doubled: Array2<f64> = local_density_matrix(dmat.view(), false, true, &[0, 2], &[0, 2]);
        assert_eq!(doubled, array![[2.0, 6.0], [14.0, 18.0]]);
        let disjoint: Array2<f64> = local_density_matrix(dmat.view(), true, false, &[1], &[0, 2]);
        assert_eq!(disjoint, array![[8.0, 12.0]]);
        let symmetrized: Array2<f64> = local_density_matrix(dmat.view(), false, false, &[1], &[0, 2]);
        assert_eq!(symmetrized, array![[6.0, 14.0]]);
    }
}
