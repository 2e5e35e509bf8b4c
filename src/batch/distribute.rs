use crate::batch::compress::{num_slices, CompressedAos};
use ndarray::linalg::general_mat_mul;
use ndarray::prelude::*;

/// Distribute per-point weights over a matrix, the adjoint of
/// [get_density](crate::batch::density::get_density):
///
///              ⎲
/// F(k, l) +=   ⎳  AO_k(k, b) u(b) AO_l(l, b)
///              b
///
/// computed as W(k, b) = AO_k(k, b) u(b) and F(k, l) += W(k, b) AO_l(l, b)^T.
/// Rows 0..4 of `u` weight the value and gradient slices, row 4 holds the tau weights.
/// The result is scattered into `fmat` with the original AO indices.
pub fn distribute_matrix(
    use_gradient: bool,
    use_tau: bool,
    prefactors: &[f64; 5],
    u: ArrayView2<f64>,
    mut fmat: ArrayViewMut2<f64>,
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
    assert!(u.nrows() >= if use_tau { 5 } else { n_slices });
    assert_eq!(u.ncols(), k_aoc.block_length());

    let mut w: Array2<f64> = Array2::zeros((k_aoc.count(), k_aoc.block_length()));
    for islice in 0..n_slices {
        if prefactors[islice].abs() > 0.0 {
            w.scaled_add(prefactors[islice], &(&k_aoc.slice(islice) * &u.row(islice)));
        }
    }

    let mut f: Array2<f64> = w.dot(&l_aoc.slice(0).t());

    if use_tau && prefactors[4].abs() > 0.0 {
        for ixyz in 1..4 {
            w.assign(&(&k_aoc.slice(ixyz) * &u.row(4)));
            general_mat_mul(prefactors[4], &w, &l_aoc.slice(ixyz).t(), 1.0, &mut f);
        }
    }

    // TODO: only one triangle has to be scattered if both sets are identical
    for (f_k, kc) in f.outer_iter().zip(k_aoc.indices().iter()) {
        for (f_kl, lc) in f_k.iter().zip(l_aoc.indices().iter()) {
            fmat[[*kc, *lc]] += *f_kl;
        }
    }
}
