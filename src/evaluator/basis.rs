use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

/// Contracted Gaussian shell on one atomic center.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Shell {
    /// index of the atomic center the shell sits on
    pub center: usize,
    /// angular momentum quantum number
    pub l: usize,
    pub exponents: Vec<f64>,
    pub coefficients: Vec<f64>,
}

impl Shell {
    pub fn new(center: usize, l: usize, exponents: Vec<f64>, coefficients: Vec<f64>) -> Self {
        assert_eq!(
            exponents.len(),
            coefficients.len(),
            "every primitive needs one exponent and one contraction coefficient"
        );
        Self {
            center,
            l,
            exponents,
            coefficients,
        }
    }

    pub fn n_primitives(&self) -> usize {
        self.exponents.len()
    }
}

/// Basis set description that is handed to the AO evaluator.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BasisSet {
    /// evaluator specific flag, e.g. spherical or Cartesian functions
    pub basis_type: i32,
    /// center coordinates in bohr, one row per center
    pub centers: Array2<f64>,
    pub shells: Vec<Shell>,
}

impl BasisSet {
    pub fn new(basis_type: i32, centers: Array2<f64>, shells: Vec<Shell>) -> Self {
        assert_eq!(centers.ncols(), 3);
        assert!(
            shells.iter().all(|shell| shell.center < centers.nrows()),
            "shell refers to a center that does not exist"
        );
        Self {
            basis_type,
            centers,
            shells,
        }
    }

    pub fn n_centers(&self) -> usize {
        self.centers.nrows()
    }

    /// Flat lists in the layout of the classic C evaluator interfaces:
    /// shell centers, angular momenta, number of primitives, exponents and coefficients.
    pub fn flat_shell_data(&self) -> (Vec<usize>, Vec<usize>, Vec<usize>, Vec<f64>, Vec<f64>) {
        let centers: Vec<usize> = self.shells.iter().map(|shell| shell.center).collect();
        let l_quantum_numbers: Vec<usize> = self.shells.iter().map(|shell| shell.l).collect();
        let n_primitives: Vec<usize> = self.shells.iter().map(|shell| shell.n_primitives()).collect();
        let exponents: Vec<f64> = self
            .shells
            .iter()
            .flat_map(|shell| shell.exponents.iter().copied())
            .collect();
        let coefficients: Vec<f64> = self
            .shells
            .iter()
            .flat_map(|shell| shell.coefficients.iter().copied())
            .collect();
        (centers, l_quantum_numbers, n_primitives, exponents, coefficients)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_shell_data_keeps_shell_order() {
        let basis: BasisSet = BasisSet::new(
            0,
            array![[0.0, 0.0, 0.0], [0.0, 0.0, 1.4]],
            vec![
                Shell::new(0, 0, vec![3.42, 0.62], vec![0.15, 0.53]),
                Shell::new(1, 1, vec![0.17], vec![1.0]),
            ],
        );
        let (centers, l, n_prim, exps, coeffs) = basis.flat_shell_data();
        assert_eq!(basis.n_centers(), 2);
        assert_eq!(centers, vec![0, 1]);
        assert_eq!(l, vec![0, 1]);
        assert_eq!(n_prim, vec![2, 1]);
        assert_eq!(exps, vec![3.42, 0.62, 0.17]);
        assert_eq!(coeffs, vec![0.15, 0.53, 1.0]);
    }

    #[test]
    #[should_panic]
    fn shell_on_missing_center_is_rejected() {
        BasisSet::new(
            0,
            array![[0.0, 0.0, 0.0]],
            vec![Shell::new(1, 0, vec![1.0], vec![1.0])],
        );
    }
}
