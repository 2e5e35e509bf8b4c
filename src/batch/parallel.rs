use crate::batch::AoBatch;
use crate::defaults::NUM_DENSITY_SLICES;
use crate::errors::AoBatchError;
use crate::evaluator::AoEvaluator;
use crate::io::BatchConfig;
use crate::utils::Timer;
use log::info;
use ndarray::prelude::*;
use rayon::prelude::*;

/// Grid points of one block, one row per point: x, y, z (in bohr) and the quadrature weight.
#[derive(Debug, Clone)]
pub struct GridBlock {
    pub points: Array2<f64>,
}

impl GridBlock {
    pub fn new(points: Array2<f64>) -> Self {
        assert!(points.ncols() >= 3);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.points.nrows() == 0
    }
}

fn max_geo_order(use_gradient: bool, use_tau: bool) -> usize {
    if use_gradient || use_tau {
        1
    } else {
        0
    }
}

/// Density (rows 0..4: value and gradient, row 4: tau) on every grid block. The blocks
/// are distributed over the rayon thread pool and every worker uses its own engine with
/// a copy of `evaluator`, which must already know the basis set.
pub fn par_get_density<E>(
    evaluator: &E,
    config: BatchConfig,
    blocks: &[GridBlock],
    use_gradient: bool,
    use_tau: bool,
    prefactors: &[f64; 5],
    dmat: ArrayView2<f64>,
    dmat_is_symmetric: bool,
) -> Result<Vec<Array2<f64>>, AoBatchError>
where
    E: AoEvaluator + Clone + Send + Sync,
{
    config.validate()?;
    let timer: Timer = Timer::start();
    let order: usize = max_geo_order(use_gradient, use_tau);
    let densities: Result<Vec<Array2<f64>>, AoBatchError> = blocks
        .par_iter()
        .map_init(
            || AoBatch::new(evaluator.clone(), config),
            |batch: &mut Result<AoBatch<E>, AoBatchError>,
             block: &GridBlock|
             -> Result<Array2<f64>, AoBatchError> {
                let batch: &mut AoBatch<E> = batch.as_mut().map_err(|err| err.clone())?;
                batch.get_ao(use_gradient, order, block.points.view())?;
                let mut density: Array2<f64> =
                    Array2::zeros((NUM_DENSITY_SLICES, config.block_length));
                batch.get_density_undiff(
                    use_gradient,
                    use_tau,
                    prefactors,
                    density.view_mut(),
                    dmat,
                    dmat_is_symmetric,
                    true,
                );
                Ok(density)
            },
        )
        .collect();
    info!("{: <25} {} grid blocks", "density assembled on", blocks.len());
    info!("{}", timer);
    densities
}

/// Sum of the matrices that are obtained by distributing the weights `potentials[i]`
/// of every grid block `blocks[i]`. Every worker accumulates into its own matrix, the
/// partial matrices are added up at the end.
pub fn par_distribute_matrix<E>(
    evaluator: &E,
    config: BatchConfig,
    blocks: &[GridBlock],
    potentials: &[Array2<f64>],
    use_gradient: bool,
    use_tau: bool,
    prefactors: &[f64; 5],
    mat_dim: usize,
) -> Result<Array2<f64>, AoBatchError>
where
    E: AoEvaluator + Clone + Send + Sync,
{
    assert_eq!(
        blocks.len(),
        potentials.len(),
        "every grid block needs its own weights"
    );
    config.validate()?;
    let timer: Timer = Timer::start();
    let order: usize = max_geo_order(use_gradient, use_tau);
    let fmat: Result<Array2<f64>, AoBatchError> = blocks
        .par_iter()
        .zip(potentials.par_iter())
        .try_fold(
            || {
                (
                    AoBatch::new(evaluator.clone(), config),
                    Array2::zeros((mat_dim, mat_dim)),
                )
            },
            |(mut batch, mut fmat): (Result<AoBatch<E>, AoBatchError>, Array2<f64>),
             (block, u): (&GridBlock, &Array2<f64>)|
             -> Result<(Result<AoBatch<E>, AoBatchError>, Array2<f64>), AoBatchError> {
                let engine: &mut AoBatch<E> = batch.as_mut().map_err(|err| err.clone())?;
                engine.get_ao(use_gradient, order, block.points.view())?;
                engine.distribute_matrix_undiff(
                    use_gradient,
                    use_tau,
                    prefactors,
                    u.view(),
                    fmat.view_mut(),
                );
                Ok((batch, fmat))
            },
        )
        .map(
            |partial: Result<(Result<AoBatch<E>, AoBatchError>, Array2<f64>), AoBatchError>| {
                partial.map(|(_, fmat)| fmat)
            },
        )
        .try_reduce(
            || Array2::zeros((mat_dim, mat_dim)),
            |a: Array2<f64>, b: Array2<f64>| Ok(a + b),
        );
    info!("{: <25} {} grid blocks", "matrix distributed over", blocks.len());
    info!("{}", timer);
    fmat
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{BasisSet, Shell};
    use crate::utils::tests::{line_of_points, random_symmetric, GaussianEvaluator};
    use approx::AbsDiffEq;

    const BLOCK_LENGTH: usize = 16;

    fn evaluator() -> GaussianEvaluator {
        let basis: BasisSet = BasisSet::new(
            0,
            array![[0.0, 0.0, 0.0], [1.4, 0.0, 0.0], [0.7, 1.2, 0.0]],
            vec![
                Shell::new(0, 0, vec![0.8], vec![1.0]),
                Shell::new(0, 0, vec![0.2], vec![1.0]),
                Shell::new(1, 0, vec![0.5], vec![1.0]),
                Shell::new(2, 0, vec![0.35], vec![1.0]),
            ],
        );
        let mut evaluator: GaussianEvaluator = GaussianEvaluator::new(Array2::zeros((0, 3)), vec![]);
        assert_eq!(evaluator.set_basis(&basis), 0);
        evaluator
    }

    fn blocks() -> Vec<GridBlock> {
        (0..5)
            .map(|i| GridBlock::new(line_of_points(BLOCK_LENGTH - i, -2.0 + i as f64, 0.2)))
            .collect()
    }

    #[test]
    fn parallel_density_equals_sequential_loop() {
        let _ = env_logger::builder().is_test(true).try_init();
        let evaluator: GaussianEvaluator = evaluator();
        let config: BatchConfig = BatchConfig::with_block_length(BLOCK_LENGTH);
        let dmat: Array2<f64> = random_symmetric(4, 1);
        let prefactors: [f64; 5] = [1.0, 2.0, 2.0, 2.0, 0.5];
        let blocks: Vec<GridBlock> = blocks();
        let densities: Vec<Array2<f64>> = par_get_density(
            &evaluator,
            config,
            &blocks,
            true,
            true,
            &prefactors,
            dmat.view(),
            true,
        )
        .unwrap();
        assert_eq!(densities.len(), blocks.len());

        let mut batch: AoBatch<GaussianEvaluator> = AoBatch::new(evaluator.clone(), config).unwrap();
        for (block, density) in blocks.iter().zip(densities.iter()) {
            batch.get_ao(true, 1, block.points.view()).unwrap();
            let mut reference: Array2<f64> = Array2::zeros((5, BLOCK_LENGTH));
            batch.get_density_undiff(true, true, &prefactors, reference.view_mut(), dmat.view(), true, true);
            assert!(density.abs_diff_eq(&reference, 1e-12));
            // padded points carry no density
            assert!(density.slice(s![.., block.len()..]).iter().all(|x| *x == 0.0));
        }
    }

    #[test]
    fn parallel_matrix_equals_sequential_loop() {
        let evaluator: GaussianEvaluator = evaluator();
        let config: BatchConfig = BatchConfig::with_block_length(BLOCK_LENGTH);
        let prefactors: [f64; 5] = [1.0, 1.0, 1.0, 1.0, 0.5];
        let blocks: Vec<GridBlock> = blocks();
        let potentials: Vec<Array2<f64>> = (0..blocks.len())
            .map(|i| Array2::from_shape_fn((5, BLOCK_LENGTH), |(s, b)| ((i + s * b) as f64).sin()))
            .collect();
        let fmat: Array2<f64> = par_distribute_matrix(
            &evaluator,
            config,
            &blocks,
            &potentials,
            true,
            true,
            &prefactors,
            4,
        )
        .unwrap();

        let mut batch: AoBatch<GaussianEvaluator> = AoBatch::new(evaluator.clone(), config).unwrap();
        let mut reference: Array2<f64> = Array2::zeros((4, 4));
        for (block, u) in blocks.iter().zip(potentials.iter()) {
            batch.get_ao(true, 1, block.points.view()).unwrap();
            batch.distribute_matrix_undiff(true, true, &prefactors, u.view(), reference.view_mut());
        }
        assert!(fmat.abs_diff_eq(&reference, 1e-10));
        assert!(fmat.iter().any(|x| x.abs() > 1e-3));
    }

    #[test]
    fn evaluator_errors_stop_the_driver() {
        let evaluator: GaussianEvaluator = evaluator();
        // the first block holds one point too many
        let config: BatchConfig = BatchConfig::with_block_length(BLOCK_LENGTH - 1);
        let dmat: Array2<f64> = random_symmetric(4, 2);
        let result = par_get_density(
            &evaluator,
            config,
            &blocks(),
            false,
            false,
            &[1.0, 0.0, 0.0, 0.0, 0.0],
            dmat.view(),
            true,
        );
        assert!(matches!(result, Err(AoBatchError::BlockTooLong { .. })));
    }

    #[test]
    fn zero_block_length_is_rejected_up_front() {
        let evaluator: GaussianEvaluator = evaluator();
        let blocks: Vec<GridBlock> = blocks();
        let potentials: Vec<Array2<f64>> = vec![Array2::zeros((5, BLOCK_LENGTH)); blocks.len()];
        let result = par_distribute_matrix(
            &evaluator,
            BatchConfig::with_block_length(0),
            &blocks,
            &potentials,
            false,
            false,
            &[1.0, 0.0, 0.0, 0.0, 0.0],
            4,
        );
        assert!(matches!(result, Err(AoBatchError::Config(_))));
    }
}
