mod basis;

pub use basis::{BasisSet, Shell};

/// Interface to the AO evaluator that computes the values and geometric derivatives
/// of all basis functions on the points of one grid block.
///
/// The buffer written by [get_ao](AoEvaluator::get_ao) is laid out as
/// derivative block -> AO index -> block position, i.e. the value of AO `i` in the
/// derivative block that starts at row `geo_offset(dx, dy, dz)` at the grid position
/// `b` is found at `block_length * (geo_offset(dx, dy, dz) + i) + b`.
///
/// Status codes follow the convention of C libraries: zero means success,
/// everything else is an error that is passed on to the caller of the engine.
pub trait AoEvaluator {
    /// Set up the basis set, returns a status code.
    fn set_basis(&mut self, basis: &BasisSet) -> i32;

    /// Number of AOs of the current basis.
    fn num_aos(&self) -> usize;

    /// Atomic center of AO `ao`.
    fn ao_center(&self, ao: usize) -> usize;

    /// Length of the buffer that is needed for all derivatives up to `max_geo_order`.
    fn buffer_len(&self, max_geo_order: usize, block_length: usize) -> usize;

    /// First row (in units of AOs) of the derivative block (dx, dy, dz).
    fn geo_offset(&self, dx: usize, dy: usize, dz: usize) -> usize;

    /// Evaluate the AOs and their derivatives up to `max_geo_order` on the points given
    /// by the coordinates `x`, `y` and `z` (in bohr). Returns a status code.
    fn get_ao(
        &mut self,
        max_geo_order: usize,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        buffer: &mut [f64],
    ) -> i32;
}

/// Number of Cartesian derivative blocks of all orders up to and including `order`.
pub fn num_geo_blocks(order: usize) -> usize {
    (order + 1) * (order + 2) * (order + 3) / 6
}

/// Position of the derivative block (dx, dy, dz) if all blocks are sorted by their
/// total order and within one order by descending x and then descending y derivative:
/// 0 | x y z | xx xy xz yy yz zz | xxx ...
pub fn geo_block_index(dx: usize, dy: usize, dz: usize) -> usize {
    let order: usize = dx + dy + dz;
    let lower: usize = order * (order + 1) * (order + 2) / 6;
    let n: usize = order - dx;
    lower + n * (n + 1) / 2 + (n - dy)
}
