// GRID BLOCKS
// number of grid points that are processed together, all AO
// tensors carry this length as their innermost dimension
pub const AO_BLOCK_LENGTH: usize = 128;

// SCREENING
// an AO is dropped from a compressed set if its largest absolute
// value on the block does not exceed this threshold
pub const SCREENING_THRESHOLD: f64 = 1.0e-15;

// DERIVATIVES
// highest geometric derivative order of the AOs and the longest
// perturbation tuple that can be processed
pub const MAX_GEO_DIFF_ORDER: usize = 4;
// value, x, y and z derivative
pub const NUM_GRADIENT_SLICES: usize = 4;
// value, x, y, z and tau
pub const NUM_DENSITY_SLICES: usize = 5;

// config file
pub const CONFIG_FILE_NAME: &str = "aobatch.toml";
