mod perturbation;

pub use perturbation::*;
