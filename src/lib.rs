#![allow(dead_code)]

pub mod batch;
pub mod defaults;
mod errors;
pub mod evaluator;
pub mod io;
pub mod types;
mod utils;

pub use batch::*;
pub use defaults::*;
pub use errors::AoBatchError;
pub use evaluator::{AoEvaluator, BasisSet, Shell};
pub use io::{BatchConfig, Configuration};
pub use types::*;
