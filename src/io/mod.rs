pub(crate) mod settings;

pub use settings::{BatchConfig, Configuration};
