use std::error;
use std::fmt;

/// Failures of the AO batch engine that a caller can react to. Misconfiguration
/// (too long perturbation tuples, too high derivative orders) is not part of
/// this type and aborts the program instead.
#[derive(Debug, Clone, PartialEq)]
pub enum AoBatchError {
    /// The AO evaluator returned a nonzero status code.
    Evaluator { routine: &'static str, status: i32 },
    /// A compression needs a derivative block that was not computed by the last `get_ao`.
    DerivativeOrderNotEvaluated { requested: usize, evaluated: usize },
    /// A derivative contraction was requested before any AO values were computed.
    AoNotEvaluated,
    /// More grid points were passed than fit into one block.
    BlockTooLong { points: usize, block_length: usize },
    /// The configuration could not be read or contains invalid values.
    Config(String),
}

impl fmt::Display for AoBatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AoBatchError::Evaluator { routine, status } => write!(
                f,
                "AO evaluator routine `{}` failed with status {}",
                routine, status
            ),
            AoBatchError::DerivativeOrderNotEvaluated {
                requested,
                evaluated,
            } => write!(
                f,
                "AO derivatives of order {} are needed, but only order {} was evaluated",
                requested, evaluated
            ),
            AoBatchError::AoNotEvaluated => {
                write!(f, "AO values have not been evaluated for this grid block")
            }
            AoBatchError::BlockTooLong {
                points,
                block_length,
            } => write!(
                f,
                "{} grid points do not fit into a block of length {}",
                points, block_length
            ),
            AoBatchError::Config(message) => write!(f, "invalid configuration: {}", message),
        }
    }
}

impl error::Error for AoBatchError {}
