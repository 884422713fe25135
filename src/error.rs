use thiserror::Error;

/// Failures raised while building or evaluating distributions. None of them
/// is recovered inside the crate: a factor error surfaces unchanged through
/// any composite holding that factor.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistrError {

    #[error("A factorised distribution requires at least one factor")]
    NoFactors,

    /// All factors of a composite must agree on the batch shape of the first one.
    #[error("Factor {index} has batch shape {found}, but the first factor has batch shape {expected}")]
    BatchMismatch { index : usize, expected : usize, found : usize },

    /// Value (or intermediate result) dimension does not match what the operation expects.
    #[error("Shape mismatch at {op}: expected {expected}, found {found}")]
    ShapeMismatch { op : &'static str, expected : usize, found : usize },

    #[error("{family} does not implement {op}")]
    Unsupported { family : &'static str, op : &'static str },

    #[error("No divergence rule registered for the pair ({p}, {q})")]
    NoRule { p : &'static str, q : &'static str },

    #[error("Cannot pair {p} factors with {q} factors")]
    FactorCountMismatch { p : usize, q : usize },

    #[error("Factor index {index} out of range for {len} factors")]
    IndexOutOfRange { index : usize, len : usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String)

}
