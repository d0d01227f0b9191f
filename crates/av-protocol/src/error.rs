use thiserror::Error;

/// Errors raised while building protocol values.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("session metadata has {inputs} inputs but {types} types")]
    MetaLengthMismatch { inputs: usize, types: usize },

    #[error("image shape {shape:?} needs {expected} samples, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("image shape {0:?} has too many samples")]
    ShapeOverflow(Vec<usize>),

    #[error("image arrays must be 2-D or 3-D, got {0} dimensions")]
    Dimensions(usize),

    #[error("value for '{field}' is not a valid {expected}: {reason}")]
    InvalidValue {
        field: String,
        expected: String,
        reason: String,
    },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
