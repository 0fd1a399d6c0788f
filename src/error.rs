use thiserror::Error;

use crate::{DeserializeError, MatrixError, SerializeError};

/// Unified error type covering store operations, persistence, and I/O.
///
/// Every module returns its own narrower error; this one lets callers mix
/// them behind a single `?`.
#[derive(Debug, Error)]
pub enum RuleMatrixError {
    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    #[error(transparent)]
    Deserialize(#[from] DeserializeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
