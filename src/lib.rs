mod error;
mod evaluate;
mod map;
mod predict;
mod serial;
mod stats;
mod types;

pub use error::RuleMatrixError;
pub use map::Encoding;
pub use serial::{DeserializeError, MatrixFormat, SerializeError, companion_path};
pub use types::{
    ColumnLayout, CounterfactualClass, Explanation, IdKind, METADATA_COLUMNS, MatchResult,
    MatrixError, PredicateType, PredictOptions, Prediction, RuleId, RuleMatrix, RuleMatrixBuilder,
    RuleOutcome, SparseMatrix,
};
