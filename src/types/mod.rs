mod error;
mod layout;
mod matrix;
mod predicate;
mod prediction;
mod sparse;

pub use error::MatrixError;
pub use layout::{ColumnLayout, METADATA_COLUMNS};
pub use matrix::{RuleId, RuleMatrix, RuleMatrixBuilder};
pub use predicate::{MatchResult, PredicateType, RuleOutcome};
pub use prediction::{CounterfactualClass, Explanation, IdKind, PredictOptions, Prediction};
pub use sparse::SparseMatrix;
