use thiserror::Error;

use super::predicate::PredicateType;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("invalid dimensions: n_features = {n_features}, n_classes = {n_classes}; both must be positive")]
    InvalidDimensions { n_features: usize, n_classes: usize },

    #[error("dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("input shape error for {what}: expected {expected}, got {actual}")]
    InputShape {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown predicate type '{0}'")]
    UnknownPredicateType(String),

    #[error("predicate type '{0}' cannot be evaluated")]
    UnsupportedPredicate(PredicateType),

    #[error("class value {value} is not in [0, {n_classes})")]
    InvalidClass { value: f64, n_classes: usize },

    #[error("rule {rule} out of bounds ({n_rules} rules stored)")]
    RuleOutOfBounds { rule: usize, n_rules: usize },

    #[error("instance {instance} out of bounds ({n_instances} instances supplied)")]
    InstanceOutOfBounds { instance: usize, n_instances: usize },

    #[error("no rules stored; prediction requires at least one rule")]
    NoRules,

    #[error("worker {worker} failed while processing its chunk")]
    WorkerFailure { worker: usize },
}
