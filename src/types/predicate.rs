use std::fmt;
use std::str::FromStr;

use super::error::MatrixError;

/// How a rule constrains each feature. Fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PredicateType {
    /// Closed interval `[alpha, beta]`, two columns per feature.
    #[default]
    Range,
    /// One column per feature. Only the column width is defined;
    /// evaluating a binary store returns [`MatrixError::UnsupportedPredicate`].
    Binary,
}

impl PredicateType {
    /// Number of matrix columns each feature occupies.
    #[must_use]
    pub fn shift(self) -> usize {
        match self {
            Self::Range => 2,
            Self::Binary => 1,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Range => "range",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for PredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredicateType {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "range" => Ok(Self::Range),
            "binary" => Ok(Self::Binary),
            other => Err(MatrixError::UnknownPredicateType(other.to_owned())),
        }
    }
}

/// Outcome of applying one rule to one instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchResult {
    /// Every predicate holds (and the label, if given, agrees with the rule).
    Match,
    /// Every predicate holds but the supplied label differs from the rule class.
    MatchWrongClass,
    NoMatch,
}

impl MatchResult {
    /// `1` for a match, `-1` for a wrong-class match, `0` otherwise.
    #[must_use]
    pub fn sign(self) -> i8 {
        match self {
            Self::Match => 1,
            Self::MatchWrongClass => -1,
            Self::NoMatch => 0,
        }
    }

    /// Whether all predicates held, regardless of the label.
    #[must_use]
    pub fn fired(self) -> bool {
        !matches!(self, Self::NoMatch)
    }
}

/// Result of [`RuleMatrix::apply_rule`](super::matrix::RuleMatrix::apply_rule).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleOutcome {
    pub result: MatchResult,
    /// Sum of normalized distances to the violated bounds. Always `0.0`
    /// for short-circuited evaluation.
    pub delta_sum: f64,
}
