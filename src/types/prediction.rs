use std::fmt;

/// Which identifier prediction reports for the rules it used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdKind {
    /// Row index in the store.
    #[default]
    Row,
    /// Value of the rule's `model` column, truncated to an integer.
    Model,
    /// Value of the rule's `node` column, truncated to an integer.
    Node,
}

/// Which counterfactual rules to report per model block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterfactualClass {
    /// The closest rule predicting any other class.
    #[default]
    First,
    /// The closest rule of every other class.
    All,
}

/// Options for [`RuleMatrix::predict_one`](super::matrix::RuleMatrix::predict_one)
/// and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictOptions {
    /// Let only the first matching rule of each model vote. Rules must be
    /// grouped by model in storage order.
    pub by_model: bool,
    pub id_kind: IdKind,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            by_model: true,
            id_kind: IdKind::Row,
        }
    }
}

/// Classification of a single instance.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Prediction {
    class: usize,
    votes: Vec<f64>,
    matched: Vec<usize>,
}

impl Prediction {
    pub(crate) fn new(class: usize, votes: Vec<f64>, matched: Vec<usize>) -> Self {
        Self {
            class,
            votes,
            matched,
        }
    }

    /// Index of the winning class.
    #[must_use]
    pub fn class(&self) -> usize {
        self.class
    }

    /// Normalized vote per class; sums to one.
    #[must_use]
    pub fn votes(&self) -> &[f64] {
        &self.votes
    }

    /// Identifiers of the rules that voted, in scan order.
    #[must_use]
    pub fn matched(&self) -> &[usize] {
        &self.matched
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {} (votes: [", self.class)?;
        for (i, v) in self.votes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v:.4}")?;
        }
        write!(f, "], {} rules)", self.matched.len())
    }
}

/// Prediction plus the counterfactual rules closest to each model's match.
///
/// Returned by
/// [`RuleMatrix::predict_one_with_counterfactual()`](super::matrix::RuleMatrix::predict_one_with_counterfactual).
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Explanation {
    prediction: Prediction,
    counterfactual: Vec<usize>,
    per_rule_delta: Vec<f64>,
}

impl Explanation {
    pub(crate) fn new(
        prediction: Prediction,
        counterfactual: Vec<usize>,
        per_rule_delta: Vec<f64>,
    ) -> Self {
        Self {
            prediction,
            counterfactual,
            per_rule_delta,
        }
    }

    pub fn prediction(&self) -> &Prediction {
        &self.prediction
    }

    #[must_use]
    pub fn class(&self) -> usize {
        self.prediction.class
    }

    #[must_use]
    pub fn vote_distribution(&self) -> &[f64] {
        &self.prediction.votes
    }

    #[must_use]
    pub fn matched_rule_ids(&self) -> &[usize] {
        &self.prediction.matched
    }

    /// Counterfactual rule identifiers, model block by model block.
    #[must_use]
    pub fn counterfactual_rule_ids(&self) -> &[usize] {
        &self.counterfactual
    }

    /// `delta_sum` of every stored rule, indexed by row. Zero for matches.
    #[must_use]
    pub fn per_rule_delta(&self) -> &[f64] {
        &self.per_rule_delta
    }
}
