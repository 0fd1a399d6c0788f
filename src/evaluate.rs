use ndarray::ArrayView1;

use crate::{MatchResult, MatrixError, PredicateType, RuleId, RuleMatrix, RuleOutcome};

impl RuleMatrix {
    /// Apply one rule to one feature vector.
    ///
    /// Each constrained feature is checked once. With `all_predicates` unset
    /// evaluation stops at the first violated predicate and `delta_sum` is
    /// `0.0`; otherwise every violated predicate adds its normalized
    /// distance to the nearest bound.
    ///
    /// # Errors
    ///
    /// [`MatrixError::InputShape`] if `x` is not `n_features()` long,
    /// [`MatrixError::RuleOutOfBounds`] for an unknown rule,
    /// [`MatrixError::UnsupportedPredicate`] for a binary store.
    pub fn apply_rule(
        &self,
        rule: RuleId,
        x: ArrayView1<'_, f64>,
        y: Option<usize>,
        all_predicates: bool,
    ) -> Result<RuleOutcome, MatrixError> {
        self.check_instance(x)?;
        self.check_rule(rule)?;
        self.apply_unchecked(rule, x, y, all_predicates)
    }

    pub(crate) fn check_instance(&self, x: ArrayView1<'_, f64>) -> Result<(), MatrixError> {
        if x.len() != self.n_features() {
            return Err(MatrixError::InputShape {
                what: "feature vector",
                expected: self.n_features(),
                actual: x.len(),
            });
        }
        Ok(())
    }

    /// [`apply_rule`](Self::apply_rule) without the shape and bounds checks,
    /// for callers that validated them once up front.
    pub(crate) fn apply_unchecked(
        &self,
        rule: RuleId,
        x: ArrayView1<'_, f64>,
        y: Option<usize>,
        all_predicates: bool,
    ) -> Result<RuleOutcome, MatrixError> {
        match self.predicate_type() {
            PredicateType::Range => Ok(self.apply_range(rule, x, y, all_predicates)),
            PredicateType::Binary => Err(MatrixError::UnsupportedPredicate(PredicateType::Binary)),
        }
    }

    fn apply_range(
        &self,
        rule: RuleId,
        x: ArrayView1<'_, f64>,
        y: Option<usize>,
        all_predicates: bool,
    ) -> RuleOutcome {
        let (columns, values) = self.feature_entries(rule);
        let mut matched = true;
        let mut delta_sum = 0.0;
        let mut last_feature = None;

        for (i, &column) in columns.iter().enumerate() {
            let feature = column / 2;
            if last_feature == Some(feature) {
                continue;
            }
            last_feature = Some(feature);

            // Columns are ascending, so alpha (even) precedes beta (odd).
            let (alpha, beta) = if column % 2 == 0 {
                let beta = match columns.get(i + 1) {
                    Some(&next) if next == column + 1 => values[i + 1],
                    _ => 0.0,
                };
                (values[i], beta)
            } else {
                (0.0, values[i])
            };

            let value = x[feature];
            if value >= alpha && value <= beta {
                continue;
            }
            matched = false;
            if !all_predicates {
                break;
            }
            delta_sum += self.normalized_delta(feature, value, alpha, beta);
        }

        let result = match (matched, y) {
            (false, _) => MatchResult::NoMatch,
            (true, Some(label)) if label != self.class(rule) => MatchResult::MatchWrongClass,
            (true, _) => MatchResult::Match,
        };
        RuleOutcome { result, delta_sum }
    }

    fn normalized_delta(&self, feature: usize, value: f64, alpha: f64, beta: f64) -> f64 {
        let delta = if value < alpha {
            (value - alpha).abs()
        } else {
            (value - beta).abs()
        };
        let span = self.feature_values_max[feature] - self.feature_values_min[feature];
        if span.is_finite() && span > 0.0 {
            delta / span
        } else {
            delta
        }
    }
}
