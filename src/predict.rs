use ndarray::{ArrayView1, ArrayView2};
use tracing::debug;

use crate::map::fork_join;
use crate::{
    CounterfactualClass, Explanation, IdKind, MatchResult, MatrixError, PredictOptions,
    Prediction, RuleId, RuleMatrix,
};

/// Non-matching rules of the model block being scanned, kept sorted by
/// ascending `delta_sum` (ties in scan order), plus the class of the rule
/// that matched in this block, if any.
#[derive(Debug, Default)]
struct ModelBlock {
    matched_class: Option<usize>,
    misses: Vec<(f64, RuleId)>,
}

impl ModelBlock {
    fn push_miss(&mut self, delta_sum: f64, rule: RuleId) {
        let pos = self.misses.partition_point(|&(d, _)| d <= delta_sum);
        self.misses.insert(pos, (delta_sum, rule));
    }

    /// Append the closest differing-class rules of this block to `out`.
    /// A block where nothing matched has no class to differ from.
    fn resolve(
        &self,
        store: &RuleMatrix,
        mode: CounterfactualClass,
        id_kind: IdKind,
        out: &mut Vec<usize>,
    ) {
        let Some(matched_class) = self.matched_class else {
            return;
        };
        match mode {
            CounterfactualClass::First => {
                if let Some(&(_, rule)) = self
                    .misses
                    .iter()
                    .find(|&&(_, r)| store.class(r) != matched_class)
                {
                    out.push(store.report_id(rule, id_kind));
                }
            }
            CounterfactualClass::All => {
                let mut seen = vec![matched_class];
                for &(_, rule) in &self.misses {
                    let class = store.class(rule);
                    if !seen.contains(&class) {
                        seen.push(class);
                        out.push(store.report_id(rule, id_kind));
                    }
                }
            }
        }
    }
}

impl RuleMatrix {
    /// Classify one instance.
    ///
    /// With `options.by_model` rules are scanned in storage order and only
    /// the first matching rule of each model votes; otherwise every matching
    /// rule votes. Each vote is the rule's class distribution
    /// `value_c* / value_total`. When nothing votes, the class priors from
    /// `class_instances_count` are used (uniform if those are all zero).
    ///
    /// # Errors
    ///
    /// [`MatrixError::NoRules`] on an empty store,
    /// [`MatrixError::InputShape`] for a wrong-length `x`.
    pub fn predict_one(
        &self,
        x: ArrayView1<'_, f64>,
        options: PredictOptions,
    ) -> Result<Prediction, MatrixError> {
        self.check_predictable(x)?;
        self.predict_checked(x, options)
    }

    fn predict_checked(
        &self,
        x: ArrayView1<'_, f64>,
        options: PredictOptions,
    ) -> Result<Prediction, MatrixError> {
        let mut votes = vec![0.0; self.n_classes()];
        let mut matched = Vec::new();
        let mut current_model = None;

        for rule in 0..self.n_rules() {
            let model = self.model_key(rule);
            if options.by_model && current_model == Some(model) {
                continue;
            }
            let outcome = self.apply_unchecked(rule, x, None, false)?;
            if outcome.result == MatchResult::Match {
                self.add_vote(rule, &mut votes);
                matched.push(self.report_id(rule, options.id_kind));
                current_model = Some(model);
            }
        }

        let (class, votes) = self.finish_votes(votes);
        Ok(Prediction::new(class, votes, matched))
    }

    /// Classify one instance and locate its counterfactual rules.
    ///
    /// Every rule is evaluated in full. Rules are grouped into model blocks
    /// by consecutive equal `model` values; every matching rule votes. For
    /// each block the non-matching rules are ranked by `delta_sum` and the
    /// closest one(s) predicting a class other than the block's matched
    /// class are reported.
    ///
    /// # Errors
    ///
    /// Same as [`predict_one`](Self::predict_one).
    pub fn predict_one_with_counterfactual(
        &self,
        x: ArrayView1<'_, f64>,
        id_kind: IdKind,
        mode: CounterfactualClass,
    ) -> Result<Explanation, MatrixError> {
        self.check_predictable(x)?;

        let mut votes = vec![0.0; self.n_classes()];
        let mut matched = Vec::new();
        let mut counterfactual = Vec::new();
        let mut per_rule_delta = Vec::with_capacity(self.n_rules());
        let mut current_model = None;
        let mut block = ModelBlock::default();

        for rule in 0..self.n_rules() {
            let outcome = self.apply_unchecked(rule, x, None, true)?;
            per_rule_delta.push(outcome.delta_sum);

            let model = self.model_key(rule);
            if current_model.is_some_and(|m| m != model) {
                block.resolve(self, mode, id_kind, &mut counterfactual);
                block = ModelBlock::default();
            }
            current_model = Some(model);

            if outcome.result == MatchResult::Match {
                block.matched_class = Some(self.class(rule));
                self.add_vote(rule, &mut votes);
                matched.push(self.report_id(rule, id_kind));
            } else {
                block.push_miss(outcome.delta_sum, rule);
            }
        }
        block.resolve(self, mode, id_kind, &mut counterfactual);

        let (class, votes) = self.finish_votes(votes);
        Ok(Explanation::new(
            Prediction::new(class, votes, matched),
            counterfactual,
            per_rule_delta,
        ))
    }

    /// Classify every row of `x`, split over `n_jobs` worker threads.
    /// Results are in row order.
    ///
    /// # Errors
    ///
    /// [`MatrixError::NoRules`], [`MatrixError::InputShape`], or
    /// [`MatrixError::WorkerFailure`] if a worker panics.
    pub fn predict_batch(
        &self,
        x: ArrayView2<'_, f64>,
        options: PredictOptions,
        n_jobs: usize,
    ) -> Result<Vec<Prediction>, MatrixError> {
        if self.n_rules() == 0 {
            return Err(MatrixError::NoRules);
        }
        self.check_batch(x, None)?;
        debug!(n_instances = x.nrows(), n_jobs, "predicting batch");

        let parts = fork_join(x.nrows(), n_jobs, |_, chunk| {
            chunk
                .map(|k| self.predict_checked(x.row(k), options))
                .collect::<Result<Vec<_>, _>>()
        })?;
        Ok(parts.into_iter().flatten().collect())
    }

    /// Normalized vote of `rules` taken together.
    ///
    /// # Errors
    ///
    /// [`MatrixError::RuleOutOfBounds`] for an unknown rule.
    pub fn aggregate_votes(&self, rules: &[RuleId]) -> Result<Vec<f64>, MatrixError> {
        let mut votes = vec![0.0; self.n_classes()];
        for &rule in rules {
            self.check_rule(rule)?;
            self.add_vote(rule, &mut votes);
        }
        Ok(self.finish_votes(votes).1)
    }

    /// Normalized vote after each prefix of `rules`: entry `i` aggregates
    /// `rules[..=i]`.
    ///
    /// # Errors
    ///
    /// [`MatrixError::RuleOutOfBounds`] for an unknown rule.
    pub fn partial_votes(&self, rules: &[RuleId]) -> Result<Vec<Vec<f64>>, MatrixError> {
        let mut votes = vec![0.0; self.n_classes()];
        let mut partial = Vec::with_capacity(rules.len());
        for &rule in rules {
            self.check_rule(rule)?;
            self.add_vote(rule, &mut votes);
            partial.push(self.finish_votes(votes.clone()).1);
        }
        Ok(partial)
    }

    fn check_predictable(&self, x: ArrayView1<'_, f64>) -> Result<(), MatrixError> {
        if self.n_rules() == 0 {
            return Err(MatrixError::NoRules);
        }
        self.check_instance(x)
    }

    /// Add the class distribution of `rule` to `votes`. Rules without a
    /// positive total carry no distribution and add nothing.
    fn add_vote(&self, rule: RuleId, votes: &mut [f64]) {
        let total = self.value_total(rule);
        if !(total.is_finite() && total > 0.0) {
            return;
        }
        for (vote, count) in votes.iter_mut().zip(self.class_values(rule)) {
            *vote += count / total;
        }
    }

    /// Normalize `votes` to sum to one and pick the first maximum.
    fn finish_votes(&self, votes: Vec<f64>) -> (usize, Vec<f64>) {
        let sum: f64 = votes.iter().sum();
        let normalized = if sum > 0.0 {
            votes.into_iter().map(|v| v / sum).collect()
        } else {
            self.class_priors()
        };
        (argmax(&normalized), normalized)
    }

    /// Class frequencies from `class_instances_count`, or uniform.
    #[allow(clippy::cast_precision_loss)]
    pub fn class_priors(&self) -> Vec<f64> {
        let total: u64 = self.class_instances_count.iter().sum();
        if total == 0 {
            let k = self.n_classes() as f64;
            return vec![1.0 / k; self.n_classes()];
        }
        self.class_instances_count
            .iter()
            .map(|&c| c as f64 / total as f64)
            .collect()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn report_id(&self, rule: RuleId, kind: IdKind) -> usize {
        match kind {
            IdKind::Row => rule,
            IdKind::Model => self.model(rule) as usize,
            IdKind::Node => self.node(rule) as usize,
        }
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}
