use std::cmp::Ordering;
use std::ops::Range;
use std::thread;

use ndarray::{ArrayView1, ArrayView2};
use tracing::{debug, trace};

use crate::{MatchResult, MatrixError, RuleId, RuleMatrix, SparseMatrix};

/// Value written into the instance map for each evaluated rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// `1` where the rule fires.
    #[default]
    Binary,
    /// `1` where the rule fires with the right label, `-1` where it fires
    /// with the wrong one. Needs labels to produce `-1`.
    BinarySigned,
    /// Normalized distance (`delta_sum`) of every evaluated rule that does
    /// not fire. Firing rules are at distance zero and stay unset.
    Real,
}

/// Split `0..n_items` into at most `n_jobs` contiguous chunks. The first
/// `n_items % n_jobs` chunks are one item longer. Always returns at least
/// one (possibly empty) chunk.
pub(crate) fn partition(n_items: usize, n_jobs: usize) -> Vec<Range<usize>> {
    let n_chunks = n_jobs.max(1).min(n_items.max(1));
    let base = n_items / n_chunks;
    let extra = n_items % n_chunks;
    let mut start = 0;
    (0..n_chunks)
        .map(|i| {
            let len = base + usize::from(i < extra);
            let chunk = start..start + len;
            start += len;
            chunk
        })
        .collect()
}

/// Run `work` over each chunk of `0..n_items` on its own scoped thread and
/// collect the results in chunk order.
///
/// Fails with the error of the lowest failing chunk, or
/// [`MatrixError::WorkerFailure`] if that worker panicked.
pub(crate) fn fork_join<T, F>(n_items: usize, n_jobs: usize, work: F) -> Result<Vec<T>, MatrixError>
where
    T: Send,
    F: Fn(usize, Range<usize>) -> Result<T, MatrixError> + Sync,
{
    let chunks = partition(n_items, n_jobs);
    let work = &work;
    thread::scope(|scope| {
        let handles: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(worker, chunk)| scope.spawn(move || work(worker, chunk)))
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        let mut failure = None;
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.join() {
                Ok(Ok(part)) => results.push(part),
                Ok(Err(err)) => {
                    failure.get_or_insert(err);
                }
                Err(_) => {
                    failure.get_or_insert(MatrixError::WorkerFailure { worker });
                }
            }
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(results),
        }
    })
}

impl RuleMatrix {
    /// All rules ordered by model ascending, then support descending.
    ///
    /// With `by_model` mapping the first rule to fire in a model is then
    /// the best-supported one. Rules without support (`NaN`) sort last
    /// within their model; ties keep storage order.
    #[must_use]
    pub fn mapping_order(&self) -> Vec<RuleId> {
        let mut order: Vec<RuleId> = (0..self.n_rules()).collect();
        order.sort_by(|&a, &b| {
            self.model(a)
                .total_cmp(&self.model(b))
                .then_with(|| support_desc(self.support(a), self.support(b)))
        });
        order
    }

    /// Map the selected instances (rows of `x`) against `rules`, in the
    /// given rule order.
    ///
    /// The result has one row per stored rule and one column per entry of
    /// `instances`; rules not listed stay empty.
    ///
    /// # Errors
    ///
    /// [`MatrixError::InputShape`] for a wrong feature or label count,
    /// [`MatrixError::RuleOutOfBounds`] / [`MatrixError::InstanceOutOfBounds`]
    /// for unknown indices, and any evaluation error.
    pub fn map_instances(
        &self,
        rules: &[RuleId],
        instances: &[usize],
        x: ArrayView2<'_, f64>,
        y: Option<ArrayView1<'_, usize>>,
        encoding: Encoding,
        by_model: bool,
    ) -> Result<SparseMatrix, MatrixError> {
        self.check_batch(x, y)?;
        for &rule in rules {
            self.check_rule(rule)?;
        }
        if let Some(&instance) = instances.iter().find(|&&k| k >= x.nrows()) {
            return Err(MatrixError::InstanceOutOfBounds {
                instance,
                n_instances: x.nrows(),
            });
        }

        let mut triplets = Vec::new();
        for (column, &k) in instances.iter().enumerate() {
            let label = y.map(|y| y[k]);
            self.map_one(rules, x.row(k), label, encoding, by_model, column, &mut triplets)?;
        }
        Ok(SparseMatrix::from_triplets(
            self.n_rules(),
            instances.len(),
            triplets,
        ))
    }

    /// Map every row of `x` against every rule, split over `n_jobs` worker
    /// threads. Rules are visited in [`mapping_order`](Self::mapping_order).
    ///
    /// The result is identical for any `n_jobs`.
    ///
    /// # Errors
    ///
    /// As [`map_instances`](Self::map_instances), plus
    /// [`MatrixError::WorkerFailure`] if a worker panics.
    pub fn imap(
        &self,
        x: ArrayView2<'_, f64>,
        y: Option<ArrayView1<'_, usize>>,
        encoding: Encoding,
        by_model: bool,
        n_jobs: usize,
    ) -> Result<SparseMatrix, MatrixError> {
        self.check_batch(x, y)?;
        let order = self.mapping_order();
        debug!(
            n_rules = self.n_rules(),
            n_instances = x.nrows(),
            n_jobs,
            ?encoding,
            by_model,
            "starting instance mapping"
        );

        let parts = fork_join(x.nrows(), n_jobs, |worker, chunk| {
            trace!(worker, start = chunk.start, end = chunk.end, "mapping chunk");
            let instances: Vec<usize> = chunk.collect();
            self.map_instances(&order, &instances, x, y, encoding, by_model)
        })?;

        let map = SparseMatrix::hstack(&parts).ok_or(MatrixError::DimensionMismatch {
            what: "partial instance map rows",
            expected: self.n_rules(),
            actual: parts.first().map_or(0, SparseMatrix::n_rows),
        })?;
        debug!(nnz = map.nnz(), "instance mapping done");
        Ok(map)
    }

    pub(crate) fn check_batch(
        &self,
        x: ArrayView2<'_, f64>,
        y: Option<ArrayView1<'_, usize>>,
    ) -> Result<(), MatrixError> {
        if x.ncols() != self.n_features() {
            return Err(MatrixError::InputShape {
                what: "feature matrix columns",
                expected: self.n_features(),
                actual: x.ncols(),
            });
        }
        if let Some(y) = y {
            if y.len() != x.nrows() {
                return Err(MatrixError::InputShape {
                    what: "label vector",
                    expected: x.nrows(),
                    actual: y.len(),
                });
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn map_one(
        &self,
        rules: &[RuleId],
        x: ArrayView1<'_, f64>,
        y: Option<usize>,
        encoding: Encoding,
        by_model: bool,
        column: usize,
        out: &mut Vec<(usize, usize, f64)>,
    ) -> Result<(), MatrixError> {
        let all_predicates = encoding == Encoding::Real;
        let mut current_model = None;

        for &rule in rules {
            let model = self.model_key(rule);
            if by_model && current_model == Some(model) {
                continue;
            }
            let outcome = self.apply_unchecked(rule, x, y, all_predicates)?;
            let value = match encoding {
                Encoding::Binary => f64::from(outcome.result.fired()),
                Encoding::BinarySigned => f64::from(outcome.result.sign()),
                Encoding::Real if outcome.result == MatchResult::NoMatch => outcome.delta_sum,
                Encoding::Real => 0.0,
            };
            if value != 0.0 {
                out.push((rule, column, value));
            }
            if outcome.result.fired() {
                current_model = Some(model);
            }
        }
        Ok(())
    }
}

fn support_desc(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.total_cmp(&a),
    }
}
