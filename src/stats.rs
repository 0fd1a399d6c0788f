use ndarray::{ArrayView1, ArrayView2};
use tracing::debug;

use crate::{Encoding, MatrixError, RuleId, RuleMatrix};

impl RuleMatrix {
    /// Compute support and coverage from labelled instances and write them
    /// into the `support` / `coverage` columns.
    ///
    /// Mapping always runs over every rule in
    /// [`mapping_order`](Self::mapping_order) with one firing rule per model
    /// and instance; only the rules in `rules` (all rules when `None`) are
    /// written back. Afterwards [`instances_map`](Self::instances_map)
    /// holds the map with every firing marked `1`.
    ///
    /// - `support = correctly covered / class_instances_count[class]`; the
    ///   denominator is raised to the occurrences of the class in `y` when
    ///   the stored count is lower, so support never exceeds one.
    /// - `coverage = covered / n_instances`.
    ///
    /// # Errors
    ///
    /// Any error of [`imap`](Self::imap), or
    /// [`MatrixError::RuleOutOfBounds`] for an unknown rule.
    pub fn calc_support_coverage(
        &mut self,
        rules: Option<&[RuleId]>,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, usize>,
        n_jobs: usize,
    ) -> Result<(), MatrixError> {
        if let Some(rules) = rules {
            for &rule in rules {
                self.check_rule(rule)?;
            }
        }
        let mut map = self.imap(x, Some(y), Encoding::BinarySigned, true, n_jobs)?;
        debug!(n_instances = x.nrows(), "computing support and coverage");

        let observed = self.observed_class_counts(y);
        let n_instances = x.nrows() as u64;
        let all: Vec<RuleId>;
        let targets = match rules {
            Some(rules) => rules,
            None => {
                all = (0..self.n_rules()).collect();
                &all
            }
        };

        for &rule in targets {
            let (_, values) = map.row_entries(rule);
            let covered = values.len();
            let supported = values.iter().filter(|&&v| v > 0.0).count();
            let class = self.class(rule);
            let denominator = self.class_instances_count[class].max(observed[class]);

            let support = ratio(supported, denominator);
            let coverage = ratio(covered, n_instances);
            self.set_meta(rule, self.layout.support, support);
            self.set_meta(rule, self.layout.coverage, coverage);
        }

        map.map_values(f64::abs);
        self.instances_map = Some(map);
        debug!("support and coverage done");
        Ok(())
    }

    fn observed_class_counts(&self, y: ArrayView1<'_, usize>) -> Vec<u64> {
        let mut counts = vec![0; self.n_classes()];
        for &label in y {
            if let Some(count) = counts.get_mut(label) {
                *count += 1;
            }
        }
        counts
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(count: usize, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    /// One feature, two models. Model 0 splits at 5, model 1 covers `[2, 8]`.
    fn store(counts: Vec<u64>) -> RuleMatrix {
        let mut store = RuleMatrix::builder(1, 2)
            .feature_range(vec![0.0], vec![10.0])
            .class_instances_count(counts)
            .build()
            .unwrap();
        let layout = *store.layout();
        let make = |alpha: f64, beta: f64, model: f64, class: f64| {
            let mut row = vec![0.0; layout.width()];
            row[0] = alpha;
            row[1] = beta;
            row[layout.model] = model;
            row[layout.class] = class;
            row[layout.support] = f64::NAN;
            row[layout.coverage] = f64::NAN;
            row
        };
        store
            .set_rules(&[
                make(0.0, 5.0, 0.0, 0.0),
                make(5.5, 10.0, 0.0, 1.0),
                make(2.0, 8.0, 1.0, 1.0),
            ])
            .unwrap();
        store
    }

    fn data() -> (ndarray::Array2<f64>, ndarray::Array1<usize>) {
        (
            array![[1.0], [3.0], [4.0], [6.0], [9.0]],
            array![0_usize, 0, 1, 1, 1],
        )
    }

    #[test]
    fn support_and_coverage_values() {
        let mut s = store(vec![2, 3]);
        let (x, y) = data();
        s.calc_support_coverage(None, x.view(), y.view(), 1).unwrap();

        // rule 0 covers 1, 3, 4; correct on 1 and 3
        assert_relative_eq!(s.support(0), 2.0 / 2.0);
        assert_relative_eq!(s.coverage(0), 3.0 / 5.0);
        // rule 1 covers 6, 9, both class 1
        assert_relative_eq!(s.support(1), 2.0 / 3.0);
        assert_relative_eq!(s.coverage(1), 2.0 / 5.0);
        // rule 2 covers 3, 4, 6; correct on 4 and 6
        assert_relative_eq!(s.support(2), 2.0 / 3.0);
        assert_relative_eq!(s.coverage(2), 3.0 / 5.0);
    }

    #[test]
    fn instance_map_is_unsigned_afterwards() {
        let mut s = store(vec![2, 3]);
        let (x, y) = data();
        s.calc_support_coverage(None, x.view(), y.view(), 2).unwrap();
        let map = s.instances_map().unwrap();
        assert_eq!(map.shape(), (3, 5));
        assert_eq!(map.row_dense(0), vec![1.0, 1.0, 1.0, 0.0, 0.0]);
        assert!(map.triplets().all(|(_, _, v)| v == 1.0));
    }

    #[test]
    fn subset_leaves_other_rules_untouched() {
        let mut s = store(vec![2, 3]);
        let (x, y) = data();
        s.calc_support_coverage(Some(&[1][..]), x.view(), y.view(), 1).unwrap();
        assert!(s.support(0).is_nan());
        assert!(s.coverage(2).is_nan());
        assert_relative_eq!(s.coverage(1), 0.4);
    }

    #[test]
    fn zero_class_count_uses_labels() {
        let mut s = store(vec![0, 0]);
        let (x, y) = data();
        s.calc_support_coverage(None, x.view(), y.view(), 1).unwrap();
        assert_relative_eq!(s.support(0), 1.0);
        assert_relative_eq!(s.support(1), 2.0 / 3.0);
    }

    #[test]
    fn understated_class_count_keeps_support_bounded() {
        // three instances of class 1 in y, but only one recorded
        let mut s = store(vec![2, 1]);
        let (x, y) = data();
        s.calc_support_coverage(None, x.view(), y.view(), 1).unwrap();
        assert_relative_eq!(s.support(1), 2.0 / 3.0);
        assert_relative_eq!(s.support(2), 2.0 / 3.0);
        for r in 0..3 {
            assert!(s.support(r) <= 1.0);
        }
    }

    #[test]
    fn unknown_rule_fails_before_mapping() {
        let mut s = store(vec![2, 3]);
        let (x, y) = data();
        let err = s
            .calc_support_coverage(Some(&[7][..]), x.view(), y.view(), 1)
            .unwrap_err();
        assert!(matches!(err, MatrixError::RuleOutOfBounds { rule: 7, .. }));
        assert!(s.instances_map().is_none());
    }

    #[test]
    fn statistics_do_not_depend_on_jobs() {
        let (x, y) = data();
        let mut one = store(vec![2, 3]);
        let mut many = store(vec![2, 3]);
        one.calc_support_coverage(None, x.view(), y.view(), 1).unwrap();
        many.calc_support_coverage(None, x.view(), y.view(), 4).unwrap();
        for r in 0..3 {
            assert_eq!(one.support(r).to_bits(), many.support(r).to_bits());
            assert_eq!(one.coverage(r).to_bits(), many.coverage(r).to_bits());
        }
        assert_eq!(one.instances_map(), many.instances_map());
    }
}
