use ndarray::{Array1, Array2};
use proptest::prelude::*;
use rulematrix::RuleMatrix;

// --- Fixed value domain ---
// every feature ranges over [0, 10]; instances are drawn from [-2, 12] so
// some fall outside every predicate.

pub const FEATURE_MAX: f64 = 10.0;

/// One generated rule before it is laid out into a dense row.
#[derive(Debug, Clone)]
pub struct GenRule {
    /// `(feature, alpha, beta)` with `alpha <= beta`; at most one per feature.
    pub bounds: Vec<(usize, f64, f64)>,
    pub model: u32,
    pub class: usize,
    pub values: Vec<f64>,
}

/// A generated store description plus a labelled batch to run it against.
#[derive(Debug, Clone)]
pub struct GenStore {
    pub n_features: usize,
    pub n_classes: usize,
    pub rules: Vec<GenRule>,
    pub x: Array2<f64>,
    pub y: Array1<usize>,
}

impl GenStore {
    /// Lay the rules out in storage order, grouped by model.
    pub fn build(&self) -> RuleMatrix {
        let mut store = RuleMatrix::builder(self.n_features, self.n_classes)
            .feature_range(vec![0.0; self.n_features], vec![FEATURE_MAX; self.n_features])
            .class_instances_count(self.class_counts())
            .build()
            .unwrap();
        let layout = *store.layout();

        let rows: Vec<Vec<f64>> = self
            .rules
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let mut row = vec![0.0; layout.width()];
                for &(f, alpha, beta) in &rule.bounds {
                    row[2 * f] = alpha;
                    row[2 * f + 1] = beta;
                }
                row[layout.id] = i as f64;
                row[layout.model] = f64::from(rule.model);
                row[layout.node] = i as f64;
                row[layout.class] = rule.class as f64;
                row[layout.n_predicates] = rule.bounds.len() as f64;
                row[layout.value_total] = rule.values.iter().sum();
                row[layout.value_c0..layout.value_c0 + self.n_classes]
                    .copy_from_slice(&rule.values);
                row
            })
            .collect();
        store.set_rules(&rows).unwrap();
        store
    }

    pub fn class_counts(&self) -> Vec<u64> {
        let mut counts = vec![0; self.n_classes];
        for &label in &self.y {
            counts[label] += 1;
        }
        counts
    }
}

fn arb_bound(feature: usize) -> impl Strategy<Value = (usize, f64, f64)> {
    (0.0..FEATURE_MAX, 0.0..FEATURE_MAX).prop_map(move |(a, b)| {
        if a <= b {
            (feature, a, b)
        } else {
            (feature, b, a)
        }
    })
}

fn arb_rule(n_features: usize, n_classes: usize) -> impl Strategy<Value = GenRule> {
    (
        prop::collection::vec(any::<bool>(), n_features),
        prop::collection::vec(arb_bound(0), n_features),
        0_u32..3,
        0..n_classes,
        prop::collection::vec(0.0_f64..20.0, n_classes),
    )
        .prop_map(|(keep, bounds, model, class, values)| GenRule {
            bounds: bounds
                .into_iter()
                .enumerate()
                .filter(|&(f, _)| keep[f])
                .map(|(f, (_, a, b))| (f, a, b))
                .collect(),
            model,
            class,
            values,
        })
}

/// A store of 1..=12 rules over 1..=3 features and 2..=4 classes, with
/// 1..=24 labelled instances.
pub fn arb_store() -> impl Strategy<Value = GenStore> {
    (1_usize..=3, 2_usize..=4).prop_flat_map(|(n_features, n_classes)| {
        (
            prop::collection::vec(arb_rule(n_features, n_classes), 1..=12),
            prop::collection::vec(
                (prop::collection::vec(-2.0_f64..12.0, n_features), 0..n_classes),
                1..=24,
            ),
        )
            .prop_map(move |(mut rules, instances)| {
                rules.sort_by_key(|r| r.model);
                let n = instances.len();
                let flat: Vec<f64> = instances.iter().flat_map(|(x, _)| x.clone()).collect();
                GenStore {
                    n_features,
                    n_classes,
                    rules,
                    x: Array2::from_shape_vec((n, n_features), flat).unwrap(),
                    y: instances.iter().map(|&(_, label)| label).collect(),
                }
            })
    })
}
