use approx::assert_relative_eq;
use ndarray::{array, Array2};
use rulematrix::{
    CounterfactualClass, Encoding, IdKind, MatchResult, MatrixError, PredicateType,
    PredictOptions, RuleMatrix,
};

fn two_feature_store() -> RuleMatrix {
    RuleMatrix::builder(2, 2)
        .feature_range(vec![0.0, 0.0], vec![10.0, 10.0])
        .build()
        .unwrap()
}

fn single_rule(store: &RuleMatrix, class: usize, values: [f64; 2]) -> Vec<f64> {
    let layout = store.layout();
    let mut row = vec![0.0; layout.width()];
    row[0] = 0.0;
    row[1] = 5.0;
    row[2] = 0.0;
    row[3] = 5.0;
    row[layout.class] = class as f64;
    row[layout.value_c0] = values[0];
    row[layout.value_c0 + 1] = values[1];
    row[layout.value_total] = values[0] + values[1];
    row
}

#[test]
fn single_rule_votes_its_distribution() {
    let mut store = two_feature_store();
    let row = single_rule(&store, 0, [8.0, 2.0]);
    store.insert_rule(&row).unwrap();

    let p = store
        .predict_one(array![2.0, 2.0].view(), PredictOptions::default())
        .unwrap();
    assert_eq!(p.class(), 0);
    assert_relative_eq!(p.votes()[0], 0.8);
    assert_relative_eq!(p.votes()[1], 0.2);
    assert_eq!(p.matched(), &[0]);
}

#[test]
fn wrong_width_insert_leaves_store_unchanged() {
    let mut store = two_feature_store();
    let row = single_rule(&store, 0, [8.0, 2.0]);
    store.insert_rule(&row).unwrap();

    let err = store.insert_rule(&row[1..]).unwrap_err();
    assert!(matches!(
        err,
        MatrixError::DimensionMismatch { what: "rule row", .. }
    ));
    assert_eq!(store.n_rules(), 1);
}

#[test]
fn range_predicate_distance_is_normalized() {
    let mut store = RuleMatrix::builder(1, 2)
        .feature_range(vec![0.0], vec![10.0])
        .build()
        .unwrap();
    let layout = *store.layout();
    let mut row = vec![0.0; layout.width()];
    row[0] = 2.0;
    row[1] = 5.0;
    store.insert_rule(&row).unwrap();

    let hit = store.apply_rule(0, array![3.0].view(), None, true).unwrap();
    assert_eq!(hit.result, MatchResult::Match);

    let miss = store.apply_rule(0, array![6.0].view(), None, true).unwrap();
    assert_eq!(miss.result, MatchResult::NoMatch);
    assert_relative_eq!(miss.delta_sum, 0.1);
}

#[test]
fn no_match_falls_back_to_priors() {
    let mut store = RuleMatrix::builder(2, 2)
        .feature_range(vec![0.0, 0.0], vec![10.0, 10.0])
        .class_instances_count(vec![1, 3])
        .build()
        .unwrap();
    let row = single_rule(&store, 0, [8.0, 2.0]);
    store.insert_rule(&row).unwrap();

    let p = store
        .predict_one(array![9.0, 9.0].view(), PredictOptions::default())
        .unwrap();
    assert_eq!(p.class(), 1);
    assert_eq!(p.votes(), &[0.25, 0.75]);
    assert!(p.matched().is_empty());
}

#[test]
fn empty_store_cannot_predict() {
    let store = two_feature_store();
    let x = array![1.0, 1.0];
    assert!(matches!(
        store.predict_one(x.view(), PredictOptions::default()),
        Err(MatrixError::NoRules)
    ));
    assert!(matches!(
        store.predict_one_with_counterfactual(x.view(), IdKind::Row, CounterfactualClass::First),
        Err(MatrixError::NoRules)
    ));
    let batch = Array2::<f64>::zeros((3, 2));
    assert!(matches!(
        store.predict_batch(batch.view(), PredictOptions::default(), 2),
        Err(MatrixError::NoRules)
    ));
}

#[test]
fn wrong_instance_length_is_input_shape() {
    let mut store = two_feature_store();
    let row = single_rule(&store, 0, [8.0, 2.0]);
    store.insert_rule(&row).unwrap();
    let err = store
        .predict_one(array![1.0, 2.0, 3.0].view(), PredictOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        MatrixError::InputShape { expected: 2, actual: 3, .. }
    ));
}

#[test]
fn unknown_predicate_type_fails_construction() {
    let err = "fuzzy".parse::<PredicateType>().unwrap_err();
    assert!(matches!(err, MatrixError::UnknownPredicateType(name) if name == "fuzzy"));
}

#[test]
fn zero_dimension_store_rejected() {
    assert!(matches!(
        RuleMatrix::new(0, 2, PredicateType::Range),
        Err(MatrixError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        RuleMatrix::new(3, 0, PredicateType::Range),
        Err(MatrixError::InvalidDimensions { .. })
    ));
}

#[test]
fn binary_store_refuses_evaluation() {
    let mut store = RuleMatrix::new(2, 2, PredicateType::Binary).unwrap();
    let width = store.layout().width();
    assert_eq!(width, 2 + 13 + 2);
    store.insert_rule(&vec![0.0; width]).unwrap();
    let err = store
        .predict_one(array![1.0, 0.0].view(), PredictOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        MatrixError::UnsupportedPredicate(PredicateType::Binary)
    ));
}

#[test]
fn counterfactual_of_single_model() {
    // model 0: [0,3] -> 0, [3,6] -> 1, [6,10] -> 0, [9,10] -> 1
    let mut store = RuleMatrix::builder(1, 2)
        .feature_range(vec![0.0], vec![10.0])
        .build()
        .unwrap();
    let layout = *store.layout();
    let rows: Vec<Vec<f64>> = [(0.0, 3.0, 0_usize), (3.0, 6.0, 1), (6.0, 10.0, 0), (9.0, 10.0, 1)]
        .into_iter()
        .map(|(alpha, beta, class)| {
            let mut row = vec![0.0; layout.width()];
            row[0] = alpha;
            row[1] = beta;
            row[layout.class] = class as f64;
            row[layout.value_total] = 1.0;
            row[layout.value_c0 + class] = 1.0;
            row
        })
        .collect();
    store.set_rules(&rows).unwrap();

    let e = store
        .predict_one_with_counterfactual(array![1.0].view(), IdKind::Row, CounterfactualClass::First)
        .unwrap();
    assert_eq!(e.class(), 0);
    assert_eq!(e.matched_rule_ids(), &[0]);
    // rule 1 is 0.2 away, rule 3 is 0.8 away
    assert_eq!(e.counterfactual_rule_ids(), &[1]);
    assert_relative_eq!(e.per_rule_delta()[1], 0.2);
    assert_relative_eq!(e.per_rule_delta()[3], 0.8);
}

#[test]
fn real_encoding_on_unlabelled_batch() {
    let mut store = RuleMatrix::builder(1, 2)
        .feature_range(vec![0.0], vec![10.0])
        .build()
        .unwrap();
    let layout = *store.layout();
    let mut row = vec![0.0; layout.width()];
    row[0] = 4.0;
    row[1] = 6.0;
    store.insert_rule(&row).unwrap();

    let x = array![[5.0], [8.0], [1.0]];
    let map = store.imap(x.view(), None, Encoding::Real, true, 2).unwrap();
    assert_eq!(map.get(0, 0), 0.0);
    assert_relative_eq!(map.get(0, 1), 0.2);
    assert_relative_eq!(map.get(0, 2), 0.3);
}

#[test]
fn label_vector_length_checked() {
    let mut store = two_feature_store();
    let row = single_rule(&store, 0, [8.0, 2.0]);
    store.insert_rule(&row).unwrap();
    let x = Array2::<f64>::zeros((3, 2));
    let y = array![0_usize, 1];
    let err = store
        .calc_support_coverage(None, x.view(), y.view(), 1)
        .unwrap_err();
    assert!(matches!(err, MatrixError::InputShape { .. }));
}

#[test]
fn display_summaries() {
    let mut store = two_feature_store();
    let row = single_rule(&store, 0, [8.0, 2.0]);
    store.insert_rule(&row).unwrap();
    assert_eq!(
        store.to_string(),
        "RuleMatrix(1 rules, 2 features, 2 classes, range predicates)"
    );
}
