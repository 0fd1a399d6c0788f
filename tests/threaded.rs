use std::sync::Arc;
use std::thread;

use ndarray::{array, Array2};
use rulematrix::{Encoding, IdKind, PredictOptions, RuleMatrix};

/// Two features, two classes, two models.
///
/// Model 0 splits on `x0 < 5`, model 1 splits on `x1 < 5`.
fn shared_store() -> RuleMatrix {
    let mut store = RuleMatrix::builder(2, 2)
        .feature_names(["x0", "x1"])
        .feature_range(vec![0.0, 0.0], vec![10.0, 10.0])
        .class_instances_count(vec![20, 20])
        .build()
        .unwrap();
    let layout = *store.layout();
    let rule = |feature: usize, alpha: f64, beta: f64, model: f64, class: usize| {
        let mut row = vec![0.0; layout.width()];
        row[2 * feature] = alpha;
        row[2 * feature + 1] = beta;
        row[layout.model] = model;
        row[layout.class] = class as f64;
        row[layout.value_total] = 4.0;
        row[layout.value_c0 + class] = 3.0;
        row[layout.value_c0 + 1 - class] = 1.0;
        row
    };
    store
        .set_rules(&[
            rule(0, 0.0, 4.99, 0.0, 0),
            rule(0, 5.0, 10.0, 0.0, 1),
            rule(1, 0.0, 4.99, 1.0, 0),
            rule(1, 5.0, 10.0, 1.0, 1),
        ])
        .unwrap();
    store
}

fn grid() -> Array2<f64> {
    let values: Vec<f64> = (0..40)
        .flat_map(|i| [f64::from(i % 10), f64::from((i * 7) % 10)])
        .collect();
    Array2::from_shape_vec((40, 2), values).unwrap()
}

#[test]
fn predict_across_threads() {
    let store = Arc::new(shared_store());

    let mut handles = vec![];

    // Thread 1: both models vote class 0
    let s = Arc::clone(&store);
    handles.push(thread::spawn(move || {
        s.predict_one(array![1.0, 2.0].view(), PredictOptions::default())
            .unwrap()
            .class()
    }));

    // Thread 2: both models vote class 1
    let s = Arc::clone(&store);
    handles.push(thread::spawn(move || {
        s.predict_one(array![8.0, 9.0].view(), PredictOptions::default())
            .unwrap()
            .class()
    }));

    // Thread 3: tie between the models, first class wins
    let s = Arc::clone(&store);
    handles.push(thread::spawn(move || {
        s.predict_one(array![1.0, 9.0].view(), PredictOptions::default())
            .unwrap()
            .class()
    }));

    let results: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results, vec![0, 1, 0]);
}

#[test]
fn batch_is_independent_of_jobs() {
    let store = shared_store();
    let x = grid();
    let sequential = store
        .predict_batch(x.view(), PredictOptions::default(), 1)
        .unwrap();
    for n_jobs in [2, 3, 4, 7, 64] {
        let parallel = store
            .predict_batch(x.view(), PredictOptions::default(), n_jobs)
            .unwrap();
        assert_eq!(sequential, parallel, "n_jobs = {n_jobs}");
    }
}

#[test]
fn imap_is_bit_identical_across_jobs() {
    let store = shared_store();
    let x = grid();
    let y: ndarray::Array1<usize> = (0..40).map(|i| i % 2).collect();

    for encoding in [Encoding::Binary, Encoding::BinarySigned, Encoding::Real] {
        let one = store
            .imap(x.view(), Some(y.view()), encoding, true, 1)
            .unwrap();
        let four = store
            .imap(x.view(), Some(y.view()), encoding, true, 4)
            .unwrap();
        assert_eq!(one, four, "{encoding:?}");
        assert_eq!(one.shape(), (4, 40));
    }
}

#[test]
fn statistics_on_clone_per_thread() {
    let store = Arc::new(shared_store());
    let x = Arc::new(grid());
    let y: Arc<ndarray::Array1<usize>> =
        Arc::new(x.rows().into_iter().map(|r| usize::from(r[0] >= 5.0)).collect());

    let handles: Vec<_> = [1, 3]
        .into_iter()
        .map(|n_jobs| {
            let (s, x, y) = (Arc::clone(&store), Arc::clone(&x), Arc::clone(&y));
            thread::spawn(move || {
                let mut own = (*s).clone();
                own.calc_support_coverage(None, x.view(), y.view(), n_jobs)
                    .unwrap();
                (0..own.n_rules())
                    .map(|r| (own.support(r), own.coverage(r)))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results[0], results[1]);
    // model 0 labels the data perfectly
    assert_eq!(results[0][0], (1.0, 0.5));
    assert_eq!(results[0][1], (1.0, 0.5));
}

#[test]
fn model_ids_reported_from_threads() {
    let store = Arc::new(shared_store());
    let options = PredictOptions {
        by_model: true,
        id_kind: IdKind::Model,
    };
    let s = Arc::clone(&store);
    let matched = thread::spawn(move || {
        s.predict_one(array![7.0, 1.0].view(), options)
            .unwrap()
            .matched()
            .to_vec()
    })
    .join()
    .unwrap();
    assert_eq!(matched, vec![0, 1]);
}
