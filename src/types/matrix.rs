use std::fmt;
use std::sync::OnceLock;

use super::error::MatrixError;
use super::layout::ColumnLayout;
use super::predicate::PredicateType;
use super::sparse::SparseMatrix;

/// Row index of a rule inside a [`RuleMatrix`].
pub type RuleId = usize;

/// Builder for constructing a [`RuleMatrix`].
///
/// Every auxiliary vector is optional. Missing names are generated
/// (`"feature 0"`, `"class 0"`, ...), missing feature ranges default to
/// `[0, 1]`, missing class counts default to zero.
///
/// # Example
///
/// ```
/// use rulematrix::{PredicateType, RuleMatrix};
///
/// let store = RuleMatrix::builder(2, 2)
///     .predicate_type(PredicateType::Range)
///     .feature_names(["petal_length", "petal_width"])
///     .feature_range(vec![0.0, 0.0], vec![10.0, 10.0])
///     .class_names(["setosa", "other"])
///     .class_instances_count(vec![50, 100])
///     .build()
///     .unwrap();
/// assert_eq!(store.n_rules(), 0);
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct RuleMatrixBuilder {
    n_features: usize,
    n_classes: usize,
    predicate_type: PredicateType,
    feature_names: Option<Vec<String>>,
    feature_values_min: Option<Vec<f64>>,
    feature_values_max: Option<Vec<f64>>,
    feature_importances: Option<Vec<f64>>,
    class_names: Option<Vec<String>>,
    class_instances_count: Option<Vec<u64>>,
}

impl RuleMatrixBuilder {
    pub fn new(n_features: usize, n_classes: usize) -> Self {
        Self {
            n_features,
            n_classes,
            predicate_type: PredicateType::Range,
            feature_names: None,
            feature_values_min: None,
            feature_values_max: None,
            feature_importances: None,
            class_names: None,
            class_instances_count: None,
        }
    }

    pub fn predicate_type(mut self, predicate_type: PredicateType) -> Self {
        self.predicate_type = predicate_type;
        self
    }

    pub fn feature_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Observed per-feature minimum and maximum, used to normalize distances.
    pub fn feature_range(mut self, min: Vec<f64>, max: Vec<f64>) -> Self {
        self.feature_values_min = Some(min);
        self.feature_values_max = Some(max);
        self
    }

    /// Opaque per-feature importances, carried through persistence untouched.
    pub fn feature_importances(mut self, importances: Vec<f64>) -> Self {
        self.feature_importances = Some(importances);
        self
    }

    pub fn class_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.class_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Training instances per class. Used as the support denominator.
    pub fn class_instances_count(mut self, counts: Vec<u64>) -> Self {
        self.class_instances_count = Some(counts);
        self
    }

    /// Validate the dimensions and build an empty store.
    ///
    /// # Errors
    ///
    /// [`MatrixError::InvalidDimensions`] if either dimension is zero,
    /// [`MatrixError::DimensionMismatch`] if a supplied vector has the wrong length.
    pub fn build(self) -> Result<RuleMatrix, MatrixError> {
        let (n_features, n_classes) = (self.n_features, self.n_classes);
        if n_features == 0 || n_classes == 0 {
            return Err(MatrixError::InvalidDimensions {
                n_features,
                n_classes,
            });
        }

        let feature_names = checked_or(self.feature_names, n_features, "feature_names", || {
            (0..n_features).map(|f| format!("feature {f}")).collect()
        })?;
        let feature_values_min =
            checked_or(self.feature_values_min, n_features, "feature_values_min", || {
                vec![0.0; n_features]
            })?;
        let feature_values_max =
            checked_or(self.feature_values_max, n_features, "feature_values_max", || {
                vec![1.0; n_features]
            })?;
        let class_names = checked_or(self.class_names, n_classes, "class_names", || {
            (0..n_classes).map(|c| format!("class {c}")).collect()
        })?;
        let class_instances_count = checked_or(
            self.class_instances_count,
            n_classes,
            "class_instances_count",
            || vec![0; n_classes],
        )?;
        let feature_importances = match self.feature_importances {
            Some(v) if !v.is_empty() && v.len() != n_features => {
                return Err(MatrixError::DimensionMismatch {
                    what: "feature_importances",
                    expected: n_features,
                    actual: v.len(),
                });
            }
            Some(v) => v,
            None => Vec::new(),
        };

        let layout = ColumnLayout::new(n_features, n_classes, self.predicate_type);
        Ok(RuleMatrix {
            layout,
            features: SparseMatrix::new(layout.feature_width()),
            metadata: Vec::new(),
            feature_names,
            feature_values_min,
            feature_values_max,
            feature_importances,
            class_names,
            class_instances_count,
            features_used: OnceLock::new(),
            instances_map: None,
        })
    }
}

fn checked_or<T>(
    value: Option<Vec<T>>,
    expected: usize,
    what: &'static str,
    default: impl FnOnce() -> Vec<T>,
) -> Result<Vec<T>, MatrixError> {
    match value {
        Some(v) if v.len() != expected => Err(MatrixError::DimensionMismatch {
            what,
            expected,
            actual: v.len(),
        }),
        Some(v) => Ok(v),
        None => Ok(default()),
    }
}

/// Sparse store of classification rules.
///
/// Each rule is one logical row of `layout().width()` columns: the feature
/// zone (predicate bounds, mostly zero) is kept in CSR form and the metadata
/// zone (always populated) is kept dense. Safe to share across threads by
/// reference; only statistics and mutation take `&mut self`.
#[derive(Debug, Clone)]
pub struct RuleMatrix {
    pub(crate) layout: ColumnLayout,
    pub(crate) features: SparseMatrix,
    pub(crate) metadata: Vec<f64>,
    pub(crate) feature_names: Vec<String>,
    pub(crate) feature_values_min: Vec<f64>,
    pub(crate) feature_values_max: Vec<f64>,
    pub(crate) feature_importances: Vec<f64>,
    pub(crate) class_names: Vec<String>,
    pub(crate) class_instances_count: Vec<u64>,
    pub(crate) features_used: OnceLock<Vec<usize>>,
    pub(crate) instances_map: Option<SparseMatrix>,
}

impl RuleMatrix {
    /// An empty store with generated names and default feature ranges.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::InvalidDimensions`] if either dimension is zero.
    pub fn new(
        n_features: usize,
        n_classes: usize,
        predicate_type: PredicateType,
    ) -> Result<Self, MatrixError> {
        RuleMatrixBuilder::new(n_features, n_classes)
            .predicate_type(predicate_type)
            .build()
    }

    pub fn builder(n_features: usize, n_classes: usize) -> RuleMatrixBuilder {
        RuleMatrixBuilder::new(n_features, n_classes)
    }

    /// Build a store from `metadata` and fill it with dense rule rows.
    ///
    /// # Errors
    ///
    /// Any error of [`RuleMatrixBuilder::build`] or [`set_rules`](Self::set_rules).
    pub fn from_dense(rows: &[Vec<f64>], metadata: RuleMatrixBuilder) -> Result<Self, MatrixError> {
        let mut store = metadata.build()?;
        store.set_rules(rows)?;
        Ok(store)
    }

    /// Append one rule.
    ///
    /// # Errors
    ///
    /// [`MatrixError::DimensionMismatch`] if `row` is not exactly
    /// `layout().width()` long, [`MatrixError::InvalidClass`] if its class
    /// column is not a class index. The store is unchanged on error.
    pub fn insert_rule(&mut self, row: &[f64]) -> Result<(), MatrixError> {
        self.validate_row(row)?;
        self.push_row(row);
        self.features_used = OnceLock::new();
        Ok(())
    }

    /// Replace every stored rule. All rows are validated before anything changes.
    ///
    /// # Errors
    ///
    /// Same as [`insert_rule`](Self::insert_rule), for the first invalid row.
    pub fn set_rules(&mut self, rows: &[Vec<f64>]) -> Result<(), MatrixError> {
        for row in rows {
            self.validate_row(row)?;
        }
        self.features = SparseMatrix::new(self.layout.feature_width());
        self.metadata = Vec::with_capacity(rows.len() * self.layout.metadata_width());
        for row in rows {
            self.push_row(row);
        }
        self.features_used = OnceLock::new();
        self.instances_map = None;
        Ok(())
    }

    fn validate_row(&self, row: &[f64]) -> Result<(), MatrixError> {
        if row.len() != self.layout.width() {
            return Err(MatrixError::DimensionMismatch {
                what: "rule row",
                expected: self.layout.width(),
                actual: row.len(),
            });
        }
        let class = row[self.layout.class];
        #[allow(clippy::cast_precision_loss)]
        let in_range = class >= 0.0 && class < self.layout.n_classes as f64;
        if !in_range || class.fract() != 0.0 {
            return Err(MatrixError::InvalidClass {
                value: class,
                n_classes: self.layout.n_classes,
            });
        }
        Ok(())
    }

    fn push_row(&mut self, row: &[f64]) {
        let split = self.layout.feature_width();
        self.features.push_dense_row(&row[..split]);
        self.metadata.extend_from_slice(&row[split..]);
    }

    // -- dimensions --

    #[inline]
    #[must_use]
    pub fn n_rules(&self) -> usize {
        self.features.n_rows()
    }

    #[inline]
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.layout.n_features
    }

    #[inline]
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.layout.n_classes
    }

    #[inline]
    #[must_use]
    pub fn predicate_type(&self) -> PredicateType {
        self.layout.predicate_type
    }

    /// Column offsets of this store's rows.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub(crate) fn check_rule(&self, rule: RuleId) -> Result<(), MatrixError> {
        if rule >= self.n_rules() {
            return Err(MatrixError::RuleOutOfBounds {
                rule,
                n_rules: self.n_rules(),
            });
        }
        Ok(())
    }

    // -- per-rule accessors --
    //
    // All of these panic if `rule >= n_rules()`.

    fn meta_row(&self, rule: RuleId) -> &[f64] {
        let width = self.layout.metadata_width();
        &self.metadata[rule * width..(rule + 1) * width]
    }

    #[inline]
    fn meta(&self, rule: RuleId, column: usize) -> f64 {
        self.meta_row(rule)[self.layout.meta_offset(column)]
    }

    pub(crate) fn set_meta(&mut self, rule: RuleId, column: usize, value: f64) {
        let width = self.layout.metadata_width();
        let offset = self.layout.meta_offset(column);
        self.metadata[rule * width + offset] = value;
    }

    /// The full dense row of a rule, in [`ColumnLayout`] order.
    #[must_use]
    pub fn row(&self, rule: RuleId) -> Vec<f64> {
        let mut row = self.features.row_dense(rule);
        row.extend_from_slice(self.meta_row(rule));
        row
    }

    /// Stored feature-zone columns and values of a rule.
    #[inline]
    pub(crate) fn feature_entries(&self, rule: RuleId) -> (&[usize], &[f64]) {
        self.features.row_entries(rule)
    }

    #[must_use]
    pub fn id(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.id)
    }

    #[must_use]
    pub fn model(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.model)
    }

    /// Identity of the rule's model for grouping: equal bit patterns, so a
    /// `NaN` model groups with itself. `-0.0` is folded into `0.0`.
    pub(crate) fn model_key(&self, rule: RuleId) -> u64 {
        let model = self.model(rule);
        if model == 0.0 {
            0.0_f64.to_bits()
        } else {
            model.to_bits()
        }
    }

    #[must_use]
    pub fn node(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.node)
    }

    /// Predicted class. Validated on insertion, so always `< n_classes()`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn class(&self, rule: RuleId) -> usize {
        self.meta(rule, self.layout.class) as usize
    }

    #[must_use]
    pub fn support(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.support)
    }

    #[must_use]
    pub fn coverage(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.coverage)
    }

    #[must_use]
    pub fn certainty(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.certainty)
    }

    #[must_use]
    pub fn n_predicates(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.n_predicates)
    }

    #[must_use]
    pub fn ranges_diameter_mean(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.ranges_diameter_mean)
    }

    /// One of the three free auxiliary columns (`index` in `0..3`).
    #[must_use]
    pub fn aux(&self, rule: RuleId, index: usize) -> f64 {
        self.meta(rule, self.layout.aux[index])
    }

    #[must_use]
    pub fn value_total(&self, rule: RuleId) -> f64 {
        self.meta(rule, self.layout.value_total)
    }

    /// Unnormalized class counts `value_c0..value_c{K-1}`.
    #[must_use]
    pub fn class_values(&self, rule: RuleId) -> &[f64] {
        let start = self.layout.meta_offset(self.layout.value_c0);
        &self.meta_row(rule)[start..]
    }

    /// `(alpha, beta)` of a range rule on `feature`. Unset bounds read as `0.0`.
    #[must_use]
    pub fn bounds(&self, rule: RuleId, feature: usize) -> (f64, f64) {
        let a = feature * 2;
        (self.features.get(rule, a), self.features.get(rule, a + 1))
    }

    // -- features used --

    /// Sorted distinct features constrained by at least one of `rules`.
    ///
    /// # Errors
    ///
    /// [`MatrixError::RuleOutOfBounds`] for an unknown rule.
    pub fn get_features_used(&self, rules: &[RuleId]) -> Result<Vec<usize>, MatrixError> {
        let mut used = vec![false; self.n_features()];
        for &rule in rules {
            self.check_rule(rule)?;
            let (columns, _) = self.feature_entries(rule);
            for &c in columns {
                used[self.layout.feature_of(c)] = true;
            }
        }
        Ok(used
            .iter()
            .enumerate()
            .filter_map(|(f, &u)| u.then_some(f))
            .collect())
    }

    /// Features constrained by any stored rule. Computed on first use and
    /// cached until the next mutation.
    #[must_use]
    pub fn features_used(&self) -> &[usize] {
        self.features_used.get_or_init(|| {
            let mut used: Vec<usize> = self
                .features
                .triplets()
                .map(|(_, c, _)| self.layout.feature_of(c))
                .collect();
            used.sort_unstable();
            used.dedup();
            used
        })
    }

    // -- auxiliary vectors --

    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    #[must_use]
    pub fn feature_values_min(&self) -> &[f64] {
        &self.feature_values_min
    }

    #[must_use]
    pub fn feature_values_max(&self) -> &[f64] {
        &self.feature_values_max
    }

    #[must_use]
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    #[must_use]
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    #[must_use]
    pub fn class_instances_count(&self) -> &[u64] {
        &self.class_instances_count
    }

    /// Snapshot of the last instance map built by
    /// [`calc_support_coverage`](Self::calc_support_coverage), or loaded from disk.
    #[must_use]
    pub fn instances_map(&self) -> Option<&SparseMatrix> {
        self.instances_map.as_ref()
    }

    /// Labels for every column, in row order.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.layout.column_names(&self.feature_names)
    }
}

impl fmt::Display for RuleMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleMatrix({} rules, {} features, {} classes, {} predicates)",
            self.n_rules(),
            self.n_features(),
            self.n_classes(),
            self.predicate_type(),
        )
    }
}
