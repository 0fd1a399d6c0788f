use super::predicate::PredicateType;

/// Names of the fixed metadata columns, in storage order. The per-class
/// count columns `value_c0..value_c{K-1}` follow them.
pub const METADATA_COLUMNS: [&str; 13] = [
    "id",
    "model",
    "node",
    "class",
    "support",
    "coverage",
    "certainty",
    "n_predicates",
    "ranges_diameter_mean",
    "aux_1",
    "aux_2",
    "aux_3",
    "value_total",
];

/// Column offsets of a rule row, computed once from the store dimensions.
///
/// A row is `n_features * shift` feature columns followed by the metadata
/// zone. Offsets are absolute row positions, so `layout.class` indexes the
/// class column of a dense row directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub n_features: usize,
    pub n_classes: usize,
    pub predicate_type: PredicateType,
    pub id: usize,
    pub model: usize,
    pub node: usize,
    pub class: usize,
    pub support: usize,
    pub coverage: usize,
    pub certainty: usize,
    pub n_predicates: usize,
    pub ranges_diameter_mean: usize,
    pub aux: [usize; 3],
    pub value_total: usize,
    pub value_c0: usize,
}

impl ColumnLayout {
    #[must_use]
    pub fn new(n_features: usize, n_classes: usize, predicate_type: PredicateType) -> Self {
        let base = n_features * predicate_type.shift();
        Self {
            n_features,
            n_classes,
            predicate_type,
            id: base,
            model: base + 1,
            node: base + 2,
            class: base + 3,
            support: base + 4,
            coverage: base + 5,
            certainty: base + 6,
            n_predicates: base + 7,
            ranges_diameter_mean: base + 8,
            aux: [base + 9, base + 10, base + 11],
            value_total: base + 12,
            value_c0: base + 13,
        }
    }

    /// Number of feature-zone columns.
    #[inline]
    #[must_use]
    pub fn feature_width(&self) -> usize {
        self.id
    }

    /// Number of metadata-zone columns.
    #[inline]
    #[must_use]
    pub fn metadata_width(&self) -> usize {
        METADATA_COLUMNS.len() + self.n_classes
    }

    /// Total row width.
    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.feature_width() + self.metadata_width()
    }

    /// Map a feature-zone column to the feature it constrains.
    #[inline]
    #[must_use]
    pub fn feature_of(&self, column: usize) -> usize {
        column / self.predicate_type.shift()
    }

    /// The feature-zone columns belonging to each of `features`, in order.
    #[must_use]
    pub fn feature_columns(&self, features: &[usize]) -> Vec<usize> {
        let shift = self.predicate_type.shift();
        features
            .iter()
            .flat_map(|&f| (f * shift)..(f * shift + shift))
            .collect()
    }

    /// Position of a metadata column inside the metadata zone.
    #[inline]
    pub(crate) fn meta_offset(&self, column: usize) -> usize {
        column - self.feature_width()
    }

    /// One label per column, for documentation rows in persisted files.
    #[must_use]
    pub fn column_names(&self, feature_names: &[String]) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        for name in feature_names {
            match self.predicate_type {
                PredicateType::Range => {
                    names.push(format!("{name} alpha"));
                    names.push(format!("{name} beta"));
                }
                PredicateType::Binary => names.push(name.clone()),
            }
        }
        names.extend(METADATA_COLUMNS.iter().map(|c| (*c).to_owned()));
        names.extend((0..self.n_classes).map(|c| format!("value_c{c}")));
        names
    }
}
