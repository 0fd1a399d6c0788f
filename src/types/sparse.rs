/// A compressed-sparse-row matrix of `f64`.
///
/// Zero entries are never stored. `NaN` is not zero and is stored like any
/// other value. Column indices within a row are kept strictly ascending.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseMatrix {
    n_rows: usize,
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// An empty matrix with `n_cols` columns and no rows.
    #[must_use]
    pub fn new(n_cols: usize) -> Self {
        Self::zeros(0, n_cols)
    }

    /// An all-zero matrix of the given shape.
    #[must_use]
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            indptr: vec![0; n_rows + 1],
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Build from `(row, col, value)` triplets. Order does not matter; for a
    /// repeated coordinate the last triplet wins. Zeros are dropped.
    ///
    /// Coordinates outside the shape are ignored.
    #[must_use]
    pub fn from_triplets(
        n_rows: usize,
        n_cols: usize,
        mut triplets: Vec<(usize, usize, f64)>,
    ) -> Self {
        triplets.retain(|&(r, c, _)| r < n_rows && c < n_cols);
        // stable: later duplicates stay after earlier ones
        triplets.sort_by_key(|&(r, c, _)| (r, c));

        let mut indptr = vec![0; n_rows + 1];
        let mut indices = Vec::with_capacity(triplets.len());
        let mut values = Vec::with_capacity(triplets.len());
        let mut rows = Vec::with_capacity(triplets.len());

        for (r, c, v) in triplets {
            if rows.last() == Some(&r) && indices.last() == Some(&c) {
                rows.pop();
                indices.pop();
                values.pop();
            }
            rows.push(r);
            indices.push(c);
            values.push(v);
        }

        // drop explicit zeros only after duplicates resolved
        let mut kept = 0;
        for i in 0..values.len() {
            if values[i] != 0.0 {
                rows[kept] = rows[i];
                indices[kept] = indices[i];
                values[kept] = values[i];
                kept += 1;
            }
        }
        rows.truncate(kept);
        indices.truncate(kept);
        values.truncate(kept);

        for &r in &rows {
            indptr[r + 1] += 1;
        }
        for r in 0..n_rows {
            indptr[r + 1] += indptr[r];
        }

        Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            values,
        }
    }

    /// Append a dense row. The caller guarantees `row.len() == n_cols`.
    pub(crate) fn push_dense_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.n_cols);
        for (c, &v) in row.iter().enumerate() {
            if v != 0.0 {
                self.indices.push(c);
                self.values.push(v);
            }
        }
        self.indptr.push(self.indices.len());
        self.n_rows += 1;
    }

    #[inline]
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.n_cols)
    }

    /// Number of stored (non-zero) entries.
    #[inline]
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values stored in `row`.
    ///
    /// # Panics
    ///
    /// Panics if `row >= n_rows`.
    #[inline]
    #[must_use]
    pub fn row_entries(&self, row: usize) -> (&[usize], &[f64]) {
        let span = self.indptr[row]..self.indptr[row + 1];
        (&self.indices[span.clone()], &self.values[span])
    }

    /// Value at `(row, col)`; `0.0` when nothing is stored there.
    ///
    /// # Panics
    ///
    /// Panics if `row >= n_rows`.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        let (indices, values) = self.row_entries(row);
        indices
            .binary_search(&col)
            .map_or(0.0, |pos| values[pos])
    }

    /// Number of stored entries in `row`.
    #[must_use]
    pub fn row_nnz(&self, row: usize) -> usize {
        self.indptr[row + 1] - self.indptr[row]
    }

    /// The row expanded to `n_cols` values.
    #[must_use]
    pub fn row_dense(&self, row: usize) -> Vec<f64> {
        let mut dense = vec![0.0; self.n_cols];
        let (indices, values) = self.row_entries(row);
        for (&c, &v) in indices.iter().zip(values) {
            dense[c] = v;
        }
        dense
    }

    /// Iterate over all stored entries as `(row, col, value)` in row-major order.
    pub fn triplets(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.n_rows).flat_map(move |r| {
            let (indices, values) = self.row_entries(r);
            indices.iter().zip(values).map(move |(&c, &v)| (r, c, v))
        })
    }

    /// A new matrix made of the given rows, in the given order.
    #[must_use]
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut out = Self::new(self.n_cols);
        for &r in rows {
            let (indices, values) = self.row_entries(r);
            out.indices.extend_from_slice(indices);
            out.values.extend_from_slice(values);
            out.indptr.push(out.indices.len());
            out.n_rows += 1;
        }
        out
    }

    /// Concatenate matrices column-wise. All parts must share `n_rows`;
    /// returns `None` otherwise.
    #[must_use]
    pub fn hstack(parts: &[Self]) -> Option<Self> {
        let n_rows = parts.first().map_or(0, |p| p.n_rows);
        if parts.iter().any(|p| p.n_rows != n_rows) {
            return None;
        }
        let n_cols = parts.iter().map(|p| p.n_cols).sum();
        let mut out = Self::new(n_cols);
        for r in 0..n_rows {
            let mut offset = 0;
            for part in parts {
                let (indices, values) = part.row_entries(r);
                out.indices.extend(indices.iter().map(|c| c + offset));
                out.values.extend_from_slice(values);
                offset += part.n_cols;
            }
            out.indptr.push(out.indices.len());
            out.n_rows += 1;
        }
        Some(out)
    }

    /// Replace every stored value with `f(value)`. Entries mapped to zero
    /// are kept as explicit zeros only until the next structural rebuild.
    pub fn map_values(&mut self, f: impl Fn(f64) -> f64) {
        for v in &mut self.values {
            *v = f(*v);
        }
    }
}
