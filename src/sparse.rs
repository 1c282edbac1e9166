//! Compressed sparse row storage for the Poisson operator.
//!
//! Only what the blend needs: row-wise construction, matrix-vector products,
//! entry lookup, and rewriting a row into an identity constraint while keeping
//! the sparsity structure intact.

/// A square or rectangular sparse matrix in CSR layout with `f64` values.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Build a matrix from one entry list per row.
    ///
    /// Entries inside a row may come in any order; they are sorted by column.
    /// Duplicate columns within a row are summed.
    ///
    /// # Panics
    ///
    /// Panics if an entry's column is `>= n_cols`.
    pub fn from_rows<I, R>(n_cols: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (usize, f64)>,
    {
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();
        let mut scratch: Vec<(usize, f64)> = Vec::with_capacity(8);

        for row in rows {
            scratch.clear();
            scratch.extend(row);
            scratch.sort_unstable_by_key(|&(c, _)| c);

            let mut last: Option<usize> = None;
            for &(c, v) in &scratch {
                assert!(c < n_cols, "column {c} out of range for {n_cols} columns");
                if last == Some(c) {
                    if let Some(prev) = values.last_mut() {
                        *prev += v;
                    }
                } else {
                    col_idx.push(c);
                    values.push(v);
                    last = Some(c);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            n_rows: row_ptr.len() - 1,
            n_cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.n_rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries, explicit zeros included.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Column indices and values stored for row `r`.
    #[must_use]
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        (&self.col_idx[span.clone()], &self.values[span])
    }

    /// Value at `(r, c)`, or `0.0` when the entry is not stored.
    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        let (cols, vals) = self.row(r);
        cols.binary_search(&c).map_or(0.0, |i| vals[i])
    }

    /// Diagonal entry of row `r`.
    #[must_use]
    pub fn diagonal(&self, r: usize) -> f64 {
        self.get(r, r)
    }

    /// Compute `y = self * x`.
    ///
    /// # Panics
    ///
    /// Panics if `x.len() != self.cols()`.
    #[must_use]
    pub fn mul_vec(&self, x: &[f64]) -> Vec<f64> {
        let mut y = vec![0.0; self.n_rows];
        self.mul_vec_into(x, &mut y);
        y
    }

    /// Compute `y = self * x` into an existing buffer.
    ///
    /// # Panics
    ///
    /// Panics if `x.len() != self.cols()` or `y.len() != self.rows()`.
    pub fn mul_vec_into(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols, "input length must match columns");
        assert_eq!(y.len(), self.n_rows, "output length must match rows");

        for (r, out) in y.iter_mut().enumerate() {
            let (cols, vals) = self.row(r);
            *out = cols.iter().zip(vals).map(|(&c, &v)| v * x[c]).sum();
        }
    }

    /// Rewrite row `r` so it reads `x[r] = b[r]`.
    ///
    /// The diagonal becomes 1 and every other stored coefficient becomes an
    /// explicit zero, so the structure shared with the unspecialized matrix
    /// stays the same.
    pub fn pin_row(&mut self, r: usize) {
        debug_assert!(
            self.row(r).0.binary_search(&r).is_ok(),
            "row {r} has no stored diagonal"
        );
        let span = self.row_ptr[r]..self.row_ptr[r + 1];
        for i in span {
            self.values[i] = if self.col_idx[i] == r { 1.0 } else { 0.0 };
        }
    }
}
