//! Compressed Sparse Row (CSR) matrix.
//!
//! Holds the MNA coefficient matrix of one circuit island. Stamps are
//! accumulated as triplets and summed; entries that cancel to exactly zero
//! (a resistor whose terminals share a node) are dropped.

/// Sparse real matrix in Compressed Sparse Row format.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    pub nrows: usize,
    pub ncols: usize,
    /// Non-zero values, stored row by row.
    pub values: Vec<f64>,
    /// Column index for each non-zero value.
    pub col_indices: Vec<usize>,
    /// `row_pointers[i]..row_pointers[i + 1]` spans row i.
    pub row_pointers: Vec<usize>,
}

impl CsrMatrix {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            values: Vec::new(),
            col_indices: Vec::new(),
            row_pointers: vec![0; nrows + 1],
        }
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Build from (row, col, value) triplets, summing duplicates.
    pub fn from_triplets(nrows: usize, ncols: usize, triplets: &[(usize, usize, f64)]) -> Self {
        let mut sorted: Vec<(usize, usize, f64)> = triplets.to_vec();
        sorted.sort_by_key(|&(r, c, _)| (r, c));

        let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(sorted.len());
        for (r, c, v) in sorted {
            match merged.last_mut() {
                Some(last) if last.0 == r && last.1 == c => last.2 += v,
                _ => merged.push((r, c, v)),
            }
        }

        let mut m = Self::new(nrows, ncols);
        for (r, c, v) in merged.into_iter().filter(|&(_, _, v)| v != 0.0) {
            m.values.push(v);
            m.col_indices.push(c);
            m.row_pointers[r + 1] += 1;
        }
        for i in 1..=nrows {
            m.row_pointers[i] += m.row_pointers[i - 1];
        }
        m
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        (self.row_pointers[row]..self.row_pointers[row + 1])
            .find(|&idx| self.col_indices[idx] == col)
            .map(|idx| self.values[idx])
            .unwrap_or(0.0)
    }

    /// Iterate (row, col, value) over stored entries.
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.nrows).flat_map(move |row| {
            (self.row_pointers[row]..self.row_pointers[row + 1])
                .map(move |idx| (row, self.col_indices[idx], self.values[idx]))
        })
    }

    /// Dense row-major copy. Only meant for small island systems.
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let mut dense = vec![vec![0.0; self.ncols]; self.nrows];
        for (r, c, v) in self.entries() {
            dense[r][c] = v;
        }
        dense
    }

    /// Largest residual of any row, divided by the sum of the magnitudes of
    /// that row's terms. Rows whose terms are all zero are skipped.
    ///
    /// Independent of how each row is scaled, so KCL rows in siemens and
    /// source rows in volts are judged alike.
    pub fn relative_residual(&self, x: &[f64], b: &[f64]) -> f64 {
        let mut worst = 0.0_f64;
        for (row, &bi) in b.iter().enumerate().take(self.nrows) {
            let (mut ax, mut magnitude) = (0.0, bi.abs());
            for k in self.row_pointers[row]..self.row_pointers[row + 1] {
                let term = self.values[k] * x[self.col_indices[k]];
                ax += term;
                magnitude += term.abs();
            }
            if magnitude > 0.0 {
                worst = worst.max((ax - bi).abs() / magnitude);
            }
        }
        worst
    }
}
