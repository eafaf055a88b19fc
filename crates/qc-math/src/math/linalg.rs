//! Small dense linear algebra for generalized linear model fitting.
//!
//! Design matrices are tall (one row per day, a few dozen columns), so the
//! only factorization needed is Cholesky on the `p x p` normal equations,
//! plus a Gram-Schmidt pass to detect aliased (linearly dependent) columns
//! before fitting.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from dense factorizations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinalgError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("matrix is not positive definite (pivot {index} = {pivot:e})")]
    NotPositiveDefinite { index: usize, pivot: f64 },

    #[error("non-finite value in matrix")]
    NonFinite,
}

/// Row-major dense matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// All-zero matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row-major data.
    pub fn from_rows(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, LinalgError> {
        if data.len() != rows * cols {
            return Err(LinalgError::DimensionMismatch {
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Matrix { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    #[inline]
    pub fn set(&mut self, r: usize, c: usize, value: f64) {
        self.data[r * self.cols + c] = value;
    }

    /// Borrow one row.
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Copy one column.
    pub fn column(&self, c: usize) -> Vec<f64> {
        (0..self.rows).map(|r| self.get(r, c)).collect()
    }

    /// Keep only the listed columns, in the listed order.
    pub fn select_columns(&self, keep: &[usize]) -> Matrix {
        let mut out = Matrix::zeros(self.rows, keep.len());
        for r in 0..self.rows {
            for (j, &c) in keep.iter().enumerate() {
                out.set(r, j, self.get(r, c));
            }
        }
        out
    }

    /// `X * beta`.
    pub fn mul_vec(&self, v: &[f64]) -> Result<Vec<f64>, LinalgError> {
        if v.len() != self.cols {
            return Err(LinalgError::DimensionMismatch {
                expected: self.cols,
                actual: v.len(),
            });
        }
        Ok((0..self.rows)
            .map(|r| self.row(r).iter().zip(v).map(|(a, b)| a * b).sum())
            .collect())
    }

    /// Weighted cross products `(X^T W X, X^T W z)` for IRLS.
    pub fn weighted_normal_equations(
        &self,
        weights: &[f64],
        z: &[f64],
    ) -> Result<(Matrix, Vec<f64>), LinalgError> {
        if weights.len() != self.rows || z.len() != self.rows {
            return Err(LinalgError::DimensionMismatch {
                expected: self.rows,
                actual: weights.len().min(z.len()),
            });
        }
        let p = self.cols;
        let mut xtwx = Matrix::zeros(p, p);
        let mut xtwz = vec![0.0; p];
        for r in 0..self.rows {
            let w = weights[r];
            if w == 0.0 {
                continue;
            }
            let row = self.row(r);
            for i in 0..p {
                let wi = w * row[i];
                xtwz[i] += wi * z[r];
                for j in 0..=i {
                    xtwx.data[i * p + j] += wi * row[j];
                }
            }
        }
        for i in 0..p {
            for j in 0..i {
                xtwx.data[j * p + i] = xtwx.data[i * p + j];
            }
        }
        Ok((xtwx, xtwz))
    }
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
#[derive(Debug, Clone)]
pub struct Cholesky {
    n: usize,
    l: Vec<f64>,
}

impl Cholesky {
    /// Factor `a = L L^T`.
    pub fn decompose(a: &Matrix) -> Result<Self, LinalgError> {
        if a.rows != a.cols {
            return Err(LinalgError::DimensionMismatch {
                expected: a.rows,
                actual: a.cols,
            });
        }
        if a.data.iter().any(|v| !v.is_finite()) {
            return Err(LinalgError::NonFinite);
        }
        let n = a.rows;
        let mut l = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..=i {
                let mut sum = a.get(i, j);
                for k in 0..j {
                    sum -= l[i * n + k] * l[j * n + k];
                }
                if i == j {
                    if sum <= 0.0 || !sum.is_finite() {
                        return Err(LinalgError::NotPositiveDefinite { index: i, pivot: sum });
                    }
                    l[i * n + i] = sum.sqrt();
                } else {
                    l[i * n + j] = sum / l[j * n + j];
                }
            }
        }
        Ok(Cholesky { n, l })
    }

    /// Solve `A x = b`.
    pub fn solve(&self, b: &[f64]) -> Result<Vec<f64>, LinalgError> {
        let n = self.n;
        if b.len() != n {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                actual: b.len(),
            });
        }
        // forward: L y = b
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = b[i];
            for k in 0..i {
                sum -= self.l[i * n + k] * y[k];
            }
            y[i] = sum / self.l[i * n + i];
        }
        // backward: L^T x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = y[i];
            for k in (i + 1)..n {
                sum -= self.l[k * n + i] * x[k];
            }
            x[i] = sum / self.l[i * n + i];
        }
        Ok(x)
    }

    /// Full inverse `A^{-1}` (used for the coefficient covariance).
    pub fn inverse(&self) -> Result<Matrix, LinalgError> {
        let n = self.n;
        let mut inv = Matrix::zeros(n, n);
        let mut e = vec![0.0; n];
        for c in 0..n {
            e.iter_mut().for_each(|v| *v = 0.0);
            e[c] = 1.0;
            let col = self.solve(&e)?;
            for (r, v) in col.into_iter().enumerate() {
                inv.set(r, c, v);
            }
        }
        Ok(inv)
    }
}

/// Indices of a maximal linearly independent prefix-greedy subset of columns.
///
/// Columns are visited left to right; a column is kept when its component
/// orthogonal to the already-kept columns has norm above `rel_tol` times its
/// own norm. All-zero columns are always dropped. Putting the intercept and
/// baseline terms first guarantees they are never the ones dropped.
pub fn independent_columns(x: &Matrix, rel_tol: f64) -> Vec<usize> {
    let mut basis: Vec<Vec<f64>> = Vec::new();
    let mut keep = Vec::new();
    for c in 0..x.cols() {
        let original = x.column(c);
        let norm0 = dot(&original, &original).sqrt();
        if norm0 == 0.0 || !norm0.is_finite() {
            continue;
        }
        let mut v = original;
        // two passes of modified Gram-Schmidt
        for _ in 0..2 {
            for q in &basis {
                let proj = dot(q, &v);
                v.iter_mut().zip(q).for_each(|(vi, qi)| *vi -= proj * qi);
            }
        }
        let norm = dot(&v, &v).sqrt();
        if norm > rel_tol * norm0 {
            v.iter_mut().for_each(|vi| *vi /= norm);
            basis.push(v);
            keep.push(c);
        }
    }
    keep
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
