//! Ordinary least squares with an intercept, solved through `nalgebra`'s SVD.

use nalgebra::{DMatrix, DVector};
use ndarray::{Array1, ArrayView1, ArrayView2};

use crate::errors::{PacerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct LinearFit {
    pub intercept: f64,
    pub coefficients: Array1<f64>,
}

impl LinearFit {
    pub fn predict(&self, x: ArrayView1<'_, f64>) -> f64 {
        self.intercept + x.dot(&self.coefficients)
    }

    /// Root-mean-square residual over the rows of `x`.
    pub fn rmse(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let sse: f64 = x
            .rows()
            .into_iter()
            .zip(y.iter())
            .map(|(row, target)| (self.predict(row) - target).powi(2))
            .sum();
        (sse / y.len() as f64).sqrt()
    }
}

/// Fits `y = b0 + X w` by least squares on `[1 | X]`.
///
/// Rank-deficient systems get the minimum-norm solution instead of an error.
pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>) -> Result<LinearFit> {
    let (n, p) = x.dim();
    if n == 0 {
        return Err(PacerError::EmptyResult("no rows to fit".to_string()));
    }
    if y.len() != n {
        return Err(PacerError::SchemaMismatch {
            expected: n,
            actual: y.len(),
        });
    }

    let design = DMatrix::from_fn(n, p + 1, |i, j| if j == 0 { 1.0 } else { x[[i, j - 1]] });
    let target = DVector::from_iterator(n, y.iter().copied());

    let solution = lstsq(design, &target)?;
    Ok(LinearFit {
        intercept: solution[0],
        coefficients: solution.iter().skip(1).copied().collect(),
    })
}

/// Minimum-norm least-squares solution of `a · w ≈ b`.
///
/// Singular values at or below `max(rows, cols) · ε · σ_max` are treated as zero.
pub fn lstsq(a: DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(PacerError::MalformedInput(
            "least squares input contains non-finite values".to_string(),
        ));
    }

    let (rows, cols) = a.shape();
    let svd = a.svd(true, true);
    let sigma_max = svd.singular_values.max();
    let cutoff = rows.max(cols) as f64 * f64::EPSILON * sigma_max;

    svd.solve(b, cutoff)
        .map_err(|e| PacerError::MalformedInput(format!("least squares solve failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Axis, array};

    #[test]
    fn test_exact_linear_relation() {
        let x = array![[1.0, 2.0], [2.0, 1.0], [3.0, 5.0], [4.0, 3.0], [5.0, 8.0]];
        let y = x.map_axis(Axis(1), |row| 10.0 + 2.0 * row[0] + 3.0 * row[1]);

        let fit = fit(x.view(), y.view()).unwrap();
        assert!((fit.intercept - 10.0).abs() < 1e-9);
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 3.0).abs() < 1e-9);
        assert!((fit.predict(array![1.0, 1.0].view()) - 15.0).abs() < 1e-9);
        assert!(fit.rmse(x.view(), y.view()) < 1e-9);
    }

    #[test]
    fn test_noisy_fit_minimizes_residuals() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![1.0, 3.0, 2.0, 5.0];

        // closed form for a simple regression
        let fit = fit(x.view(), y.view()).unwrap();
        assert!((fit.coefficients[0] - 1.1).abs() < 1e-9);
        assert!((fit.intercept - 1.1).abs() < 1e-9);
        // residuals -0.1, 0.8, -1.3, 0.6
        assert!((fit.rmse(x.view(), y.view()) - (2.7f64 / 4.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_rank_deficient_returns_minimum_norm() {
        // second column duplicates the first; the weight is split evenly
        let x = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let y = array![2.0, 4.0, 6.0];

        let fit = fit(x.view(), y.view()).unwrap();
        assert!(fit.intercept.abs() < 1e-9);
        assert!((fit.coefficients[0] - 1.0).abs() < 1e-9);
        assert!((fit.coefficients[1] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_column_and_single_row() {
        // one row, intercept plus one feature: minimum norm splits y between them
        let x = array![[1.0]];
        let y = array![4.0];
        let fit = fit(x.view(), y.view()).unwrap();
        assert!((fit.intercept - 2.0).abs() < 1e-9);
        assert!((fit.coefficients[0] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_all_zero_feature_gets_zero_weight() {
        let x = array![[0.0, 1.0], [0.0, 2.0], [0.0, 3.0]];
        let y = array![3.0, 5.0, 7.0];
        let fit = fit(x.view(), y.view()).unwrap();

        assert!(fit.coefficients[0].abs() < 1e-9);
        assert!((fit.coefficients[1] - 2.0).abs() < 1e-9);
        assert!((fit.intercept - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        let x = Array2::<f64>::zeros((0, 2));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(
            fit(x.view(), y.view()),
            Err(PacerError::EmptyResult(_))
        ));

        let x = array![[1.0], [2.0]];
        let y = array![1.0];
        assert!(matches!(
            fit(x.view(), y.view()),
            Err(PacerError::SchemaMismatch { .. })
        ));

        let y = array![1.0, f64::NAN];
        assert!(fit(x.view(), y.view()).is_err());
    }
}
