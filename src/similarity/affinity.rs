//! Affinity construction and diffusion operators
//!
//! Turns a distance matrix into a locally-scaled affinity matrix and derives
//! the row-stochastic operators used by similarity fusion.
//!
//! # Algorithm
//!
//! 1. Symmetrize the distances and zero the diagonal
//! 2. Estimate a neighborhood radius per point from its K nearest neighbors
//! 3. Scale each pair by the average of both radii and their own distance
//! 4. Apply a Gaussian kernel on that local scale

use ndarray::{Array2, Axis};
use sprs::{CsMat, TriMat};

use crate::config::AffinityConfig;
use crate::error::StructureError;

/// Fail if a matrix contains NaN
///
/// # Errors
///
/// Returns `StructureError::NumericalError` naming the offending matrix
pub fn assert_finite(matrix: &Array2<f64>, name: &str) -> Result<(), StructureError> {
    if matrix.iter().any(|v| v.is_nan()) {
        log::error!("NaN found in {} ({}x{})", name, matrix.nrows(), matrix.ncols());
        return Err(StructureError::NumericalError(format!(
            "{} contains NaN",
            name
        )));
    }
    Ok(())
}

pub(crate) fn check_square(matrix: &Array2<f64>, name: &str) -> Result<usize, StructureError> {
    let (rows, cols) = matrix.dim();
    if rows == 0 {
        return Err(StructureError::InvalidInput(format!("Empty {}", name)));
    }
    if rows != cols {
        return Err(StructureError::InvalidInput(format!(
            "{} must be square, got {}x{}",
            name, rows, cols
        )));
    }
    Ok(rows)
}

/// Build a locally-scaled affinity matrix from a distance matrix
///
/// `W[i][j] = exp(-D[i][j]^2 / (2 (mu * Eps[i][j])^2))` where
/// `Eps[i][j] = (r_i + r_j + D[i][j]) / 3` and `r_i` is the mean distance from
/// point `i` to its K nearest neighbors (self excluded).
///
/// A zero denominator is replaced by 1. That only happens when both radii and
/// the distance are zero, so the entry evaluates to `exp(0) = 1`.
///
/// # Arguments
///
/// * `distances` - Square distance matrix (need not be symmetric)
/// * `config` - Neighbor count and bandwidth
///
/// # Returns
///
/// Symmetric affinity matrix with values in `[0, 1]` and a unit diagonal
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if the matrix is empty or not
/// square, or if `k` is zero
pub fn build_affinity(
    distances: &Array2<f64>,
    config: &AffinityConfig,
) -> Result<Array2<f64>, StructureError> {
    let n = check_square(distances, "distance matrix")?;
    if config.k == 0 {
        return Err(StructureError::InvalidInput(
            "Affinity neighbor count k must be positive".to_string(),
        ));
    }

    log::debug!(
        "Building affinity: {} points, k={}, mu={}",
        n,
        config.k,
        config.mu
    );

    let mut dsym = (distances + &distances.t()) * 0.5;
    dsym.diag_mut().fill(0.0);

    // K nearest including the zero self-distance
    let kk = (config.k + 1).min(n);
    let radii: Vec<f64> = dsym
        .axis_iter(Axis(0))
        .map(|row| {
            let mut sorted = row.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let sum: f64 = sorted[..kk].iter().sum();
            if kk > 1 {
                sum / (kk - 1) as f64
            } else {
                0.0
            }
        })
        .collect();

    let mu = config.mu;
    let w = Array2::from_shape_fn((n, n), |(i, j)| {
        let d = dsym[[i, j]];
        let eps = (radii[i] + radii[j] + d) / 3.0;
        let mut denom = 2.0 * (mu * eps) * (mu * eps);
        if denom == 0.0 {
            denom = 1.0;
        }
        (-(d * d) / denom).exp()
    });

    Ok(w)
}

/// Turn a similarity matrix into a row-stochastic probability matrix
///
/// Rows summing to zero keep their zeros (the sum is floored to 1). With
/// `diag_regularize`, half of each row's mass is put on the diagonal and the
/// other half is spread over the off-diagonal entries.
pub fn probability_matrix(w: &Array2<f64>, diag_regularize: bool) -> Array2<f64> {
    let n = w.nrows();
    let mut base = w.clone();
    if diag_regularize {
        base.diag_mut().fill(0.0);
    }

    let row_sums = base.sum_axis(Axis(1)).mapv(|s| if s == 0.0 { 1.0 } else { s });
    let mut p = base / &row_sums.insert_axis(Axis(1));

    if diag_regularize {
        p *= 0.5;
        for i in 0..n {
            p[[i, i]] += 0.5;
        }
    }
    p
}

/// Restrict a similarity matrix to its top-K entries per row
///
/// Each row keeps its K largest weights (the element itself included when
/// it ranks), renormalized to sum to 1. Order among equal weights is
/// unspecified.
///
/// # Returns
///
/// Sparse `N x N` matrix in CSR layout
pub fn sparse_knn(w: &Array2<f64>, k: usize) -> CsMat<f64> {
    let (n, m) = w.dim();
    let k = k.min(m);
    let mut tri = TriMat::with_capacity((n, m), n * k);

    for (i, row) in w.axis_iter(Axis(0)).enumerate() {
        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| {
            row[b]
                .partial_cmp(&row[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let top = &order[..k];
        let mut norm: f64 = top.iter().map(|&j| row[j]).sum();
        if norm == 0.0 {
            norm = 1.0;
        }
        for &j in top {
            tri.add_triplet(i, j, row[j] / norm);
        }
    }

    tri.to_csr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::similarity::distance::euclidean_csm;
    use ndarray::array;

    fn sample_distances() -> Array2<f64> {
        let x = array![[0.0], [1.0], [1.5], [4.0], [4.2], [9.0]];
        euclidean_csm(&x, &x).unwrap()
    }

    #[test]
    fn test_affinity_is_symmetric() {
        let mut d = sample_distances();
        // Asymmetric input must still give an exactly symmetric result
        d[[0, 1]] += 0.3;
        let w = build_affinity(&d, &AffinityConfig { k: 2, mu: 0.5 }).unwrap();
        assert_eq!(w, w.t());
    }

    #[test]
    fn test_affinity_range_and_diagonal() {
        let w = build_affinity(&sample_distances(), &AffinityConfig::default()).unwrap();
        assert!(w.iter().all(|&v| (0.0..=1.0).contains(&v)));
        for i in 0..w.nrows() {
            assert!((w[[i, i]] - 1.0).abs() < 1e-12);
        }
        // Closer points are more similar
        assert!(w[[3, 4]] > w[[3, 5]]);
    }

    #[test]
    fn test_affinity_zero_denominator_quirk() {
        // All points identical: every local scale is zero, every weight becomes exp(0)
        let d = Array2::<f64>::zeros((4, 4));
        let w = build_affinity(&d, &AffinityConfig::default()).unwrap();
        assert!(w.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_affinity_rejects_non_square() {
        let d = Array2::<f64>::zeros((2, 3));
        assert!(build_affinity(&d, &AffinityConfig::default()).is_err());
        let d = Array2::<f64>::zeros((0, 0));
        assert!(build_affinity(&d, &AffinityConfig::default()).is_err());
    }

    #[test]
    fn test_probability_rows_sum_to_one() {
        let w = build_affinity(&sample_distances(), &AffinityConfig::default()).unwrap();
        for diag in [false, true] {
            let p = probability_matrix(&w, diag);
            for row in p.axis_iter(Axis(0)) {
                assert!((row.sum() - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_probability_zero_row_stays_zero() {
        let w = array![[0.0, 0.0], [1.0, 3.0]];
        let p = probability_matrix(&w, false);
        assert_eq!(p.row(0).sum(), 0.0);
        assert!((p[[1, 1]] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_sparse_knn_keeps_top_k() {
        let w = array![[1.0, 0.5, 0.1, 0.4], [0.5, 1.0, 0.2, 0.0], [0.1, 0.2, 1.0, 0.9], [0.4, 0.0, 0.9, 1.0]];
        let s = sparse_knn(&w, 2);
        assert_eq!(s.rows(), 4);
        for row in s.outer_iterator() {
            assert_eq!(row.nnz(), 2);
            let total: f64 = row.iter().map(|(_, v)| *v).sum();
            assert!((total - 1.0).abs() < 1e-12);
        }
        let dense = s.to_dense();
        assert!((dense[[0, 0]] - 1.0 / 1.5).abs() < 1e-12);
        assert!((dense[[0, 1]] - 0.5 / 1.5).abs() < 1e-12);
        assert_eq!(dense[[0, 3]], 0.0);
    }

    #[test]
    fn test_assert_finite() {
        let mut m = Array2::<f64>::eye(3);
        assert!(assert_finite(&m, "W").is_ok());
        m[[1, 2]] = f64::NAN;
        assert!(matches!(
            assert_finite(&m, "W"),
            Err(StructureError::NumericalError(_))
        ));
    }
}
