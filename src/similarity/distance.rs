//! Cross-similarity (pairwise distance) matrices
//!
//! All functions take row-major point sets: `x` is `M x d`, `y` is `N x d`,
//! and return an `M x N` distance matrix.

use ndarray::{Array1, Array2, Axis};

use crate::error::StructureError;

/// Distance metric applied to a pair of point sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseMetric {
    /// Euclidean distance
    Euclidean,
    /// Cosine distance (1 - cosine similarity)
    Cosine,
}

impl BaseMetric {
    /// Compute the cross-similarity matrix for this metric
    pub fn csm(self, x: &Array2<f64>, y: &Array2<f64>) -> Result<Array2<f64>, StructureError> {
        match self {
            BaseMetric::Euclidean => euclidean_csm(x, y),
            BaseMetric::Cosine => cosine_csm(x, y),
        }
    }
}

/// Metric used when comparing stacked feature blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Plain base metric over the whole stacked vector
    Plain(BaseMetric),
    /// Base metric minimized over cyclic rolls of the class axis
    ShiftInvariant {
        /// Metric evaluated at each roll
        base: BaseMetric,
        /// Number of stacked windows per class
        wins_per_block: usize,
    },
}

impl Metric {
    /// Compute the cross-similarity matrix for this metric
    pub fn csm(&self, x: &Array2<f64>, y: &Array2<f64>) -> Result<Array2<f64>, StructureError> {
        match *self {
            Metric::Plain(base) => base.csm(x, y),
            Metric::ShiftInvariant {
                base,
                wins_per_block,
            } => shift_invariant_csm(base, wins_per_block, x, y),
        }
    }
}

fn check_dims(x: &Array2<f64>, y: &Array2<f64>) -> Result<(), StructureError> {
    if x.ncols() != y.ncols() {
        return Err(StructureError::InvalidInput(format!(
            "Dimension mismatch: {} vs {} columns",
            x.ncols(),
            y.ncols()
        )));
    }
    Ok(())
}

fn row_sq_norms(x: &Array2<f64>) -> Array1<f64> {
    x.map_axis(Axis(1), |row| row.dot(&row))
}

/// Euclidean cross-similarity matrix
///
/// Uses the identity `|x-y|^2 = |x|^2 + |y|^2 - 2 x.y`. Cancellation can make
/// the squared distance slightly negative, so it is clamped to zero before
/// the square root.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `x` and `y` differ in dimension
pub fn euclidean_csm(x: &Array2<f64>, y: &Array2<f64>) -> Result<Array2<f64>, StructureError> {
    check_dims(x, y)?;

    let xx = row_sq_norms(x);
    let yy = row_sq_norms(y);
    let mut c = x.dot(&y.t());
    for ((i, j), v) in c.indexed_iter_mut() {
        let sq = xx[i] + yy[j] - 2.0 * *v;
        *v = if sq < 0.0 { 0.0 } else { sq.sqrt() };
    }
    Ok(c)
}

/// Cosine distance matrix
///
/// Returns `1 - cos(x_i, y_j)`, so 0 means identical direction and 2 means
/// opposite. Zero-norm rows are treated as having norm 1, and the similarity
/// is clamped to `[-1, 1]` before the subtraction.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `x` and `y` differ in dimension
pub fn cosine_csm(x: &Array2<f64>, y: &Array2<f64>) -> Result<Array2<f64>, StructureError> {
    check_dims(x, y)?;

    let normalize = |m: &Array2<f64>| -> Array2<f64> {
        let norms = row_sq_norms(m).mapv(|s| {
            let n = s.sqrt();
            if n == 0.0 {
                1.0
            } else {
                n
            }
        });
        m / &norms.insert_axis(Axis(1))
    };

    let xn = normalize(x);
    let yn = normalize(y);
    let similarity = xn.dot(&yn.t());
    Ok(similarity.mapv(|s| 1.0 - s.clamp(-1.0, 1.0)))
}

/// Shift-invariant cross-similarity matrix
///
/// Each row of `x` is viewed as an `(n_class, wins_per_block)` grid, where
/// `n_class = d / wins_per_block`. The base metric is evaluated for every
/// cyclic roll of the class axis and the element-wise minimum is returned.
///
/// # Arguments
///
/// * `base` - Metric evaluated at each roll
/// * `wins_per_block` - Number of stacked windows per class
/// * `x` - `M x d` point set (the one being rolled)
/// * `y` - `N x d` point set
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `d` is not a multiple of
/// `wins_per_block` or the dimensions of `x` and `y` differ
pub fn shift_invariant_csm(
    base: BaseMetric,
    wins_per_block: usize,
    x: &Array2<f64>,
    y: &Array2<f64>,
) -> Result<Array2<f64>, StructureError> {
    check_dims(x, y)?;
    let (m, d) = x.dim();
    if wins_per_block == 0 || d % wins_per_block != 0 {
        return Err(StructureError::InvalidInput(format!(
            "Row width {} is not a multiple of wins_per_block={}",
            d, wins_per_block
        )));
    }
    let n_class = d / wins_per_block;

    log::debug!(
        "Shift-invariant CSM: {}x{} vs {} rows, {} classes x {} windows",
        m,
        d,
        y.nrows(),
        n_class,
        wins_per_block
    );

    let mut best: Option<Array2<f64>> = None;
    for shift in 0..n_class {
        let rolled = Array2::from_shape_fn((m, d), |(i, col)| {
            let class = col / wins_per_block;
            let win = col % wins_per_block;
            let src = (class + n_class - shift) % n_class;
            x[[i, src * wins_per_block + win]]
        });
        let dist = base.csm(&rolled, y)?;
        best = Some(match best {
            None => dist,
            Some(mut acc) => {
                acc.zip_mut_with(&dist, |a, &b| {
                    if b < *a {
                        *a = b;
                    }
                });
                acc
            }
        });
    }

    Ok(best.unwrap_or_else(|| Array2::zeros((m, y.nrows()))))
}
