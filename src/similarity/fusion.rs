//! Similarity network fusion by cross diffusion
//!
//! Blends several affinity matrices (one per feature modality) into a single
//! consensus matrix by repeatedly propagating each modality's diffusion state
//! through the others' nearest-neighbor graphs.
//!
//! # Reference
//!
//! Wang, B., et al. (2014). Similarity network fusion for aggregating data
//! types on a genomic scale. *Nature Methods*, 11(3), 333-337.
//!
//! # Algorithm
//!
//! 1. For each modality, build the full row-stochastic matrix `P` and the
//!    top-K restricted matrix `S`
//! 2. Start every diffusion state at its `P`
//! 3. For a fixed number of iterations, replace each state with
//!    `S_i * mean(other states) * S_i^T`, plus identity and temporal-neighbor
//!    regularization
//! 4. Average the final states
//!
//! Every iteration reads only the previous iteration's states: all new
//! states are computed first, then swapped in together.

use ndarray::Array2;
use sprs::CsMat;

use super::affinity::{assert_finite, check_square, probability_matrix, sparse_knn};
use crate::config::FusionConfig;
use crate::error::StructureError;

/// Fuse affinity matrices by cross diffusion
///
/// # Arguments
///
/// * `affinities` - One square affinity matrix per modality, all the same size,
///   indexed in time order
/// * `config` - Neighbor count, iteration count and regularization weights
///
/// # Returns
///
/// Fused similarity matrix of the same shape. Values are not rescaled to
/// `[0, 1]`; treat them as relative similarities.
///
/// With a single modality, that modality diffuses through its own graph.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` for an empty list or mismatched
/// shapes, and `StructureError::NumericalError` if any input or the result
/// contains NaN
pub fn fuse(
    affinities: &[Array2<f64>],
    config: &FusionConfig,
) -> Result<Array2<f64>, StructureError> {
    let first = affinities.first().ok_or_else(|| {
        StructureError::InvalidInput("No affinity matrices to fuse".to_string())
    })?;
    let n = check_square(first, "affinity matrix")?;
    for (idx, w) in affinities.iter().enumerate() {
        if w.dim() != (n, n) {
            return Err(StructureError::InvalidInput(format!(
                "Affinity {} has shape {:?}, expected {}x{}",
                idx,
                w.dim(),
                n,
                n
            )));
        }
        assert_finite(w, &format!("affinity {}", idx))?;
    }
    if config.k == 0 {
        return Err(StructureError::InvalidInput(
            "Fusion neighbor count k must be positive".to_string(),
        ));
    }

    let modalities = affinities.len();
    log::debug!(
        "Fusing {} affinity matrices of size {}, k={}, iterations={}",
        modalities,
        n,
        config.k,
        config.iterations
    );

    let restricted: Vec<CsMat<f64>> = affinities.iter().map(|w| sparse_knn(w, config.k)).collect();
    let mut states: Vec<Array2<f64>> = affinities
        .iter()
        .map(|w| probability_matrix(w, false))
        .collect();

    for iteration in 0..config.iterations {
        let next: Vec<Array2<f64>> = (0..modalities)
            .map(|i| {
                let others = average_others(&states, i);
                let mut propagated = propagate(&restricted[i], &others);
                regularize(&mut propagated, config.reg_diag, config.reg_neighbs);
                propagated
            })
            .collect();
        states = next;
        log::debug!("Fusion iteration {} of {} done", iteration + 1, config.iterations);
    }

    let mut fused = Array2::<f64>::zeros((n, n));
    for state in &states {
        fused += state;
    }
    fused /= modalities as f64;

    assert_finite(&fused, "fused affinity")?;
    Ok(fused)
}

/// Mean of every state except `skip` (the state itself when it is alone)
fn average_others(states: &[Array2<f64>], skip: usize) -> Array2<f64> {
    if states.len() == 1 {
        return states[0].clone();
    }
    let mut acc = Array2::<f64>::zeros(states[skip].raw_dim());
    for (k, state) in states.iter().enumerate() {
        if k != skip {
            acc += state;
        }
    }
    acc / (states.len() - 1) as f64
}

/// Compute `S * P * S^T` with the sparse operator on the left both times
fn propagate(s: &CsMat<f64>, p: &Array2<f64>) -> Array2<f64> {
    let sp: Array2<f64> = s * p;
    let sps_t: Array2<f64> = s * &sp.t();
    sps_t.reversed_axes()
}

fn regularize(m: &mut Array2<f64>, reg_diag: f64, reg_neighbs: f64) {
    let n = m.nrows();
    if reg_diag > 0.0 {
        for i in 0..n {
            m[[i, i]] += reg_diag;
        }
    }
    if reg_neighbs > 0.0 {
        for i in 1..n {
            m[[i, i - 1]] += reg_neighbs;
            m[[i - 1, i]] += reg_neighbs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AffinityConfig;
    use crate::similarity::affinity::build_affinity;
    use crate::similarity::distance::euclidean_csm;
    use ndarray::array;

    fn affinity_from(points: Array2<f64>) -> Array2<f64> {
        let d = euclidean_csm(&points, &points).unwrap();
        build_affinity(&d, &AffinityConfig { k: 2, mu: 0.5 }).unwrap()
    }

    fn two_modalities() -> Vec<Array2<f64>> {
        vec![
            affinity_from(array![[0.0], [0.1], [5.0], [5.1], [0.05], [5.2]]),
            affinity_from(array![[1.0, 0.0], [1.1, 0.1], [3.0, 3.0], [3.1, 2.9], [0.9, 0.0], [3.0, 3.2]]),
        ]
    }

    #[test]
    fn test_fuse_shape_and_finite() {
        let ws = two_modalities();
        let config = FusionConfig {
            k: 3,
            iterations: 20,
            ..FusionConfig::default()
        };
        let fused = fuse(&ws, &config).unwrap();
        assert_eq!(fused.dim(), (6, 6));
        assert!(fused.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fuse_keeps_recurrence() {
        let ws = two_modalities();
        let config = FusionConfig {
            k: 3,
            reg_neighbs: 0.0,
            ..FusionConfig::default()
        };
        let fused = fuse(&ws, &config).unwrap();
        // Frames 0 and 4 recur in both modalities, frames 0 and 2 never do
        assert!(fused[[0, 4]] > fused[[0, 2]]);
    }

    #[test]
    fn test_fuse_zero_iterations_is_mean_probability() {
        let ws = two_modalities();
        let config = FusionConfig {
            iterations: 0,
            ..FusionConfig::default()
        };
        let fused = fuse(&ws, &config).unwrap();
        let expected = (probability_matrix(&ws[0], false) + probability_matrix(&ws[1], false)) / 2.0;
        for (a, b) in fused.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_fuse_single_modality() {
        let ws = vec![two_modalities().remove(0)];
        let fused = fuse(&ws, &FusionConfig::default()).unwrap();
        assert!(fused.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_fuse_regularization_bands() {
        // Identity affinities isolate every point, so only regularization remains visible
        let ws = vec![Array2::<f64>::eye(4), Array2::<f64>::eye(4)];
        let config = FusionConfig {
            k: 1,
            iterations: 1,
            reg_diag: 1.0,
            reg_neighbs: 0.5,
        };
        let fused = fuse(&ws, &config).unwrap();
        assert!((fused[[0, 0]] - 2.0).abs() < 1e-12);
        assert!((fused[[0, 1]] - 0.5).abs() < 1e-12);
        assert!((fused[[2, 1]] - 0.5).abs() < 1e-12);
        assert_eq!(fused[[0, 2]], 0.0);
    }

    #[test]
    fn test_fuse_rejects_nan() {
        let mut ws = two_modalities();
        ws[1][[2, 3]] = f64::NAN;
        assert!(matches!(
            fuse(&ws, &FusionConfig::default()),
            Err(StructureError::NumericalError(_))
        ));
    }

    #[test]
    fn test_fuse_rejects_shape_mismatch() {
        let ws = vec![Array2::<f64>::eye(3), Array2::<f64>::eye(4)];
        assert!(matches!(
            fuse(&ws, &FusionConfig::default()),
            Err(StructureError::InvalidInput(_))
        ));
        assert!(fuse(&[], &FusionConfig::default()).is_err());
    }
}
