//! Chorus classifier
//!
//! Decides which cliques are choruses from per-clique feature vectors. The
//! [`ChorusClassifier`] trait is the seam for any trainable model; the
//! bundled [`LogisticClassifier`] is a binary logistic regression trained by
//! deterministic full-batch gradient descent on standardized features.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::StructureError;

/// Trainable binary chorus classifier
pub trait ChorusClassifier: Send + Sync {
    /// Fit the model to one feature row per sample
    fn train(&mut self, features: &Array2<f64>, labels: &[bool]) -> Result<(), StructureError>;

    /// Probability of the target class for every row
    fn score(&self, features: &Array2<f64>) -> Result<Vec<f64>, StructureError>;

    /// Target/non-target decision for every row
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<bool>, StructureError> {
        Ok(self.score(features)?.into_iter().map(|p| p >= 0.5).collect())
    }
}

/// Training options for [`LogisticClassifier`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticOptions {
    /// Full-batch gradient steps (default: 500)
    pub epochs: usize,
    /// Step size (default: 0.5)
    pub learning_rate: f64,
    /// L2 penalty on the weights (default: 1e-3)
    pub l2: f64,
    /// Weight classes inversely to their frequency (default: true)
    pub balance_classes: bool,
}

impl Default for LogisticOptions {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.5,
            l2: 1e-3,
            balance_classes: true,
        }
    }
}

/// Binary logistic regression over standardized features
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticClassifier {
    /// Training options
    pub options: LogisticOptions,
    mean: Vec<f64>,
    scale: Vec<f64>,
    weights: Vec<f64>,
    bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticClassifier {
    /// Untrained classifier with the given options
    pub fn new(options: LogisticOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// True once `train` has succeeded
    pub fn is_trained(&self) -> bool {
        !self.weights.is_empty()
    }

    fn standardize(&self, features: &Array2<f64>) -> Array2<f64> {
        let mut x = features.clone();
        for (j, mut col) in x.axis_iter_mut(Axis(1)).enumerate() {
            let (mean, scale) = (self.mean[j], self.scale[j]);
            col.mapv_inplace(|v| (v - mean) / scale);
        }
        x
    }
}

impl ChorusClassifier for LogisticClassifier {
    fn train(&mut self, features: &Array2<f64>, labels: &[bool]) -> Result<(), StructureError> {
        let (n, dim) = features.dim();
        if n == 0 || dim == 0 {
            return Err(StructureError::InvalidInput("Empty training set".to_string()));
        }
        if n != labels.len() {
            return Err(StructureError::InvalidInput(format!(
                "{} feature rows but {} labels",
                n,
                labels.len()
            )));
        }
        if features.iter().any(|v| !v.is_finite()) {
            return Err(StructureError::InvalidInput(
                "Training features contain non-finite values".to_string(),
            ));
        }

        self.mean = features
            .mean_axis(Axis(0))
            .map(|m| m.to_vec())
            .unwrap_or_else(|| vec![0.0; dim]);
        self.scale = features
            .std_axis(Axis(0), 0.0)
            .iter()
            .map(|&s| if s > 0.0 { s } else { 1.0 })
            .collect();
        let x = self.standardize(features);
        let y = Array1::from_iter(labels.iter().map(|&l| if l { 1.0 } else { 0.0 }));

        let positives = labels.iter().filter(|&&l| l).count() as f64;
        let negatives = n as f64 - positives;
        let sample_weight = Array1::from_iter(labels.iter().map(|&l| {
            if !self.options.balance_classes {
                1.0
            } else if l {
                n as f64 / (2.0 * positives)
            } else {
                n as f64 / (2.0 * negatives)
            }
        }));
        let total_weight = sample_weight.sum();

        log::debug!(
            "Training logistic classifier: {} samples ({} positive), {} features",
            n,
            positives,
            dim
        );

        let mut w = Array1::<f64>::zeros(dim);
        let mut b = 0.0;
        let lr = self.options.learning_rate;
        let l2 = self.options.l2.max(0.0);
        for _ in 0..self.options.epochs {
            let p = (x.dot(&w) + b).mapv(sigmoid);
            let diff = (&p - &y) * &sample_weight;
            let grad_w = x.t().dot(&diff) / total_weight + &w * l2;
            let grad_b = diff.sum() / total_weight;
            w = w - grad_w * lr;
            b -= lr * grad_b;
        }

        if w.iter().any(|v| !v.is_finite()) || !b.is_finite() {
            return Err(StructureError::NumericalError(
                "Logistic regression diverged".to_string(),
            ));
        }
        self.weights = w.to_vec();
        self.bias = b;
        Ok(())
    }

    fn score(&self, features: &Array2<f64>) -> Result<Vec<f64>, StructureError> {
        if !self.is_trained() {
            return Err(StructureError::InvalidInput(
                "Classifier has not been trained".to_string(),
            ));
        }
        if features.ncols() != self.weights.len() {
            return Err(StructureError::InvalidInput(format!(
                "Expected {} features per row, got {}",
                self.weights.len(),
                features.ncols()
            )));
        }
        let w = Array1::from_vec(self.weights.clone());
        let z = self.standardize(features).dot(&w) + self.bias;
        Ok(z.mapv(sigmoid).to_vec())
    }
}
