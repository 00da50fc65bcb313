//! Chorus analysis
//!
//! Turns clique structures into chorus decisions and scores them:
//! - Classifier interface and logistic regression model
//! - Per-clique features, training data, and chorus timelines
//! - Time-weighted evaluation over song batches

pub mod classifier;
pub mod detection;
pub mod evaluation;

pub use classifier::{ChorusClassifier, LogisticClassifier, LogisticOptions};
pub use detection::{chorus_detection, clique_features, clique_training_data, CLIQUE_FEATURE_COUNT};
pub use evaluation::{chorus_scores, evaluate_batch, ChorusScores, EvaluationSummary, SongEvaluation};
