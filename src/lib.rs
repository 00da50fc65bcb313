//! # Refrain DSP
//!
//! Music structure analysis and chorus detection over precomputed audio
//! features: fused self-similarity, recurring-section cliques, and
//! MIREX-format chorus timelines matched against ground truth.
//!
//! ## Features
//!
//! - **Self-Similarity**: Timbre, harmony, melody and rhythm affinities fused by cross-diffusion
//! - **Structure**: Clique partitions with smoothing and sequential recurrence building
//! - **Annotation**: MIREX interval arithmetic and ground-truth label matching
//! - **Chorus Detection**: Per-clique features, a trainable classifier, and batch evaluation
//!
//! ## Quick Start
//!
//! ```no_run
//! use ndarray::Array2;
//! use refrain_dsp::{self_similarity_matrix, FeatureSet, StructureConfig};
//! use refrain_dsp::structure::{build_recurrence, cliques_from_labels};
//!
//! // Precomputed features, one row per frame
//! let frames = 4000;
//! let features = FeatureSet {
//!     mfcc: Array2::zeros((frames, 20)),
//!     chroma: Array2::zeros((frames, 12)),
//!     tempogram: Array2::zeros((frames, 32)),
//!     pitches: None,
//! };
//!
//! let config = StructureConfig::default();
//! let ssm = self_similarity_matrix(&features, &config)?;
//!
//! // Initial partition from an external segmenter, refined into recurrences
//! let labels: Vec<usize> = (0..ssm.n_blocks()).map(|b| (b / 40) % 3).collect();
//! let cliques = build_recurrence(&cliques_from_labels(&labels), &ssm.times, &config.cliques)?;
//! println!("{} recurring sections", cliques.len());
//! # Ok::<(), refrain_dsp::StructureError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Features → Block Aggregation → Affinities → Fusion → Cliques → Chorus Labels → Evaluation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algorithms;
pub mod analysis;
pub mod annotation;
pub mod config;
pub mod error;
pub mod io;
pub mod similarity;
pub mod structure;

// Re-export main types
pub use algorithms::{Song, StructureAlgorithm};
pub use annotation::{Interval, MirexStructure};
pub use config::StructureConfig;
pub use error::StructureError;
pub use similarity::{self_similarity_matrix, FeatureSet, Modality, SelfSimilarity};
pub use structure::Clique;
