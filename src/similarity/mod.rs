//! Self-similarity construction
//!
//! Turns precomputed feature sequences into a fused affinity matrix:
//! - Cross-similarity (distance) matrices
//! - Locally-scaled affinity and diffusion operators
//! - Cross-diffusion fusion of several modalities
//! - Frame-to-block aggregation
//! - Diagonal (time-lag) median filtering
//! - Melody pitch-class histograms

pub mod affinity;
pub mod blocks;
pub mod distance;
pub mod fusion;
pub mod lag_filter;
pub mod melody;
pub mod ssm;

pub use affinity::{assert_finite, build_affinity, probability_matrix, sparse_knn};
pub use blocks::{aggregate_to_blocks, block_boundaries, stack_memory, Aggregator};
pub use distance::{cosine_csm, euclidean_csm, shift_invariant_csm, BaseMetric, Metric};
pub use fusion::fuse;
pub use ssm::{exp_ssm, log_ssm, self_similarity_matrix, FeatureSet, Modality, SelfSimilarity};
