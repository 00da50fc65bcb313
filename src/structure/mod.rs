//! Recurrence structure
//!
//! Clique partitions of the block time axis:
//! - Extraction from label arrays and occurrence helpers
//! - Run-length smoothing
//! - Sequential recurrence building
//! - Bridges from external boundary detectors

pub mod boundaries;
pub mod cliques;
pub mod recurrence;
pub mod smoothing;

pub use boundaries::{frame_intervals, labels_from_block_ssm, labels_from_boundaries};
pub use cliques::{
    clique_groups, clique_heads, clique_tails, cliques_from_labels, filtered_clique_ends,
    labeled_ssm, labels_from_cliques, validate_partition, Clique,
};
pub use recurrence::build_recurrence;
pub use smoothing::{smooth_cliques, smooth_labels};
