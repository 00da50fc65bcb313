//! Structure annotations
//!
//! MIREX-format segmentations and their matching against ground truth:
//! - Interval arithmetic and label run merging
//! - Target-window reconciliation
//! - Per-interval and per-clique ground-truth labelling

pub mod matching;
pub mod mirex;

pub use matching::{clique_labels, match_clique_label, match_label};
pub use mirex::{
    extract_functions, filter_intervals, interval_intersection, merge_intervals, mirex_lines,
    multi_chorus_sections, number_cliques, remove_number, single_chorus_section, Interval,
    MirexStructure,
};
