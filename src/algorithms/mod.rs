//! Structure and chorus-detection algorithms
//!
//! Every algorithm family implements [`StructureAlgorithm`], which has two
//! capabilities: a labeled clique structure on the block time axis, and a
//! MIREX-format chorus timeline. Variants that need an external segmenter or
//! window detector take it as a trait object, so the black-box tools stay
//! outside the crate.

pub mod boundary;
pub mod ground_truth;
pub mod seq_recur;
pub mod window;

pub use boundary::{BoundaryMatchAlgorithm, BoundaryOnlyAlgorithm, LabeledBoundaryAlgorithm};
pub use ground_truth::GroundTruthStructure;
pub use seq_recur::{SeqRecur, SeqRecurBound};
pub use window::{HighlightWindow, RefrainWindow};

use crate::annotation::mirex::{Interval, MirexStructure};
use crate::error::StructureError;
use crate::similarity::ssm::SelfSimilarity;
use crate::structure::boundaries::labels_from_boundaries;
use crate::structure::cliques::{cliques_from_labels, Clique};

/// Everything an algorithm may look at for one song
#[derive(Debug, Clone)]
pub struct Song {
    /// Dataset the song belongs to
    pub dataset: String,
    /// Position of the song in its dataset
    pub index: usize,
    /// Song title
    pub title: String,
    /// Song length in seconds
    pub duration: f64,
    /// Fused self-similarity and its block time axis
    pub similarity: SelfSimilarity,
    /// Initial coarse clique partition of the block axis
    pub base_cliques: Vec<Clique>,
    /// Reference annotation
    pub ground_truth: MirexStructure,
}

impl Song {
    /// Block boundaries in seconds
    pub fn times(&self) -> &[f64] {
        &self.similarity.times
    }
}

/// Segment boundaries reported by an external segmenter
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    /// Boundary timestamps in seconds, ascending
    pub boundaries: Vec<f64>,
    /// One label per segment, if the segmenter also labels
    pub labels: Option<Vec<usize>>,
}

/// External structural segmenter
pub trait BoundaryDetector: Send + Sync {
    /// Identifier used in algorithm names
    fn name(&self) -> &str;

    /// Segment one song
    fn segment(&self, song: &Song) -> Result<Segmentation, StructureError>;
}

/// External single-highlight detector
pub trait HighlightDetector: Send + Sync {
    /// The highlight window of one song
    fn highlight(&self, song: &Song) -> Result<Interval, StructureError>;
}

/// External chorus detector that searches for a fixed-length clip
pub trait ChorusWindowDetector: Send + Sync {
    /// Start of the best clip of `clip_length` seconds, `None` if nothing was found
    fn detect(&self, song: &Song, clip_length: f64) -> Result<Option<f64>, StructureError>;
}

/// Structure and chorus detection for one algorithm family
pub trait StructureAlgorithm: Send + Sync {
    /// Short identifier for reports
    fn name(&self) -> &str;

    /// Clique partition of the song's block axis
    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError>;

    /// Chorus timeline in MIREX format
    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError>;
}

/// Two-clique structure (target vs the rest) from a chorus timeline
///
/// Used by algorithms that only produce chorus windows.
pub(crate) fn section_cliques(
    sections: &MirexStructure,
    times: &[f64],
    target_label: &str,
) -> Result<Vec<Clique>, StructureError> {
    let mut boundaries: Vec<f64> = sections.intervals.iter().map(|i| i.onset).collect();
    if let Some(last) = sections.intervals.last() {
        boundaries.push(last.offset);
    }
    let labels: Vec<usize> = sections
        .labels
        .iter()
        .map(|l| usize::from(l == target_label))
        .collect();
    let frames = labels_from_boundaries(&boundaries, &labels, times)?;
    Ok(cliques_from_labels(&frames))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_cliques() {
        let sections = MirexStructure {
            intervals: vec![Interval::new(0.0, 3.0), Interval::new(3.0, 6.0), Interval::new(6.0, 8.0)],
            labels: vec!["others".into(), "chorus".into(), "others".into()],
        };
        let times: Vec<f64> = (0..=8).map(|i| i as f64).collect();
        let cliques = section_cliques(&sections, &times, "chorus").unwrap();
        assert_eq!(cliques, vec![vec![0, 1, 2, 6, 7], vec![3, 4, 5]]);
    }
}
