//! Ground-truth segmentation as a structure

use std::collections::HashMap;
use std::sync::Arc;

use super::{Song, StructureAlgorithm};
use crate::analysis::classifier::ChorusClassifier;
use crate::analysis::detection::chorus_detection;
use crate::annotation::mirex::MirexStructure;
use crate::config::StructureConfig;
use crate::error::StructureError;
use crate::structure::boundaries::labels_from_boundaries;
use crate::structure::cliques::{cliques_from_labels, Clique};

/// Cliques taken from the annotated segments, chorus cliques picked by a
/// trained classifier
///
/// Isolates the classifier from structure-analysis errors.
pub struct GroundTruthStructure {
    classifier: Arc<dyn ChorusClassifier>,
    config: StructureConfig,
}

impl GroundTruthStructure {
    /// Create the algorithm around a trained classifier
    pub fn new(classifier: Arc<dyn ChorusClassifier>, config: StructureConfig) -> Self {
        Self { classifier, config }
    }
}

impl StructureAlgorithm for GroundTruthStructure {
    fn name(&self) -> &str {
        "gtBoundary"
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        let gt = &song.ground_truth;
        let Some(last) = gt.intervals.last() else {
            return Err(StructureError::InvalidInput(format!(
                "Song '{}' has an empty annotation",
                song.title
            )));
        };

        let mut ids: HashMap<&str, usize> = HashMap::new();
        let labels: Vec<usize> = gt
            .labels
            .iter()
            .map(|l| {
                let next = ids.len();
                *ids.entry(l.as_str()).or_insert(next)
            })
            .collect();
        let mut boundaries: Vec<f64> = gt.intervals.iter().map(|i| i.onset).collect();
        boundaries.push(last.offset);

        let frames = labels_from_boundaries(&boundaries, &labels, song.times())?;
        Ok(cliques_from_labels(&frames))
    }

    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError> {
        let cliques = self.structure(song)?;
        chorus_detection(
            &cliques,
            song.times(),
            &song.similarity.fused,
            self.classifier.as_ref(),
            &self.config.matching,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_support::song;
    use crate::analysis::classifier::LogisticClassifier;

    #[test]
    fn test_structure_follows_annotation() {
        let s = song(40);
        let algo = GroundTruthStructure::new(Arc::new(LogisticClassifier::default()), StructureConfig::default());
        assert_eq!(algo.structure(&s).unwrap(), s.base_cliques);
    }

    #[test]
    fn test_empty_annotation() {
        let mut s = song(40);
        s.ground_truth = MirexStructure::default();
        let algo = GroundTruthStructure::new(Arc::new(LogisticClassifier::default()), StructureConfig::default());
        assert!(algo.structure(&s).is_err());
    }
}
