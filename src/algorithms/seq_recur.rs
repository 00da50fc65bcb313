//! Sequential recurrence algorithms

use std::sync::Arc;

use super::{Song, StructureAlgorithm};
use crate::analysis::classifier::ChorusClassifier;
use crate::analysis::detection::chorus_detection;
use crate::annotation::matching::match_clique_label;
use crate::annotation::mirex::{merge_intervals, MirexStructure};
use crate::config::StructureConfig;
use crate::error::StructureError;
use crate::structure::boundaries::frame_intervals;
use crate::structure::cliques::Clique;
use crate::structure::recurrence::build_recurrence;

/// Recurrence builder over the song's base cliques, chorus cliques picked
/// by a trained classifier
pub struct SeqRecur {
    classifier: Arc<dyn ChorusClassifier>,
    config: StructureConfig,
}

impl SeqRecur {
    /// Create the algorithm around a trained classifier
    pub fn new(classifier: Arc<dyn ChorusClassifier>, config: StructureConfig) -> Self {
        Self { classifier, config }
    }
}

impl StructureAlgorithm for SeqRecur {
    fn name(&self) -> &str {
        "seqRecur"
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        build_recurrence(&song.base_cliques, song.times(), &self.config.cliques)
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

/// Upper bound of [`SeqRecur`]: same structure, cliques labelled from the
/// ground truth instead of the classifier
pub struct SeqRecurBound {
    raw: SeqRecur,
}

impl SeqRecurBound {
    /// Wrap a [`SeqRecur`]
    pub fn new(raw: SeqRecur) -> Self {
        Self { raw }
    }
}

impl StructureAlgorithm for SeqRecurBound {
    fn name(&self) -> &str {
        "seqRecur+"
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        self.raw.structure(song)
    }

    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError> {
        let cliques = self.raw.structure(song)?;
        let intervals = frame_intervals(song.times());
        let labelled = match_clique_label(&intervals, &cliques, &song.ground_truth, &self.raw.config.matching)?;
        Ok(merge_intervals(&labelled))
    }
}
