//! Algorithms built on external boundary detectors

use std::sync::Arc;

use super::{section_cliques, BoundaryDetector, Song, StructureAlgorithm};
use crate::analysis::classifier::ChorusClassifier;
use crate::analysis::detection::chorus_detection;
use crate::annotation::matching::match_label;
use crate::annotation::mirex::{merge_intervals, Interval, MirexStructure};
use crate::config::StructureConfig;
use crate::error::StructureError;
use crate::similarity::ssm::log_ssm;
use crate::structure::boundaries::{labels_from_block_ssm, labels_from_boundaries};
use crate::structure::cliques::{cliques_from_labels, Clique};
use crate::structure::smoothing::smooth_cliques;

fn smoothed_cliques(frames: &[usize], config: &StructureConfig) -> Result<Vec<Clique>, StructureError> {
    let cliques = cliques_from_labels(frames);
    smooth_cliques(&cliques, frames.len(), config.cliques.smooth_kernel_size)
}

fn classify(
    cliques: &[Clique],
    song: &Song,
    classifier: &dyn ChorusClassifier,
    config: &StructureConfig,
) -> Result<MirexStructure, StructureError> {
    chorus_detection(cliques, song.times(), &song.similarity.fused, classifier, &config.matching)
}

/// Segmenter that labels its segments; labels are projected onto the block
/// axis and smoothed
pub struct LabeledBoundaryAlgorithm {
    name: String,
    detector: Box<dyn BoundaryDetector>,
    classifier: Arc<dyn ChorusClassifier>,
    config: StructureConfig,
}

impl LabeledBoundaryAlgorithm {
    /// Create the algorithm around a labelling segmenter and a trained classifier
    pub fn new(
        detector: Box<dyn BoundaryDetector>,
        classifier: Arc<dyn ChorusClassifier>,
        config: StructureConfig,
    ) -> Self {
        Self {
            name: detector.name().to_string(),
            detector,
            classifier,
            config,
        }
    }
}

impl StructureAlgorithm for LabeledBoundaryAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        let segmentation = self.detector.segment(song)?;
        let labels = segmentation.labels.ok_or_else(|| {
            StructureError::ExternalAlgorithm(format!("Segmenter '{}' returned no labels", self.name))
        })?;
        let frames = labels_from_boundaries(&segmentation.boundaries, &labels, song.times())?;
        smoothed_cliques(&frames, &self.config)
    }

    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError> {
        let cliques = self.structure(song)?;
        classify(&cliques, song, self.classifier.as_ref(), &self.config)
    }
}

/// Segmenter without labels; segments are labelled by their similarity in
/// the fused matrix
pub struct BoundaryOnlyAlgorithm {
    name: String,
    detector: Box<dyn BoundaryDetector>,
    classifier: Arc<dyn ChorusClassifier>,
    config: StructureConfig,
}

impl BoundaryOnlyAlgorithm {
    /// Create the algorithm around a segmenter and a trained classifier
    pub fn new(
        detector: Box<dyn BoundaryDetector>,
        classifier: Arc<dyn ChorusClassifier>,
        config: StructureConfig,
    ) -> Self {
        Self {
            name: detector.name().to_string(),
            detector,
            classifier,
            config,
        }
    }
}

impl StructureAlgorithm for BoundaryOnlyAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        let segmentation = self.detector.segment(song)?;
        let log_fused = log_ssm(&song.similarity.fused, self.config.cliques.log_epsilon);
        let frames = labels_from_block_ssm(
            &segmentation.boundaries,
            song.times(),
            &log_fused,
            self.config.cliques.ssm_log_threshold,
        )?;
        smoothed_cliques(&frames, &self.config)
    }

    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError> {
        let cliques = self.structure(song)?;
        classify(&cliques, song, self.classifier.as_ref(), &self.config)
    }
}

/// Upper bound for a segmenter: every segment labelled directly from the
/// ground truth
pub struct BoundaryMatchAlgorithm {
    name: String,
    detector: Box<dyn BoundaryDetector>,
    config: StructureConfig,
}

impl BoundaryMatchAlgorithm {
    /// Create the algorithm around a segmenter
    pub fn new(detector: Box<dyn BoundaryDetector>, config: StructureConfig) -> Self {
        Self {
            name: format!("{}+", detector.name()),
            detector,
            config,
        }
    }
}

impl StructureAlgorithm for BoundaryMatchAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        let sections = self.chorus_sections(song)?;
        section_cliques(&sections, song.times(), &self.config.matching.target_label)
    }

    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError> {
        let segmentation = self.detector.segment(song)?;
        let mut intervals: Vec<Interval> = segmentation
            .boundaries
            .windows(2)
            .map(|w| Interval::new(w[0], w[1]))
            .collect();
        let mut labels = match_label(&intervals, &song.ground_truth, &self.config.matching);

        // Segments past the end of the audio are dropped, the last one is clipped
        while intervals.last().is_some_and(|i| i.onset >= song.duration) {
            intervals.pop();
            labels.pop();
        }
        let Some(last) = intervals.last_mut() else {
            return Err(StructureError::InvalidInput(format!(
                "Segmenter '{}' returned no segment inside the song",
                self.name
            )));
        };
        last.offset = song.duration;

        Ok(merge_intervals(&MirexStructure::new(intervals, labels)?))
    }
}
