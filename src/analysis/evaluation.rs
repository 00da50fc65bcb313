//! Chorus detection evaluation
//!
//! Time-weighted precision, recall and F-measure of the estimated target
//! sections against the reference, and a batch runner that evaluates one
//! algorithm over many songs in parallel.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithms::{Song, StructureAlgorithm};
use crate::annotation::mirex::{filter_intervals, MirexStructure};
use crate::config::MatchConfig;
use crate::error::StructureError;

/// Chorus overlap scores of one song
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChorusScores {
    /// Fraction of estimated chorus time that is reference chorus
    pub precision: f64,
    /// Fraction of reference chorus time that was estimated as chorus
    pub recall: f64,
    /// Harmonic mean of precision and recall
    pub f_measure: f64,
}

/// Time-weighted chorus scores
///
/// Each ratio is 0 when its denominator is 0, so a song without estimated or
/// reference chorus scores 0.
pub fn chorus_scores(estimated: &MirexStructure, reference: &MirexStructure, config: &MatchConfig) -> ChorusScores {
    let est = filter_intervals(estimated, &config.target_label);
    let refs = filter_intervals(reference, &config.target_label);

    let overlap: f64 = est
        .iter()
        .flat_map(|e| refs.iter().map(move |r| e.intersection(r)))
        .sum();
    let est_duration: f64 = est.iter().map(|i| i.duration()).sum();
    let ref_duration: f64 = refs.iter().map(|i| i.duration()).sum();

    let precision = if est_duration > 0.0 { overlap / est_duration } else { 0.0 };
    let recall = if ref_duration > 0.0 { overlap / ref_duration } else { 0.0 };
    let f_measure = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ChorusScores {
        precision,
        recall,
        f_measure,
    }
}

/// Outcome of one song in a batch
#[derive(Debug, Clone)]
pub struct SongEvaluation {
    /// Song title
    pub title: String,
    /// Scores, or the error the algorithm failed with
    pub result: Result<ChorusScores, StructureError>,
}

/// Evaluate one algorithm over many songs in parallel
///
/// Songs are independent; results come back in input order and a failing
/// song does not stop the others.
pub fn evaluate_batch(algorithm: &dyn StructureAlgorithm, songs: &[Song], config: &MatchConfig) -> Vec<SongEvaluation> {
    log::info!("Evaluating '{}' on {} songs", algorithm.name(), songs.len());
    songs
        .par_iter()
        .map(|song| {
            let result = algorithm
                .chorus_sections(song)
                .map(|estimated| chorus_scores(&estimated, &song.ground_truth, config));
            if let Err(e) = &result {
                log::warn!("'{}' failed on '{}': {}", algorithm.name(), song.title, e);
            }
            SongEvaluation {
                title: song.title.clone(),
                result,
            }
        })
        .collect()
}

/// Mean scores over the songs of a batch that succeeded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Songs that produced scores
    pub evaluated: usize,
    /// Songs the algorithm failed on
    pub failed: usize,
    /// Mean precision
    pub precision: f64,
    /// Mean recall
    pub recall: f64,
    /// Mean F-measure
    pub f_measure: f64,
}

impl EvaluationSummary {
    /// Average the successful evaluations; all means are 0 if none succeeded
    pub fn mean(evaluations: &[SongEvaluation]) -> Self {
        let scores: Vec<&ChorusScores> = evaluations.iter().filter_map(|e| e.result.as_ref().ok()).collect();
        let n = scores.len();
        let mean = |f: fn(&ChorusScores) -> f64| {
            if n == 0 {
                0.0
            } else {
                scores.iter().map(|s| f(s)).sum::<f64>() / n as f64
            }
        };
        Self {
            evaluated: n,
            failed: evaluations.len() - n,
            precision: mean(|s| s.precision),
            recall: mean(|s| s.recall),
            f_measure: mean(|s| s.f_measure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::test_support::song;
    use crate::algorithms::SeqRecurBound;
    use crate::algorithms::SeqRecur;
    use crate::analysis::classifier::LogisticClassifier;
    use crate::annotation::mirex::Interval;
    use crate::config::StructureConfig;
    use std::sync::Arc;

    fn structure(rows: &[(f64, f64, &str)]) -> MirexStructure {
        MirexStructure {
            intervals: rows.iter().map(|&(a, b, _)| Interval::new(a, b)).collect(),
            labels: rows.iter().map(|&(_, _, l)| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_chorus_scores() {
        let reference = structure(&[(0.0, 10.0, "verse"), (10.0, 20.0, "chorus"), (20.0, 30.0, "verse")]);
        let estimated = structure(&[(0.0, 15.0, "others"), (15.0, 25.0, "chorus"), (25.0, 30.0, "others")]);
        let s = chorus_scores(&estimated, &reference, &MatchConfig::default());
        assert!((s.precision - 0.5).abs() < 1e-12);
        assert!((s.recall - 0.5).abs() < 1e-12);
        assert!((s.f_measure - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_chorus_scores_without_estimate() {
        let reference = structure(&[(0.0, 10.0, "chorus")]);
        let estimated = structure(&[(0.0, 10.0, "others")]);
        let s = chorus_scores(&estimated, &reference, &MatchConfig::default());
        assert_eq!(s, ChorusScores { precision: 0.0, recall: 0.0, f_measure: 0.0 });
    }

    #[test]
    fn test_evaluate_batch_order_and_failures() {
        let mut config = StructureConfig::default();
        config.cliques.smooth_kernel_size = 3;
        let algo = SeqRecurBound::new(SeqRecur::new(Arc::new(LogisticClassifier::default()), config));

        let mut songs: Vec<Song> = (0..4)
            .map(|i| {
                let mut s = song(40);
                s.title = format!("song {}", i);
                s
            })
            .collect();
        songs[2].base_cliques = vec![vec![0]];

        let results = evaluate_batch(&algo, &songs, &MatchConfig::default());
        let titles: Vec<&str> = results.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["song 0", "song 1", "song 2", "song 3"]);
        assert!(results[2].result.is_err());
        assert_eq!(results[0].result.as_ref().unwrap().f_measure, 1.0);

        let summary = EvaluationSummary::mean(&results);
        assert_eq!(summary.evaluated, 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.f_measure, 1.0);
    }

    #[test]
    fn test_summary_of_nothing() {
        let summary = EvaluationSummary::mean(&[]);
        assert_eq!(summary.evaluated, 0);
        assert_eq!(summary.precision, 0.0);
    }
}
