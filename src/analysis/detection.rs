//! Chorus detection over clique structures
//!
//! Describes every clique with a small feature vector, labels training
//! cliques against ground truth, and turns classifier decisions back into a
//! MIREX-format chorus timeline.

use ndarray::Array2;

use super::classifier::ChorusClassifier;
use crate::annotation::matching::clique_labels;
use crate::annotation::mirex::{multi_chorus_sections, Interval, MirexStructure};
use crate::config::MatchConfig;
use crate::error::StructureError;
use crate::similarity::affinity::check_square;
use crate::structure::boundaries::frame_intervals;
use crate::structure::cliques::{clique_groups, Clique};

/// Number of features per clique
pub const CLIQUE_FEATURE_COUNT: usize = 6;

fn occurrence_windows(clique: &[usize], times: &[f64]) -> Vec<Interval> {
    clique_groups(clique)
        .iter()
        .filter_map(|g| g.last().map(|&last| Interval::new(times[g[0]], times[last + 1])))
        .collect()
}

/// Feature vector of every clique
///
/// Columns, in order:
/// 0. total duration in seconds
/// 1. fraction of the song covered
/// 2. number of occurrences
/// 3. mean occurrence duration in seconds
/// 4. onset of the first occurrence relative to song length
/// 5. mean fused affinity between the clique's frames over the global mean
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `fused` is not square with one
/// row per frame of `times`, or a clique index is out of range
pub fn clique_features(
    cliques: &[Clique],
    times: &[f64],
    fused: &Array2<f64>,
) -> Result<Array2<f64>, StructureError> {
    let n = check_square(fused, "fused SSM")?;
    if times.len() != n + 1 {
        return Err(StructureError::InvalidInput(format!(
            "Time axis has {} boundaries for {} frames",
            times.len(),
            n
        )));
    }
    if let Some(&bad) = cliques.iter().flatten().find(|&&i| i >= n) {
        return Err(StructureError::InvalidInput(format!(
            "Clique index {} out of range for {} frames",
            bad, n
        )));
    }

    let song_duration = times[n] - times[0];
    let global_mean = fused.mean().unwrap_or(0.0);
    let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };

    let mut features = Array2::<f64>::zeros((cliques.len(), CLIQUE_FEATURE_COUNT));
    for (row, clique) in cliques.iter().enumerate() {
        let windows = occurrence_windows(clique, times);
        let duration: f64 = windows.iter().map(Interval::duration).sum();
        let first_onset = windows.first().map_or(0.0, |w| w.onset - times[0]);

        let mut affinity = 0.0;
        for &x in clique {
            for &y in clique {
                affinity += fused[[x, y]];
            }
        }
        let pairs = (clique.len() * clique.len()) as f64;

        features[[row, 0]] = duration;
        features[[row, 1]] = ratio(duration, song_duration);
        features[[row, 2]] = windows.len() as f64;
        features[[row, 3]] = ratio(duration, windows.len() as f64);
        features[[row, 4]] = ratio(first_onset, song_duration);
        features[[row, 5]] = ratio(ratio(affinity, pairs), global_mean);
    }
    Ok(features)
}

/// Features and ground-truth target flags of every clique
///
/// Cliques are labelled with the same precision/recall/duration rule as
/// [`crate::annotation::matching::match_clique_label`].
///
/// # Errors
///
/// Propagates the errors of [`clique_features`]
pub fn clique_training_data(
    cliques: &[Clique],
    times: &[f64],
    fused: &Array2<f64>,
    ground_truth: &MirexStructure,
    config: &MatchConfig,
) -> Result<(Array2<f64>, Vec<bool>), StructureError> {
    let features = clique_features(cliques, times, fused)?;
    let labels = clique_labels(ground_truth, cliques, &frame_intervals(times), config)?
        .into_iter()
        .map(|l| l == config.target_label)
        .collect();
    Ok((features, labels))
}

/// Chorus timeline from classifier decisions on every clique
///
/// All occurrences of the cliques the classifier accepts become target
/// windows, merged by [`multi_chorus_sections`] over the song length
/// `times.last()`. No accepted clique yields a single non-target interval.
///
/// # Errors
///
/// Propagates feature, classifier and merge errors
pub fn chorus_detection(
    cliques: &[Clique],
    times: &[f64],
    fused: &Array2<f64>,
    classifier: &dyn ChorusClassifier,
    config: &MatchConfig,
) -> Result<MirexStructure, StructureError> {
    let features = clique_features(cliques, times, fused)?;
    let decisions = if cliques.is_empty() {
        Vec::new()
    } else {
        classifier.predict(&features)?
    };
    if decisions.len() != cliques.len() {
        return Err(StructureError::ExternalAlgorithm(format!(
            "Classifier returned {} decisions for {} cliques",
            decisions.len(),
            cliques.len()
        )));
    }

    let windows: Vec<Interval> = cliques
        .iter()
        .zip(&decisions)
        .filter(|(_, is_target)| **is_target)
        .flat_map(|(clique, _)| occurrence_windows(clique, times))
        .collect();
    log::debug!(
        "Chorus detection: {} of {} cliques accepted, {} windows",
        decisions.iter().filter(|&&d| d).count(),
        cliques.len(),
        windows.len()
    );

    let duration = times.last().copied().unwrap_or(0.0);
    multi_chorus_sections(&windows, duration, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classifier::LogisticClassifier;

    fn unit_times(n: usize) -> Vec<f64> {
        (0..=n).map(|i| i as f64).collect()
    }

    /// Accepts cliques whose first feature exceeds a threshold
    struct DurationRule(f64);

    impl ChorusClassifier for DurationRule {
        fn train(&mut self, _: &Array2<f64>, _: &[bool]) -> Result<(), StructureError> {
            Ok(())
        }

        fn score(&self, features: &Array2<f64>) -> Result<Vec<f64>, StructureError> {
            Ok(features
                .rows()
                .into_iter()
                .map(|r| if r[0] > self.0 { 1.0 } else { 0.0 })
                .collect())
        }
    }

    fn layout() -> (Vec<Clique>, Vec<f64>, Array2<f64>) {
        // verse 0..10, chorus 10..20, verse 20..30, chorus 30..40
        let cliques = vec![(0..10).chain(20..30).collect(), (10..20).chain(30..40).collect()];
        let part = |i: usize| (i / 10) % 2;
        let fused = Array2::from_shape_fn((40, 40), |(i, j)| if part(i) == part(j) { 1.0 } else { 0.1 });
        (cliques, unit_times(40), fused)
    }

    #[test]
    fn test_clique_features() {
        let (cliques, times, fused) = layout();
        let f = clique_features(&cliques, &times, &fused).unwrap();
        assert_eq!(f.dim(), (2, CLIQUE_FEATURE_COUNT));
        assert_eq!(f[[0, 0]], 20.0);
        assert!((f[[0, 1]] - 0.5).abs() < 1e-12);
        assert_eq!(f[[1, 2]], 2.0);
        assert_eq!(f[[1, 3]], 10.0);
        assert!((f[[1, 4]] - 0.25).abs() < 1e-12);
        // within-clique affinity 1.0 against a global mean of 0.55
        assert!((f[[0, 5]] - 1.0 / 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_clique_features_errors() {
        let (cliques, times, fused) = layout();
        assert!(clique_features(&cliques, &times[..30], &fused).is_err());
        assert!(clique_features(&[vec![45]], &times, &fused).is_err());
    }

    #[test]
    fn test_training_data_labels() {
        let (cliques, times, fused) = layout();
        let gt = MirexStructure {
            intervals: (0..4).map(|k| Interval::new(k as f64 * 10.0, k as f64 * 10.0 + 10.0)).collect(),
            labels: ["verse", "chorus", "verse", "chorus"].iter().map(|s| s.to_string()).collect(),
        };
        let (features, labels) = clique_training_data(&cliques, &times, &fused, &gt, &MatchConfig::default()).unwrap();
        assert_eq!(features.nrows(), 2);
        assert_eq!(labels, vec![false, true]);
    }

    #[test]
    fn test_chorus_detection_merges_accepted_cliques() {
        let cliques = vec![(0..10).chain(30..40).collect::<Clique>(), (10..30).collect()];
        let times = unit_times(40);
        let fused = Array2::from_elem((40, 40), 0.5);
        let s = chorus_detection(&cliques, &times, &fused, &DurationRule(19.5), &MatchConfig::default()).unwrap();
        // Both cliques last 20 s; the threshold accepts both
        assert_eq!(s.len(), 1);
        assert_eq!(s.labels, vec!["chorus"]);

        let s = chorus_detection(&cliques, &times, &fused, &DurationRule(25.0), &MatchConfig::default()).unwrap();
        assert_eq!(s.intervals, vec![Interval::new(0.0, 40.0)]);
        assert_eq!(s.labels, vec!["others"]);
    }

    #[test]
    fn test_chorus_detection_untrained_classifier_fails() {
        let (cliques, times, fused) = layout();
        let clf = LogisticClassifier::default();
        assert!(chorus_detection(&cliques, &times, &fused, &clf, &MatchConfig::default()).is_err());
    }
}
