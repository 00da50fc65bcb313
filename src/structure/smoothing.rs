//! Clique smoothing
//!
//! Upstream boundary detectors jitter, leaving short spurious occurrences
//! between longer ones. Smoothing folds every run shorter than a minimum
//! length into its dominant neighbor until no short run remains.

use super::cliques::{cliques_from_labels, labels_from_cliques, Clique};
use crate::error::StructureError;

#[derive(Debug, Clone, Copy)]
struct Run {
    label: usize,
    len: usize,
}

fn runs_of(labels: &[usize]) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for &label in labels {
        match runs.last_mut() {
            Some(run) if run.label == label => run.len += 1,
            _ => runs.push(Run { label, len: 1 }),
        }
    }
    runs
}

fn coalesce(runs: &mut Vec<Run>) {
    let mut merged: Vec<Run> = Vec::with_capacity(runs.len());
    for run in runs.drain(..) {
        match merged.last_mut() {
            Some(prev) if prev.label == run.label => prev.len += run.len,
            _ => merged.push(run),
        }
    }
    *runs = merged;
}

/// Fold runs shorter than `min_run` into their neighbors
///
/// The shortest run (earliest on ties) is relabeled with its longer neighbor
/// (the left one on ties), adjacent equal runs are joined, and the process
/// repeats until every run is at least `min_run` long or a single run is
/// left.
pub fn smooth_labels(labels: &[usize], min_run: usize) -> Vec<usize> {
    let mut runs = runs_of(labels);

    while runs.len() > 1 {
        let shortest = runs
            .iter()
            .enumerate()
            .filter(|(_, r)| r.len < min_run)
            .min_by_key(|(i, r)| (r.len, *i))
            .map(|(i, _)| i);
        let Some(idx) = shortest else { break };

        let left = idx.checked_sub(1).map(|i| runs[i]);
        let right = runs.get(idx + 1).copied();
        let target = match (left, right) {
            (Some(l), Some(r)) => {
                if r.len > l.len {
                    r.label
                } else {
                    l.label
                }
            }
            (Some(l), None) => l.label,
            (None, Some(r)) => r.label,
            (None, None) => break,
        };
        runs[idx].label = target;
        coalesce(&mut runs);
    }

    runs.iter()
        .flat_map(|r| std::iter::repeat(r.label).take(r.len))
        .collect()
}

/// Remove clique occurrences shorter than `min_run` frames
///
/// # Arguments
///
/// * `cliques` - Clique partition of `0..length`
/// * `length` - Number of frames
/// * `min_run` - Minimum occurrence length in frames
///
/// # Returns
///
/// New clique partition of `0..length` in first-occurrence order
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `cliques` does not partition
/// `0..length`
pub fn smooth_cliques(
    cliques: &[Clique],
    length: usize,
    min_run: usize,
) -> Result<Vec<Clique>, StructureError> {
    log::debug!(
        "Smoothing {} cliques over {} frames, min_run={}",
        cliques.len(),
        length,
        min_run
    );
    let labels = labels_from_cliques(cliques, length)?;
    let smoothed = smooth_labels(&labels, min_run);
    let result = cliques_from_labels(&smoothed);
    log::debug!("Smoothing kept {} of {} cliques", result.len(), cliques.len());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::cliques::validate_partition;

    #[test]
    fn test_short_run_joins_longer_neighbor() {
        let labels = vec![0, 0, 0, 0, 1, 2, 2, 2, 2, 2, 2];
        let smoothed = smooth_labels(&labels, 3);
        assert_eq!(smoothed, vec![0, 0, 0, 0, 2, 2, 2, 2, 2, 2, 2]);
    }

    #[test]
    fn test_short_run_between_equal_labels_bridges() {
        let labels = vec![0, 0, 0, 1, 0, 0, 0];
        assert_eq!(smooth_labels(&labels, 2), vec![0; 7]);
    }

    #[test]
    fn test_edge_runs_merge_inward() {
        let labels = vec![3, 1, 1, 1, 1, 4];
        assert_eq!(smooth_labels(&labels, 2), vec![1; 6]);
    }

    #[test]
    fn test_all_short_collapses_to_one_run() {
        let labels = vec![0, 1, 2, 3];
        let smoothed = smooth_labels(&labels, 10);
        assert!(smoothed.iter().all(|&l| l == smoothed[0]));
        assert_eq!(smoothed.len(), 4);
    }

    #[test]
    fn test_smooth_cliques_partition_and_idempotence() {
        let labels: Vec<usize> = (0..120).map(|i| if (i / 7) % 3 == 0 && i % 5 != 0 { 1 } else { (i / 11) % 4 }).collect();
        let cliques = cliques_from_labels(&labels);
        let once = smooth_cliques(&cliques, labels.len(), 5).unwrap();
        validate_partition(&once, labels.len()).unwrap();
        let twice = smooth_cliques(&once, labels.len(), 5).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_smooth_cliques_rejects_bad_partition() {
        assert!(smooth_cliques(&[vec![0, 1]], 3, 2).is_err());
    }
}
