//! Sequential recurrence builder
//!
//! Refines a coarse clique partition (for example one derived from the fused
//! self-similarity matrix) into longer recurring sections.
//!
//! # Algorithm
//!
//! 1. Smooth away occurrences shorter than the minimum run length
//! 2. Walk the sequence of occurrences and build the transition graph between
//!    cliques
//! 3. When clique `a` is always followed by clique `b`, `b` is always preceded
//!    by `a`, the pair recurs, and one of them is shorter than the minimum
//!    section duration, fold the shorter clique into the longer one
//! 4. Repeat until no pair qualifies
//!
//! Every step only relabels frames, so the output is a partition of the same
//! frames with at most as many cliques as the input.

use std::collections::HashMap;

use super::cliques::{cliques_from_labels, labels_from_cliques, Clique};
use super::smoothing::smooth_labels;
use crate::config::CliqueConfig;
use crate::error::StructureError;

#[derive(Debug, Default, Clone, Copy)]
struct Occurrences {
    count: usize,
    duration: f64,
}

impl Occurrences {
    fn mean_duration(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.duration / self.count as f64
        }
    }
}

/// Runs of equal labels as `(label, start, end)` with `end` exclusive
fn label_runs(labels: &[usize]) -> Vec<(usize, usize, usize)> {
    let mut runs: Vec<(usize, usize, usize)> = Vec::new();
    for (frame, &label) in labels.iter().enumerate() {
        match runs.last_mut() {
            Some(run) if run.0 == label => run.2 = frame + 1,
            _ => runs.push((label, frame, frame + 1)),
        }
    }
    runs
}

/// Find one pair of cliques to merge, as `(absorbed, kept)`
fn next_merge(labels: &[usize], times: &[f64], min_duration: f64) -> Option<(usize, usize)> {
    let runs = label_runs(labels);

    let mut stats: HashMap<usize, Occurrences> = HashMap::new();
    for &(label, start, end) in &runs {
        let entry = stats.entry(label).or_default();
        entry.count += 1;
        entry.duration += times[end] - times[start];
    }

    let mut transitions: HashMap<(usize, usize), usize> = HashMap::new();
    for pair in runs.windows(2) {
        *transitions.entry((pair[0].0, pair[1].0)).or_default() += 1;
    }

    for pair in runs.windows(2) {
        let (a, b) = (pair[0].0, pair[1].0);
        let follows = transitions.get(&(a, b)).copied().unwrap_or(0);
        let (sa, sb) = (stats[&a], stats[&b]);
        if sa.count < 2 || follows != sa.count || follows != sb.count {
            continue;
        }
        let (da, db) = (sa.mean_duration(), sb.mean_duration());
        if da.min(db) >= min_duration {
            continue;
        }
        return Some(if db > da { (a, b) } else { (b, a) });
    }
    None
}

/// Build longer recurring sections from an initial clique partition
///
/// # Arguments
///
/// * `orig_cliques` - Clique partition of the `times.len() - 1` frames
/// * `times` - Frame boundaries in seconds
/// * `config` - Minimum run length and minimum section duration
///
/// # Returns
///
/// Clique partition of the same frames, equal or coarser than the input
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `times` has fewer than two
/// entries or `orig_cliques` does not partition the frames
pub fn build_recurrence(
    orig_cliques: &[Clique],
    times: &[f64],
    config: &CliqueConfig,
) -> Result<Vec<Clique>, StructureError> {
    if times.len() < 2 {
        return Err(StructureError::InvalidInput(format!(
            "Time axis needs at least 2 boundaries, got {}",
            times.len()
        )));
    }
    let n = times.len() - 1;
    let labels = labels_from_cliques(orig_cliques, n)?;
    let mut labels = smooth_labels(&labels, config.smooth_kernel_size);

    log::debug!(
        "Building recurrence: {} frames, {} input cliques, min_section_duration={:.1}s",
        n,
        orig_cliques.len(),
        config.min_section_duration
    );

    let mut merges = 0;
    while let Some((absorbed, kept)) = next_merge(&labels, times, config.min_section_duration) {
        for label in labels.iter_mut() {
            if *label == absorbed {
                *label = kept;
            }
        }
        merges += 1;
    }

    let cliques = cliques_from_labels(&labels);
    log::debug!(
        "Recurrence built: {} cliques after {} merges",
        cliques.len(),
        merges
    );
    Ok(cliques)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::cliques::validate_partition;

    fn unit_times(n: usize) -> Vec<f64> {
        (0..=n).map(|i| i as f64).collect()
    }

    fn config(min_run: usize, min_duration: f64) -> CliqueConfig {
        CliqueConfig {
            smooth_kernel_size: min_run,
            min_section_duration: min_duration,
            ..CliqueConfig::default()
        }
    }

    #[test]
    fn test_short_lead_in_joins_following_section() {
        // A(10) B(2) C(10) A(10) B(2) C(10): B always sits between A and C
        let mut labels = Vec::new();
        for _ in 0..2 {
            labels.extend(std::iter::repeat(0).take(10));
            labels.extend(std::iter::repeat(1).take(2));
            labels.extend(std::iter::repeat(2).take(10));
        }
        let cliques = cliques_from_labels(&labels);
        let out = build_recurrence(&cliques, &unit_times(labels.len()), &config(1, 8.0)).unwrap();
        assert_eq!(out.len(), 2);
        validate_partition(&out, labels.len()).unwrap();
        // B folds into A, the longer of the pair it first appears in
        assert_eq!(out[0].len(), 24);
        assert!(out[0].contains(&10) && out[0].contains(&11));
    }

    #[test]
    fn test_long_sections_stay_apart() {
        let labels: Vec<usize> = (0..40).map(|i| (i / 10) % 2).collect();
        let cliques = cliques_from_labels(&labels);
        let out = build_recurrence(&cliques, &unit_times(40), &config(1, 8.0)).unwrap();
        assert_eq!(out, cliques);
    }

    #[test]
    fn test_non_recurring_pair_not_merged() {
        let labels = vec![0, 0, 0, 1, 2, 2, 2, 2];
        let cliques = cliques_from_labels(&labels);
        let out = build_recurrence(&cliques, &unit_times(8), &config(1, 8.0)).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_output_is_coarser_partition() {
        let labels: Vec<usize> = (0..90).map(|i| ((i * 31) / 7) % 5).collect();
        let cliques = cliques_from_labels(&labels);
        let out = build_recurrence(&cliques, &unit_times(90), &config(3, 4.0)).unwrap();
        validate_partition(&out, 90).unwrap();
        assert!(out.len() <= cliques.len());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(build_recurrence(&[vec![0]], &[0.0], &CliqueConfig::default()).is_err());
        assert!(build_recurrence(&[vec![0]], &unit_times(2), &CliqueConfig::default()).is_err());
    }
}
