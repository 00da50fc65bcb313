//! Ground-truth label matching
//!
//! Labels estimated segments or whole cliques as target or non-target by
//! their overlap with the target sections of a reference annotation. Used by
//! the evaluation upper bounds and by classifier training-data generation.

use super::mirex::{filter_intervals, merge_intervals, Interval, MirexStructure};
use crate::config::MatchConfig;
use crate::error::StructureError;
use crate::structure::cliques::{clique_groups, Clique};

/// Label each estimated interval by its overlap with the reference
///
/// An interval is target when its total intersection with the reference
/// target intervals covers at least half of its own duration.
pub fn match_label(estimated: &[Interval], ground_truth: &MirexStructure, config: &MatchConfig) -> Vec<String> {
    let reference = filter_intervals(ground_truth, &config.target_label);
    estimated
        .iter()
        .map(|est| {
            let overlap: f64 = reference.iter().map(|r| r.intersection(est)).sum();
            if overlap >= est.duration() / 2.0 {
                config.target_label.clone()
            } else {
                config.non_target_label.clone()
            }
        })
        .collect()
}

/// Time span of every occurrence of a clique
fn occurrence_intervals(clique: &[usize], intervals: &[Interval]) -> Result<Vec<Interval>, StructureError> {
    if let Some(&bad) = clique.iter().find(|&&i| i >= intervals.len()) {
        return Err(StructureError::InvalidInput(format!(
            "Clique index {} out of range for {} intervals",
            bad,
            intervals.len()
        )));
    }
    Ok(clique_groups(clique)
        .iter()
        .filter_map(|g| g.last().map(|&last| Interval::new(intervals[g[0]].onset, intervals[last].offset)))
        .collect())
}

/// Target/non-target label of every clique
///
/// For each clique:
/// - precision = overlap with reference targets / clique duration
/// - recall = overlap / duration of the reference targets the clique touches
///
/// Either ratio is 0 when its denominator is 0. A clique is target when
/// precision, recall and total duration all reach their configured minimum.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if a clique index has no interval
pub fn clique_labels(
    ground_truth: &MirexStructure,
    cliques: &[Clique],
    intervals: &[Interval],
    config: &MatchConfig,
) -> Result<Vec<String>, StructureError> {
    let reference = filter_intervals(&merge_intervals(ground_truth), &config.target_label);

    cliques
        .iter()
        .map(|clique| {
            let occurrences = occurrence_intervals(clique, intervals)?;
            let overlap: f64 = occurrences
                .iter()
                .flat_map(|o| reference.iter().map(move |r| r.intersection(o)))
                .sum();
            let duration: f64 = occurrences.iter().map(Interval::duration).sum();
            let hit_duration: f64 = reference
                .iter()
                .filter(|r| occurrences.iter().map(|o| r.intersection(o)).sum::<f64>() > 0.0)
                .map(Interval::duration)
                .sum();

            let precision = if duration > 0.0 { overlap / duration } else { 0.0 };
            let recall = if hit_duration > 0.0 { overlap / hit_duration } else { 0.0 };
            let is_target = precision >= config.precision
                && recall >= config.recall
                && duration >= config.min_chorus_duration;

            Ok(if is_target {
                config.target_label.clone()
            } else {
                config.non_target_label.clone()
            })
        })
        .collect()
}

/// Per-interval structure labelled clique by clique against the reference
///
/// Every interval of a clique gets that clique's label; intervals that no
/// clique covers stay non-target.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if a clique index has no interval
pub fn match_clique_label(
    intervals: &[Interval],
    cliques: &[Clique],
    ground_truth: &MirexStructure,
    config: &MatchConfig,
) -> Result<MirexStructure, StructureError> {
    let mut labels = vec![config.non_target_label.clone(); intervals.len()];
    let per_clique = clique_labels(ground_truth, cliques, intervals, config)?;
    for (clique, label) in cliques.iter().zip(per_clique) {
        for &idx in clique {
            labels[idx] = label.clone();
        }
    }
    MirexStructure::new(intervals.to_vec(), labels)
}
