//! MIREX-format structure annotations
//!
//! A structure is a list of half-open time intervals paired with one label
//! each. Intervals are expected to be sorted and contiguous, as produced by
//! annotation files and by every function in this crate.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MatchConfig;
use crate::error::StructureError;
use crate::structure::cliques::Clique;

/// Time interval in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start time in seconds
    pub onset: f64,
    /// End time in seconds
    pub offset: f64,
}

impl Interval {
    /// Create an interval
    pub fn new(onset: f64, offset: f64) -> Self {
        Self { onset, offset }
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.offset - self.onset
    }

    /// Overlap with another interval in seconds, never negative
    pub fn intersection(&self, other: &Interval) -> f64 {
        interval_intersection(self, other)
    }
}

/// Labeled segmentation of a song
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MirexStructure {
    /// Segment intervals in time order
    pub intervals: Vec<Interval>,
    /// One label per interval
    pub labels: Vec<String>,
}

impl MirexStructure {
    /// Pair intervals with labels
    ///
    /// # Errors
    ///
    /// Returns `StructureError::InvalidInput` if the lengths differ
    pub fn new(intervals: Vec<Interval>, labels: Vec<String>) -> Result<Self, StructureError> {
        if intervals.len() != labels.len() {
            return Err(StructureError::InvalidInput(format!(
                "{} intervals but {} labels",
                intervals.len(),
                labels.len()
            )));
        }
        Ok(Self { intervals, labels })
    }

    /// Number of segments
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// True if the structure has no segments
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Iterate over `(interval, label)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&Interval, &str)> {
        self.intervals
            .iter()
            .zip(self.labels.iter().map(String::as_str))
    }

    fn push(&mut self, interval: Interval, label: &str) {
        self.intervals.push(interval);
        self.labels.push(label.to_string());
    }
}

/// Overlap of two intervals in seconds, clamped at 0
pub fn interval_intersection(a: &Interval, b: &Interval) -> f64 {
    (a.offset.min(b.offset) - a.onset.max(b.onset)).max(0.0)
}

/// Join adjacent intervals that carry the same label
///
/// The merged interval spans from the first onset to the last offset of the
/// run. An empty structure stays empty.
pub fn merge_intervals(structure: &MirexStructure) -> MirexStructure {
    let mut merged = MirexStructure::default();
    for (interval, label) in structure.iter() {
        match (merged.intervals.last_mut(), merged.labels.last()) {
            (Some(prev), Some(prev_label)) if prev_label == label => prev.offset = interval.offset,
            _ => merged.push(*interval, label),
        }
    }
    merged
}

fn has_function(label: &str, function: &str) -> bool {
    label.to_lowercase().starts_with(&function.to_lowercase())
}

/// Map raw annotation labels onto a set of function names
///
/// A label becomes the first function it starts with (case-insensitive), so
/// "Chorus2" and "chorus_a" both become "chorus". Anything else becomes
/// `non_target`.
pub fn extract_functions(labels: &[String], functions: &[&str], non_target: &str) -> Vec<String> {
    labels
        .iter()
        .map(|label| {
            functions
                .iter()
                .find(|f| has_function(label, f))
                .map_or_else(|| non_target.to_string(), |f| f.to_string())
        })
        .collect()
}

/// Intervals whose label belongs to `function`
pub fn filter_intervals(structure: &MirexStructure, function: &str) -> Vec<Interval> {
    structure
        .iter()
        .filter(|(_, label)| has_function(label, function))
        .map(|(interval, _)| *interval)
        .collect()
}

/// Structure with a single target section `[begin, end)` in a song of `duration`
///
/// Produces exactly three intervals: before, target, after. The window is
/// clipped to the song, so boundary intervals may have zero length.
pub fn single_chorus_section(begin: f64, end: f64, duration: f64, config: &MatchConfig) -> MirexStructure {
    let begin = clip_to_song(begin, duration);
    let end = clip_to_song(end, duration).max(begin);
    MirexStructure {
        intervals: vec![
            Interval::new(0.0, begin),
            Interval::new(begin, end),
            Interval::new(end, duration),
        ],
        labels: vec![
            config.non_target_label.clone(),
            config.target_label.clone(),
            config.non_target_label.clone(),
        ],
    }
}

fn clip_to_song(t: f64, duration: f64) -> f64 {
    t.min(duration).max(0.0)
}

/// Timestamp key with a resolution of 10 ms
fn time_key(t: f64) -> i64 {
    (t * 100.0) as i64
}

/// Reconcile possibly overlapping target windows into one timeline
///
/// Every window onset counts +1 and every offset −1. Sweeping the sorted
/// boundaries, time is labelled target while the running count is positive.
/// Zero-length intervals are dropped and adjacent equal labels merged, so
/// windows `(0,10)` and `(5,15)` in a 20 s song give `(0,15)` target and
/// `(15,20)` non-target. No windows gives a single non-target interval.
/// Windows are clipped to `[0, duration]` first.
///
/// # Errors
///
/// Returns `StructureError::UnbalancedBoundaries` if the running count goes
/// negative (an offset before its onset)
pub fn multi_chorus_sections(
    windows: &[Interval],
    duration: f64,
    config: &MatchConfig,
) -> Result<MirexStructure, StructureError> {
    log::debug!(
        "Merging {} chorus windows over {:.2}s",
        windows.len(),
        duration
    );

    let mut boundaries: BTreeMap<i64, i32> = BTreeMap::new();
    for window in windows {
        let onset = clip_to_song(window.onset, duration);
        let offset = clip_to_song(window.offset, duration);
        *boundaries.entry(time_key(onset)).or_insert(0) += 1;
        *boundaries.entry(time_key(offset)).or_insert(0) -= 1;
    }

    let mut sweep = MirexStructure::default();
    let mut onset = 0.0;
    let mut label = config.non_target_label.as_str();
    let mut state = 0i32;
    for (&key, &delta) in &boundaries {
        let t = key as f64 / 100.0;
        sweep.push(Interval::new(onset, t), label);
        onset = t;
        state += delta;
        if state < 0 {
            log::error!("Unbalanced chorus boundaries at {:.2}s: {:?}", t, boundaries);
            return Err(StructureError::UnbalancedBoundaries(format!(
                "Boundary count became {} at {:.2}s",
                state, t
            )));
        }
        label = if state > 0 {
            config.target_label.as_str()
        } else {
            config.non_target_label.as_str()
        };
    }
    sweep.push(Interval::new(onset, duration), label);

    let mut kept = MirexStructure::default();
    for (interval, label) in sweep.iter().filter(|(i, _)| i.duration() > 0.0) {
        kept.push(*interval, label);
    }
    Ok(merge_intervals(&kept))
}

/// Spreadsheet-style section letter: A..Z, AA, AB, ...
fn section_letter(mut count: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push(b'A' + (count % 26) as u8);
        if count < 26 {
            break;
        }
        count = count / 26 - 1;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Append a recurrence letter to every frame label
///
/// Cliques are visited in first-occurrence order. The n-th clique whose
/// first frame carries label `L` turns its frames into `"L A"`, `"L B"`, ...
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if a clique index is out of range
pub fn number_cliques(cliques: &[Clique], labels: &[String]) -> Result<Vec<String>, StructureError> {
    let mut numbered = labels.to_vec();
    let mut order: Vec<&Clique> = cliques.iter().filter(|c| !c.is_empty()).collect();
    order.sort_by_key(|c| c[0]);

    let mut type_count: BTreeMap<String, usize> = BTreeMap::new();
    for clique in order {
        if let Some(&bad) = clique.iter().find(|&&i| i >= labels.len()) {
            return Err(StructureError::InvalidInput(format!(
                "Clique index {} out of range for {} labels",
                bad,
                labels.len()
            )));
        }
        let label_type = labels[clique[0]].clone();
        let count = type_count.entry(label_type).or_insert(0);
        let letter = section_letter(*count);
        for &idx in clique {
            numbered[idx] = format!("{} {}", labels[idx], letter);
        }
        *count += 1;
    }
    Ok(numbered)
}

/// Strip recurrence letters, keeping the first word of every label
pub fn remove_number(structure: &MirexStructure) -> MirexStructure {
    MirexStructure {
        intervals: structure.intervals.clone(),
        labels: structure
            .labels
            .iter()
            .map(|l| l.split_whitespace().next().unwrap_or("").to_string())
            .collect(),
    }
}

/// Render one `onset offset label` row per segment
pub fn mirex_lines(structure: &MirexStructure) -> String {
    structure
        .iter()
        .map(|(i, label)| format!("{:.2}\t{:.2}\t{}\n", i.onset, i.offset, label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure(rows: &[(f64, f64, &str)]) -> MirexStructure {
        MirexStructure {
            intervals: rows.iter().map(|&(a, b, _)| Interval::new(a, b)).collect(),
            labels: rows.iter().map(|&(_, _, l)| l.to_string()).collect(),
        }
    }

    #[test]
    fn test_intersection() {
        let a = Interval::new(0.0, 10.0);
        assert_eq!(a.intersection(&Interval::new(5.0, 20.0)), 5.0);
        assert_eq!(a.intersection(&Interval::new(12.0, 20.0)), 0.0);
        assert_eq!(a.intersection(&Interval::new(10.0, 20.0)), 0.0);
    }

    #[test]
    fn test_new_rejects_length_mismatch() {
        assert!(MirexStructure::new(vec![Interval::new(0.0, 1.0)], vec![]).is_err());
    }

    #[test]
    fn test_merge_intervals() {
        let s = structure(&[
            (0.0, 5.0, "others"),
            (5.0, 8.0, "others"),
            (8.0, 12.0, "chorus"),
            (12.0, 15.0, "others"),
        ]);
        let merged = merge_intervals(&s);
        assert_eq!(merged, structure(&[(0.0, 8.0, "others"), (8.0, 12.0, "chorus"), (12.0, 15.0, "others")]));
        assert!(merge_intervals(&MirexStructure::default()).is_empty());
    }

    #[test]
    fn test_extract_and_filter() {
        let labels: Vec<String> = ["Chorus2", "verse", "chorus_a", "bridge"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = extract_functions(&labels, &["chorus"], "others");
        assert_eq!(out, vec!["chorus", "others", "chorus", "others"]);

        let s = structure(&[(0.0, 10.0, "Chorus"), (10.0, 20.0, "verse"), (20.0, 30.0, "chorus b")]);
        let chorus = filter_intervals(&s, "chorus");
        assert_eq!(chorus, vec![Interval::new(0.0, 10.0), Interval::new(20.0, 30.0)]);
    }

    #[test]
    fn test_single_chorus_section() {
        let s = single_chorus_section(30.0, 60.0, 200.0, &MatchConfig::default());
        assert_eq!(
            s,
            structure(&[(0.0, 30.0, "others"), (30.0, 60.0, "chorus"), (60.0, 200.0, "others")])
        );
    }

    #[test]
    fn test_single_chorus_section_clipped_to_song() {
        let s = single_chorus_section(30.0, 60.0, 40.0, &MatchConfig::default());
        assert_eq!(
            s,
            structure(&[(0.0, 30.0, "others"), (30.0, 40.0, "chorus"), (40.0, 40.0, "others")])
        );

        let s = single_chorus_section(50.0, 80.0, 40.0, &MatchConfig::default());
        assert!(s.iter().all(|(i, _)| i.onset <= i.offset && i.offset <= 40.0));
        assert_eq!(s.intervals[0], Interval::new(0.0, 40.0));
    }

    #[test]
    fn test_multi_chorus_overlapping_windows() {
        let windows = vec![Interval::new(0.0, 10.0), Interval::new(5.0, 15.0)];
        let s = multi_chorus_sections(&windows, 20.0, &MatchConfig::default()).unwrap();
        assert_eq!(s, structure(&[(0.0, 15.0, "chorus"), (15.0, 20.0, "others")]));
    }

    #[test]
    fn test_multi_chorus_disjoint_and_touching() {
        let windows = vec![
            Interval::new(10.0, 20.0),
            Interval::new(20.0, 30.0),
            Interval::new(50.0, 60.0),
        ];
        let s = multi_chorus_sections(&windows, 80.0, &MatchConfig::default()).unwrap();
        assert_eq!(
            s,
            structure(&[
                (0.0, 10.0, "others"),
                (10.0, 30.0, "chorus"),
                (30.0, 50.0, "others"),
                (50.0, 60.0, "chorus"),
                (60.0, 80.0, "others"),
            ])
        );
    }

    #[test]
    fn test_multi_chorus_no_windows() {
        let s = multi_chorus_sections(&[], 42.0, &MatchConfig::default()).unwrap();
        assert_eq!(s, structure(&[(0.0, 42.0, "others")]));
    }

    #[test]
    fn test_multi_chorus_windows_past_end() {
        let cfg = MatchConfig::default();
        let s = multi_chorus_sections(&[Interval::new(30.0, 50.0)], 40.0, &cfg).unwrap();
        assert_eq!(s, structure(&[(0.0, 30.0, "others"), (30.0, 40.0, "chorus")]));

        let windows = vec![Interval::new(-5.0, 10.0), Interval::new(45.0, 60.0)];
        let s = multi_chorus_sections(&windows, 40.0, &cfg).unwrap();
        assert_eq!(s, structure(&[(0.0, 10.0, "chorus"), (10.0, 40.0, "others")]));
    }

    #[test]
    fn test_multi_chorus_unbalanced() {
        let windows = vec![Interval::new(10.0, 5.0)];
        let err = multi_chorus_sections(&windows, 20.0, &MatchConfig::default()).unwrap_err();
        assert!(matches!(err, StructureError::UnbalancedBoundaries(_)));
    }

    #[test]
    fn test_number_and_remove() {
        let labels: Vec<String> = ["chorus", "chorus", "others", "chorus", "others", "chorus"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let cliques = vec![vec![0, 1], vec![2, 4], vec![3, 5]];
        let numbered = number_cliques(&cliques, &labels).unwrap();
        assert_eq!(
            numbered,
            vec!["chorus A", "chorus A", "others A", "chorus B", "others A", "chorus B"]
        );

        let s = MirexStructure {
            intervals: (0..6).map(|i| Interval::new(i as f64, i as f64 + 1.0)).collect(),
            labels: numbered,
        };
        assert_eq!(remove_number(&s).labels, labels);
        assert!(number_cliques(&[vec![7]], &labels).is_err());
    }

    #[test]
    fn test_section_letters() {
        assert_eq!(section_letter(0), "A");
        assert_eq!(section_letter(25), "Z");
        assert_eq!(section_letter(26), "AA");
        assert_eq!(section_letter(27), "AB");
    }

    #[test]
    fn test_mirex_lines() {
        let s = structure(&[(0.0, 1.5, "others"), (1.5, 3.0, "chorus")]);
        assert_eq!(mirex_lines(&s), "0.00\t1.50\tothers\n1.50\t3.00\tchorus\n");
    }
}
