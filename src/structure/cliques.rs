//! Clique extraction
//!
//! A clique is the sorted list of frame indices belonging to one recurring
//! section. A list of cliques partitions the frame axis: every frame belongs
//! to exactly one clique.

use std::collections::HashMap;
use std::hash::Hash;

use ndarray::Array2;

use crate::error::StructureError;

/// Sorted frame indices of one recurring section
pub type Clique = Vec<usize>;

/// Group frame indices by label
///
/// Cliques are ordered by their first frame, so the section that appears
/// earliest in the song comes first.
///
/// # Example
///
/// ```
/// use refrain_dsp::structure::cliques_from_labels;
///
/// let cliques = cliques_from_labels(&[0, 0, 1, 1, 0, 0]);
/// assert_eq!(cliques, vec![vec![0, 1, 4, 5], vec![2, 3]]);
/// ```
pub fn cliques_from_labels<L: Eq + Hash>(labels: &[L]) -> Vec<Clique> {
    let mut index: HashMap<&L, usize> = HashMap::new();
    let mut cliques: Vec<Clique> = Vec::new();
    for (frame, label) in labels.iter().enumerate() {
        let slot = *index.entry(label).or_insert_with(|| {
            cliques.push(Vec::new());
            cliques.len() - 1
        });
        cliques[slot].push(frame);
    }
    cliques
}

/// Check that cliques partition `0..length`
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if an index is out of range,
/// repeated, or missing
pub fn validate_partition(cliques: &[Clique], length: usize) -> Result<(), StructureError> {
    let mut seen = vec![false; length];
    for clique in cliques {
        for &idx in clique {
            if idx >= length {
                return Err(StructureError::InvalidInput(format!(
                    "Clique index {} out of range for {} frames",
                    idx, length
                )));
            }
            if seen[idx] {
                return Err(StructureError::InvalidInput(format!(
                    "Frame {} belongs to more than one clique",
                    idx
                )));
            }
            seen[idx] = true;
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(StructureError::InvalidInput(format!(
            "Frame {} belongs to no clique",
            missing
        )));
    }
    Ok(())
}

/// Per-frame label array from a clique partition
///
/// Frame `i` gets the position of its clique in `cliques`.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `cliques` does not partition
/// `0..length`
pub fn labels_from_cliques(cliques: &[Clique], length: usize) -> Result<Vec<usize>, StructureError> {
    validate_partition(cliques, length)?;
    let mut labels = vec![0; length];
    for (label, clique) in cliques.iter().enumerate() {
        for &idx in clique {
            labels[idx] = label;
        }
    }
    Ok(labels)
}

/// Split a clique into its maximal runs of consecutive frames
///
/// Each run is one occurrence of the section in time.
pub fn clique_groups(clique: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for &idx in clique {
        match groups.last_mut() {
            Some(group) if group.last().map(|&l| l + 1) == Some(idx) => group.push(idx),
            _ => groups.push(vec![idx]),
        }
    }
    groups
}

/// First frame of every occurrence
pub fn clique_heads(clique: &[usize]) -> Vec<usize> {
    clique_groups(clique).iter().map(|g| g[0]).collect()
}

/// One past the last frame of every occurrence
pub fn clique_tails(clique: &[usize]) -> Vec<usize> {
    clique_groups(clique)
        .iter()
        .filter_map(|g| g.last().map(|&l| l + 1))
        .collect()
}

/// Heads and tails of the occurrences that are at least `min_size` long
///
/// Occurrences separated by fewer than `gap` frames are joined into one.
pub fn filtered_clique_ends(clique: &[usize], min_size: usize, gap: usize) -> (Vec<usize>, Vec<usize>) {
    let kept: Vec<(usize, usize)> = clique_groups(clique)
        .iter()
        .filter(|g| g.len() >= min_size)
        .filter_map(|g| g.last().map(|&l| (g[0], l + 1)))
        .collect();

    let mut heads: Vec<usize> = Vec::new();
    let mut tails: Vec<usize> = Vec::new();
    for (head, tail) in kept {
        match tails.last_mut() {
            Some(prev_tail) if head - *prev_tail < gap => *prev_tail = tail,
            _ => {
                heads.push(head);
                tails.push(tail);
            }
        }
    }
    (heads, tails)
}

/// Block matrix marking which frame pairs share a clique
///
/// Cell `(x, y)` holds `c + 1` when frames `x` and `y` both lie in
/// occurrences of clique `c`, and 0 otherwise.
pub fn labeled_ssm(cliques: &[Clique], size: usize) -> Array2<usize> {
    let mut labeled = Array2::<usize>::zeros((size, size));
    for (flag, clique) in cliques.iter().enumerate() {
        for &x in clique.iter().filter(|&&x| x < size) {
            for &y in clique.iter().filter(|&&y| y < size) {
                labeled[[x, y]] = flag + 1;
            }
        }
    }
    labeled
}
