//! Boundary-to-frame label bridges
//!
//! External segmentation algorithms report boundary timestamps (and
//! sometimes labels) in seconds. These helpers project them onto the block
//! time axis of a self-similarity matrix so they can be turned into cliques.

use ndarray::{s, Array2};

use crate::annotation::mirex::Interval;
use crate::error::StructureError;
use crate::similarity::affinity::check_square;

/// Consecutive `[times[i], times[i + 1])` intervals
pub fn frame_intervals(times: &[f64]) -> Vec<Interval> {
    times.windows(2).map(|w| Interval::new(w[0], w[1])).collect()
}

fn frame_count(times: &[f64]) -> Result<usize, StructureError> {
    if times.len() < 2 {
        return Err(StructureError::InvalidInput(format!(
            "Time axis needs at least 2 boundaries, got {}",
            times.len()
        )));
    }
    Ok(times.len() - 1)
}

/// Frame range `[lower, higher)` covered by a segment, left-side search
fn frame_range(times: &[f64], onset: f64, offset: f64, n: usize) -> (usize, usize) {
    let lower = times.partition_point(|&t| t < onset).min(n);
    let higher = times.partition_point(|&t| t < offset).min(n);
    (lower, higher.max(lower))
}

/// Per-frame labels from segment boundaries and segment labels
///
/// Segment `i` spans `boundaries[i]..boundaries[i + 1]` and writes
/// `labels[i]` onto the frames whose start time falls inside it. Frames
/// before the first boundary keep label 0.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `times` has fewer than two
/// entries or `labels` does not have one entry per segment
pub fn labels_from_boundaries(
    boundaries: &[f64],
    labels: &[usize],
    times: &[f64],
) -> Result<Vec<usize>, StructureError> {
    let n = frame_count(times)?;
    let segments = boundaries.len().saturating_sub(1);
    if labels.len() != segments {
        return Err(StructureError::InvalidInput(format!(
            "{} boundaries need {} labels, got {}",
            boundaries.len(),
            segments,
            labels.len()
        )));
    }

    let mut frames = vec![0; n];
    for (w, &label) in boundaries.windows(2).zip(labels) {
        let (lower, higher) = frame_range(times, w[0], w[1], n);
        frames[lower..higher].fill(label);
    }
    Ok(frames)
}

/// Per-frame labels for boundary-only detectors
///
/// Builds a segment-by-segment score: the fraction of cells of the log-domain
/// fused matrix above `threshold` inside each pair of segments. Every segment
/// then takes the index of its best-scoring other segment when that segment
/// comes earlier and the score is positive, and keeps its own index
/// otherwise.
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if `log_ssm` is not square with
/// one row per frame of `times`
pub fn labels_from_block_ssm(
    boundaries: &[f64],
    times: &[f64],
    log_ssm: &Array2<f64>,
    threshold: f64,
) -> Result<Vec<usize>, StructureError> {
    let n = frame_count(times)?;
    let size = check_square(log_ssm, "log SSM")?;
    if size != n {
        return Err(StructureError::InvalidInput(format!(
            "log SSM has {} rows but the time axis has {} frames",
            size, n
        )));
    }

    let ranges: Vec<(usize, usize)> = boundaries
        .windows(2)
        .map(|w| frame_range(times, w[0], w[1], n))
        .collect();
    let m = ranges.len();
    log::debug!("Labelling {} segments from block SSM, threshold={}", m, threshold);

    let mut scores = Array2::<f64>::zeros((m, m));
    for (i, &(x0, x1)) in ranges.iter().enumerate() {
        for (j, &(y0, y1)) in ranges.iter().enumerate() {
            let cells = (x1 - x0) * (y1 - y0);
            if cells > 0 {
                let above = log_ssm
                    .slice(s![x0..x1, y0..y1])
                    .iter()
                    .filter(|&&v| v > threshold)
                    .count();
                scores[[i, j]] = above as f64 / cells as f64;
            }
        }
    }

    let mut labels: Vec<usize> = (0..m).collect();
    for (i, label) in labels.iter_mut().enumerate() {
        let mut best: Option<(usize, f64)> = None;
        for j in (0..m).filter(|&j| j != i) {
            if best.map_or(true, |(_, score)| scores[[i, j]] > score) {
                best = Some((j, scores[[i, j]]));
            }
        }
        if let Some((j, score)) = best {
            if j < i && score > 0.0 {
                *label = j;
            }
        }
    }

    labels_from_boundaries(boundaries, &labels, times)
}
