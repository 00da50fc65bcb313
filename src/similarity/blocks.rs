//! Frame-to-block aggregation
//!
//! Downsamples a frame-rate feature sequence to a fixed number of blocks,
//! stacks neighboring blocks for temporal context, and turns the result into
//! a block-resolution affinity matrix.

use ndarray::Array2;

use super::affinity::{assert_finite, build_affinity};
use super::distance::Metric;
use crate::config::AffinityConfig;
use crate::error::StructureError;

/// Reducer applied to the frames inside one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregator {
    /// Arithmetic mean per dimension
    Mean,
    /// Median per dimension
    Median,
}

impl Aggregator {
    /// Reduce a non-empty set of values
    fn reduce(self, values: &mut [f64]) -> f64 {
        match self {
            Aggregator::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregator::Median => {
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) * 0.5
                } else {
                    values[mid]
                }
            }
        }
    }
}

/// Frame boundaries of `n_blocks` contiguous blocks
///
/// Blocks are `n_frames / n_blocks` frames long; the last block absorbs the
/// remainder. A block count above the frame count is clamped.
///
/// # Returns
///
/// `n_blocks + 1` increasing frame indices, starting at 0 and ending at
/// `n_frames`
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if either count is zero
pub fn block_boundaries(n_frames: usize, n_blocks: usize) -> Result<Vec<usize>, StructureError> {
    if n_frames == 0 {
        return Err(StructureError::InvalidInput(
            "Empty feature sequence".to_string(),
        ));
    }
    if n_blocks == 0 {
        return Err(StructureError::InvalidInput(
            "Block count must be positive".to_string(),
        ));
    }

    let blocks = if n_blocks > n_frames {
        log::warn!(
            "Requested {} blocks for {} frames, clamping to {}",
            n_blocks,
            n_frames,
            n_frames
        );
        n_frames
    } else {
        n_blocks
    };

    let hop = n_frames / blocks;
    let mut bounds: Vec<usize> = (0..blocks).map(|b| b * hop).collect();
    bounds.push(n_frames);
    Ok(bounds)
}

/// Aggregate frames into blocks
///
/// # Arguments
///
/// * `features` - `frames x dims` feature matrix
/// * `target_block_count` - Number of blocks to produce
/// * `aggregator` - Per-dimension reducer
///
/// # Returns
///
/// `blocks x dims` matrix
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` for an empty feature sequence or a
/// zero block count
pub fn aggregate_to_blocks(
    features: &Array2<f64>,
    target_block_count: usize,
    aggregator: Aggregator,
) -> Result<Array2<f64>, StructureError> {
    let bounds = block_boundaries(features.nrows(), target_block_count)?;
    Ok(aggregate_between(features, &bounds, aggregator))
}

/// Aggregate frames between consecutive boundaries
pub(crate) fn aggregate_between(
    features: &Array2<f64>,
    bounds: &[usize],
    aggregator: Aggregator,
) -> Array2<f64> {
    let dims = features.ncols();
    let blocks = bounds.len().saturating_sub(1);
    let mut out = Array2::<f64>::zeros((blocks, dims));
    let mut scratch = Vec::new();

    for b in 0..blocks {
        let (start, end) = (bounds[b], bounds[b + 1]);
        for r in 0..dims {
            scratch.clear();
            scratch.extend((start..end).map(|t| features[[t, r]]));
            if !scratch.is_empty() {
                out[[b, r]] = aggregator.reduce(&mut scratch);
            }
        }
    }
    out
}

/// Stack each row with its `n_steps - 1` predecessors
///
/// Rows before the start are edge-padded with the first row. The output is
/// laid out class-major: dimension `r` at lag `k` lands in column
/// `r * n_steps + k`, so each row reshapes to `(dims, n_steps)`.
pub fn stack_memory(blocks: &Array2<f64>, n_steps: usize) -> Array2<f64> {
    let (rows, dims) = blocks.dim();
    let steps = n_steps.max(1);
    Array2::from_shape_fn((rows, dims * steps), |(t, col)| {
        let r = col / steps;
        let k = col % steps;
        blocks[[t.saturating_sub(k), r]]
    })
}

/// Block-resolution affinity matrix for one feature modality
///
/// Aggregates the frames between `bounds`, stacks `wins_per_block` blocks,
/// measures distances with `metric` and builds the affinity.
///
/// # Errors
///
/// Returns `StructureError::NumericalError` if the affinity contains NaN, or
/// any error from the distance and affinity builders
pub fn feature_affinity(
    features: &Array2<f64>,
    bounds: &[usize],
    aggregator: Aggregator,
    metric: Metric,
    wins_per_block: usize,
    affinity: &AffinityConfig,
) -> Result<Array2<f64>, StructureError> {
    if features.nrows() == 0 || features.ncols() == 0 {
        return Err(StructureError::InvalidInput(
            "Empty feature sequence".to_string(),
        ));
    }
    let blocks = aggregate_between(features, bounds, aggregator);
    let stacked = stack_memory(&blocks, wins_per_block);
    let distances = metric.csm(&stacked, &stacked)?;
    let w = build_affinity(&distances, affinity)?;
    assert_finite(&w, "block affinity")?;

    log::debug!(
        "Feature affinity: features {:?} -> blocks {:?} -> stacked {:?} -> W {:?}",
        features.dim(),
        blocks.dim(),
        stacked.dim(),
        w.dim()
    );
    Ok(w)
}
