//! Multi-modal self-similarity matrix
//!
//! Builds one block-resolution affinity matrix per feature modality and
//! fuses them into a single consensus matrix.
//!
//! | Modality | Feature   | Aggregation | Metric                          |
//! |----------|-----------|-------------|---------------------------------|
//! | Timbre   | MFCC      | mean        | Euclidean                       |
//! | Harmony  | chroma    | median      | shift-invariant cosine          |
//! | Melody   | pitch     | median      | shift-invariant cosine          |
//! | Rhythm   | tempogram | mean        | Euclidean                       |

use ndarray::{s, Array2};

use super::blocks::{block_boundaries, feature_affinity, Aggregator};
use super::distance::{BaseMetric, Metric};
use super::fusion::fuse;
use super::lag_filter::diagonal_median_filter;
use super::melody::pitch_chroma;
use crate::config::StructureConfig;
use crate::error::StructureError;

/// Feature modality contributing to the fused matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// MFCC (timbre)
    Timbre,
    /// Chroma (harmony)
    Harmony,
    /// Pitch-class histogram of the melody contour
    Melody,
    /// Tempogram (rhythm)
    Rhythm,
}

/// Precomputed frame-rate features of one song
///
/// Every matrix is `frames x dims` at the hop size given in
/// [`BlockConfig`](crate::config::BlockConfig).
#[derive(Debug, Clone)]
pub struct FeatureSet {
    /// MFCC frames
    pub mfcc: Array2<f64>,
    /// Chroma frames (12 pitch classes)
    pub chroma: Array2<f64>,
    /// Tempogram frames
    pub tempogram: Array2<f64>,
    /// Optional melody fundamental frequency per frame in Hz (<= 0 for unvoiced)
    pub pitches: Option<Vec<f64>>,
}

impl FeatureSet {
    /// Number of frames shared by every feature
    pub fn n_frames(&self) -> usize {
        let mut n = self
            .mfcc
            .nrows()
            .min(self.chroma.nrows())
            .min(self.tempogram.nrows());
        if let Some(pitches) = &self.pitches {
            n = n.min(pitches.len());
        }
        n
    }
}

/// Fused self-similarity of one song
#[derive(Debug, Clone)]
pub struct SelfSimilarity {
    /// Fused affinity matrix (`blocks x blocks`)
    pub fused: Array2<f64>,
    /// Per-modality affinity matrices, in fusion order
    pub modalities: Vec<(Modality, Array2<f64>)>,
    /// Block boundaries in seconds (`blocks + 1` entries)
    pub times: Vec<f64>,
}

impl SelfSimilarity {
    /// Number of blocks on each axis
    pub fn n_blocks(&self) -> usize {
        self.fused.nrows()
    }

    /// Affinity matrix of one modality, if it was computed
    pub fn modality(&self, modality: Modality) -> Option<&Array2<f64>> {
        self.modalities
            .iter()
            .find(|(m, _)| *m == modality)
            .map(|(_, w)| w)
    }

    /// Melody affinity, present only when a pitch contour was supplied
    pub fn melody(&self) -> Option<&Array2<f64>> {
        self.modality(Modality::Melody)
    }
}

/// Compute the fused self-similarity matrix of a song
///
/// # Arguments
///
/// * `features` - Precomputed frame-rate features
/// * `config` - Analysis configuration
///
/// # Returns
///
/// Fused matrix, per-modality matrices and the block time axis
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` if the features are empty or too
/// short for a single block, and `StructureError::NumericalError` if any
/// affinity contains NaN
pub fn self_similarity_matrix(
    features: &FeatureSet,
    config: &StructureConfig,
) -> Result<SelfSimilarity, StructureError> {
    let blocks = &config.blocks;
    let n_frames = features.n_frames();
    if n_frames == 0 {
        return Err(StructureError::InvalidInput(
            "Empty feature sequence".to_string(),
        ));
    }
    if blocks.win_fac == 0 || blocks.sample_rate == 0 {
        return Err(StructureError::InvalidInput(format!(
            "Invalid block config: win_fac={}, sample_rate={}",
            blocks.win_fac, blocks.sample_rate
        )));
    }
    let n_blocks = n_frames / blocks.win_fac;
    if n_blocks == 0 {
        return Err(StructureError::InvalidInput(format!(
            "{} frames is shorter than one block of {} frames",
            n_frames, blocks.win_fac
        )));
    }

    log::debug!(
        "Self-similarity: {} frames -> {} blocks, wins_per_block={}, melody={}",
        n_frames,
        n_blocks,
        blocks.wins_per_block,
        features.pitches.is_some()
    );

    let bounds = block_boundaries(n_frames, n_blocks)?;
    let shift_cosine = Metric::ShiftInvariant {
        base: BaseMetric::Cosine,
        wins_per_block: blocks.wins_per_block,
    };
    let euclidean = Metric::Plain(BaseMetric::Euclidean);

    let affinity_for = |feature: &Array2<f64>, aggregator: Aggregator, metric: Metric| {
        feature_affinity(
            &feature.slice(s![..n_frames, ..]).to_owned(),
            &bounds,
            aggregator,
            metric,
            blocks.wins_per_block,
            &config.affinity,
        )
    };

    let mut modalities = vec![
        (
            Modality::Timbre,
            affinity_for(&features.mfcc, Aggregator::Mean, euclidean)?,
        ),
        (
            Modality::Harmony,
            affinity_for(&features.chroma, Aggregator::Median, shift_cosine)?,
        ),
    ];
    if let Some(pitches) = &features.pitches {
        let melody = pitch_chroma(&pitches[..n_frames], &config.melody)?;
        modalities.push((
            Modality::Melody,
            affinity_for(&melody, Aggregator::Median, shift_cosine)?,
        ));
    }
    modalities.push((
        Modality::Rhythm,
        affinity_for(&features.tempogram, Aggregator::Mean, euclidean)?,
    ));

    if blocks.rec_smooth > 0 {
        for (_, w) in modalities.iter_mut() {
            *w = diagonal_median_filter(w, blocks.rec_smooth);
        }
    }

    let affinities: Vec<Array2<f64>> = modalities.iter().map(|(_, w)| w.clone()).collect();
    let fused = fuse(&affinities, &config.fusion)?;

    let times = bounds.iter().map(|&f| blocks.frame_to_time(f)).collect();

    log::debug!(
        "Fused W {:?}, min={:.4e}, max={:.4e}",
        fused.dim(),
        fused.iter().copied().fold(f64::INFINITY, f64::min),
        fused.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    );

    Ok(SelfSimilarity {
        fused,
        modalities,
        times,
    })
}

/// Map a similarity matrix to the log domain
///
/// Negative values are clamped to zero and `epsilon` is added before the
/// natural log, so every output is finite.
pub fn log_ssm(ssm: &Array2<f64>, epsilon: f64) -> Array2<f64> {
    ssm.mapv(|v| (v.max(0.0) + epsilon).ln())
}

/// Inverse of [`log_ssm`], clamping the result at zero
pub fn exp_ssm(ssm: &Array2<f64>, epsilon: f64) -> Array2<f64> {
    ssm.mapv(|v| (v.exp() - epsilon).max(0.0))
}
