//! Configuration parameters for structure analysis
//!
//! Every tunable of the pipeline lives here, grouped by the stage that reads
//! it. Functions take the section they need by reference.

use serde::{Deserialize, Serialize};

/// Top-level structure analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Nearest-neighbor affinity construction
    pub affinity: AffinityConfig,
    /// Cross-diffusion fusion
    pub fusion: FusionConfig,
    /// Frame-to-block aggregation
    pub blocks: BlockConfig,
    /// Melody pitch-class histogram
    pub melody: MelodyConfig,
    /// Clique smoothing and boundary labelling
    pub cliques: CliqueConfig,
    /// Ground-truth label matching
    pub matching: MatchConfig,
    /// Single-window chorus detector retry policy
    pub detector: DetectorConfig,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            affinity: AffinityConfig::default(),
            fusion: FusionConfig::default(),
            blocks: BlockConfig::default(),
            melody: MelodyConfig::default(),
            cliques: CliqueConfig::default(),
            matching: MatchConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}

/// Affinity builder parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffinityConfig {
    /// Number of nearest neighbors used to estimate the local radius (default: 5)
    pub k: usize,

    /// Bandwidth multiplier applied to the local scale (default: 0.5)
    pub mu: f64,
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self { k: 5, mu: 0.5 }
    }
}

/// Similarity fusion parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Neighbors kept per row of the restricted diffusion graph (default: 5)
    pub k: usize,

    /// Fixed number of cross-diffusion iterations (default: 3)
    pub iterations: usize,

    /// Identity regularization weight (default: 1.0)
    pub reg_diag: f64,

    /// Weight added to entries one step off the diagonal (default: 0.5)
    pub reg_neighbs: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            k: 5,
            iterations: 3,
            reg_diag: 1.0,
            reg_neighbs: 0.5,
        }
    }
}

/// Block aggregation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockConfig {
    /// Frames per block; block count = frames / win_fac (default: 10)
    pub win_fac: usize,

    /// Consecutive blocks stacked into one vector (default: 20)
    pub wins_per_block: usize,

    /// Hop size of the feature frames in samples (default: 512)
    pub hop_length: usize,

    /// Sample rate the features were computed at (default: 22050)
    pub sample_rate: u32,

    /// Diagonal median filter width, 0 disables (default: 0)
    pub rec_smooth: usize,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            win_fac: 10,
            wins_per_block: 20,
            hop_length: 512,
            sample_rate: 22050,
            rec_smooth: 0,
        }
    }
}

impl BlockConfig {
    /// Convert a frame index to seconds
    pub fn frame_to_time(&self, frame: usize) -> f64 {
        frame as f64 * self.hop_length as f64 / self.sample_rate as f64
    }
}

/// Melody pitch-class histogram parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MelodyConfig {
    /// Number of pitch classes (default: 12)
    pub n_class: usize,

    /// Past frames accumulated per histogram (default: 20)
    pub count: usize,

    /// Spacing between accumulated frames (default: 5)
    pub hop: usize,
}

impl Default for MelodyConfig {
    fn default() -> Self {
        Self {
            n_class: 12,
            count: 20,
            hop: 5,
        }
    }
}

/// Clique extraction parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliqueConfig {
    /// Minimum run length in frames kept by smoothing (default: 23)
    pub smooth_kernel_size: usize,

    /// Log-domain fused similarity above which two frames count as similar (default: -4.5)
    pub ssm_log_threshold: f64,

    /// Offset added before taking the log of a similarity matrix (default: 1e-8)
    pub log_epsilon: f64,

    /// Occurrences shorter than this (seconds) may be absorbed by the section
    /// they always lead into or follow (default: 8.0)
    pub min_section_duration: f64,
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self {
            smooth_kernel_size: 23,
            ssm_log_threshold: -4.5,
            log_epsilon: 1e-8,
            min_section_duration: 8.0,
        }
    }
}

/// Ground-truth matching thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum clique precision against target ground truth (default: 0.8)
    pub precision: f64,

    /// Minimum clique recall against overlapped ground truth (default: 0.5)
    pub recall: f64,

    /// Minimum total clique duration in seconds (default: 10.0)
    pub min_chorus_duration: f64,

    /// Label of the target function (default: "chorus")
    pub target_label: String,

    /// Label used for everything else (default: "others")
    pub non_target_label: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            precision: 0.8,
            recall: 0.5,
            min_chorus_duration: 10.0,
            target_label: "chorus".to_string(),
            non_target_label: "others".to_string(),
        }
    }
}

/// Retry policy for single-window chorus detectors
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Initial clip length in seconds (default: 30.0)
    pub clip_length: f64,

    /// Amount the clip is shortened after each failure (default: 5.0)
    pub clip_step: f64,

    /// Retries stop once the clip is no longer above this length (default: 5.0)
    pub min_clip_length: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            clip_length: 30.0,
            clip_step: 5.0,
            min_clip_length: 5.0,
        }
    }
}
