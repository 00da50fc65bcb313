//! Melody pitch-class histograms
//!
//! Converts a per-frame fundamental frequency contour into a pitch-class
//! feature that can be compared with the shift-invariant cosine metric,
//! the same way chroma is.

use ndarray::Array2;

use crate::config::MelodyConfig;
use crate::error::StructureError;

/// Pitch class of a voiced frequency, or `None` for unvoiced frames
fn pitch_class(hz: f64, n_class: usize) -> Option<usize> {
    if hz.is_nan() || hz <= 0.0 {
        return None;
    }
    let midi = 69.0 + 12.0 * (hz / 440.0).log2();
    let scaled = (midi * n_class as f64 / 12.0).trunc() as i64;
    Some(scaled.rem_euclid(n_class as i64) as usize)
}

/// Build a weighted pitch-class histogram per frame
///
/// Frame `t` accumulates the pitch classes of frames `t, t - hop, ...,
/// t - (count - 1) * hop` (clamped to the first frame) with weights
/// `count, count - 1, ..., 1`. Unvoiced frames (frequency <= 0) add nothing.
///
/// # Arguments
///
/// * `pitches` - Fundamental frequency per frame in Hz
/// * `config` - Class count and accumulation window
///
/// # Returns
///
/// `frames x n_class` histogram matrix
///
/// # Errors
///
/// Returns `StructureError::InvalidInput` for an empty contour or a zero
/// class or window count
pub fn pitch_chroma(pitches: &[f64], config: &MelodyConfig) -> Result<Array2<f64>, StructureError> {
    if pitches.is_empty() {
        return Err(StructureError::InvalidInput(
            "Empty pitch contour".to_string(),
        ));
    }
    if config.n_class == 0 || config.count == 0 {
        return Err(StructureError::InvalidInput(format!(
            "Invalid melody config: n_class={}, count={}",
            config.n_class, config.count
        )));
    }

    log::debug!(
        "Pitch chroma: {} frames, {} classes, count={}, hop={}",
        pitches.len(),
        config.n_class,
        config.count,
        config.hop
    );

    let classes: Vec<Option<usize>> = pitches
        .iter()
        .map(|&hz| pitch_class(hz, config.n_class))
        .collect();

    let mut histogram = Array2::<f64>::zeros((pitches.len(), config.n_class));
    for t in 0..pitches.len() {
        for k in 0..config.count {
            let src = t.saturating_sub(k * config.hop);
            if let Some(class) = classes[src] {
                histogram[[t, class]] += (config.count - k) as f64;
            }
        }
    }
    Ok(histogram)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pitch_class_mapping() {
        assert_eq!(pitch_class(440.0, 12), Some(9)); // A4
        assert_eq!(pitch_class(262.0, 12), Some(0)); // C4
        assert_eq!(pitch_class(0.0, 12), None);
        assert_eq!(pitch_class(-1.0, 12), None);
    }

    #[test]
    fn test_histogram_weights() {
        let config = MelodyConfig {
            n_class: 12,
            count: 3,
            hop: 1,
        };
        // A, A, unvoiced, C
        let pitches = [440.0, 440.0, 0.0, 262.0];
        let h = pitch_chroma(&pitches, &config).unwrap();
        assert_eq!(h.dim(), (4, 12));
        // Frame 0 pads with itself three times: 3 + 2 + 1
        assert_eq!(h[[0, 9]], 6.0);
        // Frame 3: C (3), unvoiced (0), A (1)
        assert_eq!(h[[3, 0]], 3.0);
        assert_eq!(h[[3, 9]], 1.0);
        assert_eq!(h.row(2).sum(), 3.0);
    }

    #[test]
    fn test_empty_contour() {
        assert!(pitch_chroma(&[], &MelodyConfig::default()).is_err());
    }
}
