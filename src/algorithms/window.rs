//! Single-window chorus detectors

use super::{section_cliques, ChorusWindowDetector, HighlightDetector, Song, StructureAlgorithm};
use crate::annotation::mirex::{single_chorus_section, MirexStructure};
use crate::config::StructureConfig;
use crate::error::StructureError;
use crate::io::cache::{cache_key, ChorusWindow, ResultCache};
use crate::structure::cliques::Clique;

/// External highlight detector reporting one window per song
pub struct HighlightWindow {
    detector: Box<dyn HighlightDetector>,
    config: StructureConfig,
}

impl HighlightWindow {
    /// Create the algorithm around a highlight detector
    pub fn new(detector: Box<dyn HighlightDetector>, config: StructureConfig) -> Self {
        Self { detector, config }
    }
}

impl StructureAlgorithm for HighlightWindow {
    fn name(&self) -> &str {
        "highlighter"
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        let sections = self.chorus_sections(song)?;
        section_cliques(&sections, song.times(), &self.config.matching.target_label)
    }

    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError> {
        let window = self.detector.highlight(song)?;
        Ok(single_chorus_section(
            window.onset,
            window.offset,
            song.duration,
            &self.config.matching,
        ))
    }
}

/// External fixed-length chorus detector with retries and a result cache
///
/// When the detector finds nothing, the clip is shortened by
/// `clip_step` and the search repeated while the clip is longer than
/// `min_clip_length`. If every attempt fails the window starts at 0. The
/// outcome is cached per song either way.
pub struct RefrainWindow {
    detector: Box<dyn ChorusWindowDetector>,
    cache: Box<dyn ResultCache>,
    config: StructureConfig,
}

impl RefrainWindow {
    /// Create the algorithm around a window detector and a cache
    pub fn new(
        detector: Box<dyn ChorusWindowDetector>,
        cache: Box<dyn ResultCache>,
        config: StructureConfig,
    ) -> Self {
        Self {
            detector,
            cache,
            config,
        }
    }

    fn detect_with_retry(&self, song: &Song) -> Result<ChorusWindow, StructureError> {
        let policy = &self.config.detector;
        let mut clip_length = policy.clip_length;
        let mut start = self.detector.detect(song, clip_length)?;
        while start.is_none() && policy.clip_step > 0.0 && clip_length > policy.min_clip_length {
            clip_length -= policy.clip_step;
            log::warn!(
                "No chorus found in '{}', retrying with clip_length={:.1}s",
                song.title,
                clip_length
            );
            start = self.detector.detect(song, clip_length)?;
        }
        let start = start.unwrap_or_else(|| {
            log::warn!("No chorus found in '{}', defaulting to start 0", song.title);
            0.0
        });
        Ok(ChorusWindow { start, clip_length })
    }
}

impl StructureAlgorithm for RefrainWindow {
    fn name(&self) -> &str {
        "refraiD"
    }

    fn structure(&self, song: &Song) -> Result<Vec<Clique>, StructureError> {
        let sections = self.chorus_sections(song)?;
        section_cliques(&sections, song.times(), &self.config.matching.target_label)
    }

    fn chorus_sections(&self, song: &Song) -> Result<MirexStructure, StructureError> {
        let key = cache_key(&song.dataset, song.index, &song.title);
        let window = match self.cache.get(&key)? {
            Some(window) => window,
            None => {
                let window = self.detect_with_retry(song)?;
                self.cache.put(&key, &window)?;
                window
            }
        };
        Ok(single_chorus_section(
            window.start,
            window.start + window.clip_length,
            song.duration,
            &self.config.matching,
        ))
    }
}
