//! Example: Structure analysis on synthetic features
//!
//! Usage:
//!   cargo run --release --example analyze_features -- [--config config.json] [annotation.lab]
//!
//! Builds a verse/chorus feature sequence, computes the fused self-similarity
//! matrix, segments it with fixed-length windows, refines the segments into
//! recurring sections, and prints the detected chorus timeline. With an
//! annotation file the classifier is trained against it; otherwise against
//! the synthetic layout.

use std::env;
use std::fs;

use ndarray::Array2;
use refrain_dsp::analysis::{chorus_detection, chorus_scores, clique_training_data, ChorusClassifier, LogisticClassifier};
use refrain_dsp::annotation::{mirex_lines, Interval, MirexStructure};
use refrain_dsp::io::load_labeled_intervals;
use refrain_dsp::similarity::log_ssm;
use refrain_dsp::structure::{build_recurrence, cliques_from_labels, labels_from_block_ssm};
use refrain_dsp::{self_similarity_matrix, FeatureSet, StructureConfig};

const SECTION_SECONDS: f64 = 15.0;

fn synthetic_features(config: &StructureConfig, sections: usize) -> FeatureSet {
    let frames_per_second = config.blocks.sample_rate as f64 / config.blocks.hop_length as f64;
    let section_frames = (SECTION_SECONDS * frames_per_second) as usize;
    let frames = section_frames * sections;
    let part = |t: usize| (t / section_frames) % 2;
    FeatureSet {
        mfcc: Array2::from_shape_fn((frames, 20), |(t, r)| {
            let base = if part(t) == 0 { 0.3 } else { 1.1 };
            (base * r as f64 + t as f64 * 1e-3).sin()
        }),
        chroma: Array2::from_shape_fn((frames, 12), |(t, r)| {
            let root = if part(t) == 0 { 0 } else { 5 };
            if r == root || r == (root + 4) % 12 || r == (root + 7) % 12 {
                1.0
            } else {
                0.1
            }
        }),
        tempogram: Array2::from_shape_fn((frames, 16), |(t, r)| ((part(t) as f64 + 1.0) * r as f64 * 0.2).cos()),
        pitches: Some(
            (0..frames)
                .map(|t| if part(t) == 0 { 196.0 } else { 293.7 })
                .collect(),
        ),
    }
}

fn synthetic_annotation(sections: usize) -> MirexStructure {
    MirexStructure {
        intervals: (0..sections)
            .map(|k| Interval::new(k as f64 * SECTION_SECONDS, (k + 1) as f64 * SECTION_SECONDS))
            .collect(),
        labels: (0..sections)
            .map(|k| if k % 2 == 1 { "chorus".to_string() } else { "verse".to_string() })
            .collect(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut config = StructureConfig::default();
    let mut annotation_path = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().ok_or("--config needs a path")?;
                config = serde_json::from_str(&fs::read_to_string(path)?)?;
            }
            _ => annotation_path = Some(arg),
        }
    }

    let sections = 6;
    let features = synthetic_features(&config, sections);
    let ssm = self_similarity_matrix(&features, &config)?;
    let times = &ssm.times;
    println!("Self-similarity: {} blocks over {:.1}s", ssm.n_blocks(), times[times.len() - 1]);

    // Fixed-length windows stand in for an external segmenter
    let duration = times[times.len() - 1];
    let mut boundaries: Vec<f64> = (0..)
        .map(|k| k as f64 * SECTION_SECONDS / 3.0)
        .take_while(|&t| t < duration)
        .collect();
    boundaries.push(duration);
    let log_fused = log_ssm(&ssm.fused, config.cliques.log_epsilon);
    let frames = labels_from_block_ssm(&boundaries, times, &log_fused, config.cliques.ssm_log_threshold)?;
    let cliques = build_recurrence(&cliques_from_labels(&frames), times, &config.cliques)?;
    println!("Recurring sections: {}", cliques.len());

    let ground_truth = match annotation_path {
        Some(path) => load_labeled_intervals(path)?,
        None => synthetic_annotation(sections),
    };

    let (x, y) = clique_training_data(&cliques, times, &ssm.fused, &ground_truth, &config.matching)?;
    let mut classifier = LogisticClassifier::default();
    classifier.train(&x, &y)?;

    let detected = chorus_detection(&cliques, times, &ssm.fused, &classifier, &config.matching)?;
    println!("\nDetected chorus timeline:");
    print!("{}", mirex_lines(&detected));

    let scores = chorus_scores(&detected, &ground_truth, &config.matching);
    println!(
        "\nPrecision {:.3}  Recall {:.3}  F {:.3}",
        scores.precision, scores.recall, scores.f_measure
    );
    Ok(())
}
