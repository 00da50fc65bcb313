//! Labeled-interval annotation files
//!
//! One segment per row: `onset offset label`, separated by tabs or spaces.
//! Blank lines and lines starting with `#` are skipped. Labels may contain
//! spaces; everything after the offset column is the label.

use std::fs;
use std::path::Path;

use crate::annotation::mirex::{Interval, MirexStructure};
use crate::error::StructureError;

fn parse_time(field: &str, line_no: usize) -> Result<f64, StructureError> {
    field.parse::<f64>().map_err(|e| {
        StructureError::ParseError(format!("Line {}: invalid time '{}': {}", line_no, field, e))
    })
}

/// Parse labeled intervals from annotation text
///
/// # Errors
///
/// Returns `StructureError::ParseError` for rows with fewer than three
/// fields, unparsable times, or an offset before its onset
pub fn parse_labeled_intervals(text: &str) -> Result<MirexStructure, StructureError> {
    let mut structure = MirexStructure::default();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(StructureError::ParseError(format!(
                "Line {}: expected 'onset offset label', got '{}'",
                line_no, line
            )));
        }
        let onset = parse_time(fields[0], line_no)?;
        let offset = parse_time(fields[1], line_no)?;
        if offset < onset {
            return Err(StructureError::ParseError(format!(
                "Line {}: offset {} precedes onset {}",
                line_no, offset, onset
            )));
        }

        structure.intervals.push(Interval::new(onset, offset));
        structure.labels.push(fields[2..].join(" "));
    }
    Ok(structure)
}

/// Load labeled intervals from an annotation file
///
/// # Errors
///
/// Returns `StructureError::IoError` if the file cannot be read, or
/// `StructureError::ParseError` if its contents are malformed
pub fn load_labeled_intervals<P: AsRef<Path>>(path: P) -> Result<MirexStructure, StructureError> {
    let path = path.as_ref();
    log::debug!("Loading annotation: {}", path.display());
    let text = fs::read_to_string(path)?;
    let structure = parse_labeled_intervals(&text)?;
    log::debug!("Loaded {} segments from {}", structure.len(), path.display());
    Ok(structure)
}
