//! Error types for the structure analysis engine

use std::fmt;

/// Errors that can occur during structure analysis
#[derive(Debug, Clone, PartialEq)]
pub enum StructureError {
    /// Invalid input parameters (empty features, shape or length mismatch)
    InvalidInput(String),

    /// Numerical error (NaN in an affinity or fused matrix)
    NumericalError(String),

    /// Boundary sweep went negative while merging candidate sections
    UnbalancedBoundaries(String),

    /// Malformed annotation data
    ParseError(String),

    /// File system error while reading annotations or cache entries
    IoError(String),

    /// Cache entry could not be encoded or decoded
    CacheError(String),

    /// An external detector or classifier failed
    ExternalAlgorithm(String),
}

impl fmt::Display for StructureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructureError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            StructureError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            StructureError::UnbalancedBoundaries(msg) => {
                write!(f, "Unbalanced boundaries: {}", msg)
            }
            StructureError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            StructureError::IoError(msg) => write!(f, "I/O error: {}", msg),
            StructureError::CacheError(msg) => write!(f, "Cache error: {}", msg),
            StructureError::ExternalAlgorithm(msg) => {
                write!(f, "External algorithm failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for StructureError {}

impl From<std::io::Error> for StructureError {
    fn from(err: std::io::Error) -> Self {
        StructureError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for StructureError {
    fn from(err: serde_json::Error) -> Self {
        StructureError::CacheError(err.to_string())
    }
}
