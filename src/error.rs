//! Error types for the beat tracking and tempo estimation pipeline

use std::fmt;

/// Errors that can occur during analysis
#[derive(Debug, Clone)]
pub enum AnalysisError {
    /// Invalid input parameters
    InvalidInput(String),

    /// Window length is zero, larger than the signal, or the hop is zero
    InvalidWindow(String),

    /// A zero-length novelty curve was passed to a tempo or beat stage
    EmptyNovelty(String),

    /// Mel filterbank parameters cannot produce valid triangles
    DegenerateFilterbank(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (overflow, underflow, etc.)
    NumericalError(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::InvalidWindow(msg) => write!(f, "Invalid window: {}", msg),
            AnalysisError::EmptyNovelty(msg) => write!(f, "Empty novelty curve: {}", msg),
            AnalysisError::DegenerateFilterbank(msg) => {
                write!(f, "Degenerate filterbank: {}", msg)
            }
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
