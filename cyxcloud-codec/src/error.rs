//! Error types for the CyxCloud codecs
//!
//! Initialization and per-call failures are kept apart: an `InitError` means the
//! profile was rejected, a `CodecError` fails a single call and leaves the coder
//! usable.

use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Profile rejected during `init`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InitError {
    #[error("Invalid codec configuration: {0}")]
    InvalidConfig(String),
}

/// Failure of a single encode/decode/recode call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient chunks: have {available}, need {required}")]
    InsufficientChunks { available: usize, required: usize },

    #[error("Insufficient rank: got {rank} independent chunks, need {required}")]
    InsufficientRank { rank: usize, required: usize },

    #[error("Singular matrix: selected rows are linearly dependent")]
    SingularMatrix,
}

impl CodecError {
    pub(crate) fn index_out_of_range(index: usize, chunk_count: usize) -> Self {
        CodecError::InvalidInput(format!(
            "chunk index {} out of range (chunk count: {})",
            index, chunk_count
        ))
    }
}
