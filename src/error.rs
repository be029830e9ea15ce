// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for candle-seqmask.

/// Errors that can occur in masking and sequence operations.
#[derive(Debug, thiserror::Error)]
pub enum MaskError {
    /// Tensor runtime error (wraps candle).
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Shape or axis precondition violated.
    #[error("shape error: {0}")]
    Shape(String),

    /// Unsupported element type at a function boundary.
    #[error("dtype error: {0}")]
    DType(String),

    /// Invalid numeric configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Result type alias for candle-seqmask operations.
pub type Result<T> = std::result::Result<T, MaskError>;
