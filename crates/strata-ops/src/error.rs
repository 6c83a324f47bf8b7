//! Error types for area operations.

use thiserror::Error;

use crate::algebra::FormatMismatch;

/// Error type for format algebra and area kernels.
#[derive(Error, Debug)]
pub enum OpsError {
    /// Source and destination regions differ in size.
    #[error("size mismatch: {0}")]
    SizeMismatch(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Kernel cannot handle this buffer combination.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// No combine operation exists for the format pair.
    #[error(transparent)]
    Incompatible(#[from] FormatMismatch),

    #[error(transparent)]
    Core(#[from] strata_core::Error),
}

/// Result type for area operations.
pub type OpsResult<T> = Result<T, OpsError>;
