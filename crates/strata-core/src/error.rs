//! Error types for strata-core.
//!
//! # Usage
//!
//! ```rust
//! use strata_core::{Error, Result};
//!
//! fn check(x: i32, y: i32, width: u32, height: u32) -> Result<()> {
//!     if x < 0 || y < 0 || x as u32 >= width || y as u32 >= height {
//!         return Err(Error::out_of_bounds(x, y, width, height));
//!     }
//!     Ok(())
//! }
//! assert!(check(3, 3, 2, 2).is_err());
//! ```

use thiserror::Error;

use crate::rect::Rect;

/// Result alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by buffer and region operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel coordinates outside the buffer.
    #[error("pixel ({x}, {y}) out of bounds for buffer {width}x{height}")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    /// Region does not fit the buffer it addresses.
    #[error("region {region} exceeds buffer bounds {width}x{height}")]
    InvalidRegion { region: Rect, width: u32, height: u32 },

    /// Buffer storage could not be reserved.
    #[error("failed to allocate {requested} samples: {reason}")]
    AllocationFailed { requested: usize, reason: String },

    #[error("unsupported pixel format: {format}")]
    UnsupportedFormat { format: String },

    /// Sample count per pixel differs from what the operation needs.
    #[error("channel mismatch: expected {expected}, got {got}")]
    ChannelMismatch { expected: usize, got: usize },

    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },
}

impl Error {
    #[inline]
    pub fn out_of_bounds(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn invalid_region(region: Rect, width: u32, height: u32) -> Self {
        Self::InvalidRegion {
            region,
            width,
            height,
        }
    }

    #[inline]
    pub fn allocation_failed(requested: usize, reason: impl Into<String>) -> Self {
        Self::AllocationFailed {
            requested,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    #[inline]
    pub fn channel_mismatch(expected: usize, got: usize) -> Self {
        Self::ChannelMismatch { expected, got }
    }

    #[inline]
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. } | Self::InvalidRegion { .. })
    }

    #[inline]
    pub fn is_allocation_error(&self) -> bool {
        matches!(self, Self::AllocationFailed { .. })
    }
}
