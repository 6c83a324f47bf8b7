//! # strata-core
//!
//! Core raster types for the strata layered-document engine.
//!
//! - [`Rect`] - Regions in document space (unit of invalidation and work)
//! - [`FormatDescriptor`], [`Precision`], [`ColorModel`] - Pixel layouts
//! - [`PixelBuffer`], [`BufferView`], [`BufferViewMut`] - Pixel storage
//! - [`Error`] - Buffer and region errors
//!
//! ## Crate Structure
//!
//! ```text
//! strata-core (this crate)
//!    ^
//!    +-- strata-ops (format algebra, area kernels)
//!    +-- strata-doc (document, projection, merge)
//!    +-- strata-cli
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod error;
pub mod format;
pub mod rect;

pub use buffer::{BufferView, BufferViewMut, PixelBuffer};
pub use error::{Error, Result};
pub use format::{ColorModel, FormatDescriptor, Precision};
pub use rect::Rect;

/// Prelude for convenient imports.
///
/// ```
/// use strata_core::prelude::*;
/// let _ = FormatDescriptor::rgb(Precision::U8);
/// ```
pub mod prelude {
    pub use crate::buffer::{BufferView, BufferViewMut, PixelBuffer};
    pub use crate::error::{Error, Result};
    pub use crate::format::{ColorModel, FormatDescriptor, Precision};
    pub use crate::rect::Rect;
}
