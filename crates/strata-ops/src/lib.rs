//! # strata-ops
//!
//! Pixel-level primitives for layered raster documents.
//!
//! # Modules
//!
//! - [`algebra`] - [`operation_for`]: which combine primitive a format pair allows
//! - [`blend`] - [`BlendMode`] formulas
//! - [`area`] - initialize / combine kernels, channel overlays, mask helpers
//! - [`active`] - per-sample write enables
//! - [`resample`] - nearest-neighbor scaling for previews
//!
//! # Example
//!
//! ```rust
//! use strata_core::{FormatDescriptor, PixelBuffer, Precision};
//! use strata_ops::{area::{combine_areas, AreaSource, CombineParams}, operation_for, BlendMode};
//!
//! let mut dest = PixelBuffer::filled(FormatDescriptor::rgba(Precision::F32), 2, 2, &[0.0, 0.0, 1.0, 1.0])?;
//! let src = PixelBuffer::filled(FormatDescriptor::rgb(Precision::F32), 2, 2, &[1.0, 0.0, 0.0])?;
//!
//! let op = operation_for(dest.format(), src.format())?;
//! let params = CombineParams::new(0.5, BlendMode::Normal);
//! let bounds = dest.bounds();
//! combine_areas(op, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)?;
//! assert!((dest.pixel(0, 0)[0] - 0.5).abs() < 1e-6);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Feature Flags
//!
//! - `parallel` (default) - run area kernels row-parallel on rayon

#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod active;
pub mod algebra;
pub mod area;
pub mod blend;
pub mod resample;

pub use active::ActiveChannels;
pub use algebra::{operation_for, CombineOp, FormatMismatch, MismatchReason};
pub use area::{AreaSource, CombineParams, OverlayStyle};
pub use blend::BlendMode;
pub use error::{OpsError, OpsResult};
