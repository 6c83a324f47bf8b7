//! Pixel format descriptors.
//!
//! Every [`PixelBuffer`](crate::PixelBuffer) is tagged with a
//! [`FormatDescriptor`]: numeric precision × color model × alpha presence.
//! Two descriptors are *compatible* when precision and model agree; alpha
//! presence only picks a variant of the combine primitive.
//!
//! # Types
//!
//! - [`Precision`] - Sample storage precision (U8, U16, F16, F32)
//! - [`ColorModel`] - RGB, gray or colormap-indexed
//! - [`FormatDescriptor`] - The full descriptor
//!
//! # Usage
//!
//! ```rust
//! use strata_core::{ColorModel, FormatDescriptor, Precision};
//!
//! let layer = FormatDescriptor::rgb(Precision::U8);
//! let doc = FormatDescriptor::rgba(Precision::U8);
//! assert!(layer.is_compatible(&doc));
//! assert_eq!(layer.channels(), 3);
//!
//! // Projections always carry alpha and never stay indexed.
//! let proj = FormatDescriptor::indexed(Precision::U8).projection_format();
//! assert_eq!(proj.model, ColorModel::Rgb);
//! assert!(proj.has_alpha);
//! ```
//!
//! # Samples
//!
//! Samples are held as normalized `f32` and snapped to the declared
//! precision on write (see [`FormatDescriptor::store`]). The color sample
//! of an indexed buffer is a colormap index, stored as a whole number.

use std::fmt;
use std::str::FromStr;

use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Sample precision of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 8-bit unsigned integer.
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit float.
    #[default]
    F32,
}

impl Precision {
    /// Bits per sample.
    #[inline]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 | Self::F16 => 16,
            Self::F32 => 32,
        }
    }

    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Snaps a normalized value to this precision.
    ///
    /// Integer precisions clamp to [0, 1] and round to the nearest code;
    /// F16 round-trips through [`half::f16`].
    ///
    /// ```rust
    /// use strata_core::Precision;
    ///
    /// assert_eq!(Precision::U8.quantize(1.5), 1.0);
    /// assert_eq!(Precision::U8.quantize(0.5), 128.0 / 255.0);
    /// assert_eq!(Precision::F32.quantize(1.5), 1.5);
    /// ```
    #[inline]
    pub fn quantize(&self, v: f32) -> f32 {
        match self {
            Self::U8 => (v.clamp(0.0, 1.0) * 255.0).round() / 255.0,
            Self::U16 => (v.clamp(0.0, 1.0) * 65535.0).round() / 65535.0,
            Self::F16 => f16::from_f32(v).to_f32(),
            Self::F32 => v,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::F16 => "f16",
            Self::F32 => "f32",
        };
        f.write_str(s)
    }
}

impl FromStr for Precision {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "8" => Ok(Self::U8),
            "u16" | "16" => Ok(Self::U16),
            "f16" | "half" => Ok(Self::F16),
            "f32" | "float" => Ok(Self::F32),
            other => Err(Error::unsupported_format(format!("precision '{other}'"))),
        }
    }
}

/// Color model of a pixel buffer.
///
/// `Rgb` and `Gray` form the intensity family; `Indexed` stores colormap
/// indices and uses its own combine table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorModel {
    #[default]
    Rgb,
    Gray,
    Indexed,
}

impl ColorModel {
    /// Number of color (non-alpha) samples per pixel.
    #[inline]
    pub const fn color_components(&self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Gray | Self::Indexed => 1,
        }
    }

    #[inline]
    pub const fn is_indexed(&self) -> bool {
        matches!(self, Self::Indexed)
    }
}

impl fmt::Display for ColorModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rgb => "rgb",
            Self::Gray => "gray",
            Self::Indexed => "indexed",
        };
        f.write_str(s)
    }
}

impl FromStr for ColorModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(Self::Rgb),
            "gray" | "grey" => Ok(Self::Gray),
            "indexed" => Ok(Self::Indexed),
            other => Err(Error::unsupported_format(format!("color model '{other}'"))),
        }
    }
}

/// Layout of a pixel buffer: precision, color model and alpha presence.
///
/// Interleaved sample order is the color components followed by alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub precision: Precision,
    pub model: ColorModel,
    pub has_alpha: bool,
}

impl FormatDescriptor {
    #[inline]
    pub const fn new(precision: Precision, model: ColorModel, has_alpha: bool) -> Self {
        Self {
            precision,
            model,
            has_alpha,
        }
    }

    #[inline]
    pub const fn rgb(precision: Precision) -> Self {
        Self::new(precision, ColorModel::Rgb, false)
    }

    #[inline]
    pub const fn rgba(precision: Precision) -> Self {
        Self::new(precision, ColorModel::Rgb, true)
    }

    #[inline]
    pub const fn gray(precision: Precision) -> Self {
        Self::new(precision, ColorModel::Gray, false)
    }

    #[inline]
    pub const fn indexed(precision: Precision) -> Self {
        Self::new(precision, ColorModel::Indexed, false)
    }

    /// Format of a channel buffer: single gray sample, no alpha.
    #[inline]
    pub const fn mask(precision: Precision) -> Self {
        Self::gray(precision)
    }

    /// Same descriptor with alpha presence replaced.
    #[inline]
    pub const fn with_alpha(self, has_alpha: bool) -> Self {
        Self::new(self.precision, self.model, has_alpha)
    }

    /// Total samples per pixel.
    #[inline]
    pub const fn channels(&self) -> usize {
        self.model.color_components() + self.has_alpha as usize
    }

    /// Sample index of alpha, if present.
    #[inline]
    pub const fn alpha_index(&self) -> Option<usize> {
        if self.has_alpha {
            Some(self.model.color_components())
        } else {
            None
        }
    }

    /// Precision and model agree (alpha presence is free to differ).
    #[inline]
    pub fn is_compatible(&self, other: &FormatDescriptor) -> bool {
        self.precision == other.precision && self.model == other.model
    }

    /// Format used for a projection of a document with this format.
    ///
    /// Alpha is forced on and indexed is promoted to RGB.
    #[inline]
    pub const fn projection_format(&self) -> Self {
        let model = match self.model {
            ColorModel::Indexed => ColorModel::Rgb,
            m => m,
        };
        Self::new(self.precision, model, true)
    }

    /// Snaps `v` for storage in sample `channel`.
    ///
    /// The index sample of an indexed buffer is rounded to a whole,
    /// non-negative number instead of being quantized.
    #[inline]
    pub fn store(&self, channel: usize, v: f32) -> f32 {
        if self.model.is_indexed() && channel == 0 {
            v.round().max(0.0)
        } else {
            self.precision.quantize(v)
        }
    }
}

impl fmt::Display for FormatDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.model)?;
        if self.has_alpha {
            f.write_str("a")?;
        }
        write!(f, "/{}", self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels() {
        assert_eq!(FormatDescriptor::rgb(Precision::U8).channels(), 3);
        assert_eq!(FormatDescriptor::rgba(Precision::U8).channels(), 4);
        assert_eq!(FormatDescriptor::gray(Precision::F32).with_alpha(true).channels(), 2);
        assert_eq!(FormatDescriptor::indexed(Precision::U8).alpha_index(), None);
        assert_eq!(FormatDescriptor::rgba(Precision::U8).alpha_index(), Some(3));
    }

    #[test]
    fn test_compatibility_ignores_alpha() {
        let a = FormatDescriptor::rgb(Precision::U16);
        assert!(a.is_compatible(&a.with_alpha(true)));
        assert!(!a.is_compatible(&FormatDescriptor::rgb(Precision::U8)));
        assert!(!a.is_compatible(&FormatDescriptor::gray(Precision::U16)));
    }

    #[test]
    fn test_projection_format() {
        let p = FormatDescriptor::gray(Precision::F16).projection_format();
        assert_eq!(p, FormatDescriptor::new(Precision::F16, ColorModel::Gray, true));
        let p = FormatDescriptor::indexed(Precision::U8).projection_format();
        assert_eq!(p, FormatDescriptor::rgba(Precision::U8));
    }

    #[test]
    fn test_quantize() {
        assert_eq!(Precision::U8.quantize(-0.2), 0.0);
        assert!((Precision::U16.quantize(0.3) - 0.3).abs() < 1e-4);
        assert!((Precision::F16.quantize(0.1) - 0.1).abs() < 1e-3);
    }

    #[test]
    fn test_store_indexed() {
        let f = FormatDescriptor::indexed(Precision::U8).with_alpha(true);
        assert_eq!(f.store(0, 4.6), 5.0);
        assert_eq!(f.store(1, 0.5), 128.0 / 255.0);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("U16".parse::<Precision>().unwrap(), Precision::U16);
        assert_eq!("grey".parse::<ColorModel>().unwrap(), ColorModel::Gray);
        assert!("cmyk".parse::<ColorModel>().is_err());
        assert_eq!(FormatDescriptor::rgba(Precision::U8).to_string(), "rgba/u8");
    }
}
