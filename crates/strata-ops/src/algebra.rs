//! Format algebra: which combine primitive is legal for a format pair.
//!
//! [`operation_for`] is the single authority consulted before any pixel
//! operation, by the projection path and the merge path alike. The set of
//! valid combinations is closed, so it is expressed as two constant lookup
//! tables (intensity family and indexed family) indexed by
//! `(dest.has_alpha, src.has_alpha)`.
//!
//! ```text
//!                      src no-alpha        src alpha
//! intensity dest no-a  IntenInten          IntenIntenA
//! intensity dest alpha IntenAInten         IntenAIntenA
//! indexed   dest no-a  IndexedIndexed      IndexedIndexedA
//! indexed   dest alpha (invalid)           IndexedAIndexedA
//! ```
//!
//! # Example
//!
//! ```rust
//! use strata_core::{FormatDescriptor, Precision};
//! use strata_ops::{operation_for, CombineOp};
//!
//! let dest = FormatDescriptor::rgba(Precision::U8);
//! let src = FormatDescriptor::rgb(Precision::U8);
//! assert_eq!(operation_for(dest, src).unwrap(), CombineOp::IntenAInten);
//!
//! let other = FormatDescriptor::rgb(Precision::U16);
//! assert!(operation_for(dest, other).is_err());
//! ```

use std::fmt;

use strata_core::FormatDescriptor;
use thiserror::Error;

/// Combine primitive selected for a (destination, source) format pair.
///
/// Names read destination first: `IntenAInten` writes an alpha-less
/// intensity source onto an alpha-bearing intensity destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineOp {
    IntenInten,
    IntenIntenA,
    IntenAInten,
    IntenAIntenA,
    IndexedIndexed,
    IndexedIndexedA,
    IndexedAIndexedA,
}

impl CombineOp {
    /// Whether the destination side of the pair carries alpha.
    #[inline]
    pub const fn dest_alpha(self) -> bool {
        matches!(
            self,
            Self::IntenAInten | Self::IntenAIntenA | Self::IndexedAIndexedA
        )
    }

    /// Whether the source side of the pair carries alpha.
    #[inline]
    pub const fn src_alpha(self) -> bool {
        matches!(
            self,
            Self::IntenIntenA | Self::IntenAIntenA | Self::IndexedIndexedA | Self::IndexedAIndexedA
        )
    }

    #[inline]
    pub const fn is_indexed(self) -> bool {
        matches!(
            self,
            Self::IndexedIndexed | Self::IndexedIndexedA | Self::IndexedAIndexedA
        )
    }
}

impl fmt::Display for CombineOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::IntenInten => "inten/inten",
            Self::IntenIntenA => "inten/inten-a",
            Self::IntenAInten => "inten-a/inten",
            Self::IntenAIntenA => "inten-a/inten-a",
            Self::IndexedIndexed => "indexed/indexed",
            Self::IndexedIndexedA => "indexed/indexed-a",
            Self::IndexedAIndexedA => "indexed-a/indexed-a",
        };
        f.write_str(s)
    }
}

/// Why a format pair has no combine primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MismatchReason {
    Precision,
    ColorModel,
    /// Alpha-bearing indexed destination with an alpha-less source.
    IndexedAlpha,
}

impl fmt::Display for MismatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Precision => "precision differs",
            Self::ColorModel => "color model differs",
            Self::IndexedAlpha => "indexed destination with alpha needs an alpha source",
        };
        f.write_str(s)
    }
}

/// The "incompatible" outcome of [`operation_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[error("incompatible formats {src} onto {dest}: {reason}")]
pub struct FormatMismatch {
    pub dest: FormatDescriptor,
    pub src: FormatDescriptor,
    pub reason: MismatchReason,
}

use CombineOp::*;

const INTENSITY_TABLE: [Option<CombineOp>; 4] = [
    Some(IntenInten),
    Some(IntenIntenA),
    Some(IntenAInten),
    Some(IntenAIntenA),
];

const INDEXED_TABLE: [Option<CombineOp>; 4] = [
    Some(IndexedIndexed),
    Some(IndexedIndexedA),
    None,
    Some(IndexedAIndexedA),
];

/// Picks the combine primitive for writing `src` onto `dest`.
///
/// Fails when precision or color model differ, and for the one invalid
/// indexed cell. Pure and total over every constructible descriptor.
pub fn operation_for(
    dest: FormatDescriptor,
    src: FormatDescriptor,
) -> Result<CombineOp, FormatMismatch> {
    let mismatch = |reason| FormatMismatch { dest, src, reason };
    if dest.precision != src.precision {
        return Err(mismatch(MismatchReason::Precision));
    }
    if dest.model != src.model {
        return Err(mismatch(MismatchReason::ColorModel));
    }
    let cell = 2 * dest.has_alpha as usize + src.has_alpha as usize;
    let table = if dest.model.is_indexed() {
        &INDEXED_TABLE
    } else {
        &INTENSITY_TABLE
    };
    table[cell].ok_or_else(|| mismatch(MismatchReason::IndexedAlpha))
}
