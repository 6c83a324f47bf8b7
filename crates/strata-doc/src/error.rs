//! Error and diagnostic types for document operations.
//!
//! Every failure an operation reports is returned as a [`DocError`] and is
//! also recorded on the [`Document`](crate::Document) as a [`Diagnostic`],
//! so interactive callers can show messages without threading errors
//! through their own state.

use std::fmt;

use strata_ops::{FormatMismatch, OpsError};
use thiserror::Error;

use crate::channel::ChannelId;
use crate::layer::LayerId;

/// Result type for document operations.
pub type DocResult<T> = Result<T, DocError>;

#[derive(Error, Debug)]
pub enum DocError {
    #[error("{0} not found")]
    LayerNotFound(LayerId),

    #[error("{0} not found")]
    ChannelNotFound(ChannelId),

    /// Too few layers for a merge.
    #[error("not enough layers: {0}")]
    NotEnoughLayers(String),

    /// Computed merge bounds cover no pixels.
    #[error("merge bounds are empty")]
    EmptyBounds,

    #[error(transparent)]
    Incompatible(#[from] FormatMismatch),

    #[error("{0} is already in the document")]
    DuplicateLayer(LayerId),

    #[error("cannot raise {0}: {1}")]
    CannotRaise(String, String),

    #[error("cannot lower {0}: {1}")]
    CannotLower(String, String),

    #[error("layer mask rejected: {0}")]
    MaskRejected(String),

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error(transparent)]
    Core(#[from] strata_core::Error),

    #[error(transparent)]
    Ops(OpsError),

    /// Scene description is malformed.
    #[error("scene error: {0}")]
    Scene(String),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<OpsError> for DocError {
    fn from(err: OpsError) -> Self {
        match err {
            OpsError::Incompatible(m) => Self::Incompatible(m),
            OpsError::Core(e) => Self::Core(e),
            other => Self::Ops(other),
        }
    }
}

impl DocError {
    /// Diagnostic category of this error.
    pub fn kind(&self) -> DiagnosticKind {
        match self {
            Self::Incompatible(_) => DiagnosticKind::IncompatibleFormat,
            Self::EmptyBounds => DiagnosticKind::EmptyRegion,
            Self::Core(e) if e.is_allocation_error() => DiagnosticKind::Allocation,
            Self::Core(_) | Self::Ops(_) => DiagnosticKind::Pixel,
            Self::Scene(_) | Self::Yaml(_) | Self::Io(_) => DiagnosticKind::Input,
            _ => DiagnosticKind::Rejected,
        }
    }

    #[inline]
    pub fn is_incompatible(&self) -> bool {
        matches!(self, Self::Incompatible(_))
    }
}

/// Category of a recorded diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// A format pair had no combine operation.
    IncompatibleFormat,
    /// An operation's region was empty.
    EmptyRegion,
    /// A buffer could not be allocated.
    Allocation,
    /// An edit was refused (missing item, illegal reorder, bad mask).
    Rejected,
    /// A pixel kernel failed.
    Pixel,
    /// Scene or configuration input was unusable.
    Input,
}

/// A user-facing message recorded by a document operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl From<&DocError> for Diagnostic {
    fn from(err: &DocError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
