//! # strata-doc
//!
//! Layered raster documents and their projection engine.
//!
//! A [`Document`] owns an ordered layer stack, auxiliary channels and a
//! selection mask. The projection (the flattened view used for display) is
//! rebuilt lazily, region by region, when a consumer reads an invalid area;
//! a flat document skips it entirely. Layers are merged permanently with
//! [`Document::merge_layers`] and friends.
//!
//! # Modules
//!
//! - [`document`] - the stack and its editing operations
//! - [`projection`] - flatness short-circuit and on-demand rebuilds
//! - [`compositor`] - per-layer and per-channel compositing
//! - [`merge`] - merge / flatten with a [`BoundsPolicy`]
//! - [`paint`] - blending external buffers onto drawables
//! - [`preview`] - down-scaled composites
//! - [`undo`], [`display`] - boundaries to the undo log and viewers
//! - [`scene`], [`config`] - YAML scene files and engine settings
//!
//! # Example
//!
//! ```rust
//! use strata_core::{FormatDescriptor, Precision};
//! use strata_doc::{BoundsPolicy, Document};
//!
//! let fmt = FormatDescriptor::rgba(Precision::U8);
//! let mut doc = Document::new(30, 10, FormatDescriptor::rgb(Precision::U8))?;
//! let a = doc.new_layer("a", fmt, 10, 10)?.filled(&[1.0, 0.0, 0.0, 1.0])?;
//! let b = doc.new_layer("b", fmt, 10, 10)?.with_offset(20, 0).filled(&[0.0, 1.0, 0.0, 1.0])?;
//! let ids = [a.id(), b.id()];
//! doc.add_layer(a, None)?;
//! doc.add_layer(b, None)?;
//!
//! let merged = doc.merge_layers(&ids, BoundsPolicy::ExpandToUnion)?;
//! let layer = doc.layer(merged).unwrap();
//! assert_eq!(layer.buffer().pixel(25, 5), &[0.0, 1.0, 0.0, 1.0]);
//! assert_eq!(layer.buffer().pixel(15, 5)[3], 0.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(rustdoc::missing_crate_level_docs)]

pub mod channel;
pub mod compositor;
pub mod config;
pub mod display;
pub mod document;
pub mod error;
pub mod layer;
pub mod merge;
pub mod paint;
pub mod preview;
pub mod projection;
pub mod scene;
pub mod undo;

pub use channel::{Channel, ChannelId};
pub use compositor::{ChannelOverlayCompositor, LayerCompositor};
pub use config::EngineConfig;
pub use display::{ColorTransform, DamageLog, DisplaySink, NullDisplay};
pub use document::{Document, DocumentId, MaskApply};
pub use error::{Diagnostic, DiagnosticKind, DocError, DocResult};
pub use layer::{Layer, LayerId};
pub use merge::BoundsPolicy;
pub use paint::Drawable;
pub use projection::ProjectionCache;
pub use scene::{ChannelSpec, LayerSpec, RectFill, Scene};
pub use undo::{JournalEntry, NoUndo, UndoGroup, UndoJournal, UndoRecord, UndoSink};
