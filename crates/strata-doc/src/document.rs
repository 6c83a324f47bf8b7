//! The editable document: layer stack, channels and selection mask.
//!
//! Layers are stored top first (index 0 is the topmost layer) and
//! composited bottom to top. Channels follow the same convention. Every
//! mutation goes through a `Document` method so that the undo sink is told
//! first and the projection is invalidated afterwards.
//!
//! # Example
//!
//! ```rust
//! use strata_core::{FormatDescriptor, Precision, Rect};
//! use strata_doc::Document;
//!
//! let mut doc = Document::new(64, 64, FormatDescriptor::rgb(Precision::U8))?;
//! let bg = doc.new_layer("background", FormatDescriptor::rgb(Precision::U8), 64, 64)?;
//! let bg = bg.filled(&[1.0, 1.0, 1.0])?;
//! doc.add_layer(bg, None)?;
//! assert!(doc.is_flat());
//!
//! let ink = doc.new_layer("ink", FormatDescriptor::rgba(Precision::U8), 16, 16)?;
//! doc.add_layer(ink.with_offset(8, 8), None)?;
//! assert!(!doc.is_flat());
//! let proj = doc.projection(Rect::new(0, 0, 64, 64))?;
//! assert_eq!(proj.pixel(0, 0), &[1.0, 1.0, 1.0, 1.0]);
//! # Ok::<(), strata_doc::DocError>(())
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use strata_core::{FormatDescriptor, PixelBuffer, Rect};
use strata_ops::active::MAX_CHANNELS;
use strata_ops::area::apply_mask_to_alpha;
use strata_ops::BlendMode;
use tracing::{debug, warn};

use crate::channel::{Channel, ChannelId};
use crate::config::EngineConfig;
use crate::display::{DisplaySink, NullDisplay};
use crate::error::{Diagnostic, DocError, DocResult};
use crate::layer::{Layer, LayerId};
use crate::preview::PreviewCache;
use crate::projection::ProjectionCache;
use crate::undo::{NoUndo, UndoGroup, UndoRecord, UndoSink};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        Self(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// What happens to a layer mask's content when it is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaskApply {
    /// Multiply the mask into the layer alpha.
    Apply,
    /// Drop the mask.
    #[default]
    Discard,
}

pub struct Document {
    pub(crate) id: DocumentId,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) format: FormatDescriptor,
    pub(crate) layers: Vec<Layer>,
    pub(crate) channels: Vec<Channel>,
    pub(crate) selection: Channel,
    pub(crate) colormap: Vec<[f32; 3]>,
    pub(crate) component_visible: [bool; MAX_CHANNELS],
    pub(crate) component_active: [bool; MAX_CHANNELS],
    pub(crate) active_layer: Option<LayerId>,
    pub(crate) active_channel: Option<ChannelId>,
    pub(crate) projection: Option<ProjectionCache>,
    pub(crate) preview: Option<PreviewCache>,
    pub(crate) config: EngineConfig,
    pub(crate) undo: Box<dyn UndoSink>,
    pub(crate) display: Box<dyn DisplaySink>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    next_id: u32,
}

impl Document {
    /// Creates an empty document.
    ///
    /// The document format is `format` with alpha removed; alpha presence is
    /// a per-layer property.
    pub fn new(width: u32, height: u32, format: FormatDescriptor) -> DocResult<Self> {
        if width == 0 || height == 0 {
            return Err(DocError::InvalidDimensions(format!(
                "document must not be empty, got {width}x{height}"
            )));
        }
        let format = format.with_alpha(false);
        let selection = Channel::new(ChannelId(0), "selection", width, height, format.precision);
        let mut doc = Self {
            id: DocumentId::next(),
            width,
            height,
            format,
            layers: Vec::new(),
            channels: Vec::new(),
            selection,
            colormap: Vec::new(),
            component_visible: [true; MAX_CHANNELS],
            component_active: [true; MAX_CHANNELS],
            active_layer: None,
            active_channel: None,
            projection: None,
            preview: None,
            config: EngineConfig::default(),
            undo: Box::new(NoUndo),
            display: Box::new(NullDisplay),
            diagnostics: Vec::new(),
            next_id: 1,
        };
        doc.sync_projection()?;
        debug!(doc = %doc.id, width, height, format = %doc.format, "document created");
        Ok(doc)
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self.invalidate_all();
        self
    }

    pub fn with_undo(mut self, undo: impl UndoSink + 'static) -> Self {
        self.undo = Box::new(undo);
        self
    }

    pub fn with_display(mut self, display: impl DisplaySink + 'static) -> Self {
        self.display = Box::new(display);
        self
    }

    #[inline]
    pub fn id(&self) -> DocumentId {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The document extent at the origin.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    pub fn format(&self) -> FormatDescriptor {
        self.format
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Layers, top first.
    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Channels, top first.
    #[inline]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    #[inline]
    pub fn selection(&self) -> &Channel {
        &self.selection
    }

    #[inline]
    pub fn colormap(&self) -> &[[f32; 3]] {
        &self.colormap
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id() == id)
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id() == id)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id() == id)
    }

    pub fn channel_index(&self, id: ChannelId) -> Option<usize> {
        self.channels.iter().position(|c| c.id() == id)
    }

    #[inline]
    pub fn active_layer(&self) -> Option<LayerId> {
        self.active_layer
    }

    #[inline]
    pub fn active_channel(&self) -> Option<ChannelId> {
        self.active_channel
    }

    pub fn component_visible(&self, component: usize) -> bool {
        self.component_visible.get(component).copied().unwrap_or(false)
    }

    pub fn component_active(&self, component: usize) -> bool {
        self.component_active.get(component).copied().unwrap_or(false)
    }

    /// Diagnostics recorded so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Drains recorded diagnostics.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Records `err` as a diagnostic and hands it back.
    pub(crate) fn report(&mut self, err: DocError) -> DocError {
        let diagnostic = Diagnostic::from(&err);
        warn!(doc = %self.id, kind = ?diagnostic.kind, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
        err
    }

    pub(crate) fn find_layer(&mut self, id: LayerId) -> DocResult<usize> {
        match self.layer_index(id) {
            Some(i) => Ok(i),
            None => Err(self.report(DocError::LayerNotFound(id))),
        }
    }

    pub(crate) fn find_channel(&mut self, id: ChannelId) -> DocResult<usize> {
        match self.channel_index(id) {
            Some(i) => Ok(i),
            None => Err(self.report(DocError::ChannelNotFound(id))),
        }
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Creates a transparent (zeroed) layer owned by nobody yet.
    pub fn new_layer(
        &mut self,
        name: impl Into<String>,
        format: FormatDescriptor,
        width: u32,
        height: u32,
    ) -> DocResult<Layer> {
        let buffer = PixelBuffer::try_new(format, width, height).map_err(|e| self.report(e.into()))?;
        Ok(self.new_layer_from(name, buffer))
    }

    /// Wraps an existing buffer in a new layer.
    pub fn new_layer_from(&mut self, name: impl Into<String>, buffer: PixelBuffer) -> Layer {
        let id = LayerId(self.alloc_id());
        Layer::new(id, name, buffer)
    }

    /// Creates a document-sized channel.
    pub fn new_channel(&mut self, name: impl Into<String>) -> Channel {
        let id = ChannelId(self.alloc_id());
        Channel::new(id, name, self.width, self.height, self.format.precision)
    }

    /// Creates a mask channel sized for `layer`, filled with `value`.
    pub fn new_layer_mask(&mut self, layer: LayerId, value: f32) -> DocResult<Channel> {
        let idx = self.find_layer(layer)?;
        let (w, h) = self.layers[idx].buffer.dimensions();
        let name = format!("{} mask", self.layers[idx].name);
        let id = ChannelId(self.alloc_id());
        Ok(Channel::new(id, name, w, h, self.format.precision).filled(value))
    }

    /// Drops cached state after a structural change covering `area`.
    pub(crate) fn structure_changed(&mut self, area: Rect) {
        // allocation failures are recorded by sync_projection
        let _ = self.sync_projection();
        self.invalidate(area);
    }

    pub(crate) fn push_undo(&mut self, record: UndoRecord) {
        self.undo.push(self.id, record);
    }

    pub(crate) fn undo_group_start(&mut self, group: UndoGroup) {
        self.undo.group_start(self.id, group);
    }

    pub(crate) fn undo_group_end(&mut self) {
        self.undo.group_end(self.id);
    }

    /// Inserts `layer` at `position` (0 = top). `None` inserts above the
    /// active layer. The layer becomes active.
    pub fn add_layer(&mut self, layer: Layer, position: Option<usize>) -> DocResult<()> {
        if self.layer_index(layer.id()).is_some() {
            return Err(self.report(DocError::DuplicateLayer(layer.id())));
        }
        let position = position
            .or_else(|| self.active_layer.and_then(|id| self.layer_index(id)))
            .unwrap_or(0)
            .min(self.layers.len());
        let id = layer.id();
        let bounds = layer.bounds();
        self.push_undo(UndoRecord::LayerAdded { layer: id, position });
        self.layers.insert(position, layer);
        self.active_layer = Some(id);
        debug!(doc = %self.id, layer = %id, position, "layer added");
        self.structure_changed(bounds);
        Ok(())
    }

    /// Takes a layer out of the stack and returns it.
    pub fn remove_layer(&mut self, id: LayerId) -> DocResult<Layer> {
        let idx = self.find_layer(id)?;
        let record = UndoRecord::LayerRemoved {
            layer: Box::new(self.layers[idx].clone()),
            position: idx,
        };
        self.push_undo(record);
        let layer = self.layers.remove(idx);
        if self.active_layer == Some(id) {
            self.active_layer = self.layers.first().map(Layer::id);
        }
        debug!(doc = %self.id, layer = %id, position = idx, "layer removed");
        self.structure_changed(layer.bounds());
        Ok(layer)
    }

    /// Moves a layer one step up. Both it and the layer above need alpha.
    pub fn raise_layer(&mut self, id: LayerId) -> DocResult<()> {
        let idx = self.find_layer(id)?;
        if idx == 0 {
            let err = DocError::CannotRaise(id.to_string(), "already the top layer".into());
            return Err(self.report(err));
        }
        self.swap_layers(idx, idx - 1)
            .map_err(|reason| self.report(DocError::CannotRaise(id.to_string(), reason)))
    }

    /// Moves a layer one step down. Both it and the layer below need alpha.
    pub fn lower_layer(&mut self, id: LayerId) -> DocResult<()> {
        let idx = self.find_layer(id)?;
        if idx + 1 >= self.layers.len() {
            let err = DocError::CannotLower(id.to_string(), "already the bottom layer".into());
            return Err(self.report(err));
        }
        self.swap_layers(idx, idx + 1)
            .map_err(|reason| self.report(DocError::CannotLower(id.to_string(), reason)))
    }

    fn swap_layers(&mut self, from: usize, to: usize) -> Result<(), String> {
        if !self.layers[from].has_alpha() || !self.layers[to].has_alpha() {
            return Err("both layers need an alpha channel".into());
        }
        let id = self.layers[from].id();
        let overlap = self.layers[from].bounds().intersect(&self.layers[to].bounds());
        self.push_undo(UndoRecord::LayerMoved { layer: id, from, to });
        self.layers.swap(from, to);
        match overlap {
            Some(area) => self.structure_changed(area),
            None => {
                let _ = self.sync_projection();
            }
        }
        Ok(())
    }

    /// Inserts a document-sized channel at `position` (0 = top).
    pub fn add_channel(&mut self, channel: Channel, position: Option<usize>) -> DocResult<()> {
        if channel.buffer.dimensions() != (self.width, self.height) {
            let err = DocError::InvalidDimensions(format!(
                "channel is {}x{}, document is {}x{}",
                channel.width(),
                channel.height(),
                self.width,
                self.height
            ));
            return Err(self.report(err));
        }
        if self.channel_index(channel.id()).is_some() {
            let err = DocError::InvalidDimensions(format!("{} is already in the document", channel.id()));
            return Err(self.report(err));
        }
        let position = position.unwrap_or(0).min(self.channels.len());
        let id = channel.id();
        self.push_undo(UndoRecord::ChannelAdded { channel: id, position });
        self.channels.insert(position, channel);
        self.active_channel = Some(id);
        self.structure_changed(self.bounds());
        Ok(())
    }

    pub fn remove_channel(&mut self, id: ChannelId) -> DocResult<Channel> {
        let idx = self.find_channel(id)?;
        let record = UndoRecord::ChannelRemoved {
            channel: Box::new(self.channels[idx].clone()),
            position: idx,
        };
        self.push_undo(record);
        let channel = self.channels.remove(idx);
        if self.active_channel == Some(id) {
            self.active_channel = None;
        }
        self.structure_changed(self.bounds());
        Ok(channel)
    }

    pub fn raise_channel(&mut self, id: ChannelId) -> DocResult<()> {
        let idx = self.find_channel(id)?;
        if idx == 0 {
            let err = DocError::CannotRaise(id.to_string(), "already the top channel".into());
            return Err(self.report(err));
        }
        self.move_channel(idx, idx - 1);
        Ok(())
    }

    pub fn lower_channel(&mut self, id: ChannelId) -> DocResult<()> {
        let idx = self.find_channel(id)?;
        if idx + 1 >= self.channels.len() {
            let err = DocError::CannotLower(id.to_string(), "already the bottom channel".into());
            return Err(self.report(err));
        }
        self.move_channel(idx, idx + 1);
        Ok(())
    }

    fn move_channel(&mut self, from: usize, to: usize) {
        let id = self.channels[from].id();
        self.push_undo(UndoRecord::ChannelMoved { channel: id, from, to });
        self.channels.swap(from, to);
        self.structure_changed(self.bounds());
    }

    /// Attaches `mask` to a layer.
    ///
    /// Rejected if the layer already has a mask, is indexed, lacks alpha, or
    /// differs in size from the mask.
    pub fn add_layer_mask(&mut self, id: LayerId, mask: Channel) -> DocResult<()> {
        let idx = self.find_layer(id)?;
        let layer = &self.layers[idx];
        let reason = if layer.mask.is_some() {
            Some("layer already has a mask".to_string())
        } else if layer.format().model.is_indexed() {
            Some("indexed layers cannot have masks".to_string())
        } else if !layer.has_alpha() {
            Some("layer has no alpha channel".to_string())
        } else if mask.buffer.dimensions() != layer.buffer.dimensions() {
            Some(format!(
                "mask is {}x{}, layer is {}x{}",
                mask.width(),
                mask.height(),
                layer.width(),
                layer.height()
            ))
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(self.report(DocError::MaskRejected(reason)));
        }
        self.push_undo(UndoRecord::MaskAdded { layer: id });
        let layer = &mut self.layers[idx];
        layer.mask = Some(mask);
        layer.apply_mask = true;
        layer.show_mask = false;
        let bounds = layer.bounds();
        self.structure_changed(bounds);
        Ok(())
    }

    /// Detaches a layer's mask, optionally baking it into the layer alpha.
    pub fn remove_layer_mask(&mut self, id: LayerId, mode: MaskApply) -> DocResult<Channel> {
        let idx = self.find_layer(id)?;
        let Some(mask) = self.layers[idx].mask.clone() else {
            return Err(self.report(DocError::MaskRejected("layer has no mask".into())));
        };
        let mut applied = None;
        if mode == MaskApply::Apply {
            let mut buffer = self.layers[idx].buffer.clone();
            if let Err(e) = apply_mask_to_alpha(&mut buffer, &mask.buffer) {
                return Err(self.report(e.into()));
            }
            applied = Some(buffer);
        }

        self.undo_group_start(UndoGroup::RemoveMask);
        if let Some(buffer) = applied {
            let layer = &mut self.layers[idx];
            let old = std::mem::replace(&mut layer.buffer, buffer);
            let area = old.bounds();
            self.push_undo(UndoRecord::LayerPixels { layer: id, area, pixels: old });
        }
        self.push_undo(UndoRecord::MaskRemoved {
            layer: id,
            mask: Box::new(mask.clone()),
        });
        let layer = &mut self.layers[idx];
        layer.mask = None;
        layer.show_mask = false;
        layer.edit_mask = false;
        let bounds = layer.bounds();
        self.undo_group_end();
        self.structure_changed(bounds);
        Ok(mask)
    }

    fn edit_layer<R>(&mut self, id: LayerId, f: impl FnOnce(&mut Layer) -> R) -> DocResult<R> {
        let idx = self.find_layer(id)?;
        let before = self.layers[idx].bounds();
        let out = f(&mut self.layers[idx]);
        let after = self.layers[idx].bounds();
        self.structure_changed(before.union(&after));
        Ok(out)
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> DocResult<()> {
        self.edit_layer(id, |l| l.visible = visible)
    }

    pub fn set_layer_opacity(&mut self, id: LayerId, opacity: f32) -> DocResult<()> {
        self.edit_layer(id, |l| l.opacity = opacity.clamp(0.0, 1.0))
    }

    pub fn set_layer_mode(&mut self, id: LayerId, mode: BlendMode) -> DocResult<()> {
        self.edit_layer(id, |l| l.mode = mode)
    }

    /// Moves a layer; both the old and new extent are invalidated.
    pub fn set_layer_offset(&mut self, id: LayerId, x: i32, y: i32) -> DocResult<()> {
        self.edit_layer(id, |l| {
            l.offset_x = x;
            l.offset_y = y;
        })
    }

    /// Locks the layer alpha against painting. No visual change.
    pub fn set_preserve_transparency(&mut self, id: LayerId, preserve: bool) -> DocResult<()> {
        let idx = self.find_layer(id)?;
        self.layers[idx].preserve_transparency = preserve;
        Ok(())
    }

    pub fn set_mask_apply(&mut self, id: LayerId, apply: bool) -> DocResult<()> {
        self.edit_layer(id, |l| l.apply_mask = apply)
    }

    /// Shows the mask as gray in place of the layer.
    pub fn set_mask_show(&mut self, id: LayerId, show: bool) -> DocResult<()> {
        self.edit_layer(id, |l| l.show_mask = show)
    }

    /// Routes painting to the mask instead of the layer.
    pub fn set_mask_edit(&mut self, id: LayerId, edit: bool) -> DocResult<()> {
        let idx = self.find_layer(id)?;
        self.layers[idx].edit_mask = edit;
        Ok(())
    }

    pub fn set_active_layer(&mut self, id: LayerId) -> DocResult<()> {
        self.find_layer(id)?;
        self.active_layer = Some(id);
        Ok(())
    }

    pub fn set_active_channel(&mut self, id: Option<ChannelId>) -> DocResult<()> {
        if let Some(id) = id {
            self.find_channel(id)?;
        }
        self.active_channel = id;
        Ok(())
    }

    fn edit_channel<R>(&mut self, id: ChannelId, f: impl FnOnce(&mut Channel) -> R) -> DocResult<R> {
        let idx = self.find_channel(id)?;
        let out = f(&mut self.channels[idx]);
        self.structure_changed(self.bounds());
        Ok(out)
    }

    pub fn set_channel_visible(&mut self, id: ChannelId, visible: bool) -> DocResult<()> {
        self.edit_channel(id, |c| c.visible = visible)
    }

    pub fn set_channel_color(&mut self, id: ChannelId, color: [f32; 3], opacity: f32) -> DocResult<()> {
        self.edit_channel(id, |c| {
            c.color = color;
            c.opacity = opacity.clamp(0.0, 1.0);
        })
    }

    pub fn set_channel_show_masked(&mut self, id: ChannelId, show_masked: bool) -> DocResult<()> {
        self.edit_channel(id, |c| c.show_masked = show_masked)
    }

    /// Shows or hides one color component of the projection.
    pub fn set_component_visible(&mut self, component: usize, visible: bool) -> DocResult<()> {
        let slot = self.component_slot(component)?;
        self.component_visible[slot] = visible;
        self.structure_changed(self.bounds());
        Ok(())
    }

    /// Enables or disables painting into one color component.
    pub fn set_component_active(&mut self, component: usize, active: bool) -> DocResult<()> {
        let slot = self.component_slot(component)?;
        self.component_active[slot] = active;
        Ok(())
    }

    fn component_slot(&mut self, component: usize) -> DocResult<usize> {
        let count = self.format.model.color_components();
        if component >= count {
            let err = DocError::InvalidDimensions(format!(
                "component {component} out of range for {} ({count} components)",
                self.format.model
            ));
            return Err(self.report(err));
        }
        Ok(component)
    }

    /// Replaces the colormap used to display indexed layers.
    pub fn set_colormap(&mut self, colormap: Vec<[f32; 3]>) {
        self.colormap = colormap;
        self.invalidate_all();
    }

    /// Edits a layer's pixels in place and invalidates its extent.
    ///
    /// The closure may replace the buffer; old and new extents are both
    /// invalidated. A layer with a mask must keep its size: a resized
    /// buffer is rolled back and the edit rejected.
    pub fn update_layer<R>(&mut self, id: LayerId, f: impl FnOnce(&mut PixelBuffer) -> R) -> DocResult<R> {
        let idx = self.find_layer(id)?;
        let Some(mask_size) = self.layers[idx].mask.as_ref().map(|m| m.buffer.dimensions()) else {
            return self.edit_layer(id, |l| f(&mut l.buffer));
        };
        let previous = self.layers[idx].buffer.clone();
        let out = f(&mut self.layers[idx].buffer);
        let size = self.layers[idx].buffer.dimensions();
        if size != mask_size {
            self.layers[idx].buffer = previous;
            let err = DocError::MaskRejected(format!(
                "{id} is masked at {}x{}, buffer cannot become {}x{}",
                mask_size.0, mask_size.1, size.0, size.1
            ));
            return Err(self.report(err));
        }
        self.structure_changed(self.layers[idx].bounds());
        Ok(out)
    }

    /// Edits a layer mask's pixels in place. The mask must keep its size.
    pub fn update_layer_mask<R>(&mut self, id: LayerId, f: impl FnOnce(&mut PixelBuffer) -> R) -> DocResult<R> {
        let idx = self.find_layer(id)?;
        let Some(mask) = self.layers[idx].mask.as_mut() else {
            return Err(self.report(DocError::MaskRejected("layer has no mask".into())));
        };
        let out = f(&mut mask.buffer);
        let bounds = self.layers[idx].bounds();
        self.structure_changed(bounds);
        Ok(out)
    }

    /// Edits a channel's pixels in place. The channel must keep its size.
    pub fn update_channel<R>(&mut self, id: ChannelId, f: impl FnOnce(&mut PixelBuffer) -> R) -> DocResult<R> {
        self.edit_channel(id, |c| f(&mut c.buffer))
    }

    /// Edits the selection mask in place. The mask must keep its size.
    pub fn update_selection<R>(&mut self, f: impl FnOnce(&mut PixelBuffer) -> R) -> R {
        let out = f(&mut self.selection.buffer);
        self.preview = None;
        out
    }

    /// True if some selection value exceeds the configured threshold.
    pub fn has_selection(&self) -> bool {
        self.selection.has_coverage(self.config.selection_threshold)
    }

    /// Topmost visible layer with non-zero coverage at a document point.
    pub fn pick_correlate_layer(&self, x: i32, y: i32) -> Option<LayerId> {
        self.layers
            .iter()
            .filter(|l| l.is_visible())
            .find(|l| l.coverage_at(x, y) > 0.0)
            .map(Layer::id)
    }

    /// Resizes the canvas, shifting all content by (`offset_x`, `offset_y`).
    ///
    /// Layers are translated; channels and the selection mask are
    /// re-allocated at the new size. The projection follows the new size.
    pub fn resize_canvas(&mut self, width: u32, height: u32, offset_x: i32, offset_y: i32) -> DocResult<()> {
        if width == 0 || height == 0 {
            let err = DocError::InvalidDimensions(format!("cannot resize to {width}x{height}"));
            return Err(self.report(err));
        }
        let resize = |c: &Channel| c.buffer.resized(width, height, offset_x, offset_y);
        let resized: Result<Vec<PixelBuffer>, _> = self.channels.iter().map(resize).collect();
        let buffers = match (resized, resize(&self.selection)) {
            (Ok(channels), Ok(selection)) => (channels, selection),
            (Err(e), _) | (_, Err(e)) => return Err(self.report(e.into())),
        };

        self.undo_group_start(UndoGroup::Resize);
        self.push_undo(UndoRecord::CanvasResized {
            width: self.width,
            height: self.height,
            offset_x,
            offset_y,
        });
        let (channels, selection) = buffers;
        for (channel, buffer) in self.channels.iter_mut().zip(channels) {
            channel.buffer = buffer;
        }
        self.selection.buffer = selection;
        for layer in &mut self.layers {
            layer.offset_x += offset_x;
            layer.offset_y += offset_y;
        }
        self.width = width;
        self.height = height;
        self.undo_group_end();
        debug!(doc = %self.id, width, height, offset_x, offset_y, "canvas resized");

        self.preview = None;
        self.sync_projection()?;
        self.invalidate_all();
        Ok(())
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("layers", &self.layers.len())
            .field("channels", &self.channels.len())
            .field("has_projection", &self.projection.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::undo::{JournalEntry, UndoJournal};
    use strata_core::Precision;

    fn rgba() -> FormatDescriptor {
        FormatDescriptor::rgba(Precision::F32)
    }

    fn doc() -> Document {
        Document::new(20, 20, FormatDescriptor::rgb(Precision::F32)).unwrap()
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(Document::new(0, 5, rgba()).is_err());
    }

    #[test]
    fn test_format_alpha_is_stripped() {
        let d = Document::new(4, 4, rgba()).unwrap();
        assert!(!d.format().has_alpha);
        assert_eq!(d.selection().buffer().dimensions(), (4, 4));
    }

    #[test]
    fn test_ids_are_unique() {
        let mut d = doc();
        let a = d.new_layer("a", rgba(), 2, 2).unwrap();
        let b = d.new_layer("b", rgba(), 2, 2).unwrap();
        let c = d.new_channel("c");
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id().raw(), c.id().raw());
        assert_ne!(doc().id(), d.id());
    }

    #[test]
    fn test_add_layer_above_active_and_duplicate() {
        let mut d = doc();
        let a = d.new_layer("a", rgba(), 2, 2).unwrap();
        let b = d.new_layer("b", rgba(), 2, 2).unwrap();
        let a_id = a.id();
        d.add_layer(a.clone(), None).unwrap();
        d.add_layer(b, Some(1)).unwrap();
        assert_eq!(d.layers()[0].id(), a_id);
        let err = d.add_layer(a, None).unwrap_err();
        assert!(matches!(err, DocError::DuplicateLayer(_)));
        assert_eq!(d.diagnostics().len(), 1);
    }

    #[test]
    fn test_remove_layer_records_position() {
        let journal = UndoJournal::new();
        let mut d = doc().with_undo(journal.clone());
        let a = d.new_layer("a", rgba(), 2, 2).unwrap();
        let id = a.id();
        d.add_layer(a, None).unwrap();
        let removed = d.remove_layer(id).unwrap();
        assert_eq!(removed.id(), id);
        assert!(d.layers().is_empty());
        assert_eq!(d.active_layer(), None);
        let entries = journal.entries();
        assert!(matches!(
            entries[1],
            JournalEntry::Record(UndoRecord::LayerRemoved { position: 0, .. })
        ));
    }

    #[test]
    fn test_raise_requires_alpha() {
        let mut d = doc();
        let top = d.new_layer("top", rgba(), 2, 2).unwrap();
        let bottom = d.new_layer("bottom", FormatDescriptor::rgb(Precision::F32), 2, 2).unwrap();
        let (top_id, bottom_id) = (top.id(), bottom.id());
        d.add_layer(bottom, None).unwrap();
        d.add_layer(top, Some(0)).unwrap();
        assert!(matches!(d.raise_layer(top_id), Err(DocError::CannotRaise(..))));
        assert!(matches!(d.raise_layer(bottom_id), Err(DocError::CannotRaise(..))));
        assert!(matches!(d.lower_layer(bottom_id), Err(DocError::CannotLower(..))));
        assert_eq!(d.layers()[0].id(), top_id);
    }

    #[test]
    fn test_raise_and_lower_swap() {
        let mut d = doc();
        let a = d.new_layer("a", rgba(), 2, 2).unwrap();
        let b = d.new_layer("b", rgba(), 2, 2).unwrap();
        let (a_id, b_id) = (a.id(), b.id());
        d.add_layer(a, Some(0)).unwrap();
        d.add_layer(b, Some(1)).unwrap();
        d.raise_layer(b_id).unwrap();
        assert_eq!(d.layers()[0].id(), b_id);
        d.lower_layer(b_id).unwrap();
        assert_eq!(d.layers()[0].id(), a_id);
    }

    #[test]
    fn test_mask_rejections() {
        let mut d = doc();
        let opaque = d.new_layer("opaque", FormatDescriptor::rgb(Precision::F32), 4, 4).unwrap();
        let alpha = d.new_layer("alpha", rgba(), 4, 4).unwrap();
        let (opaque_id, alpha_id) = (opaque.id(), alpha.id());
        d.add_layer(opaque, None).unwrap();
        d.add_layer(alpha, None).unwrap();

        let mask = d.new_layer_mask(opaque_id, 1.0).unwrap();
        assert!(matches!(d.add_layer_mask(opaque_id, mask), Err(DocError::MaskRejected(_))));

        let wrong = d.new_channel("wrong size");
        assert!(matches!(d.add_layer_mask(alpha_id, wrong), Err(DocError::MaskRejected(_))));

        let mask = d.new_layer_mask(alpha_id, 1.0).unwrap();
        d.add_layer_mask(alpha_id, mask).unwrap();
        let again = d.new_layer_mask(alpha_id, 1.0).unwrap();
        assert!(matches!(d.add_layer_mask(alpha_id, again), Err(DocError::MaskRejected(_))));
    }

    #[test]
    fn test_remove_mask_apply_bakes_alpha() {
        let journal = UndoJournal::new();
        let mut d = doc().with_undo(journal.clone());
        let layer = d.new_layer("l", rgba(), 2, 2).unwrap().filled(&[1.0, 0.0, 0.0, 1.0]).unwrap();
        let id = layer.id();
        d.add_layer(layer, None).unwrap();
        let mask = d.new_layer_mask(id, 0.25).unwrap();
        d.add_layer_mask(id, mask).unwrap();
        journal.clear();

        d.remove_layer_mask(id, MaskApply::Apply).unwrap();
        let layer = d.layer(id).unwrap();
        assert!(layer.mask().is_none());
        assert_eq!(layer.buffer().pixel(1, 1)[3], 0.25);

        let entries = journal.entries();
        assert_eq!(entries.first(), Some(&JournalEntry::GroupStart(UndoGroup::RemoveMask)));
        assert_eq!(entries.last(), Some(&JournalEntry::GroupEnd));
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn test_pick_correlate_layer() {
        let mut d = doc();
        let low = d.new_layer("low", rgba(), 10, 10).unwrap().filled(&[0.0, 0.0, 0.0, 1.0]).unwrap();
        let high = d.new_layer("high", rgba(), 4, 4).unwrap().with_offset(5, 5);
        let high = high.filled(&[1.0, 1.0, 1.0, 1.0]).unwrap();
        let (low_id, high_id) = (low.id(), high.id());
        d.add_layer(low, Some(0)).unwrap();
        d.add_layer(high, Some(0)).unwrap();
        assert_eq!(d.pick_correlate_layer(6, 6), Some(high_id));
        assert_eq!(d.pick_correlate_layer(1, 1), Some(low_id));
        assert_eq!(d.pick_correlate_layer(15, 15), None);
        d.set_layer_visible(high_id, false).unwrap();
        assert_eq!(d.pick_correlate_layer(6, 6), Some(low_id));
    }

    #[test]
    fn test_resize_canvas() {
        let mut d = doc();
        let layer = d.new_layer("l", rgba(), 5, 5).unwrap().with_offset(1, 1);
        let id = layer.id();
        d.add_layer(layer, None).unwrap();
        d.update_selection(|s| s.fill(&[1.0])).unwrap();
        d.resize_canvas(30, 10, 4, -2).unwrap();
        assert_eq!((d.width(), d.height()), (30, 10));
        assert_eq!(d.layer(id).unwrap().offset(), (5, -1));
        assert_eq!(d.selection().buffer().dimensions(), (30, 10));
        assert_eq!(d.selection().buffer().pixel(3, 0), &[0.0]);
        assert_eq!(d.selection().buffer().pixel(4, 0), &[1.0]);
        assert!(d.resize_canvas(0, 10, 0, 0).is_err());
    }

    #[test]
    fn test_component_range() {
        let mut d = Document::new(2, 2, FormatDescriptor::gray(Precision::U8)).unwrap();
        assert!(d.set_component_visible(0, false).is_ok());
        assert!(d.set_component_visible(1, false).is_err());
        assert!(!d.component_visible(0));
    }
}
