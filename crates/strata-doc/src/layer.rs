//! Layers: positioned, blended pixel contributors.

use std::fmt;

use strata_core::{FormatDescriptor, PixelBuffer, Rect};
use strata_ops::BlendMode;

use crate::channel::Channel;

/// Identifier of a layer, unique within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u32);

impl LayerId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// A layer of a [`Document`](crate::Document).
///
/// Layers are created through [`Document::new_layer`](crate::Document::new_layer)
/// and configured with the `with_*` builders before insertion. Once owned by
/// a document, every change goes through document methods so the projection
/// is invalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    id: LayerId,
    pub name: String,
    pub(crate) buffer: PixelBuffer,
    pub(crate) offset_x: i32,
    pub(crate) offset_y: i32,
    pub(crate) opacity: f32,
    pub(crate) mode: BlendMode,
    pub(crate) visible: bool,
    pub(crate) mask: Option<Channel>,
    pub(crate) apply_mask: bool,
    pub(crate) show_mask: bool,
    pub(crate) edit_mask: bool,
    pub(crate) preserve_transparency: bool,
    pub(crate) floating: bool,
}

impl Layer {
    pub(crate) fn new(id: LayerId, name: impl Into<String>, buffer: PixelBuffer) -> Self {
        Self {
            id,
            name: name.into(),
            buffer,
            offset_x: 0,
            offset_y: 0,
            opacity: 1.0,
            mode: BlendMode::Normal,
            visible: true,
            mask: None,
            apply_mask: true,
            show_mask: false,
            edit_mask: false,
            preserve_transparency: false,
            floating: false,
        }
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_mode(mut self, mode: BlendMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_preserve_transparency(mut self, preserve: bool) -> Self {
        self.preserve_transparency = preserve;
        self
    }

    pub fn with_floating(mut self, floating: bool) -> Self {
        self.floating = floating;
        self
    }

    /// Fills the whole layer with `pixel`, builder style.
    pub fn filled(mut self, pixel: &[f32]) -> strata_core::Result<Self> {
        self.buffer.fill(pixel)?;
        Ok(self)
    }

    #[inline]
    pub fn id(&self) -> LayerId {
        self.id
    }

    #[inline]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Direct pixel access for layers not yet owned by a document.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    #[inline]
    pub fn format(&self) -> FormatDescriptor {
        self.buffer.format()
    }

    #[inline]
    pub fn has_alpha(&self) -> bool {
        self.buffer.format().has_alpha
    }

    #[inline]
    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Extent in document coordinates.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::new(self.offset_x, self.offset_y, self.buffer.width(), self.buffer.height())
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    #[inline]
    pub fn mode(&self) -> BlendMode {
        self.mode
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn is_floating(&self) -> bool {
        self.floating
    }

    #[inline]
    pub fn mask(&self) -> Option<&Channel> {
        self.mask.as_ref()
    }

    #[inline]
    pub fn apply_mask(&self) -> bool {
        self.apply_mask
    }

    #[inline]
    pub fn show_mask(&self) -> bool {
        self.show_mask
    }

    #[inline]
    pub fn edit_mask(&self) -> bool {
        self.edit_mask
    }

    #[inline]
    pub fn preserve_transparency(&self) -> bool {
        self.preserve_transparency
    }

    /// The mask, if attached and enabled.
    #[inline]
    pub fn active_mask(&self) -> Option<&Channel> {
        self.mask.as_ref().filter(|_| self.apply_mask)
    }

    /// Converts a document point to layer coordinates, `None` outside.
    pub fn to_local(&self, x: i32, y: i32) -> Option<(u32, u32)> {
        self.bounds()
            .contains(x, y)
            .then(|| ((x - self.offset_x) as u32, (y - self.offset_y) as u32))
    }

    /// Effective opacity at a document point (alpha × enabled mask),
    /// ignoring layer opacity. Zero outside the layer.
    pub fn coverage_at(&self, x: i32, y: i32) -> f32 {
        let Some((lx, ly)) = self.to_local(x, y) else {
            return 0.0;
        };
        let px = self.buffer.pixel(lx, ly);
        let alpha = self.format().alpha_index().map_or(1.0, |a| px[a]);
        let mask = self
            .active_mask()
            .map_or(1.0, |m| m.buffer.get_pixel(lx as i32, ly as i32).map_or(0.0, |p| p[0]));
        alpha * mask
    }
}
