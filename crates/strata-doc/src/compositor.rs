//! Per-contributor compositing into a destination buffer.
//!
//! [`LayerCompositor`] draws one layer; [`ChannelOverlayCompositor`] draws
//! one tinted channel. Both follow the same initialize/combine split: the
//! first contributor of a rebuild establishes content without reading the
//! destination, later ones alpha-blend over it. Callers thread the
//! `first_write` flag explicitly through one pass.

use strata_core::{FormatDescriptor, PixelBuffer, Rect};
use strata_ops::area::{
    combine_areas, combine_channel, copy_gray_to_area, initial_area, initial_channel,
};
use strata_ops::{operation_for, AreaSource, BlendMode, CombineParams};
use tracing::trace;

use crate::channel::Channel;
use crate::error::DocResult;
use crate::layer::Layer;

/// Draws layers into a buffer whose pixel (0, 0) sits at `origin` in
/// document space.
#[derive(Debug, Clone, Copy)]
pub struct LayerCompositor<'a> {
    format: FormatDescriptor,
    origin: (i32, i32),
    colormap: &'a [[f32; 3]],
}

impl<'a> LayerCompositor<'a> {
    /// `format` is what each layer's format is checked against.
    pub fn new(format: FormatDescriptor, colormap: &'a [[f32; 3]]) -> Self {
        Self {
            format,
            origin: (0, 0),
            colormap,
        }
    }

    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    /// Projects `layer` into `area` (document coordinates).
    ///
    /// Returns `Ok(false)` if the layer does not touch `area`. An
    /// incompatible layer is an error and leaves `dest` untouched.
    pub fn composite(&self, dest: &mut PixelBuffer, area: Rect, layer: &Layer, first_write: bool) -> DocResult<bool> {
        self.draw(dest, area, layer, first_write, layer.mode, true)
    }

    /// Blends `layer` over existing content with `mode` in place of the
    /// layer's own mode. Mask display is ignored; an enabled mask still
    /// clips.
    pub fn combine_as(&self, dest: &mut PixelBuffer, area: Rect, layer: &Layer, mode: BlendMode) -> DocResult<bool> {
        self.draw(dest, area, layer, false, mode, false)
    }

    fn draw(
        &self,
        dest: &mut PixelBuffer,
        area: Rect,
        layer: &Layer,
        first_write: bool,
        mode: BlendMode,
        allow_mask_display: bool,
    ) -> DocResult<bool> {
        let op = operation_for(self.format, layer.format())?;
        let Some(region) = area.intersect(&layer.bounds()) else {
            return Ok(false);
        };
        let (ox, oy) = self.origin;
        let dest_rect = region.translate(-ox, -oy);
        let sx = (region.x - layer.offset_x) as u32;
        let sy = (region.y - layer.offset_y) as u32;

        if allow_mask_display && layer.show_mask {
            if let Some(mask) = &layer.mask {
                trace!(layer = %layer.id(), %region, "mask display");
                copy_gray_to_area(dest, dest_rect, AreaSource::new(&mask.buffer, sx, sy))?;
                return Ok(true);
            }
        }

        let mask = layer.active_mask().map(|m| AreaSource::new(&m.buffer, sx, sy));
        let params = CombineParams::new(layer.opacity, mode)
            .with_mask(mask)
            .with_colormap(self.colormap);
        let src = AreaSource::new(&layer.buffer, sx, sy);
        trace!(layer = %layer.id(), %op, %region, first_write, "composite layer");
        if first_write {
            initial_area(op, dest, dest_rect, src, &params)?;
        } else {
            combine_areas(op, dest, dest_rect, src, &params)?;
        }
        Ok(true)
    }
}

/// Draws document channels over a projection.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelOverlayCompositor;

impl ChannelOverlayCompositor {
    /// Tints `channel` into `area` of a document-aligned `dest`.
    ///
    /// Uses the selection variant, or the mask-display variant when the
    /// channel is shown as a mask.
    pub fn composite(&self, dest: &mut PixelBuffer, area: Rect, channel: &Channel, first_write: bool) -> DocResult<bool> {
        let Some(region) = area.intersect(&channel.buffer.bounds()) else {
            return Ok(false);
        };
        let src = AreaSource::new(&channel.buffer, region.x as u32, region.y as u32);
        let style = channel.overlay_style();
        trace!(channel = %channel.id(), %region, ?style, first_write, "composite channel");
        if first_write {
            initial_channel(dest, region, src, style, channel.color, channel.opacity)?;
        } else {
            combine_channel(dest, region, src, style, channel.color, channel.opacity)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelId;
    use crate::document::Document;
    use crate::error::DocError;
    use strata_core::Precision;

    fn rgba() -> FormatDescriptor {
        FormatDescriptor::rgba(Precision::F32)
    }

    #[test]
    fn test_composite_respects_offset_and_origin() {
        let mut doc = Document::new(10, 10, FormatDescriptor::rgb(Precision::F32)).unwrap();
        let layer = doc.new_layer("l", rgba(), 2, 2).unwrap().with_offset(4, 4);
        let layer = layer.filled(&[1.0, 0.0, 0.0, 1.0]).unwrap();
        let mut dest = PixelBuffer::new(rgba(), 4, 4);
        let comp = LayerCompositor::new(doc.format(), &[]).with_origin(3, 3);
        let wrote = comp.composite(&mut dest, Rect::new(3, 3, 4, 4), &layer, true).unwrap();
        assert!(wrote);
        assert_eq!(dest.pixel(1, 1), &[1.0, 0.0, 0.0, 1.0]);
        assert_eq!(dest.pixel(0, 0), &[0.0; 4]);
        assert_eq!(dest.pixel(3, 3), &[0.0; 4]);
    }

    #[test]
    fn test_composite_outside_area() {
        let mut doc = Document::new(10, 10, FormatDescriptor::rgb(Precision::F32)).unwrap();
        let layer = doc.new_layer("l", rgba(), 2, 2).unwrap().with_offset(8, 8);
        let mut dest = PixelBuffer::new(rgba(), 10, 10);
        let comp = LayerCompositor::new(doc.format(), &[]);
        assert!(!comp.composite(&mut dest, Rect::new(0, 0, 4, 4), &layer, true).unwrap());
    }

    #[test]
    fn test_incompatible_leaves_dest() {
        let mut doc = Document::new(4, 4, FormatDescriptor::rgb(Precision::U8)).unwrap();
        let layer = doc.new_layer("l", FormatDescriptor::rgba(Precision::U16), 4, 4).unwrap();
        let layer = layer.filled(&[1.0; 4]).unwrap();
        let mut dest = PixelBuffer::new(FormatDescriptor::rgba(Precision::U8), 4, 4);
        let comp = LayerCompositor::new(doc.format(), &[]);
        let err = comp.composite(&mut dest, Rect::new(0, 0, 4, 4), &layer, true).unwrap_err();
        assert!(matches!(err, DocError::Incompatible(_)));
        assert!(dest.data().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_show_mask_replaces_layer() {
        let mut doc = Document::new(2, 2, FormatDescriptor::rgb(Precision::F32)).unwrap();
        let mut layer = doc.new_layer("l", rgba(), 2, 2).unwrap().filled(&[1.0, 0.0, 0.0, 1.0]).unwrap();
        let mask = Channel::new(ChannelId(99), "m", 2, 2, Precision::F32).filled(0.25);
        layer.mask = Some(mask);
        layer.show_mask = true;
        let mut dest = PixelBuffer::new(rgba(), 2, 2);
        let comp = LayerCompositor::new(doc.format(), &[]);
        comp.composite(&mut dest, Rect::new(0, 0, 2, 2), &layer, true).unwrap();
        assert_eq!(dest.pixel(0, 1), &[0.25, 0.25, 0.25, 1.0]);

        let mut dest = PixelBuffer::new(rgba(), 2, 2);
        comp.combine_as(&mut dest, Rect::new(0, 0, 2, 2), &layer, BlendMode::Normal).unwrap();
        assert_eq!(dest.pixel(0, 1), &[1.0, 0.0, 0.0, 0.25]);
    }

    #[test]
    fn test_disabled_mask_does_not_clip() {
        let mut doc = Document::new(1, 1, FormatDescriptor::rgb(Precision::F32)).unwrap();
        let mut layer = doc.new_layer("l", rgba(), 1, 1).unwrap().filled(&[0.0, 1.0, 0.0, 1.0]).unwrap();
        layer.mask = Some(Channel::new(ChannelId(7), "m", 1, 1, Precision::F32));
        layer.apply_mask = false;
        let mut dest = PixelBuffer::new(rgba(), 1, 1);
        let comp = LayerCompositor::new(doc.format(), &[]);
        comp.composite(&mut dest, Rect::new(0, 0, 1, 1), &layer, true).unwrap();
        assert_eq!(dest.pixel(0, 0)[3], 1.0);
    }

    #[test]
    fn test_channel_overlay_initial_and_combine() {
        let channel = Channel::new(ChannelId(1), "c", 2, 2, Precision::F32)
            .filled(1.0)
            .with_color([0.0, 0.0, 1.0], 0.5);
        let mut dest = PixelBuffer::new(rgba(), 2, 2);
        let area = Rect::new(0, 0, 2, 2);
        ChannelOverlayCompositor.composite(&mut dest, area, &channel, true).unwrap();
        assert_eq!(dest.pixel(0, 0), &[0.0, 0.0, 1.0, 0.5]);

        let mut dest = PixelBuffer::filled(rgba(), 2, 2, &[1.0, 0.0, 0.0, 1.0]).unwrap();
        ChannelOverlayCompositor.composite(&mut dest, area, &channel, false).unwrap();
        assert_eq!(dest.pixel(1, 1), &[0.5, 0.0, 0.5, 1.0]);
    }
}
