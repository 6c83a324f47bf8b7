//! Compositing external pixels onto document drawables.
//!
//! [`Document::apply_buffer`] is the single entry point painting and
//! pasting go through: the source is checked with
//! [`operation_for`](strata_ops::operation_for), clipped by the selection
//! mask when one exists, restricted to the drawable's active samples, and
//! blended with [`combine_areas`].

use strata_core::{FormatDescriptor, PixelBuffer, Rect};
use strata_ops::area::combine_areas;
use strata_ops::{operation_for, ActiveChannels, AreaSource, BlendMode, CombineParams};
use tracing::trace;

use crate::channel::ChannelId;
use crate::document::Document;
use crate::error::{DocError, DocResult};
use crate::layer::LayerId;
use crate::undo::UndoRecord;

/// Something pixels can be drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Drawable {
    Layer(LayerId),
    LayerMask(LayerId),
    Channel(ChannelId),
    Selection,
}

impl Document {
    /// The drawable a paint tool should target for a layer: its mask while
    /// mask editing is on, otherwise the layer itself.
    pub fn paint_target(&self, layer: LayerId) -> Drawable {
        match self.layer(layer) {
            Some(l) if l.edit_mask && l.mask.is_some() => Drawable::LayerMask(layer),
            _ => Drawable::Layer(layer),
        }
    }

    /// Writable samples of `drawable`.
    ///
    /// Layer color samples follow the document's active components; the
    /// alpha sample is locked for preserve-transparency layers. Masks,
    /// channels and the selection have a single writable sample.
    pub fn active_channels_for(&mut self, drawable: Drawable) -> DocResult<ActiveChannels> {
        let Drawable::Layer(id) = drawable else {
            self.locate(drawable)?;
            return Ok(ActiveChannels::from_array([true, false, false, false]));
        };
        let idx = self.find_layer(id)?;
        let layer = &self.layers[idx];
        let format = layer.format();
        let mut affect = ActiveChannels::from_array([false; 4]);
        for i in 0..format.model.color_components() {
            affect.set(i, self.component_active[i]);
        }
        if let Some(a) = format.alpha_index() {
            affect.set(a, !layer.preserve_transparency);
        }
        Ok(affect)
    }

    /// Document extent, format and container index of a drawable.
    fn locate(&mut self, drawable: Drawable) -> DocResult<(Rect, FormatDescriptor, usize)> {
        match drawable {
            Drawable::Layer(id) => {
                let idx = self.find_layer(id)?;
                let layer = &self.layers[idx];
                Ok((layer.bounds(), layer.format(), idx))
            }
            Drawable::LayerMask(id) => {
                let idx = self.find_layer(id)?;
                let layer = &self.layers[idx];
                if let Some(mask) = &layer.mask {
                    return Ok((layer.bounds(), mask.buffer.format(), idx));
                }
                Err(self.report(DocError::MaskRejected(format!("{id} has no mask"))))
            }
            Drawable::Channel(id) => {
                let idx = self.find_channel(id)?;
                Ok((self.bounds(), self.channels[idx].buffer.format(), idx))
            }
            Drawable::Selection => Ok((self.bounds(), self.selection.buffer.format(), 0)),
        }
    }

    /// Blends `src`, placed at document position (`x`, `y`), onto `target`.
    pub fn apply_buffer(
        &mut self,
        target: Drawable,
        src: &PixelBuffer,
        x: i32,
        y: i32,
        opacity: f32,
        mode: BlendMode,
    ) -> DocResult<()> {
        let (bounds, format, idx) = self.locate(target)?;
        let op = operation_for(format, src.format()).map_err(|e| self.report(e.into()))?;
        let affect = self.active_channels_for(target)?;
        let clip = target != Drawable::Selection && self.has_selection();

        let mut area = Rect::new(x, y, src.width(), src.height()).intersect(&bounds);
        if clip {
            area = area.and_then(|a| a.intersect(&self.bounds()));
        }
        let Some(area) = area else {
            return Ok(());
        };
        let dest_rect = area.translate(-bounds.x, -bounds.y);
        trace!(doc = %self.id, ?target, %area, %op, clip, "apply buffer");

        let previous = match target {
            Drawable::Layer(id) => match self.layers[idx].buffer.crop(dest_rect) {
                Ok(pixels) => Some(UndoRecord::LayerPixels {
                    layer: id,
                    area: dest_rect,
                    pixels,
                }),
                Err(e) => return Err(self.report(e.into())),
            },
            _ => None,
        };

        let source = AreaSource::new(src, (area.x - x) as u32, (area.y - y) as u32);
        let base = CombineParams::new(opacity, mode).with_affect(affect);
        let result = match target {
            Drawable::Selection => {
                let params = base.with_colormap(&self.colormap);
                combine_areas(op, &mut self.selection.buffer, dest_rect, source, &params).map_err(DocError::from)
            }
            _ => {
                let mask = clip.then(|| AreaSource::new(&self.selection.buffer, area.x as u32, area.y as u32));
                let params = base.with_mask(mask).with_colormap(&self.colormap);
                let dest = match target {
                    Drawable::Layer(_) => Some(&mut self.layers[idx].buffer),
                    Drawable::LayerMask(_) => self.layers[idx].mask.as_mut().map(|m| &mut m.buffer),
                    Drawable::Channel(_) => Some(&mut self.channels[idx].buffer),
                    Drawable::Selection => None,
                };
                match dest {
                    Some(dest) => combine_areas(op, dest, dest_rect, source, &params).map_err(DocError::from),
                    None => Err(DocError::MaskRejected("drawable has no pixels".into())),
                }
            }
        };
        result.map_err(|e| self.report(e))?;
        if let Some(record) = previous {
            self.push_undo(record);
        }

        match target {
            Drawable::Selection => self.preview = None,
            _ => self.invalidate(area),
        }
        Ok(())
    }
}
