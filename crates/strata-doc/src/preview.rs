//! Down-scaled composite previews (thumbnails).
//!
//! Each visible layer and its enabled mask are scaled with nearest
//! sampling and composited bottom to top into a preview-sized buffer. An
//! optional [`ColorTransform`] runs on the finished composite.

use strata_core::{PixelBuffer, Rect};
use strata_ops::resample::scale_nearest;
use tracing::debug;

use crate::compositor::LayerCompositor;
use crate::display::ColorTransform;
use crate::document::Document;
use crate::error::{DocError, DocResult};

#[derive(Debug, Clone)]
pub(crate) struct PreviewCache {
    width: u32,
    height: u32,
    buffer: PixelBuffer,
}

fn scale_coord(v: i32, num: u32, den: u32) -> i32 {
    ((v as i64 * num as i64).div_euclid(den as i64)) as i32
}

fn scale_len(v: u32, num: u32, den: u32) -> u32 {
    ((v as u64 * num as u64 + den as u64 / 2) / den as u64).max(1) as u32
}

impl Document {
    /// Composites a `width` × `height` preview, uncached.
    pub fn construct_composite_preview(
        &mut self,
        width: u32,
        height: u32,
        transform: Option<&dyn ColorTransform>,
    ) -> DocResult<PixelBuffer> {
        if width == 0 || height == 0 {
            let err = DocError::InvalidDimensions(format!("preview must not be empty, got {width}x{height}"));
            return Err(self.report(err));
        }
        let mut out = PixelBuffer::try_new(self.format.projection_format(), width, height)
            .map_err(|e| self.report(e.into()))?;
        let (dw, dh) = (self.width, self.height);
        let compositor = LayerCompositor::new(self.format, &self.colormap);
        let area = Rect::from_size(width, height);

        let mut failures = Vec::new();
        let mut written = false;
        for layer in self.layers.iter().rev().filter(|l| l.visible && !l.floating) {
            let sw = scale_len(layer.width(), width, dw);
            let sh = scale_len(layer.height(), height, dh);
            let mut small = layer.clone();
            small.offset_x = scale_coord(layer.offset_x, width, dw);
            small.offset_y = scale_coord(layer.offset_y, height, dh);
            let scaled = scale_nearest(&layer.buffer, sw, sh).map_err(DocError::from);
            let scaled_mask = match small.mask.as_mut() {
                Some(mask) => scale_nearest(&mask.buffer, sw, sh).map(|b| mask.buffer = b).map_err(DocError::from),
                None => Ok(()),
            };
            let drawn = scaled.and_then(|b| {
                scaled_mask?;
                small.buffer = b;
                compositor.composite(&mut out, area, &small, !written)
            });
            match drawn {
                Ok(wrote) => written |= wrote,
                Err(e) => failures.push(e),
            }
        }
        for e in failures {
            self.report(e);
        }

        if let Some(transform) = transform {
            let transformed = transform.transform(&out);
            if transformed.dimensions() != out.dimensions() {
                let (tw, th) = transformed.dimensions();
                let err = DocError::InvalidDimensions(format!(
                    "color transform returned {tw}x{th} for a {width}x{height} preview"
                ));
                return Err(self.report(err));
            }
            out = transformed;
        }
        debug!(doc = %self.id, width, height, "composite preview built");
        Ok(out)
    }

    /// Cached preview; rebuilt after any invalidation or size change.
    pub fn composite_preview(&mut self, width: u32, height: u32) -> DocResult<&PixelBuffer> {
        let fresh = self
            .preview
            .as_ref()
            .is_some_and(|p| p.width == width && p.height == height);
        if !fresh {
            let buffer = self.construct_composite_preview(width, height, None)?;
            self.preview = Some(PreviewCache { width, height, buffer });
        }
        match self.preview.as_ref() {
            Some(p) => Ok(&p.buffer),
            None => Err(DocError::InvalidDimensions("preview unavailable".into())),
        }
    }
}
