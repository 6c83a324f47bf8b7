//! The projection: the flattened view of a document, rebuilt on demand.
//!
//! A document that is *flat* (one opaque, unmasked, full-size layer and
//! nothing drawn over it) has no projection buffer; requests are answered
//! with the layer's own buffer. Otherwise a [`ProjectionCache`] holds the
//! composite plus a list of invalid rectangles. Reading a region rebuilds
//! every pending rectangle that touches it, each exactly once.
//!
//! # Example
//!
//! ```rust
//! use strata_core::{FormatDescriptor, Precision, Rect};
//! use strata_doc::{DamageLog, Document};
//!
//! let damage = DamageLog::new();
//! let mut doc = Document::new(32, 32, FormatDescriptor::rgb(Precision::F32))?
//!     .with_display(damage.clone());
//! let layer = doc.new_layer("paint", FormatDescriptor::rgba(Precision::F32), 8, 8)?;
//! doc.add_layer(layer, None)?;
//!
//! doc.projection(Rect::new(0, 0, 32, 32))?;
//! let before = doc.rebuild_count();
//! doc.invalidate(Rect::new(4, 4, 8, 8));
//! doc.projection(Rect::new(5, 5, 1, 1))?;
//! assert_eq!(doc.rebuild_count(), before + 1);
//! assert_eq!(damage.regions().last(), Some(&Rect::new(4, 4, 8, 8)));
//! # Ok::<(), strata_doc::DocError>(())
//! ```

use strata_core::{PixelBuffer, Rect};
use strata_ops::operation_for;
use tracing::{debug, trace};

use crate::compositor::{ChannelOverlayCompositor, LayerCompositor};
use crate::document::Document;
use crate::error::{DocError, DocResult};

/// Composite buffer plus its pending invalid regions.
#[derive(Debug, Clone)]
pub struct ProjectionCache {
    buffer: PixelBuffer,
    invalid: Vec<Rect>,
    rebuilds: u64,
}

impl ProjectionCache {
    fn allocate(doc: &Document) -> DocResult<Self> {
        let format = doc.format.projection_format();
        let buffer = PixelBuffer::try_new(format, doc.width, doc.height)?;
        Ok(Self {
            invalid: vec![buffer.bounds()],
            buffer,
            rebuilds: 0,
        })
    }

    #[inline]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Pending rectangles, in the order they were marked.
    #[inline]
    pub fn invalid_regions(&self) -> &[Rect] {
        &self.invalid
    }

    /// Completed rebuild passes since allocation.
    #[inline]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Marks `area` for rebuild. Areas already covered are not re-added.
    pub fn invalidate(&mut self, area: Rect) {
        let Some(area) = area.intersect(&self.buffer.bounds()) else {
            return;
        };
        if self.invalid.iter().any(|r| r.contains_rect(&area)) {
            return;
        }
        self.invalid.retain(|r| !area.contains_rect(r));
        self.invalid.push(area);
    }

    fn take_touching(&mut self, area: Rect) -> Vec<Rect> {
        let (touching, rest): (Vec<Rect>, Vec<Rect>) = self.invalid.drain(..).partition(|r| r.overlaps(&area));
        self.invalid = rest;
        touching
    }
}

impl Document {
    /// True if the single-layer short-circuit applies.
    ///
    /// Requires exactly one layer at full opacity, without mask or alpha,
    /// covering the document exactly, no document channels and every
    /// color component visible.
    pub fn is_flat(&self) -> bool {
        let [layer] = self.layers.as_slice() else {
            return false;
        };
        let components = self.format.model.color_components();
        layer.opacity >= 1.0
            && layer.mask.is_none()
            && !layer.has_alpha()
            && layer.bounds() == self.bounds()
            && self.channels.is_empty()
            && self.component_visible[..components].iter().all(|v| *v)
    }

    /// Frees or allocates the projection to match the flatness state.
    pub(crate) fn sync_projection(&mut self) -> DocResult<()> {
        if self.is_flat() {
            if self.projection.take().is_some() {
                debug!(doc = %self.id, "projection released, document is flat");
            }
            return Ok(());
        }
        let matches = self.projection.as_ref().is_some_and(|p| {
            p.buffer.dimensions() == (self.width, self.height) && p.buffer.format() == self.format.projection_format()
        });
        if matches {
            return Ok(());
        }
        self.projection = None;
        match ProjectionCache::allocate(self) {
            Ok(cache) => {
                debug!(doc = %self.id, format = %cache.buffer.format(), "projection allocated");
                self.projection = Some(cache);
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    /// True while a projection buffer is allocated.
    #[inline]
    pub fn has_projection(&self) -> bool {
        self.projection.is_some()
    }

    /// The projection cache, if allocated.
    #[inline]
    pub fn projection_cache(&self) -> Option<&ProjectionCache> {
        self.projection.as_ref()
    }

    /// Rebuild passes run by the current projection; zero when flat.
    pub fn rebuild_count(&self) -> u64 {
        self.projection.as_ref().map_or(0, ProjectionCache::rebuild_count)
    }

    /// Opacity the display applies when drawing the projection.
    pub fn projection_opacity(&self) -> f32 {
        1.0
    }

    /// Marks `area` (document coordinates) as stale.
    pub fn invalidate(&mut self, area: Rect) {
        self.preview = None;
        if let Some(cache) = self.projection.as_mut() {
            trace!(doc = %self.id, %area, "invalidate");
            cache.invalidate(area);
        }
    }

    pub(crate) fn invalidate_all(&mut self) {
        self.invalidate(self.bounds());
    }

    /// Returns a buffer whose content inside `area` is current.
    ///
    /// When the document is flat this is the layer's own buffer.
    /// Otherwise every pending rectangle touching `area` is rebuilt first.
    pub fn projection(&mut self, area: Rect) -> DocResult<&PixelBuffer> {
        if self.is_flat() {
            self.projection = None;
            return Ok(&self.layers[0].buffer);
        }
        if self.projection.is_none() {
            self.sync_projection()?;
        }
        let pending = match self.projection.as_mut() {
            Some(cache) => cache.take_touching(area),
            None => Vec::new(),
        };
        for rect in pending {
            self.rebuild(rect);
        }
        match self.projection.as_ref() {
            Some(cache) => Ok(&cache.buffer),
            None => Err(DocError::InvalidDimensions("projection unavailable".into())),
        }
    }

    /// Recomposites `rect` from scratch.
    fn rebuild(&mut self, rect: Rect) {
        let Self {
            id,
            format,
            layers,
            channels,
            colormap,
            component_visible,
            projection,
            display,
            ..
        } = self;
        let Some(cache) = projection.as_mut() else {
            return;
        };
        let mut failures = Vec::new();
        let compositor = LayerCompositor::new(*format, colormap.as_slice());
        let contributors: Vec<_> = layers
            .iter()
            .rev()
            .filter(|l| l.visible && !l.floating && l.bounds().overlaps(&rect))
            .collect();

        let covered = contributors.first().is_some_and(|l| {
            !l.has_alpha()
                && l.opacity >= 1.0
                && l.active_mask().is_none()
                && !l.show_mask
                && l.bounds().contains_rect(&rect)
                && operation_for(*format, l.format()).is_ok()
        });
        if !covered {
            seed_transparent(&mut cache.buffer, rect);
        }

        let mut written = false;
        for layer in contributors {
            match compositor.composite(&mut cache.buffer, rect, layer, !written) {
                Ok(wrote) => written |= wrote,
                Err(e) => failures.push(e),
            }
        }
        if covered && !written {
            seed_transparent(&mut cache.buffer, rect);
        }

        hide_components(&mut cache.buffer, rect, &component_visible[..]);

        for channel in channels.iter().rev().filter(|c| c.visible) {
            match ChannelOverlayCompositor.composite(&mut cache.buffer, rect, channel, !written) {
                Ok(wrote) => written |= wrote,
                Err(e) => failures.push(e),
            }
        }

        cache.rebuilds += 1;
        debug!(doc = %id, %rect, rebuild = cache.rebuilds, "projection rebuilt");
        display.region_updated(*id, rect);
        for e in failures {
            self.report(e);
        }
    }
}

fn seed_transparent(buffer: &mut PixelBuffer, rect: Rect) {
    let zero = vec![0.0; buffer.channels()];
    // rect is always clipped to the projection
    let _ = buffer.fill_rect(rect, &zero);
}

fn hide_components(buffer: &mut PixelBuffer, rect: Rect, visible: &[bool]) {
    let format = buffer.format();
    let hidden: Vec<usize> = (0..format.model.color_components()).filter(|i| !visible[*i]).collect();
    if hidden.is_empty() {
        return;
    }
    let c = format.channels();
    let Ok(mut view) = buffer.view_mut(rect) else {
        return;
    };
    for (_, row) in view.rows_mut() {
        for px in row.chunks_exact_mut(c) {
            for i in &hidden {
                px[*i] = 0.0;
            }
        }
    }
}
