//! Display and color-management boundaries.
//!
//! - [`DisplaySink`] - told once per completed projection rebuild which
//!   region of which document to redraw
//! - [`ColorTransform`] - applied to composite previews after compositing

use std::cell::RefCell;
use std::rc::Rc;

use strata_core::{PixelBuffer, Rect};

use crate::document::DocumentId;

/// Redraw notifications.
pub trait DisplaySink {
    fn region_updated(&mut self, doc: DocumentId, area: Rect);
}

/// Ignores notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl DisplaySink for NullDisplay {
    fn region_updated(&mut self, _doc: DocumentId, _area: Rect) {}
}

/// Shared-handle sink recording every notified region.
#[derive(Debug, Clone, Default)]
pub struct DamageLog {
    regions: Rc<RefCell<Vec<(DocumentId, Rect)>>>,
}

impl DamageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> Vec<Rect> {
        self.regions.borrow().iter().map(|(_, r)| *r).collect()
    }

    pub fn len(&self) -> usize {
        self.regions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.regions.borrow_mut().clear();
    }
}

impl DisplaySink for DamageLog {
    fn region_updated(&mut self, doc: DocumentId, area: Rect) {
        self.regions.borrow_mut().push((doc, area));
    }
}

/// External color transform for previews.
///
/// The result must keep the input's dimensions and format.
pub trait ColorTransform {
    fn transform(&self, src: &PixelBuffer) -> PixelBuffer;
}

impl<F> ColorTransform for F
where
    F: Fn(&PixelBuffer) -> PixelBuffer,
{
    fn transform(&self, src: &PixelBuffer) -> PixelBuffer {
        self(src)
    }
}
