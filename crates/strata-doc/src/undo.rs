//! Undo-log boundary.
//!
//! The document does not own undo bookkeeping; it reports every structural
//! mutation to an [`UndoSink`] before performing it, bracketing multi-step
//! mutations in a group. [`UndoJournal`] is a recording sink whose handle
//! can be cloned and inspected after handing a copy to the document.

use std::cell::RefCell;
use std::rc::Rc;

use strata_core::{PixelBuffer, Rect};

use crate::channel::{Channel, ChannelId};
use crate::document::DocumentId;
use crate::layer::{Layer, LayerId};

/// Kind of a multi-step mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UndoGroup {
    Merge,
    Flatten,
    RemoveMask,
    Resize,
}

/// State needed to reverse one mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoRecord {
    /// Layer inserted at `position` (0 = top).
    LayerAdded { layer: LayerId, position: usize },
    /// Layer taken out of the stack from `position`.
    LayerRemoved { layer: Box<Layer>, position: usize },
    LayerMoved { layer: LayerId, from: usize, to: usize },
    ChannelAdded { channel: ChannelId, position: usize },
    ChannelRemoved { channel: Box<Channel>, position: usize },
    ChannelMoved { channel: ChannelId, from: usize, to: usize },
    MaskAdded { layer: LayerId },
    MaskRemoved { layer: LayerId, mask: Box<Channel> },
    /// Pixels of `layer` in `area` (layer coordinates) before an edit.
    LayerPixels { layer: LayerId, area: Rect, pixels: PixelBuffer },
    /// Canvas size before a resize and the offset applied to the content.
    CanvasResized { width: u32, height: u32, offset_x: i32, offset_y: i32 },
}

/// Receiver of undo records.
pub trait UndoSink {
    fn group_start(&mut self, doc: DocumentId, group: UndoGroup);
    fn group_end(&mut self, doc: DocumentId);
    fn push(&mut self, doc: DocumentId, record: UndoRecord);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoUndo;

impl UndoSink for NoUndo {
    fn group_start(&mut self, _doc: DocumentId, _group: UndoGroup) {}
    fn group_end(&mut self, _doc: DocumentId) {}
    fn push(&mut self, _doc: DocumentId, _record: UndoRecord) {}
}

/// One entry of an [`UndoJournal`].
#[derive(Debug, Clone, PartialEq)]
pub enum JournalEntry {
    GroupStart(UndoGroup),
    GroupEnd,
    Record(UndoRecord),
}

/// Shared-handle recording sink.
#[derive(Debug, Clone, Default)]
pub struct UndoJournal {
    entries: Rc<RefCell<Vec<JournalEntry>>>,
}

impl UndoJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl UndoSink for UndoJournal {
    fn group_start(&mut self, _doc: DocumentId, group: UndoGroup) {
        self.entries.borrow_mut().push(JournalEntry::GroupStart(group));
    }

    fn group_end(&mut self, _doc: DocumentId) {
        self.entries.borrow_mut().push(JournalEntry::GroupEnd);
    }

    fn push(&mut self, _doc: DocumentId, record: UndoRecord) {
        self.entries.borrow_mut().push(JournalEntry::Record(record));
    }
}
