//! Stack editing and painting through the public document API.

use approx::assert_abs_diff_eq;
use strata_core::{FormatDescriptor, PixelBuffer, Precision, Rect};
use strata_doc::{
    DiagnosticKind, DocError, Document, Drawable, JournalEntry, LayerId, MaskApply, UndoJournal, UndoRecord,
};
use strata_ops::BlendMode;

fn rgba() -> FormatDescriptor {
    FormatDescriptor::rgba(Precision::F32)
}

fn doc_with_layer(w: u32, h: u32, px: &[f32]) -> (Document, LayerId) {
    let mut doc = Document::new(w, h, FormatDescriptor::rgb(Precision::F32)).unwrap();
    let layer = doc.new_layer("paint", rgba(), w, h).unwrap().filled(px).unwrap();
    let id = layer.id();
    doc.add_layer(layer, None).unwrap();
    (doc, id)
}

fn stamp(w: u32, h: u32, px: &[f32]) -> PixelBuffer {
    PixelBuffer::filled(rgba(), w, h, px).unwrap()
}

#[test]
fn test_apply_buffer_updates_projection() {
    let (mut doc, id) = doc_with_layer(8, 8, &[0.0; 4]);
    doc.projection(doc.bounds()).unwrap();
    let red = stamp(2, 2, &[1.0, 0.0, 0.0, 1.0]);
    doc.apply_buffer(Drawable::Layer(id), &red, 3, 3, 1.0, BlendMode::Normal).unwrap();

    let proj = doc.projection(doc.bounds()).unwrap();
    assert_eq!(proj.pixel(3, 3), &[1.0, 0.0, 0.0, 1.0]);
    assert_eq!(proj.pixel(5, 5), &[0.0; 4]);
}

#[test]
fn test_apply_buffer_clipped_by_selection() {
    let (mut doc, id) = doc_with_layer(4, 4, &[0.0; 4]);
    doc.update_selection(|sel| sel.fill_rect(Rect::new(0, 0, 2, 4), &[1.0])).unwrap();
    assert!(doc.has_selection());

    let red = stamp(4, 4, &[1.0, 0.0, 0.0, 1.0]);
    doc.apply_buffer(Drawable::Layer(id), &red, 0, 0, 1.0, BlendMode::Normal).unwrap();
    let buf = doc.layer(id).unwrap().buffer();
    assert_eq!(buf.pixel(1, 2), &[1.0, 0.0, 0.0, 1.0]);
    assert_eq!(buf.pixel(3, 2), &[0.0; 4]);
}

#[test]
fn test_partial_selection_scales_coverage() {
    let (mut doc, id) = doc_with_layer(2, 2, &[0.0; 4]);
    doc.update_selection(|sel| sel.fill(&[0.5])).unwrap();
    let white = stamp(2, 2, &[1.0; 4]);
    doc.apply_buffer(Drawable::Layer(id), &white, 0, 0, 1.0, BlendMode::Normal).unwrap();
    assert_abs_diff_eq!(doc.layer(id).unwrap().buffer().pixel(0, 0)[3], 0.5, epsilon = 1e-6);
}

#[test]
fn test_preserve_transparency_locks_alpha() {
    let (mut doc, id) = doc_with_layer(2, 1, &[0.0; 4]);
    doc.update_layer(id, |b| b.set_pixel(1, 0, &[1.0, 0.0, 0.0, 1.0])).unwrap().unwrap();
    doc.set_preserve_transparency(id, true).unwrap();

    let blue = stamp(2, 1, &[0.0, 0.0, 1.0, 1.0]);
    doc.apply_buffer(Drawable::Layer(id), &blue, 0, 0, 1.0, BlendMode::Normal).unwrap();
    let buf = doc.layer(id).unwrap().buffer();
    assert_eq!(buf.pixel(0, 0)[3], 0.0);
    assert_eq!(buf.pixel(1, 0), &[0.0, 0.0, 1.0, 1.0]);
}

#[test]
fn test_inactive_component_untouched() {
    let (mut doc, id) = doc_with_layer(1, 1, &[0.0, 0.0, 0.0, 1.0]);
    doc.set_component_active(0, false).unwrap();
    let white = stamp(1, 1, &[1.0; 4]);
    doc.apply_buffer(Drawable::Layer(id), &white, 0, 0, 1.0, BlendMode::Normal).unwrap();
    assert_eq!(doc.layer(id).unwrap().buffer().pixel(0, 0), &[0.0, 1.0, 1.0, 1.0]);
    assert!(doc.set_component_active(7, true).is_err());
}

#[test]
fn test_apply_buffer_records_previous_pixels() {
    let journal = UndoJournal::new();
    let mut doc = Document::new(4, 4, FormatDescriptor::rgb(Precision::F32))
        .unwrap()
        .with_undo(journal.clone());
    let layer = doc.new_layer("l", rgba(), 4, 4).unwrap().with_offset(1, 1);
    let id = layer.id();
    doc.add_layer(layer, None).unwrap();
    journal.clear();

    let red = stamp(2, 2, &[1.0, 0.0, 0.0, 1.0]);
    doc.apply_buffer(Drawable::Layer(id), &red, 2, 2, 1.0, BlendMode::Normal).unwrap();
    let entries = journal.entries();
    assert_eq!(entries.len(), 1);
    match &entries[0] {
        JournalEntry::Record(UndoRecord::LayerPixels { layer, area, pixels }) => {
            assert_eq!(*layer, id);
            assert_eq!(*area, Rect::new(1, 1, 2, 2));
            assert_eq!(pixels.pixel(0, 0), &[0.0; 4]);
        }
        other => panic!("unexpected entry {other:?}"),
    }
}

#[test]
fn test_failed_apply_records_no_undo() {
    let journal = UndoJournal::new();
    let mut doc = Document::new(4, 4, FormatDescriptor::rgb(Precision::F32))
        .unwrap()
        .with_undo(journal.clone());
    let layer = doc.new_layer("l", rgba(), 4, 4).unwrap();
    let id = layer.id();
    doc.add_layer(layer, None).unwrap();
    doc.update_selection(|b| *b = PixelBuffer::filled(FormatDescriptor::mask(Precision::F32), 1, 1, &[1.0]).unwrap());
    journal.clear();

    let red = stamp(2, 2, &[1.0, 0.0, 0.0, 1.0]);
    let err = doc.apply_buffer(Drawable::Layer(id), &red, 1, 1, 1.0, BlendMode::Normal).unwrap_err();
    assert!(matches!(err, DocError::Core(_)));
    assert!(journal.entries().is_empty());
    assert_eq!(doc.layer(id).unwrap().buffer().pixel(1, 1), &[0.0; 4]);
    assert_eq!(doc.take_diagnostics()[0].kind, DiagnosticKind::Pixel);
}

#[test]
fn test_apply_buffer_rejects_incompatible_source() {
    let mut doc = Document::new(2, 2, FormatDescriptor::rgb(Precision::U8)).unwrap();
    let layer = doc.new_layer("l", FormatDescriptor::rgba(Precision::U8), 2, 2).unwrap();
    let id = layer.id();
    doc.add_layer(layer, None).unwrap();

    let wide = PixelBuffer::filled(FormatDescriptor::rgba(Precision::U16), 2, 2, &[1.0; 4]).unwrap();
    let err = doc.apply_buffer(Drawable::Layer(id), &wide, 0, 0, 1.0, BlendMode::Normal).unwrap_err();
    assert!(matches!(err, DocError::Incompatible(_)));
    assert_eq!(doc.take_diagnostics()[0].kind, DiagnosticKind::IncompatibleFormat);
    assert_eq!(doc.layer(id).unwrap().buffer().pixel(0, 0), &[0.0; 4]);
}

#[test]
fn test_apply_outside_drawable_is_noop() {
    let (mut doc, id) = doc_with_layer(4, 4, &[0.0; 4]);
    let red = stamp(2, 2, &[1.0; 4]);
    doc.apply_buffer(Drawable::Layer(id), &red, 10, 10, 1.0, BlendMode::Normal).unwrap();
    assert!(doc.layer(id).unwrap().buffer().data().iter().all(|v| *v == 0.0));
}

#[test]
fn test_paint_into_mask_and_channel() {
    let (mut doc, id) = doc_with_layer(4, 4, &[1.0; 4]);
    let mask = doc.new_layer_mask(id, 1.0).unwrap();
    doc.add_layer_mask(id, mask).unwrap();
    let channel = doc.new_channel("c");
    let cid = channel.id();
    doc.add_channel(channel, None).unwrap();

    let black = PixelBuffer::filled(FormatDescriptor::mask(Precision::F32), 2, 2, &[0.0]).unwrap();
    doc.apply_buffer(Drawable::LayerMask(id), &black, 0, 0, 1.0, BlendMode::Normal).unwrap();
    let white = PixelBuffer::filled(FormatDescriptor::mask(Precision::F32), 1, 1, &[1.0]).unwrap();
    doc.apply_buffer(Drawable::Channel(cid), &white, 3, 3, 1.0, BlendMode::Normal).unwrap();

    assert_eq!(doc.layer(id).unwrap().mask().unwrap().buffer().pixel(0, 0), &[0.0]);
    assert_eq!(doc.channel(cid).unwrap().buffer().pixel(3, 3), &[1.0]);
    assert_eq!(doc.projection(doc.bounds()).unwrap().pixel(0, 0)[3], 0.0);
}

#[test]
fn test_remove_mask_apply_bakes_alpha() {
    let (mut doc, id) = doc_with_layer(2, 2, &[1.0; 4]);
    let mask = doc.new_layer_mask(id, 0.25).unwrap();
    doc.add_layer_mask(id, mask).unwrap();
    doc.remove_layer_mask(id, MaskApply::Apply).unwrap();

    let layer = doc.layer(id).unwrap();
    assert!(layer.mask().is_none());
    assert_abs_diff_eq!(layer.buffer().pixel(1, 1)[3], 0.25, epsilon = 1e-6);
}

#[test]
fn test_remove_mask_discard_keeps_pixels() {
    let (mut doc, id) = doc_with_layer(2, 2, &[1.0; 4]);
    let mask = doc.new_layer_mask(id, 0.0).unwrap();
    doc.add_layer_mask(id, mask).unwrap();
    assert_eq!(doc.projection(doc.bounds()).unwrap().pixel(0, 0)[3], 0.0);

    doc.remove_layer_mask(id, MaskApply::Discard).unwrap();
    assert_eq!(doc.layer(id).unwrap().buffer().pixel(0, 0), &[1.0; 4]);
    assert_eq!(doc.projection(doc.bounds()).unwrap().pixel(0, 0), &[1.0; 4]);
}

#[test]
fn test_mask_rejections() {
    let mut doc = Document::new(4, 4, FormatDescriptor::rgb(Precision::F32)).unwrap();
    let opaque = doc.new_layer("opaque", FormatDescriptor::rgb(Precision::F32), 4, 4).unwrap();
    let oid = opaque.id();
    doc.add_layer(opaque, None).unwrap();
    let mask = doc.new_layer_mask(oid, 1.0).unwrap();
    assert!(matches!(doc.add_layer_mask(oid, mask), Err(DocError::MaskRejected(_))));
    assert!(doc.remove_layer_mask(oid, MaskApply::Discard).is_err());
}

#[test]
fn test_raise_and_lower_need_alpha() {
    let mut doc = Document::new(4, 4, FormatDescriptor::rgb(Precision::F32)).unwrap();
    let top = doc.new_layer("top", rgba(), 4, 4).unwrap();
    let bottom = doc.new_layer("bottom", FormatDescriptor::rgb(Precision::F32), 4, 4).unwrap();
    let (tid, bid) = (top.id(), bottom.id());
    doc.add_layer(bottom, Some(0)).unwrap();
    doc.add_layer(top, Some(0)).unwrap();

    assert!(matches!(doc.raise_layer(tid), Err(DocError::CannotRaise(..))));
    assert!(matches!(doc.lower_layer(tid), Err(DocError::CannotLower(..))));
    assert!(matches!(doc.raise_layer(bid), Err(DocError::CannotRaise(..))));
    assert_eq!(doc.layer_index(tid), Some(0));
    assert_eq!(doc.take_diagnostics().len(), 3);
}

#[test]
fn test_pick_correlate_respects_alpha_and_mask() {
    let mut doc = Document::new(4, 4, FormatDescriptor::rgb(Precision::F32)).unwrap();
    let base = doc.new_layer("base", rgba(), 4, 4).unwrap().filled(&[1.0; 4]).unwrap();
    let over = doc
        .new_layer("over", rgba(), 2, 2)
        .unwrap()
        .with_offset(2, 2)
        .filled(&[1.0; 4])
        .unwrap();
    let (base_id, over_id) = (base.id(), over.id());
    doc.add_layer(base, None).unwrap();
    doc.add_layer(over, Some(0)).unwrap();

    assert_eq!(doc.pick_correlate_layer(3, 3), Some(over_id));
    assert_eq!(doc.pick_correlate_layer(0, 0), Some(base_id));
    assert_eq!(doc.pick_correlate_layer(9, 9), None);

    let mask = doc.new_layer_mask(over_id, 0.0).unwrap();
    doc.add_layer_mask(over_id, mask).unwrap();
    assert_eq!(doc.pick_correlate_layer(3, 3), Some(base_id));
}

#[test]
fn test_masked_layer_keeps_its_size() {
    let (mut doc, id) = doc_with_layer(8, 8, &[1.0; 4]);
    doc.update_layer(id, |b| *b = stamp(4, 4, &[1.0; 4])).unwrap();
    let mask = doc.new_layer_mask(id, 1.0).unwrap();
    doc.add_layer_mask(id, mask).unwrap();

    let err = doc.update_layer(id, |b| *b = stamp(8, 8, &[1.0; 4])).unwrap_err();
    assert!(matches!(err, DocError::MaskRejected(_)));
    assert_eq!(doc.layer(id).unwrap().buffer().dimensions(), (4, 4));
    assert_eq!(doc.take_diagnostics().len(), 1);

    assert_eq!(doc.pick_correlate_layer(6, 6), None);
    assert_eq!(doc.pick_correlate_layer(2, 2), Some(id));
    doc.update_layer(id, |b| b.fill(&[0.0; 4])).unwrap().unwrap();
    assert_eq!(doc.pick_correlate_layer(2, 2), None);
}

#[test]
fn test_channel_order_affects_overlay() {
    let mut doc = Document::new(1, 1, FormatDescriptor::rgb(Precision::F32)).unwrap();
    let bg = doc.new_layer("bg", FormatDescriptor::rgb(Precision::F32), 1, 1).unwrap();
    doc.add_layer(bg, None).unwrap();
    let red = doc.new_channel("red").filled(1.0).with_color([1.0, 0.0, 0.0], 1.0);
    let blue = doc.new_channel("blue").filled(1.0).with_color([0.0, 0.0, 1.0], 1.0);
    let red_id = red.id();
    doc.add_channel(red, None).unwrap();
    doc.add_channel(blue, None).unwrap();

    // channels are drawn bottom to top; index 0 ends on top
    assert_eq!(doc.projection(doc.bounds()).unwrap().pixel(0, 0), &[0.0, 0.0, 1.0, 1.0]);
    doc.raise_channel(red_id).unwrap();
    assert_eq!(doc.projection(doc.bounds()).unwrap().pixel(0, 0), &[1.0, 0.0, 0.0, 1.0]);
}
