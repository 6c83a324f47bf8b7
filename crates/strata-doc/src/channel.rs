//! Auxiliary channels, layer masks and the selection mask.
//!
//! A [`Channel`] is a single-sample, alpha-less buffer. Document channels
//! are drawn over the projection tinted with their display color; a channel
//! attached to a layer is that layer's mask; one channel per document is the
//! selection mask.

use std::fmt;

use strata_core::{FormatDescriptor, PixelBuffer, Precision};
use strata_ops::OverlayStyle;

/// Identifier of a channel, unique within its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub(crate) u32);

impl ChannelId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    id: ChannelId,
    pub name: String,
    pub(crate) buffer: PixelBuffer,
    pub(crate) color: [f32; 3],
    pub(crate) opacity: f32,
    pub(crate) show_masked: bool,
    pub(crate) visible: bool,
}

impl Channel {
    pub(crate) fn new(id: ChannelId, name: impl Into<String>, width: u32, height: u32, precision: Precision) -> Self {
        Self {
            id,
            name: name.into(),
            buffer: PixelBuffer::new(FormatDescriptor::mask(precision), width, height),
            color: [0.0, 0.0, 0.0],
            opacity: 0.5,
            show_masked: false,
            visible: true,
        }
    }

    /// Sets every value, builder style.
    pub fn filled(mut self, value: f32) -> Self {
        // a mask buffer always has exactly one sample
        let _ = self.buffer.fill(&[value]);
        self
    }

    pub fn with_color(mut self, color: [f32; 3], opacity: f32) -> Self {
        self.color = color;
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_show_masked(mut self, show_masked: bool) -> Self {
        self.show_masked = show_masked;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    #[inline]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    #[inline]
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Direct pixel access for channels not yet owned by a document.
    #[inline]
    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    #[inline]
    pub fn color(&self) -> [f32; 3] {
        self.color
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    #[inline]
    pub fn show_masked(&self) -> bool {
        self.show_masked
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Overlay variant used when this channel is drawn over the projection.
    pub fn overlay_style(&self) -> OverlayStyle {
        if self.show_masked {
            OverlayStyle::MaskDisplay
        } else {
            OverlayStyle::Selection
        }
    }

    /// True if any value exceeds `threshold`.
    pub fn has_coverage(&self, threshold: f32) -> bool {
        self.buffer.data().iter().any(|v| *v > threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_channel_is_empty_gray() {
        let ch = Channel::new(ChannelId(3), "alpha copy", 4, 2, Precision::U8);
        assert_eq!(ch.buffer().format(), FormatDescriptor::gray(Precision::U8));
        assert!(!ch.has_coverage(0.0));
        assert_eq!(ch.id().to_string(), "channel#3");
    }

    #[test]
    fn test_builders() {
        let ch = Channel::new(ChannelId(1), "c", 2, 2, Precision::F32)
            .filled(0.5)
            .with_color([1.0, 0.0, 0.0], 2.0)
            .with_show_masked(true);
        assert!(ch.has_coverage(0.25));
        assert!(!ch.has_coverage(0.5));
        assert_eq!(ch.opacity(), 1.0);
        assert_eq!(ch.overlay_style(), OverlayStyle::MaskDisplay);
    }
}
