//! Format-tagged pixel storage.
//!
//! - [`PixelBuffer`] - Owned 2-D pixel store tagged with a [`FormatDescriptor`]
//! - [`BufferView`] - Immutable rectangular view
//! - [`BufferViewMut`] - Mutable rectangular view, row-splittable for
//!   parallel kernels
//!
//! # Memory Layout
//!
//! Samples are interleaved per pixel (color components, then alpha) and
//! pixels are stored row-major, top to bottom:
//!
//! ```text
//! [R G B A R G B A ...]  ← Row 0
//! [R G B A R G B A ...]  ← Row 1
//! ```
//!
//! Sample storage is shared copy-on-write, so cloning a buffer (for an
//! undo record or a merge copy) is cheap until one side is written.
//!
//! # Usage
//!
//! ```rust
//! use strata_core::{FormatDescriptor, PixelBuffer, Precision, Rect};
//!
//! let mut buf = PixelBuffer::new(FormatDescriptor::rgba(Precision::F32), 4, 4);
//! buf.fill_rect(Rect::new(1, 1, 2, 2), &[1.0, 0.0, 0.0, 1.0]).unwrap();
//! assert_eq!(buf.pixel(1, 1), &[1.0, 0.0, 0.0, 1.0]);
//! assert_eq!(buf.pixel(0, 0), &[0.0, 0.0, 0.0, 0.0]);
//! ```

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::format::FormatDescriptor;
use crate::rect::Rect;

/// An owned pixel buffer.
#[derive(Clone, PartialEq)]
pub struct PixelBuffer {
    format: FormatDescriptor,
    width: u32,
    height: u32,
    data: Arc<Vec<f32>>,
}

impl PixelBuffer {
    /// Creates a zero-filled buffer (transparent black when alpha is present).
    pub fn new(format: FormatDescriptor, width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * format.channels();
        Self {
            format,
            width,
            height,
            data: Arc::new(vec![0.0; len]),
        }
    }

    /// Creates a zero-filled buffer, reporting allocation failure instead of
    /// aborting.
    ///
    /// Used for projection and merge targets, whose size is driven by user
    /// documents.
    pub fn try_new(format: FormatDescriptor, width: u32, height: u32) -> Result<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(format.channels()))
            .ok_or_else(|| Error::allocation_failed(usize::MAX, "size overflow"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| Error::allocation_failed(len, e.to_string()))?;
        data.resize(len, 0.0);
        Ok(Self {
            format,
            width,
            height,
            data: Arc::new(data),
        })
    }

    /// Creates a buffer with every pixel set to `pixel`.
    pub fn filled(format: FormatDescriptor, width: u32, height: u32, pixel: &[f32]) -> Result<Self> {
        let mut buf = Self::try_new(format, width, height)?;
        buf.fill(pixel)?;
        Ok(buf)
    }

    /// Wraps existing interleaved samples.
    pub fn from_data(format: FormatDescriptor, width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(Error::invalid_dimensions(
                width,
                height,
                format!("expected {expected} samples, got {}", data.len()),
            ));
        }
        Ok(Self {
            format,
            width,
            height,
            data: Arc::new(data),
        })
    }

    #[inline]
    pub fn format(&self) -> FormatDescriptor {
        self.format
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Samples per pixel.
    #[inline]
    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    /// Samples per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.width as usize * self.channels()
    }

    /// The buffer's own extent, at the origin.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable samples; clones shared storage first.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        Arc::make_mut(&mut self.data).as_mut_slice()
    }

    /// Returns `true` if both buffers point at the same storage.
    #[inline]
    pub fn shares_storage(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels()
    }

    /// Samples of one pixel.
    ///
    /// # Panics
    ///
    /// Panics if (x, y) is outside the buffer.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &[f32] {
        let o = self.offset(x, y);
        &self.data[o..o + self.channels()]
    }

    /// Samples of one pixel in signed coordinates, `None` outside.
    #[inline]
    pub fn get_pixel(&self, x: i32, y: i32) -> Option<&[f32]> {
        if self.bounds().contains(x, y) {
            Some(self.pixel(x as u32, y as u32))
        } else {
            None
        }
    }

    #[inline]
    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [f32] {
        let o = self.offset(x, y);
        let c = self.channels();
        &mut self.data_mut()[o..o + c]
    }

    /// Writes one pixel, snapping each sample to the buffer precision.
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: &[f32]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x as i32, y as i32, self.width, self.height));
        }
        self.check_pixel(pixel)?;
        let format = self.format;
        for (i, (d, s)) in self.pixel_mut(x, y).iter_mut().zip(pixel).enumerate() {
            *d = format.store(i, *s);
        }
        Ok(())
    }

    fn check_pixel(&self, pixel: &[f32]) -> Result<()> {
        if pixel.len() != self.channels() {
            return Err(Error::channel_mismatch(self.channels(), pixel.len()));
        }
        Ok(())
    }

    /// Sets every pixel.
    pub fn fill(&mut self, pixel: &[f32]) -> Result<()> {
        self.fill_rect(self.bounds(), pixel)
    }

    /// Sets every pixel of `rect`, which must lie inside the buffer.
    pub fn fill_rect(&mut self, rect: Rect, pixel: &[f32]) -> Result<()> {
        self.check_pixel(pixel)?;
        let format = self.format;
        let stored: Vec<f32> = pixel.iter().enumerate().map(|(i, v)| format.store(i, *v)).collect();
        let mut view = self.view_mut(rect)?;
        for (_, row) in view.rows_mut() {
            for px in row.chunks_exact_mut(stored.len()) {
                px.copy_from_slice(&stored);
            }
        }
        Ok(())
    }

    /// Immutable view of `rect` (buffer coordinates).
    pub fn view(&self, rect: Rect) -> Result<BufferView<'_>> {
        self.check_rect(rect)?;
        Ok(BufferView { buffer: self, rect })
    }

    /// Mutable view of `rect` (buffer coordinates).
    pub fn view_mut(&mut self, rect: Rect) -> Result<BufferViewMut<'_>> {
        self.check_rect(rect)?;
        Ok(BufferViewMut { buffer: self, rect })
    }

    fn check_rect(&self, rect: Rect) -> Result<()> {
        if !self.bounds().contains_rect(&rect) {
            return Err(Error::invalid_region(rect, self.width, self.height));
        }
        Ok(())
    }

    /// Copy of `rect` as a new buffer.
    pub fn crop(&self, rect: Rect) -> Result<PixelBuffer> {
        let view = self.view(rect)?;
        let mut out = PixelBuffer::try_new(self.format, rect.width, rect.height)?;
        let stride = out.stride();
        for (y, row) in out.data_mut().chunks_exact_mut(stride.max(1)).enumerate() {
            row.copy_from_slice(view.row(y as u32));
        }
        Ok(out)
    }

    /// Copy with an alpha sample appended, set to `alpha` everywhere.
    ///
    /// Returns a plain clone if the buffer already has alpha.
    pub fn with_alpha(&self, alpha: f32) -> Result<PixelBuffer> {
        if self.format.has_alpha {
            return Ok(self.clone());
        }
        let format = self.format.with_alpha(true);
        let mut out = PixelBuffer::try_new(format, self.width, self.height)?;
        let src_c = self.channels();
        let a = format.store(src_c, alpha);
        for (dst, src) in out
            .data_mut()
            .chunks_exact_mut(src_c + 1)
            .zip(self.data.chunks_exact(src_c))
        {
            dst[..src_c].copy_from_slice(src);
            dst[src_c] = a;
        }
        Ok(out)
    }

    /// Copy with the alpha sample dropped, color left as stored.
    pub fn without_alpha(&self) -> Result<PixelBuffer> {
        if !self.format.has_alpha {
            return Ok(self.clone());
        }
        let format = self.format.with_alpha(false);
        let mut out = PixelBuffer::try_new(format, self.width, self.height)?;
        let dst_c = format.channels();
        for (dst, src) in out
            .data_mut()
            .chunks_exact_mut(dst_c)
            .zip(self.data.chunks_exact(dst_c + 1))
        {
            dst.copy_from_slice(&src[..dst_c]);
        }
        Ok(out)
    }

    /// Copy on a new `width` × `height` canvas with the old content placed
    /// at (`off_x`, `off_y`). Uncovered pixels are zero.
    pub fn resized(&self, width: u32, height: u32, off_x: i32, off_y: i32) -> Result<PixelBuffer> {
        let mut out = PixelBuffer::try_new(self.format, width, height)?;
        let placed = self.bounds().translate(off_x, off_y);
        if let Some(overlap) = placed.intersect(&out.bounds()) {
            let src_rect = overlap.translate(-off_x, -off_y);
            let src = self.view(src_rect)?;
            let mut dst = out.view_mut(overlap)?;
            for (y, row) in dst.rows_mut() {
                row.copy_from_slice(src.row(y));
            }
        }
        Ok(out)
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Immutable rectangular view into a [`PixelBuffer`].
///
/// Coordinates passed to view methods are relative to the view origin.
#[derive(Clone, Copy)]
pub struct BufferView<'a> {
    buffer: &'a PixelBuffer,
    rect: Rect,
}

impl<'a> BufferView<'a> {
    #[inline]
    pub fn width(&self) -> u32 {
        self.rect.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.rect.height
    }

    /// The viewed rectangle in buffer coordinates.
    #[inline]
    pub fn region(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn format(&self) -> FormatDescriptor {
        self.buffer.format
    }

    /// Samples of row `y` restricted to the view.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [f32] {
        let c = self.buffer.channels();
        let start = self.buffer.offset(self.rect.x as u32, self.rect.y as u32 + y);
        &self.buffer.data[start..start + self.rect.width as usize * c]
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> &'a [f32] {
        self.buffer
            .pixel(self.rect.x as u32 + x, self.rect.y as u32 + y)
    }
}

/// Mutable rectangular view into a [`PixelBuffer`].
pub struct BufferViewMut<'a> {
    buffer: &'a mut PixelBuffer,
    rect: Rect,
}

impl<'a> BufferViewMut<'a> {
    #[inline]
    pub fn width(&self) -> u32 {
        self.rect.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.rect.height
    }

    #[inline]
    pub fn region(&self) -> Rect {
        self.rect
    }

    #[inline]
    pub fn format(&self) -> FormatDescriptor {
        self.buffer.format
    }

    /// Rows of the view as `(row index within view, samples)`.
    ///
    /// The slices are disjoint, so they can be handed to worker threads.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = (u32, &mut [f32])> + '_ {
        let c = self.buffer.channels();
        let stride = self.buffer.stride().max(1);
        let x0 = self.rect.x as usize * c;
        let x1 = x0 + self.rect.width as usize * c;
        let y0 = self.rect.y as usize;
        let h = self.rect.height as usize;
        self.buffer
            .data_mut()
            .chunks_exact_mut(stride)
            .skip(y0)
            .take(h)
            .enumerate()
            .map(move |(i, row)| (i as u32, &mut row[x0..x1]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Precision;

    fn rgba() -> FormatDescriptor {
        FormatDescriptor::rgba(Precision::F32)
    }

    #[test]
    fn test_new_is_zeroed() {
        let buf = PixelBuffer::new(rgba(), 3, 2);
        assert_eq!(buf.data().len(), 24);
        assert!(buf.data().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_set_pixel_quantizes() {
        let mut buf = PixelBuffer::new(FormatDescriptor::rgb(Precision::U8), 2, 2);
        buf.set_pixel(1, 0, &[0.5, 2.0, -1.0]).unwrap();
        assert_eq!(buf.pixel(1, 0), &[128.0 / 255.0, 1.0, 0.0]);
        assert!(buf.set_pixel(2, 0, &[0.0, 0.0, 0.0]).is_err());
        assert!(buf.set_pixel(0, 0, &[0.0]).is_err());
    }

    #[test]
    fn test_fill_rect_rejects_outside() {
        let mut buf = PixelBuffer::new(rgba(), 4, 4);
        let err = buf.fill_rect(Rect::new(2, 2, 4, 4), &[1.0; 4]).unwrap_err();
        assert!(err.is_bounds_error());
    }

    #[test]
    fn test_clone_is_copy_on_write() {
        let a = PixelBuffer::new(rgba(), 2, 2);
        let mut b = a.clone();
        assert!(a.shares_storage(&b));
        b.fill(&[1.0; 4]).unwrap();
        assert!(!a.shares_storage(&b));
        assert_eq!(a.pixel(0, 0), &[0.0; 4]);

        let mut c = a.clone();
        c.data_mut()[0] = 0.5;
        assert!(!a.shares_storage(&c));
        assert_eq!(c.data()[0], 0.5);
        assert_eq!(a.data()[0], 0.0);
    }

    #[test]
    fn test_alpha_add_and_remove() {
        let rgb = PixelBuffer::filled(FormatDescriptor::rgb(Precision::F32), 2, 1, &[0.1, 0.2, 0.3]).unwrap();
        let with = rgb.with_alpha(1.0).unwrap();
        assert_eq!(with.pixel(1, 0), &[0.1, 0.2, 0.3, 1.0]);
        let back = with.without_alpha().unwrap();
        assert_eq!(back, rgb);
    }

    #[test]
    fn test_crop_and_view_rows() {
        let mut buf = PixelBuffer::new(FormatDescriptor::gray(Precision::F32), 4, 4);
        buf.set_pixel(2, 1, &[0.75]).unwrap();
        let crop = buf.crop(Rect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(crop.pixel(1, 0), &[0.75]);
        let view = buf.view(Rect::new(2, 1, 2, 1)).unwrap();
        assert_eq!(view.row(0), &[0.75, 0.0]);
    }

    #[test]
    fn test_resized_places_content() {
        let src = PixelBuffer::filled(FormatDescriptor::gray(Precision::F32), 2, 2, &[1.0]).unwrap();
        let out = src.resized(4, 4, 3, -1).unwrap();
        assert_eq!(out.pixel(3, 0), &[1.0]);
        assert_eq!(out.pixel(2, 0), &[0.0]);
        assert_eq!(out.pixel(3, 1), &[0.0]);
    }

    #[test]
    fn test_from_data_checks_len() {
        assert!(PixelBuffer::from_data(rgba(), 2, 2, vec![0.0; 15]).is_err());
        assert!(PixelBuffer::from_data(rgba(), 2, 2, vec![0.0; 16]).is_ok());
    }
}
