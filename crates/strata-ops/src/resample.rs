//! Nearest-neighbor resampling for thumbnails and previews.

use strata_core::PixelBuffer;

use crate::error::{OpsError, OpsResult};

/// Scales `src` to `width` × `height` by nearest-neighbor sampling.
///
/// Samples are copied, never interpolated, so indexed buffers stay valid.
///
/// ```rust
/// use strata_core::{FormatDescriptor, PixelBuffer, Precision};
/// use strata_ops::resample::scale_nearest;
///
/// let src = PixelBuffer::filled(FormatDescriptor::gray(Precision::F32), 4, 4, &[0.5]).unwrap();
/// let dst = scale_nearest(&src, 2, 1).unwrap();
/// assert_eq!(dst.dimensions(), (2, 1));
/// assert_eq!(dst.pixel(1, 0), &[0.5]);
/// ```
pub fn scale_nearest(src: &PixelBuffer, width: u32, height: u32) -> OpsResult<PixelBuffer> {
    if width == 0 || height == 0 {
        return Err(OpsError::InvalidParameter(format!(
            "cannot scale to {width}x{height}"
        )));
    }
    let mut dst = PixelBuffer::try_new(src.format(), width, height)?;
    if src.width() == 0 || src.height() == 0 {
        return Ok(dst);
    }
    let c = src.channels();
    let sx = src.width() as f64 / width as f64;
    let sy = src.height() as f64 / height as f64;
    let stride = dst.stride();
    for (y, row) in dst.data_mut().chunks_exact_mut(stride).enumerate() {
        let src_y = (((y as f64 + 0.5) * sy) as u32).min(src.height() - 1);
        for (x, px) in row.chunks_exact_mut(c).enumerate() {
            let src_x = (((x as f64 + 0.5) * sx) as u32).min(src.width() - 1);
            px.copy_from_slice(src.pixel(src_x, src_y));
        }
    }
    Ok(dst)
}
