//! Area kernels: the pixel primitives behind projection and merging.
//!
//! Every kernel writes a destination rectangle from a same-sized source
//! area. Sources are addressed by an [`AreaSource`]: a buffer plus the
//! source coordinate that lands on the rectangle's top-left corner.
//!
//! - [`initial_area`] - establish first content: `dest = src × opacity × mask`,
//!   prior destination content is not read
//! - [`combine_areas`] - alpha-blend ("over") onto existing content
//! - [`initial_channel`] / [`combine_channel`] - tinted channel overlays
//! - [`copy_gray_to_area`] - show a mask channel as gray
//! - [`apply_mask_to_alpha`] - bake a mask into a buffer's alpha
//!
//! Both layer kernels take the [`CombineOp`] chosen by
//! [`operation_for`](crate::operation_for). Intensity destinations accept
//! indexed sources (colormap expansion); indexed destinations only accept
//! indexed sources, which are copied where the effective source alpha
//! exceeds one half.
//!
//! With the `parallel` feature, rows are processed on the rayon pool.

use strata_core::{BufferView, ColorModel, FormatDescriptor, PixelBuffer, Rect};
use tracing::trace;

use crate::active::ActiveChannels;
use crate::algebra::CombineOp;
use crate::blend::BlendMode;
use crate::error::{OpsError, OpsResult};

const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// Source area: `buffer` read starting at (`x`, `y`).
#[derive(Debug, Clone, Copy)]
pub struct AreaSource<'a> {
    pub buffer: &'a PixelBuffer,
    pub x: u32,
    pub y: u32,
}

impl<'a> AreaSource<'a> {
    #[inline]
    pub fn new(buffer: &'a PixelBuffer, x: u32, y: u32) -> Self {
        Self { buffer, x, y }
    }

    fn view(&self, width: u32, height: u32) -> OpsResult<BufferView<'a>> {
        let rect = Rect::new(self.x as i32, self.y as i32, width, height);
        Ok(self.buffer.view(rect)?)
    }

    fn mask_view(&self, width: u32, height: u32) -> OpsResult<BufferView<'a>> {
        let channels = self.buffer.channels();
        if channels != 1 {
            return Err(strata_core::Error::channel_mismatch(1, channels).into());
        }
        self.view(width, height)
    }
}

/// Per-call parameters of the layer kernels.
#[derive(Debug, Clone, Copy)]
pub struct CombineParams<'a> {
    /// Multiplies source alpha.
    pub opacity: f32,
    pub mode: BlendMode,
    /// Single-channel clip mask.
    pub mask: Option<AreaSource<'a>>,
    /// Colormap for indexed sources drawn onto intensity destinations.
    pub colormap: &'a [[f32; 3]],
    /// Destination samples that may be modified.
    pub affect: ActiveChannels,
}

impl<'a> CombineParams<'a> {
    pub fn new(opacity: f32, mode: BlendMode) -> Self {
        Self {
            opacity: opacity.clamp(0.0, 1.0),
            mode,
            mask: None,
            colormap: &[],
            affect: ActiveChannels::ALL,
        }
    }

    pub fn with_mask(mut self, mask: Option<AreaSource<'a>>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_colormap(mut self, colormap: &'a [[f32; 3]]) -> Self {
        self.colormap = colormap;
        self
    }

    pub fn with_affect(mut self, affect: ActiveChannels) -> Self {
        self.affect = affect;
        self
    }
}

/// How a channel is tinted onto the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayStyle {
    /// Tint where the channel is set.
    #[default]
    Selection,
    /// Tint where the channel is clear.
    MaskDisplay,
}

/// Decodes a source pixel into destination color space.
///
/// Returns up to three color samples (only the first
/// `dest_model.color_components()` are meaningful) and alpha.
#[inline]
fn decode(
    px: &[f32],
    src: FormatDescriptor,
    dest_model: ColorModel,
    colormap: &[[f32; 3]],
) -> ([f32; 3], f32) {
    let alpha = src.alpha_index().map_or(1.0, |i| px[i]);
    let rgb = match src.model {
        ColorModel::Rgb => [px[0], px[1], px[2]],
        ColorModel::Gray => [px[0]; 3],
        ColorModel::Indexed if dest_model.is_indexed() => return ([px[0], 0.0, 0.0], alpha),
        ColorModel::Indexed => colormap
            .get(px[0].max(0.0) as usize)
            .copied()
            .unwrap_or([0.0; 3]),
    };
    let color = match dest_model {
        ColorModel::Rgb => rgb,
        _ if src.model == ColorModel::Gray => rgb,
        _ => [rgb[0] * LUMA[0] + rgb[1] * LUMA[1] + rgb[2] * LUMA[2], 0.0, 0.0],
    };
    (color, alpha)
}

/// Blend mode result weighted by backdrop alpha: where the destination is
/// transparent the source color passes through unmixed.
#[inline]
fn backdrop_mix(mode: BlendMode, s: f32, d: f32, da: f32) -> f32 {
    da * mode.mix(s, d) + (1.0 - da) * s
}

/// Runs `f` over every row of `rect` in `dest`.
fn for_each_row<F>(dest: &mut PixelBuffer, rect: Rect, f: F) -> OpsResult<()>
where
    F: Fn(u32, &mut [f32]) + Sync + Send,
{
    let mut view = dest.view_mut(rect)?;
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        let rows: Vec<(u32, &mut [f32])> = view.rows_mut().collect();
        rows.into_par_iter().for_each(|(y, row)| f(y, row));
    }
    #[cfg(not(feature = "parallel"))]
    {
        for (y, row) in view.rows_mut() {
            f(y, row);
        }
    }
    Ok(())
}

fn check_layer_pair(op: CombineOp, dest: &PixelBuffer, src: &PixelBuffer) -> OpsResult<()> {
    let (d, s) = (dest.format(), src.format());
    if op.src_alpha() != s.has_alpha {
        return Err(OpsError::InvalidParameter(format!(
            "operation {op} does not match source format {s}"
        )));
    }
    if d.model.is_indexed() && !s.model.is_indexed() {
        return Err(OpsError::Unsupported(format!("{s} onto indexed {d}")));
    }
    if d.precision != s.precision {
        return Err(OpsError::Unsupported(format!("{s} onto {d}")));
    }
    Ok(())
}

/// Establishes first content in `rect`: `dest = src × opacity × mask`.
///
/// The blend mode is not consulted; there is nothing to blend with.
pub fn initial_area(
    op: CombineOp,
    dest: &mut PixelBuffer,
    rect: Rect,
    src: AreaSource<'_>,
    params: &CombineParams<'_>,
) -> OpsResult<()> {
    layer_area(op, dest, rect, src, params, true)
}

/// Alpha-blends `src` over `dest` in `rect` using the blend mode, opacity
/// and mask in `params`.
pub fn combine_areas(
    op: CombineOp,
    dest: &mut PixelBuffer,
    rect: Rect,
    src: AreaSource<'_>,
    params: &CombineParams<'_>,
) -> OpsResult<()> {
    layer_area(op, dest, rect, src, params, false)
}

fn layer_area(
    op: CombineOp,
    dest: &mut PixelBuffer,
    rect: Rect,
    src: AreaSource<'_>,
    params: &CombineParams<'_>,
    initial: bool,
) -> OpsResult<()> {
    if rect.is_empty() {
        return Ok(());
    }
    check_layer_pair(op, dest, src.buffer)?;
    trace!(%op, %rect, initial, mode = %params.mode, "layer_area");

    let src_view = src.view(rect.width, rect.height)?;
    let mask_view = params.mask.map(|m| m.mask_view(rect.width, rect.height)).transpose()?;
    let dfmt = dest.format();
    let sfmt = src.buffer.format();
    let sc = sfmt.channels();
    let dc = dfmt.channels();
    let colors = dfmt.model.color_components();
    let alpha_slot = dfmt.alpha_index();
    let opacity = params.opacity;
    let mode = params.mode;
    let affect = params.affect;
    let colormap = params.colormap;
    let indexed_dest = dfmt.model.is_indexed();

    for_each_row(dest, rect, |y, row| {
        let src_row = src_view.row(y);
        let mask_row = mask_view.as_ref().map(|m| m.row(y));
        for (x, (d, s)) in row.chunks_exact_mut(dc).zip(src_row.chunks_exact(sc)).enumerate() {
            let (color, alpha) = decode(s, sfmt, dfmt.model, colormap);
            let m = mask_row.map_or(1.0, |r| r[x]);
            let sa = alpha * opacity * m;

            if indexed_dest {
                if sa > 0.5 {
                    if affect.is_active(0) {
                        d[0] = dfmt.store(0, color[0]);
                    }
                    if let Some(a) = alpha_slot.filter(|a| affect.is_active(*a)) {
                        d[a] = 1.0;
                    }
                } else if initial {
                    if let Some(a) = alpha_slot.filter(|a| affect.is_active(*a)) {
                        d[a] = 0.0;
                    }
                }
                continue;
            }

            if initial {
                for i in 0..colors {
                    if affect.is_active(i) {
                        let v = if alpha_slot.is_some() { color[i] } else { color[i] * sa };
                        d[i] = dfmt.store(i, v);
                    }
                }
                if let Some(a) = alpha_slot.filter(|a| affect.is_active(*a)) {
                    d[a] = dfmt.store(a, sa);
                }
                continue;
            }

            if sa <= 0.0 {
                continue;
            }
            match alpha_slot {
                Some(a) => {
                    let da = d[a];
                    let out_a = sa + da * (1.0 - sa);
                    for i in 0..colors {
                        if affect.is_active(i) {
                            let mixed = backdrop_mix(mode, color[i], d[i], da);
                            let v = if out_a > 1e-8 {
                                (mixed * sa + d[i] * da * (1.0 - sa)) / out_a
                            } else {
                                0.0
                            };
                            d[i] = dfmt.store(i, v);
                        }
                    }
                    if affect.is_active(a) {
                        d[a] = dfmt.store(a, out_a);
                    }
                }
                None => {
                    for i in 0..colors {
                        if affect.is_active(i) {
                            let mixed = mode.mix(color[i], d[i]);
                            d[i] = dfmt.store(i, mixed * sa + d[i] * (1.0 - sa));
                        }
                    }
                }
            }
        }
    })
}

/// Establishes first content from a channel overlay.
pub fn initial_channel(
    dest: &mut PixelBuffer,
    rect: Rect,
    channel: AreaSource<'_>,
    style: OverlayStyle,
    color: [f32; 3],
    opacity: f32,
) -> OpsResult<()> {
    channel_area(dest, rect, channel, style, color, opacity, true)
}

/// Blends a tinted channel overlay over existing content.
pub fn combine_channel(
    dest: &mut PixelBuffer,
    rect: Rect,
    channel: AreaSource<'_>,
    style: OverlayStyle,
    color: [f32; 3],
    opacity: f32,
) -> OpsResult<()> {
    channel_area(dest, rect, channel, style, color, opacity, false)
}

fn channel_area(
    dest: &mut PixelBuffer,
    rect: Rect,
    channel: AreaSource<'_>,
    style: OverlayStyle,
    color: [f32; 3],
    opacity: f32,
    initial: bool,
) -> OpsResult<()> {
    if rect.is_empty() {
        return Ok(());
    }
    let dfmt = dest.format();
    if dfmt.model.is_indexed() {
        return Err(OpsError::Unsupported(format!("channel overlay onto {dfmt}")));
    }
    trace!(%rect, ?style, initial, "channel_area");

    let view = channel.mask_view(rect.width, rect.height)?;
    let tint = if dfmt.model == ColorModel::Rgb {
        color
    } else {
        [color[0] * LUMA[0] + color[1] * LUMA[1] + color[2] * LUMA[2], 0.0, 0.0]
    };
    let opacity = opacity.clamp(0.0, 1.0);
    let dc = dfmt.channels();
    let colors = dfmt.model.color_components();
    let alpha_slot = dfmt.alpha_index();

    for_each_row(dest, rect, |y, row| {
        let src_row = view.row(y);
        for (d, v) in row.chunks_exact_mut(dc).zip(src_row) {
            let coverage = match style {
                OverlayStyle::Selection => *v,
                OverlayStyle::MaskDisplay => 1.0 - *v,
            };
            let sa = coverage.clamp(0.0, 1.0) * opacity;
            if initial {
                for i in 0..colors {
                    d[i] = dfmt.store(i, tint[i]);
                }
                if let Some(a) = alpha_slot {
                    d[a] = dfmt.store(a, sa);
                }
                continue;
            }
            let da = alpha_slot.map_or(1.0, |a| d[a]);
            let out_a = sa + da * (1.0 - sa);
            for i in 0..colors {
                let v = if out_a > 1e-8 {
                    (tint[i] * sa + d[i] * da * (1.0 - sa)) / out_a
                } else {
                    0.0
                };
                d[i] = dfmt.store(i, v);
            }
            if let Some(a) = alpha_slot {
                d[a] = dfmt.store(a, out_a);
            }
        }
    })
}

/// Writes a single-channel buffer as opaque gray.
pub fn copy_gray_to_area(dest: &mut PixelBuffer, rect: Rect, gray: AreaSource<'_>) -> OpsResult<()> {
    if rect.is_empty() {
        return Ok(());
    }
    let dfmt = dest.format();
    if dfmt.model.is_indexed() {
        return Err(OpsError::Unsupported(format!("gray copy onto {dfmt}")));
    }
    let view = gray.mask_view(rect.width, rect.height)?;
    let dc = dfmt.channels();
    let colors = dfmt.model.color_components();
    let alpha_slot = dfmt.alpha_index();
    for_each_row(dest, rect, |y, row| {
        for (d, v) in row.chunks_exact_mut(dc).zip(view.row(y)) {
            for s in d.iter_mut().take(colors) {
                *s = dfmt.precision.quantize(*v);
            }
            if let Some(a) = alpha_slot {
                d[a] = 1.0;
            }
        }
    })
}

/// Multiplies `buffer` alpha by a same-sized single-channel `mask`.
pub fn apply_mask_to_alpha(buffer: &mut PixelBuffer, mask: &PixelBuffer) -> OpsResult<()> {
    if buffer.dimensions() != mask.dimensions() {
        let (bw, bh) = buffer.dimensions();
        let (mw, mh) = mask.dimensions();
        return Err(OpsError::SizeMismatch(format!("{bw}x{bh} vs mask {mw}x{mh}")));
    }
    let fmt = buffer.format();
    let Some(a) = fmt.alpha_index() else {
        return Err(OpsError::InvalidParameter(format!("{fmt} has no alpha")));
    };
    let view = AreaSource::new(mask, 0, 0).mask_view(mask.width(), mask.height())?;
    let dc = fmt.channels();
    let bounds = buffer.bounds();
    for_each_row(buffer, bounds, |y, row| {
        for (d, m) in row.chunks_exact_mut(dc).zip(view.row(y)) {
            d[a] = fmt.store(a, d[a] * m);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra::operation_for;
    use approx::assert_abs_diff_eq;
    use strata_core::Precision;

    fn rgba() -> FormatDescriptor {
        FormatDescriptor::rgba(Precision::F32)
    }

    fn solid(format: FormatDescriptor, w: u32, h: u32, px: &[f32]) -> PixelBuffer {
        PixelBuffer::filled(format, w, h, px).unwrap()
    }

    #[test]
    fn test_initial_ignores_destination_and_mode() {
        let mut dest = solid(rgba(), 2, 2, &[0.9, 0.9, 0.9, 1.0]);
        let src = solid(rgba(), 2, 2, &[0.2, 0.4, 0.6, 1.0]);
        let op = operation_for(dest.format(), src.format()).unwrap();
        let params = CombineParams::new(0.5, BlendMode::Multiply);
        let bounds = dest.bounds();
        initial_area(op, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params).unwrap();
        assert_eq!(dest.pixel(1, 1), &[0.2, 0.4, 0.6, 0.5]);
    }

    #[test]
    fn test_combine_over_half_alpha() {
        let mut dest = solid(rgba(), 1, 1, &[0.0, 0.0, 1.0, 1.0]);
        let src = solid(rgba(), 1, 1, &[1.0, 0.0, 0.0, 0.5]);
        let params = CombineParams::new(1.0, BlendMode::Normal);
        let bounds = dest.bounds();
        combine_areas(CombineOp::IntenAIntenA, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        let px = dest.pixel(0, 0);
        assert_abs_diff_eq!(px[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[2], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(px[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_combine_onto_transparent_keeps_normal_content() {
        let mut dest = PixelBuffer::new(rgba(), 1, 1);
        let src = solid(FormatDescriptor::rgb(Precision::F32), 1, 1, &[0.3, 0.6, 0.9]);
        let params = CombineParams::new(1.0, BlendMode::Normal);
        let bounds = dest.bounds();
        combine_areas(CombineOp::IntenAInten, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        assert_eq!(dest.pixel(0, 0), &[0.3, 0.6, 0.9, 1.0]);
    }

    #[test]
    fn test_multiply_onto_transparent_matches_initial() {
        let src = solid(rgba(), 1, 1, &[0.3, 0.6, 0.9, 1.0]);
        let params = CombineParams::new(1.0, BlendMode::Multiply);

        let mut combined = PixelBuffer::new(rgba(), 1, 1);
        let bounds = combined.bounds();
        combine_areas(CombineOp::IntenAIntenA, &mut combined, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        let mut initial = PixelBuffer::new(rgba(), 1, 1);
        initial_area(CombineOp::IntenAIntenA, &mut initial, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        assert_eq!(combined.pixel(0, 0), &[0.3, 0.6, 0.9, 1.0]);
        assert_eq!(combined.pixel(0, 0), initial.pixel(0, 0));
    }

    #[test]
    fn test_multiply_weighted_by_backdrop_alpha() {
        let mut dest = solid(rgba(), 1, 1, &[1.0, 1.0, 1.0, 0.5]);
        let src = solid(rgba(), 1, 1, &[0.5, 0.5, 0.5, 1.0]);
        let params = CombineParams::new(1.0, BlendMode::Multiply);
        let bounds = dest.bounds();
        combine_areas(CombineOp::IntenAIntenA, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        // 0.5 * (0.5 * 1.0) + 0.5 * 0.5
        assert_abs_diff_eq!(dest.pixel(0, 0)[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(dest.pixel(0, 0)[3], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mask_and_source_offset() {
        let mut dest = PixelBuffer::new(rgba(), 2, 1);
        let src = solid(rgba(), 4, 4, &[1.0, 1.0, 1.0, 1.0]);
        let mut mask = PixelBuffer::new(FormatDescriptor::mask(Precision::F32), 2, 1);
        mask.set_pixel(1, 0, &[0.25]).unwrap();
        let params = CombineParams::new(1.0, BlendMode::Normal).with_mask(Some(AreaSource::new(&mask, 0, 0)));
        let bounds = dest.bounds();
        initial_area(CombineOp::IntenAIntenA, &mut dest, bounds, AreaSource::new(&src, 2, 3), &params)
            .unwrap();
        assert_eq!(dest.pixel(0, 0)[3], 0.0);
        assert_eq!(dest.pixel(1, 0)[3], 0.25);
    }

    #[test]
    fn test_source_area_out_of_range() {
        let mut dest = PixelBuffer::new(rgba(), 2, 2);
        let src = PixelBuffer::new(rgba(), 2, 2);
        let params = CombineParams::new(1.0, BlendMode::Normal);
        let bounds = dest.bounds();
        let err = combine_areas(CombineOp::IntenAIntenA, &mut dest, bounds, AreaSource::new(&src, 1, 0), &params)
            .unwrap_err();
        assert!(matches!(err, OpsError::Core(_)));
    }

    #[test]
    fn test_op_must_match_source_alpha() {
        let mut dest = PixelBuffer::new(rgba(), 1, 1);
        let src = PixelBuffer::new(rgba(), 1, 1);
        let params = CombineParams::new(1.0, BlendMode::Normal);
        let bounds = dest.bounds();
        let err = combine_areas(CombineOp::IntenAInten, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap_err();
        assert!(matches!(err, OpsError::InvalidParameter(_)));
    }

    #[test]
    fn test_locked_alpha_is_preserved() {
        let mut dest = solid(rgba(), 1, 1, &[0.0, 0.0, 0.0, 0.25]);
        let src = solid(rgba(), 1, 1, &[1.0, 1.0, 1.0, 1.0]);
        let affect = ActiveChannels::ALL.lock_alpha(dest.format());
        let params = CombineParams::new(1.0, BlendMode::Normal).with_affect(affect);
        let bounds = dest.bounds();
        combine_areas(CombineOp::IntenAIntenA, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        assert_eq!(dest.pixel(0, 0), &[1.0, 1.0, 1.0, 0.25]);
    }

    #[test]
    fn test_indexed_source_expands_through_colormap() {
        let mut dest = PixelBuffer::new(FormatDescriptor::rgba(Precision::U8), 1, 1);
        let src = solid(FormatDescriptor::indexed(Precision::U8).with_alpha(true), 1, 1, &[1.0, 1.0]);
        let cmap = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
        let params = CombineParams::new(1.0, BlendMode::Normal).with_colormap(&cmap);
        let bounds = dest.bounds();
        initial_area(CombineOp::IndexedIndexedA, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        assert_eq!(dest.pixel(0, 0), &[1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_indexed_destination_thresholds() {
        let fmt = FormatDescriptor::indexed(Precision::U8);
        let mut dest = solid(fmt, 2, 1, &[3.0]);
        let mut src = PixelBuffer::new(fmt.with_alpha(true), 2, 1);
        src.set_pixel(0, 0, &[7.0, 0.4]).unwrap();
        src.set_pixel(1, 0, &[7.0, 0.8]).unwrap();
        let params = CombineParams::new(1.0, BlendMode::Normal);
        let bounds = dest.bounds();
        combine_areas(CombineOp::IndexedIndexedA, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap();
        assert_eq!(dest.pixel(0, 0), &[3.0]);
        assert_eq!(dest.pixel(1, 0), &[7.0]);
    }

    #[test]
    fn test_rgb_onto_indexed_is_rejected() {
        let mut dest = PixelBuffer::new(FormatDescriptor::indexed(Precision::U8), 1, 1);
        let src = PixelBuffer::new(FormatDescriptor::rgb(Precision::U8), 1, 1);
        let params = CombineParams::new(1.0, BlendMode::Normal);
        let bounds = dest.bounds();
        let err = combine_areas(CombineOp::IndexedIndexed, &mut dest, bounds, AreaSource::new(&src, 0, 0), &params)
            .unwrap_err();
        assert!(matches!(err, OpsError::Unsupported(_)));
    }

    #[test]
    fn test_channel_overlay_styles() {
        let mut chan = PixelBuffer::new(FormatDescriptor::mask(Precision::F32), 2, 1);
        chan.set_pixel(0, 0, &[1.0]).unwrap();
        let mut dest = solid(rgba(), 2, 1, &[0.0, 0.0, 0.0, 1.0]);
        let bounds = dest.bounds();
        combine_channel(&mut dest, bounds, AreaSource::new(&chan, 0, 0), OverlayStyle::Selection, [1.0, 0.0, 0.0], 0.5)
            .unwrap();
        assert_abs_diff_eq!(dest.pixel(0, 0)[0], 0.5, epsilon = 1e-6);
        assert_eq!(dest.pixel(1, 0)[0], 0.0);

        let mut dest = solid(rgba(), 2, 1, &[0.0, 0.0, 0.0, 1.0]);
        let bounds = dest.bounds();
        combine_channel(&mut dest, bounds, AreaSource::new(&chan, 0, 0), OverlayStyle::MaskDisplay, [1.0, 0.0, 0.0], 1.0)
            .unwrap();
        assert_eq!(dest.pixel(0, 0)[0], 0.0);
        assert_eq!(dest.pixel(1, 0)[0], 1.0);
    }

    #[test]
    fn test_initial_channel_sets_alpha_from_coverage() {
        let chan = solid(FormatDescriptor::mask(Precision::F32), 1, 1, &[0.5]);
        let mut dest = PixelBuffer::new(rgba(), 1, 1);
        let bounds = dest.bounds();
        initial_channel(&mut dest, bounds, AreaSource::new(&chan, 0, 0), OverlayStyle::Selection, [0.0, 1.0, 0.0], 0.5)
            .unwrap();
        assert_eq!(dest.pixel(0, 0), &[0.0, 1.0, 0.0, 0.25]);
    }

    #[test]
    fn test_copy_gray_and_apply_mask() {
        let mask = solid(FormatDescriptor::mask(Precision::F32), 2, 2, &[0.5]);
        let mut dest = PixelBuffer::new(rgba(), 2, 2);
        let bounds = dest.bounds();
        copy_gray_to_area(&mut dest, bounds, AreaSource::new(&mask, 0, 0)).unwrap();
        assert_eq!(dest.pixel(1, 1), &[0.5, 0.5, 0.5, 1.0]);

        apply_mask_to_alpha(&mut dest, &mask).unwrap();
        assert_eq!(dest.pixel(0, 0)[3], 0.5);
        let small = PixelBuffer::new(FormatDescriptor::mask(Precision::F32), 1, 1);
        assert!(matches!(apply_mask_to_alpha(&mut dest, &small), Err(OpsError::SizeMismatch(_))));
    }
}
