use crate::compose::surface::Surface;
use crate::foundation::math::{mul_div255_u8, opacity_to_u8};

pub(crate) type PremulRgba8 = [u8; 4];

/// At or above this opacity a layer is composited as fully opaque (no matte multiply).
pub(crate) const OPAQUE_THRESHOLD: f32 = 0.999;
/// At or below this opacity a layer is skipped.
pub(crate) const INVISIBLE_THRESHOLD: f32 = 0.001;

/// A surface placed at an integer offset on the canvas.
#[derive(Clone, Debug)]
pub struct Layer {
    pub surface: Surface,
    pub x: i32,
    pub y: i32,
}

impl Layer {
    pub fn new(surface: Surface, x: i32, y: i32) -> Self {
        Self { surface, x, y }
    }

    pub fn byte_len(&self) -> usize {
        self.surface.byte_len()
    }
}

/// Source-over of one premultiplied pixel with an extra opacity (`0..=255`).
pub(crate) fn over(dst: PremulRgba8, src: PremulRgba8, op: u16) -> PremulRgba8 {
    if op == 0 || src[3] == 0 {
        return dst;
    }

    let sa = if op == 255 {
        src[3]
    } else {
        mul_div255(u16::from(src[3]), op)
    };
    if sa == 0 {
        return dst;
    }
    if sa == 255 && op == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa, mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = if op == 255 {
            src[i]
        } else {
            mul_div255(u16::from(src[i]), op)
        };
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc, dc);
    }
    out
}

/// Composite `layer` onto `dst` at `opacity`, clipping to the destination bounds.
///
/// Opacity `>= 0.999` composites directly; `<= 0.001` is a no-op.
pub(crate) fn draw_layer(dst: &mut Surface, layer: &Layer, opacity: f32) {
    if !opacity.is_finite() || opacity <= INVISIBLE_THRESHOLD {
        return;
    }
    let op = if opacity >= OPAQUE_THRESHOLD {
        255
    } else {
        opacity_to_u8(opacity)
    };

    let src = &layer.surface;
    let dst_w = dst.width() as i64;
    let dst_h = dst.height() as i64;
    let x0 = i64::from(layer.x).max(0);
    let y0 = i64::from(layer.y).max(0);
    let x1 = (i64::from(layer.x) + i64::from(src.width())).min(dst_w);
    let y1 = (i64::from(layer.y) + i64::from(src.height())).min(dst_h);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let span = ((x1 - x0) as usize) * 4;
    let src_w = src.width() as usize;
    let dst_stride = dst.width() as usize * 4;
    let src_data = src.data();
    let dst_data = dst.data_mut();

    for y in y0..y1 {
        let sy = (y - i64::from(layer.y)) as usize;
        let sx = (x0 - i64::from(layer.x)) as usize;
        let s_off = (sy * src_w + sx) * 4;
        let d_off = (y as usize) * dst_stride + (x0 as usize) * 4;
        let s_row = &src_data[s_off..s_off + span];
        let d_row = &mut dst_data[d_off..d_off + span];
        for (d, s) in d_row.chunks_exact_mut(4).zip(s_row.chunks_exact(4)) {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], op);
            d.copy_from_slice(&out);
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    mul_div255_u8(x, y)
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/composite.rs"]
mod tests;
