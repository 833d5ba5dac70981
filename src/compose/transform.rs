//! Photo placement: aspect-fit into the photo rect plus the optional Ken Burns motion.

use image::RgbaImage;
use image::imageops::{self, FilterType};
use rayon::prelude::*;

use crate::compose::layout::PixelRect;
use crate::compose::surface::Surface;
use crate::foundation::core::{Affine, Point, Vec2};
use crate::foundation::math::lerp_f32;

/// Zoom gained over a clip's full window.
pub(crate) const KEN_BURNS_ZOOM: f64 = 0.04;
/// Horizontal travel in pixels over a clip's full window.
pub(crate) const KEN_BURNS_PAN_X: f64 = 30.0;
/// Vertical travel in pixels over a clip's full window.
pub(crate) const KEN_BURNS_PAN_Y: f64 = 18.0;

/// Pan/zoom parameters at one point of a clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KenBurns {
    pub scale: f64,
    pub pan: Vec2,
}

impl KenBurns {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        pan: Vec2::ZERO,
    };

    /// Motion for `progress` within clip `clip_index`. Even clips drift right, odd clips left.
    pub fn at(progress: f32, clip_index: usize) -> Self {
        let p = f64::from(progress.clamp(0.0, 1.0));
        let dir = if clip_index.is_multiple_of(2) { 1.0 } else { -1.0 };
        Self {
            scale: 1.0 + KEN_BURNS_ZOOM * p,
            pan: Vec2::new((p - 0.5) * KEN_BURNS_PAN_X * dir, (p - 0.5) * KEN_BURNS_PAN_Y),
        }
    }

    /// Transform in photo-rect local pixels, applied about the rect center.
    fn affine(self, rect: PixelRect) -> Affine {
        let c = Point::new(f64::from(rect.width) / 2.0, f64::from(rect.height) / 2.0);
        Affine::translate(self.pan)
            * Affine::translate(c.to_vec2())
            * Affine::scale(self.scale)
            * Affine::translate(-c.to_vec2())
    }
}

/// Downscale `photo` so it is no larger than `rect` at maximum zoom.
///
/// Sampling from a source close to the output size keeps bilinear filtering from aliasing.
pub(crate) fn fit_source(photo: Surface, rect: PixelRect) -> Surface {
    let max_zoom = 1.0 + KEN_BURNS_ZOOM;
    let target_w = (f64::from(rect.width) * max_zoom).ceil().max(1.0) as u32;
    let target_h = (f64::from(rect.height) * max_zoom).ceil().max(1.0) as u32;
    if photo.width() <= target_w || photo.height() <= target_h {
        return photo;
    }

    let (w, h) = (photo.width(), photo.height());
    // Premultiplied data resamples correctly with a linear filter.
    let Some(img) = RgbaImage::from_raw(w, h, photo.data().to_vec()) else {
        return photo;
    };
    let resized = imageops::resize(&img, target_w, target_h, FilterType::Triangle);
    Surface::from_premul(target_w, target_h, resized.into_raw()).unwrap_or(photo)
}

/// Render `photo` aspect-fit into a surface the size of `rect`, with `motion` applied.
///
/// Pixels that map outside the photo are left transparent.
pub(crate) fn render_photo(photo: &Surface, rect: PixelRect, motion: KenBurns) -> Surface {
    let mut out = Surface::new(rect.width, rect.height);
    if rect.is_empty() || photo.width() == 0 || photo.height() == 0 {
        return out;
    }

    let (pw, ph) = (f64::from(photo.width()), f64::from(photo.height()));
    let (rw, rh) = (f64::from(rect.width), f64::from(rect.height));
    let fit = (rw / pw).min(rh / ph);
    let offset = Vec2::new((rw - pw * fit) / 2.0, (rh - ph * fit) / 2.0);
    let forward = motion.affine(rect) * Affine::translate(offset) * Affine::scale(fit);
    let inverse = forward.inverse();
    let [a, b, c, d, e, f] = inverse.as_coeffs();

    let stride = rect.width as usize * 4;
    out.data_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            let py = y as f64 + 0.5;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let px_x = x as f64 + 0.5;
                let sx = a * px_x + c * py + e;
                let sy = b * px_x + d * py + f;
                if let Some(sample) = sample_bilinear(photo, sx, sy) {
                    px.copy_from_slice(&sample);
                }
            }
        });
    out
}

/// Bilinear sample at continuous coordinates (pixel centers at `n + 0.5`).
fn sample_bilinear(src: &Surface, x: f64, y: f64) -> Option<[u8; 4]> {
    let w = src.width();
    let h = src.height();
    if !(x >= 0.0 && y >= 0.0 && x < f64::from(w) && y < f64::from(h)) {
        return None;
    }

    let fx = (x - 0.5).max(0.0);
    let fy = (y - 0.5).max(0.0);
    let x0 = (fx.floor() as u32).min(w - 1);
    let y0 = (fy.floor() as u32).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let tx = (fx - f64::from(x0)) as f32;
    let ty = (fy - f64::from(y0)) as f32;

    let p00 = src.pixel(x0, y0);
    let p10 = src.pixel(x1, y0);
    let p01 = src.pixel(x0, y1);
    let p11 = src.pixel(x1, y1);

    let mut out = [0u8; 4];
    for i in 0..4 {
        let top = lerp_f32(f32::from(p00[i]), f32::from(p10[i]), tx);
        let bottom = lerp_f32(f32::from(p01[i]), f32::from(p11[i]), tx);
        out[i] = lerp_f32(top, bottom, ty).round().clamp(0.0, 255.0) as u8;
    }
    Some(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/transform.rs"]
mod tests;
