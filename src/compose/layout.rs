//! Mat/photo/plate geometry for one oriented image on the output canvas.

use crate::foundation::core::{Canvas, Rect, Size};
use crate::settings::{LayoutSettings, PlatePlacement, PlateSettings};

/// Whole-pixel rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    /// Snap a float rect by rounding each edge to the nearest pixel.
    pub fn from_rect(r: Rect) -> Self {
        let r = r.round();
        Self {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width: r.width().max(0.0) as u32,
            height: r.height().max(0.0) as u32,
        }
    }

    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(self) -> i32 {
        self.y + self.height as i32
    }

    pub fn center(self) -> (f64, f64) {
        (
            f64::from(self.x) + f64::from(self.width) / 2.0,
            f64::from(self.y) + f64::from(self.height) / 2.0,
        )
    }
}

/// Resolved geometry for one clip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameLayout {
    /// Paper mat behind the photo.
    pub paper: PixelRect,
    /// Where the photo is drawn.
    pub photo: PixelRect,
    /// Caption band, when the plate is enabled.
    pub plate_band: Option<PixelRect>,
    /// Caption baseline (y) and horizontal center (x).
    pub caption_anchor: Option<(f64, f64)>,
}

/// Computes [`FrameLayout`]s for a fixed canvas and settings.
#[derive(Clone, Copy, Debug)]
pub struct LayoutEngine {
    canvas: Canvas,
    layout: LayoutSettings,
    plate: PlateSettings,
}

impl LayoutEngine {
    pub fn new(canvas: Canvas, layout: LayoutSettings, plate: PlateSettings) -> Self {
        Self {
            canvas,
            layout,
            plate,
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Lay out an image of `image` pixels.
    pub fn layout(&self, image: Size) -> FrameLayout {
        let pad = self.layout.padding;
        let plate_h = if self.plate.enabled {
            self.plate.height
        } else {
            0.0
        };
        let (in_frame_h, below_h) = match self.plate.placement {
            PlatePlacement::InFrame => (plate_h, 0.0),
            PlatePlacement::BelowCanvas => (0.0, plate_h),
        };

        let canvas = self.canvas.rect();
        let available = Rect::new(
            canvas.x0 + self.layout.margin_horizontal,
            canvas.y0 + self.layout.margin_vertical,
            (canvas.x1 - self.layout.margin_horizontal).max(canvas.x0 + self.layout.margin_horizontal),
            (canvas.y1 - self.layout.margin_vertical - below_h)
                .max(canvas.y0 + self.layout.margin_vertical),
        );

        let box_size = Size::new(
            (available.width() - 2.0 * pad).max(1.0),
            (available.height() - 2.0 * pad - in_frame_h).max(1.0),
        );
        let photo_size = aspect_fit(image, box_size);

        let paper_size = Size::new(
            photo_size.width + 2.0 * pad,
            photo_size.height + 2.0 * pad + in_frame_h,
        );
        let paper_origin = (
            available.x0 + (available.width() - paper_size.width) / 2.0,
            available.y0 + (available.height() - paper_size.height) / 2.0,
        );
        let paper = Rect::from_origin_size(paper_origin, paper_size);
        let photo = Rect::from_origin_size((paper.x0 + pad, paper.y0 + pad), photo_size);

        let paper = PixelRect::from_rect(paper);
        let photo = PixelRect::from_rect(photo);

        let plate_band = self.plate.enabled.then(|| match self.plate.placement {
            PlatePlacement::InFrame => PixelRect {
                x: paper.x,
                y: paper.bottom() - plate_h.round() as i32,
                width: paper.width,
                height: plate_h.round() as u32,
            },
            PlatePlacement::BelowCanvas => PixelRect {
                x: paper.x,
                y: paper.bottom(),
                width: paper.width,
                height: plate_h.round() as u32,
            },
        });
        let caption_anchor = plate_band.map(|band| {
            (
                photo.center().0,
                f64::from(band.bottom()) - self.plate.baseline_offset,
            )
        });

        FrameLayout {
            paper,
            photo,
            plate_band,
            caption_anchor,
        }
    }
}

/// Largest size with `image`'s aspect ratio that fits inside `bounds`.
pub fn aspect_fit(image: Size, bounds: Size) -> Size {
    if image.width <= 0.0 || image.height <= 0.0 {
        return Size::ZERO;
    }
    let scale = (bounds.width / image.width).min(bounds.height / image.height);
    Size::new(image.width * scale, image.height * scale)
}

#[cfg(test)]
#[path = "../../tests/unit/compose/layout.rs"]
mod tests;
