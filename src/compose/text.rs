//! Text overlay: the photo's 1-px frame stroke plus the metadata caption.
//!
//! Both are emitted as a tiny SVG document and rasterized with `resvg`, so caption shaping uses
//! whatever fonts the shared `fontdb` resolved.

use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Context as _;

use crate::compose::composite::Layer;
use crate::compose::layout::{FrameLayout, PixelRect};
use crate::compose::surface::Surface;
use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{RenderError, RenderResult};
use crate::settings::{CanvasColors, PlateSettings};

/// System font database, loaded once per composer.
pub(crate) fn system_fontdb() -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    tracing::debug!(faces = db.len(), "loaded caption fonts");
    Arc::new(db)
}

pub(crate) struct OverlayPainter {
    fontdb: Arc<usvg::fontdb::Database>,
    plate: PlateSettings,
    text_color: String,
    stroke_color: String,
}

impl OverlayPainter {
    pub(crate) fn new(
        fontdb: Arc<usvg::fontdb::Database>,
        plate: PlateSettings,
        colors: CanvasColors,
    ) -> Self {
        Self {
            fontdb,
            plate,
            text_color: svg_gray(colors.text),
            stroke_color: svg_gray(colors.stroke),
        }
    }

    /// Transparent layer holding the stroke and (when enabled and non-empty) the caption.
    pub(crate) fn render(&self, layout: &FrameLayout, caption: &str) -> RenderResult<Layer> {
        let ring = PixelRect {
            x: layout.photo.x - 1,
            y: layout.photo.y - 1,
            width: layout.photo.width + 2,
            height: layout.photo.height + 2,
        };
        let caption = caption.trim();
        let show_caption = self.plate.enabled && !caption.is_empty();
        let bounds = match (show_caption, layout.plate_band) {
            (true, Some(band)) => union(ring, band),
            _ => ring,
        };

        let svg = self.svg_document(layout, bounds, show_caption.then_some(caption));
        let options = usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Default::default()
        };
        let tree = usvg::Tree::from_str(&svg, &options)
            .context("parse overlay svg")
            .map_err(RenderError::from)?;
        let mut pixmap = resvg::tiny_skia::Pixmap::new(bounds.width, bounds.height)
            .ok_or_else(|| RenderError::validation("overlay has zero size"))?;
        resvg::render(
            &tree,
            resvg::tiny_skia::Transform::identity(),
            &mut pixmap.as_mut(),
        );

        let surface = Surface::from_premul(bounds.width, bounds.height, pixmap.take())?;
        Ok(Layer::new(surface, bounds.x, bounds.y))
    }

    fn svg_document(&self, layout: &FrameLayout, bounds: PixelRect, caption: Option<&str>) -> String {
        let (ox, oy) = (f64::from(bounds.x), f64::from(bounds.y));
        let photo = layout.photo;
        let mut svg = String::new();
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = bounds.width,
            h = bounds.height
        );
        let _ = write!(
            svg,
            r#"<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="{}" stroke-width="1"/>"#,
            f64::from(photo.x) - 0.5 - ox,
            f64::from(photo.y) - 0.5 - oy,
            f64::from(photo.width) + 1.0,
            f64::from(photo.height) + 1.0,
            self.stroke_color
        );
        if let (Some(text), Some((cx, baseline))) = (caption, layout.caption_anchor) {
            let _ = write!(
                svg,
                r#"<text x="{}" y="{}" font-family="sans-serif" font-size="{}" text-anchor="middle" fill="{}">{}</text>"#,
                cx - ox,
                baseline - oy,
                self.plate.font_size,
                self.text_color,
                escape_xml(text)
            );
        }
        svg.push_str("</svg>");
        svg
    }
}

fn union(a: PixelRect, b: PixelRect) -> PixelRect {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    PixelRect {
        x,
        y,
        width: (a.right().max(b.right()) - x).max(0) as u32,
        height: (a.bottom().max(b.bottom()) - y).max(0) as u32,
    }
}

fn svg_gray(level: f64) -> String {
    let [r, g, b, _] = Rgba8Premul::gray(level).to_array();
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
