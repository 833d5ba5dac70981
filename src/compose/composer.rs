use std::sync::Arc;

use crate::assets::RenderAsset;
use crate::compose::composite::{INVISIBLE_THRESHOLD, Layer, draw_layer};
use crate::compose::layout::{FrameLayout, LayoutEngine, PixelRect};
use crate::compose::surface::{Frame, Surface};
use crate::compose::text::{OverlayPainter, system_fontdb};
use crate::compose::transform::{KenBurns, fit_source, render_photo};
use crate::foundation::core::{Canvas, Rgba8Premul, Size};
use crate::foundation::error::RenderResult;
use crate::settings::{OrientationStrategy, RenderSettings};
use crate::timeline::TimelineLayer;

/// Everything needed to draw one source image, independent of time.
#[derive(Clone, Debug)]
pub struct ComposedClip {
    pub index: usize,
    pub layout: FrameLayout,
    /// Flat mat behind the photo.
    pub paper: Layer,
    /// Oriented photo, pre-scaled close to the photo rect; source for live Ken Burns frames.
    pub photo: Surface,
    /// Photo already fitted into the photo rect. Present when Ken Burns is off.
    pub static_photo: Option<Layer>,
    /// Frame stroke and caption on a transparent layer.
    pub overlay: Layer,
}

impl ComposedClip {
    pub fn photo_rect(&self) -> PixelRect {
        self.layout.photo
    }

    pub fn byte_len(&self) -> usize {
        self.paper.byte_len()
            + self.photo.byte_len()
            + self.static_photo.as_ref().map_or(0, Layer::byte_len)
            + self.overlay.byte_len()
    }
}

/// Builds [`ComposedClip`]s and blends them into frames. Stateless apart from settings.
pub struct FrameComposer {
    canvas: Canvas,
    layout: LayoutEngine,
    orientation: OrientationStrategy,
    ken_burns: bool,
    background: Rgba8Premul,
    paper: Rgba8Premul,
    overlay: OverlayPainter,
}

impl FrameComposer {
    /// Composer using the system fonts for captions.
    pub fn new(settings: &RenderSettings) -> Self {
        Self::with_fontdb(settings, system_fontdb())
    }

    pub fn with_fontdb(settings: &RenderSettings, fontdb: Arc<usvg::fontdb::Database>) -> Self {
        let canvas = settings.canvas();
        Self {
            canvas,
            layout: LayoutEngine::new(canvas, settings.layout, settings.plate),
            orientation: settings.orientation,
            ken_burns: settings.ken_burns,
            background: Rgba8Premul::gray(settings.canvas.background),
            paper: Rgba8Premul::gray(settings.canvas.paper),
            overlay: OverlayPainter::new(fontdb, settings.plate, settings.canvas),
        }
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Orient, lay out, and pre-render the static layers of one image.
    pub fn make_clip(&self, asset: &RenderAsset) -> RenderResult<ComposedClip> {
        let oriented = orient(&asset.image, self.orientation);
        let layout = self.layout.layout(Size::new(
            f64::from(oriented.width()),
            f64::from(oriented.height()),
        ));

        let paper = Layer::new(
            Surface::filled(layout.paper.width, layout.paper.height, self.paper),
            layout.paper.x,
            layout.paper.y,
        );
        let photo = fit_source(oriented, layout.photo);
        let static_photo = (!self.ken_burns).then(|| {
            Layer::new(
                render_photo(&photo, layout.photo, KenBurns::IDENTITY),
                layout.photo.x,
                layout.photo.y,
            )
        });
        let overlay = self.overlay.render(&layout, &asset.caption())?;

        Ok(ComposedClip {
            index: asset.index,
            layout,
            paper,
            photo,
            static_photo,
            overlay,
        })
    }

    /// Blend the active clips into one frame.
    ///
    /// `layers` must be ascending by clip index: earlier clips are painted underneath. Overlays go
    /// on top of every photo so captions and strokes stay crisp through a crossfade.
    pub fn compose_frame(&self, layers: &[(TimelineLayer, Arc<ComposedClip>)]) -> Frame {
        debug_assert!(
            layers
                .windows(2)
                .all(|w| w[0].0.clip_index < w[1].0.clip_index),
            "layers must be ascending by clip index"
        );

        let mut frame = Surface::filled(self.canvas.width, self.canvas.height, self.background);
        for (layer, clip) in layers {
            if layer.opacity <= INVISIBLE_THRESHOLD {
                continue;
            }
            draw_layer(&mut frame, &clip.paper, layer.opacity);
            match &clip.static_photo {
                Some(baked) => draw_layer(&mut frame, baked, layer.opacity),
                None => {
                    let rect = clip.layout.photo;
                    let motion = KenBurns::at(layer.progress, clip.index);
                    let live = Layer::new(render_photo(&clip.photo, rect, motion), rect.x, rect.y);
                    draw_layer(&mut frame, &live, layer.opacity);
                }
            }
        }
        for (layer, clip) in layers {
            draw_layer(&mut frame, &clip.overlay, layer.opacity);
        }
        frame
    }
}

/// Quarter-turn the image when its aspect disagrees with a forced orientation.
pub(crate) fn orient(image: &Surface, strategy: OrientationStrategy) -> Surface {
    let landscape = image.width() > image.height();
    let portrait = image.height() > image.width();
    let rotate = match strategy {
        OrientationStrategy::FollowAsset => false,
        OrientationStrategy::ForceLandscape => portrait,
        OrientationStrategy::ForcePortrait => landscape,
    };
    if rotate {
        image.rotate90()
    } else {
        image.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/composer.rs"]
mod tests;
