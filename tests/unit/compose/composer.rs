use super::*;
use crate::settings::{CanvasColors, LayoutSettings};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn settings(ken_burns: bool) -> RenderSettings {
    RenderSettings {
        output_width: 320,
        output_height: 240,
        ken_burns,
        layout: LayoutSettings {
            margin_horizontal: 16.0,
            margin_vertical: 12.0,
            padding: 8.0,
        },
        canvas: CanvasColors {
            background: 0.0,
            paper: 1.0,
            stroke: 0.5,
            text: 0.25,
        },
        ..RenderSettings::default()
    }
}

fn composer(ken_burns: bool) -> FrameComposer {
    FrameComposer::with_fontdb(&settings(ken_burns), Arc::new(usvg::fontdb::Database::new()))
}

fn asset(index: usize, color: [u8; 4]) -> RenderAsset {
    let px = Rgba8Premul::from_straight_rgba(color[0], color[1], color[2], color[3]);
    RenderAsset::new(index, format!("{index}.jpg"), Surface::filled(400, 300, px))
}

fn layer(clip_index: usize, opacity: f32) -> TimelineLayer {
    TimelineLayer {
        clip_index,
        opacity,
        progress: 0.5,
    }
}

#[test]
fn make_clip_lays_out_paper_and_static_photo() {
    let clip = composer(false).make_clip(&asset(0, RED)).unwrap();
    assert_eq!(clip.photo_rect().width, 192);
    assert_eq!(clip.photo_rect().height, 144);
    assert_eq!((clip.paper.x, clip.paper.y), (56, 12));
    assert_eq!(clip.paper.surface.width(), 208);

    let baked = clip.static_photo.as_ref().unwrap();
    assert_eq!((baked.x, baked.y), (64, 20));
    assert_eq!(baked.surface.width(), 192);
    assert_eq!(baked.surface.pixel(96, 72), RED);
    assert!(clip.byte_len() > clip.photo.byte_len());
}

#[test]
fn ken_burns_clip_has_no_static_photo() {
    let clip = composer(true).make_clip(&asset(0, RED)).unwrap();
    assert!(clip.static_photo.is_none());
    assert!(clip.photo.width() <= 200);
}

#[test]
fn single_layer_frame_shows_background_paper_and_photo() {
    let c = composer(false);
    let clip = Arc::new(c.make_clip(&asset(0, RED)).unwrap());
    let frame = c.compose_frame(&[(layer(0, 1.0), clip)]);

    assert_eq!((frame.width(), frame.height()), (320, 240));
    assert_eq!(frame.pixel(5, 5), [0, 0, 0, 255]);
    assert_eq!(frame.pixel(58, 14), [255, 255, 255, 255]);
    assert_eq!(frame.pixel(160, 92), RED);
}

#[test]
fn live_ken_burns_frame_keeps_photo_centered() {
    let c = composer(true);
    let clip = Arc::new(c.make_clip(&asset(0, RED)).unwrap());
    let frame = c.compose_frame(&[(layer(0, 1.0), clip)]);
    assert_eq!(frame.pixel(160, 92), RED);
}

#[test]
fn later_clip_paints_over_earlier_one() {
    let c = composer(false);
    let a = Arc::new(c.make_clip(&asset(0, RED)).unwrap());
    let b = Arc::new(c.make_clip(&asset(1, BLUE)).unwrap());

    let frame = c.compose_frame(&[(layer(0, 1.0), a.clone()), (layer(1, 1.0), b.clone())]);
    assert_eq!(frame.pixel(160, 92), BLUE);

    let mid = c.compose_frame(&[(layer(0, 0.5), a), (layer(1, 0.5), b)]);
    let px = mid.pixel(160, 92);
    assert!(px[0] > 0 && px[2] > 0, "expected a blend, got {px:?}");
}

#[test]
fn overlay_stroke_stays_on_top_of_crossfade() {
    let c = composer(false);
    let a = Arc::new(c.make_clip(&asset(0, RED)).unwrap());
    let b = Arc::new(c.make_clip(&asset(1, BLUE)).unwrap());
    let frame = c.compose_frame(&[(layer(0, 1.0), a), (layer(1, 1.0), b)]);

    // Column just left of the photo rect carries the stroke, not bare paper.
    assert_ne!(frame.pixel(63, 92), [255, 255, 255, 255]);
}

#[test]
fn invisible_layers_are_skipped() {
    let c = composer(false);
    let clip = Arc::new(c.make_clip(&asset(0, RED)).unwrap());
    let frame = c.compose_frame(&[(layer(0, 0.0005), clip)]);
    assert_eq!(frame.pixel(160, 92), [0, 0, 0, 255]);
}

#[test]
fn orientation_strategy_rotates_on_disagreement() {
    let landscape = Surface::new(4, 2);
    let portrait = Surface::new(2, 4);

    let r = orient(&landscape, OrientationStrategy::ForcePortrait);
    assert_eq!((r.width(), r.height()), (2, 4));
    let r = orient(&landscape, OrientationStrategy::ForceLandscape);
    assert_eq!((r.width(), r.height()), (4, 2));
    let r = orient(&portrait, OrientationStrategy::ForceLandscape);
    assert_eq!((r.width(), r.height()), (4, 2));
    let r = orient(&portrait, OrientationStrategy::FollowAsset);
    assert_eq!((r.width(), r.height()), (2, 4));
    let square = orient(&Surface::new(3, 3), OrientationStrategy::ForcePortrait);
    assert_eq!((square.width(), square.height()), (3, 3));
}
