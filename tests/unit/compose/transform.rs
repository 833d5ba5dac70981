use super::*;
use crate::compose::layout::PixelRect;
use crate::foundation::core::Rgba8Premul;

fn rect(width: u32, height: u32) -> PixelRect {
    PixelRect {
        x: 0,
        y: 0,
        width,
        height,
    }
}

#[test]
fn ken_burns_midpoint_is_centered() {
    let m = KenBurns::at(0.5, 0);
    assert!((m.scale - 1.02).abs() < 1e-9);
    assert!(m.pan.x.abs() < 1e-9 && m.pan.y.abs() < 1e-9);
}

#[test]
fn ken_burns_direction_alternates_by_parity() {
    let even = KenBurns::at(1.0, 2);
    let odd = KenBurns::at(1.0, 3);
    assert!((even.pan.x - 15.0).abs() < 1e-9);
    assert!((odd.pan.x + 15.0).abs() < 1e-9);
    assert!((even.pan.y - 9.0).abs() < 1e-9);
    assert!((odd.pan.y - 9.0).abs() < 1e-9);
    assert!((even.scale - 1.04).abs() < 1e-9);
}

#[test]
fn identity_fill_covers_rect() {
    let color = Rgba8Premul::from_straight_rgba(200, 40, 10, 255).to_array();
    let src = Surface::filled(4, 2, Rgba8Premul::from_straight_rgba(200, 40, 10, 255));
    let out = render_photo(&src, rect(8, 4), KenBurns::IDENTITY);
    assert_eq!(out.width(), 8);
    assert_eq!(out.height(), 4);
    for y in 0..4 {
        for x in 0..8 {
            assert_eq!(out.pixel(x, y), color);
        }
    }
}

#[test]
fn pan_exposes_transparent_edge() {
    let src = Surface::filled(4, 2, Rgba8Premul::gray(1.0));
    let motion = KenBurns {
        scale: 1.0,
        pan: Vec2::new(2.0, 0.0),
    };
    let out = render_photo(&src, rect(8, 4), motion);
    assert_eq!(out.pixel(0, 1), [0, 0, 0, 0]);
    assert_eq!(out.pixel(7, 1), [255, 255, 255, 255]);
}

#[test]
fn fit_source_downscales_large_photos_only() {
    let big = Surface::filled(100, 100, Rgba8Premul::gray(0.5));
    let fitted = fit_source(big, rect(10, 10));
    assert_eq!((fitted.width(), fitted.height()), (11, 11));

    let small = Surface::filled(6, 6, Rgba8Premul::gray(0.5));
    let kept = fit_source(small.clone(), rect(10, 10));
    assert_eq!(kept, small);
}
