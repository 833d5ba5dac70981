use super::*;
use crate::foundation::core::Rgba8Premul;

#[test]
fn over_opaque_src_replaces_dst() {
    assert_eq!(over([1, 2, 3, 255], [9, 8, 7, 255], 255), [9, 8, 7, 255]);
}

#[test]
fn over_transparent_src_keeps_dst() {
    assert_eq!(over([1, 2, 3, 255], [0, 0, 0, 0], 255), [1, 2, 3, 255]);
    assert_eq!(over([1, 2, 3, 255], [9, 9, 9, 255], 0), [1, 2, 3, 255]);
}

#[test]
fn over_half_opacity_blends() {
    let out = over([0, 0, 0, 255], [255, 255, 255, 255], 128);
    assert_eq!(out[3], 255);
    assert!((i32::from(out[0]) - 128).abs() <= 1);
}

#[test]
fn draw_layer_clips_to_destination() {
    let mut dst = Surface::filled(4, 4, Rgba8Premul::gray(0.0));
    let layer = Layer::new(Surface::filled(3, 3, Rgba8Premul::gray(1.0)), 2, -1);
    draw_layer(&mut dst, &layer, 1.0);

    assert_eq!(dst.pixel(1, 0), [0, 0, 0, 255]);
    assert_eq!(dst.pixel(2, 0), [255, 255, 255, 255]);
    assert_eq!(dst.pixel(3, 1), [255, 255, 255, 255]);
    assert_eq!(dst.pixel(3, 2), [0, 0, 0, 255]);
}

#[test]
fn draw_layer_fully_outside_is_noop() {
    let mut dst = Surface::filled(2, 2, Rgba8Premul::gray(0.0));
    let before = dst.clone();
    let layer = Layer::new(Surface::filled(2, 2, Rgba8Premul::gray(1.0)), 5, 5);
    draw_layer(&mut dst, &layer, 1.0);
    assert_eq!(dst, before);
}

#[test]
fn opacity_fast_paths() {
    let white = Layer::new(Surface::filled(1, 1, Rgba8Premul::gray(1.0)), 0, 0);

    let mut near_opaque = Surface::filled(1, 1, Rgba8Premul::gray(0.0));
    draw_layer(&mut near_opaque, &white, 0.9995);
    assert_eq!(near_opaque.pixel(0, 0), [255, 255, 255, 255]);

    let mut near_clear = Surface::filled(1, 1, Rgba8Premul::gray(0.0));
    draw_layer(&mut near_clear, &white, 0.0005);
    assert_eq!(near_clear.pixel(0, 0), [0, 0, 0, 255]);
}
