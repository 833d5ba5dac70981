use super::*;

#[test]
fn fps_validation() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::new(25, 1).unwrap().as_f64(), 25.0);
}

#[test]
fn frames_to_cover_rounds_up_but_not_on_exact_multiples() {
    let fps = Fps::new(30, 1).unwrap();
    assert_eq!(fps.frames_to_cover(7.0), 210);
    assert_eq!(fps.frames_to_cover(7.01), 211);
    assert_eq!(fps.frames_to_cover(0.0), 0);

    let ntsc = Fps::new(30_000, 1001).unwrap();
    assert_eq!(ntsc.frames_to_cover(1.0), 30);
}

#[test]
fn frame_to_secs_uses_rational_fps() {
    let fps = Fps::new(24, 1).unwrap();
    assert!((fps.frame_to_secs(FrameIndex(48)) - 2.0).abs() < 1e-12);
}

#[test]
fn gray_levels_are_opaque() {
    assert_eq!(Rgba8Premul::gray(0.0).to_array(), [0, 0, 0, 255]);
    assert_eq!(Rgba8Premul::gray(1.0).to_array(), [255, 255, 255, 255]);
    assert_eq!(Rgba8Premul::gray(2.0).r, 255);
}

#[test]
fn premultiply_half_alpha() {
    let c = Rgba8Premul::from_straight_rgba(200, 100, 0, 128);
    assert_eq!(c.to_array(), [100, 50, 0, 128]);
}
