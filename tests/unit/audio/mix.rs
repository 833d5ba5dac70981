use super::*;
use crate::audio::plan::plan_audio_segments;

/// Mono-valued stereo ramp: frame `i` has value `(i + 1) / 100`.
fn ramp(frames: usize, sample_rate: u32) -> AudioPcm {
    let mut interleaved_f32 = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let v = (i + 1) as f32 / 100.0;
        interleaved_f32.extend_from_slice(&[v, v]);
    }
    AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32,
    }
}

#[test]
fn looped_track_restarts_each_segment() {
    // 4 frames of audio at 1 Hz under 10 s of video.
    let src = ramp(4, 1);
    let segs = plan_audio_segments(4.0, 10.0, true);
    let out = render_track(&src, &segs, 1.0, 10);

    let left: Vec<f32> = out.chunks_exact(2).map(|f| f[0]).collect();
    assert_eq!(
        left,
        vec![0.01, 0.02, 0.03, 0.04, 0.01, 0.02, 0.03, 0.04, 0.01, 0.02]
    );
}

#[test]
fn unlooped_track_leaves_silence_after_it_ends() {
    let src = ramp(3, 1);
    let segs = plan_audio_segments(3.0, 5.0, false);
    let out = render_track(&src, &segs, 1.0, 5);
    assert_eq!(out.len(), 10);
    assert_eq!(&out[6..], &[0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn volume_scales_and_output_is_clamped() {
    let src = AudioPcm {
        sample_rate: 1,
        channels: 2,
        interleaved_f32: vec![0.5, -0.5, 2.0, -2.0],
    };
    let segs = plan_audio_segments(2.0, 2.0, false);
    let out = render_track(&src, &segs, 0.5, 2);
    assert_eq!(out, vec![0.25, -0.25, 1.0, -1.0]);
}

#[test]
fn mono_source_is_duplicated_to_both_channels() {
    let src = AudioPcm {
        sample_rate: 1,
        channels: 1,
        interleaved_f32: vec![0.1, 0.2],
    };
    let out = render_track(&src, &plan_audio_segments(2.0, 2.0, false), 1.0, 2);
    assert_eq!(out, vec![0.1, 0.1, 0.2, 0.2]);
}

#[test]
fn f32le_file_round_trips_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mix.f32le");
    write_f32le_file(&[1.0, -0.5], &path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 8);
    assert_eq!(f32::from_le_bytes(bytes[4..8].try_into().unwrap()), -0.5);
}
