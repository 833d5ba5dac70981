use super::*;

fn spans(segs: &[AudioSegment]) -> Vec<(f64, f64)> {
    segs.iter().map(|s| (s.start, s.end)).collect()
}

#[test]
fn loop_covers_video_with_truncated_tail() {
    let segs = plan_audio_segments(4.0, 10.0, true);
    assert_eq!(spans(&segs), vec![(0.0, 4.0), (4.0, 8.0), (8.0, 10.0)]);
    assert!((segs[2].duration() - 2.0).abs() < 1e-12);
}

#[test]
fn loop_segments_are_contiguous() {
    for (audio, video) in [(3.3, 10.0), (0.7, 7.0), (10.0, 10.0), (12.0, 5.0)] {
        let segs = plan_audio_segments(audio, video, true);
        assert_eq!(segs[0].start, 0.0);
        for w in segs.windows(2) {
            assert_eq!(w[0].end, w[1].start);
        }
        assert!((segs.last().unwrap().end - video).abs() < 1e-9);
        assert!(segs.iter().all(|s| s.duration() <= audio + 1e-12));
    }
}

#[test]
fn without_loop_plays_once_truncated() {
    assert_eq!(spans(&plan_audio_segments(4.0, 10.0, false)), vec![(0.0, 4.0)]);
    assert_eq!(spans(&plan_audio_segments(30.0, 10.0, false)), vec![(0.0, 10.0)]);
}

#[test]
fn exact_multiple_has_no_sliver() {
    let segs = plan_audio_segments(2.5, 10.0, true);
    assert_eq!(segs.len(), 4);
}

#[test]
fn degenerate_durations_yield_nothing() {
    assert!(plan_audio_segments(0.0, 10.0, true).is_empty());
    assert!(plan_audio_segments(4.0, 0.0, false).is_empty());
    assert!(plan_audio_segments(f64::NAN, 10.0, true).is_empty());
}
