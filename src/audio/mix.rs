use std::path::Path;

use anyhow::Context as _;

use crate::audio::media::AudioPcm;
use crate::audio::plan::AudioSegment;
use crate::foundation::error::RenderResult;

/// Seconds to the nearest sample index. Adjacent segments share boundaries, so rounding both
/// ends the same way keeps them gap-free.
pub(crate) fn sec_to_sample(sec: f64, sample_rate: u32) -> usize {
    (sec.max(0.0) * f64::from(sample_rate)).round() as usize
}

/// Render `segments` of `source` into an interleaved stereo buffer covering `total_frames`.
///
/// Each segment replays the source from sample 0. `volume` scales everything uniformly; output
/// is clamped to `-1..=1`.
pub(crate) fn render_track(
    source: &AudioPcm,
    segments: &[AudioSegment],
    volume: f32,
    total_frames: usize,
) -> Vec<f32> {
    let channels = usize::from(source.channels.max(1));
    let mut out = vec![0.0f32; total_frames * 2];
    let src = source.interleaved_f32.as_slice();
    let src_frames = source.frames();
    if src_frames == 0 {
        return out;
    }

    for seg in segments {
        let start = sec_to_sample(seg.start, source.sample_rate).min(total_frames);
        let end = sec_to_sample(seg.end, source.sample_rate).min(total_frames);
        for (rel, dst_frame) in (start..end).enumerate() {
            if rel >= src_frames {
                break;
            }
            let i = rel * channels;
            let (l, r) = if channels == 1 {
                (src[i], src[i])
            } else {
                (src[i], src[i + 1])
            };
            out[dst_frame * 2] = (l * volume).clamp(-1.0, 1.0);
            out[dst_frame * 2 + 1] = (r * volume).clamp(-1.0, 1.0);
        }
    }
    out
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub(crate) fn write_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> RenderResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes)
        .with_context(|| format!("write mixed audio '{}'", out_path.display()))?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/audio/mix.rs"]
mod tests;
