//! ffprobe/ffmpeg helpers for the mux pass.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

use crate::foundation::error::{RenderError, RenderResult};

/// Decoded interleaved PCM.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    pub fn frames(&self) -> usize {
        self.interleaved_f32.len() / usize::from(self.channels.max(1))
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// What ffprobe reports about a media file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaInfo {
    /// Container duration in seconds, if known.
    pub duration: Option<f64>,
    pub has_video: bool,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Run `ffprobe` on `path`.
pub async fn probe(path: &Path) -> RenderResult<MediaInfo> {
    if !path.exists() {
        return Err(RenderError::audio_mux(format!(
            "'{}' does not exist",
            path.display()
        )));
    }

    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RenderError::audio_mux(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(RenderError::audio_mux(format!(
            "ffprobe failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    parse_probe_json(&out.stdout)
}

pub(crate) fn parse_probe_json(json: &[u8]) -> RenderResult<MediaInfo> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| RenderError::audio_mux(format!("ffprobe json parse failed: {e}")))?;

    let has = |kind: &str| {
        parsed
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some(kind))
    };
    let format_duration = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|s| s.parse::<f64>().ok());
    let stream_duration = parsed
        .streams
        .iter()
        .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));

    Ok(MediaInfo {
        duration: format_duration
            .or(stream_duration)
            .filter(|d| d.is_finite() && *d > 0.0),
        has_video: has("video"),
        has_audio: has("audio"),
    })
}

/// Decode the first audio stream of `path` to interleaved stereo `f32` at `sample_rate`.
pub async fn decode_audio_f32_stereo(path: &Path, sample_rate: u32) -> RenderResult<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| RenderError::audio_mux(format!("failed to run ffmpeg for audio decode: {e}")))?;

    if !out.status.success() {
        return Err(RenderError::audio_mux(format!(
            "ffmpeg audio decode failed for '{}': {}",
            path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    pcm_from_f32le(&out.stdout, sample_rate)
}

pub(crate) fn pcm_from_f32le(bytes: &[u8], sample_rate: u32) -> RenderResult<AudioPcm> {
    if !bytes.len().is_multiple_of(4) {
        return Err(RenderError::audio_mux(
            "decoded audio byte length is not aligned to f32 samples",
        ));
    }
    let interleaved_f32 = bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32,
    })
}
