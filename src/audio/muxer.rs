use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt as _;
use tokio::process::Command;

use crate::audio::media::{self, AudioPcm};
use crate::audio::mix::{render_track, sec_to_sample, write_f32le_file};
use crate::audio::plan::{AudioSegment, plan_audio_segments};
use crate::audio::{MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{RenderError, RenderResult};
use crate::foundation::fs::{TempFileGuard, sibling_temp_path};
use crate::logging::RenderLogger;
use crate::settings::AudioTrackSettings;

/// How often the mux wait re-checks cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(50);

/// Outcome of a successful mux.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioMuxReport {
    pub video_duration: f64,
    pub audio_duration: f64,
    pub segments: Vec<AudioSegment>,
    pub elapsed: Duration,
}

/// Combines a finished silent video with one (looped or truncated) audio track.
pub struct AudioMuxer {
    track: AudioTrackSettings,
    logger: RenderLogger,
}

impl AudioMuxer {
    pub fn new(track: AudioTrackSettings, logger: RenderLogger) -> Self {
        Self { track, logger }
    }

    /// Write `video` plus the audio track into `out`.
    ///
    /// The video stream is copied untouched. On any failure or cancellation `out` is removed.
    #[tracing::instrument(skip(self, cancel), fields(audio = %self.track.source.display()))]
    pub async fn mux(
        &self,
        video: &Path,
        out: &Path,
        cancel: &CancelToken,
    ) -> RenderResult<AudioMuxReport> {
        let started = Instant::now();
        let out_guard = TempFileGuard::new(out);
        check_cancel(cancel)?;

        let video_info = media::probe(video).await?;
        if !video_info.has_video {
            return Err(RenderError::audio_mux(format!(
                "'{}' has no video track",
                video.display()
            )));
        }
        let video_duration = video_info.duration.ok_or_else(|| {
            RenderError::audio_mux(format!("'{}' has no usable duration", video.display()))
        })?;

        let audio_info = media::probe(&self.track.source).await?;
        if !audio_info.has_audio {
            return Err(RenderError::audio_mux(format!(
                "'{}' has no audio track",
                self.track.source.display()
            )));
        }
        check_cancel(cancel)?;

        let pcm = media::decode_audio_f32_stereo(&self.track.source, MIX_SAMPLE_RATE).await?;
        let audio_duration = pcm.duration_secs();
        if pcm.frames() == 0 || audio_duration <= 0.0 {
            return Err(RenderError::audio_mux(format!(
                "'{}' has zero-length audio",
                self.track.source.display()
            )));
        }

        let segments = plan_audio_segments(audio_duration, video_duration, self.track.looping);
        self.logger.event(
            "audio_plan",
            &[
                ("video_s", &format_args!("{video_duration:.3}")),
                ("audio_s", &format_args!("{audio_duration:.3}")),
                ("looping", &self.track.looping),
                ("segments", &segments.len()),
                ("volume", &self.track.volume),
            ],
        );
        check_cancel(cancel)?;

        let pcm_path = sibling_temp_path(out, "audio", "f32le");
        let pcm_guard = TempFileGuard::new(&pcm_path);
        write_mixed_track(
            pcm,
            segments.clone(),
            self.track.volume,
            video_duration,
            pcm_path.clone(),
        )
        .await?;

        ensure_parent_dir(out).map_err(|e| RenderError::audio_mux(e.to_string()))?;
        run_mux(video, &pcm_path, video_duration, out, cancel).await?;
        out_guard.keep();
        drop(pcm_guard);

        let elapsed = started.elapsed();
        self.logger.event(
            "audio_mux_done",
            &[("elapsed_ms", &elapsed.as_millis()), ("out", &out.display())],
        );
        Ok(AudioMuxReport {
            video_duration,
            audio_duration,
            segments,
            elapsed,
        })
    }
}

fn check_cancel(cancel: &CancelToken) -> RenderResult<()> {
    if cancel.is_cancelled() {
        Err(RenderError::Cancelled)
    } else {
        Ok(())
    }
}

async fn write_mixed_track(
    pcm: AudioPcm,
    segments: Vec<AudioSegment>,
    volume: f32,
    video_duration: f64,
    path: PathBuf,
) -> RenderResult<()> {
    tokio::task::spawn_blocking(move || {
        let total_frames = sec_to_sample(video_duration, pcm.sample_rate);
        let mixed = render_track(&pcm, &segments, volume, total_frames);
        write_f32le_file(&mixed, &path)
    })
    .await
    .map_err(|e| RenderError::audio_mux(format!("audio mix worker failed: {e}")))?
    .map_err(|e| RenderError::audio_mux(e.to_string()))
}

/// Copy the video stream, encode the mixed PCM as AAC, and stop at the video's duration.
async fn run_mux(
    video: &Path,
    pcm: &Path,
    video_duration: f64,
    out: &Path,
    cancel: &CancelToken,
) -> RenderResult<()> {
    let mut child = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(video)
        .args([
            "-f",
            "f32le",
            "-ar",
            &MIX_SAMPLE_RATE.to_string(),
            "-ac",
            &MIX_CHANNELS.to_string(),
            "-i",
        ])
        .arg(pcm)
        .args([
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            "-t",
            &format!("{video_duration:.6}"),
            "-movflags",
            "+faststart",
        ])
        .arg(out)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| RenderError::audio_mux(format!("failed to spawn ffmpeg: {e}")))?;

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| RenderError::audio_mux("failed to open ffmpeg stderr"))?;
    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).trim().to_string()
    });

    let status = loop {
        tokio::select! {
            status = child.wait() => {
                break status.map_err(|e| RenderError::audio_mux(format!("failed to wait for ffmpeg: {e}")))?;
            }
            _ = tokio::time::sleep(CANCEL_POLL) => {
                if cancel.is_cancelled() {
                    tracing::info!("audio mux cancelled, killing ffmpeg");
                    let _ = child.kill().await;
                    stderr_task.abort();
                    return Err(RenderError::Cancelled);
                }
            }
        }
    };

    let stderr = stderr_task.await.unwrap_or_default();
    if !status.success() {
        return Err(RenderError::audio_mux(format!(
            "ffmpeg mux exited with status {status}: {stderr}"
        )));
    }
    Ok(())
}
