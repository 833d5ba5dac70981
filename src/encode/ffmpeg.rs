use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, SyncSender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::compose::surface::Frame;
use crate::encode::buffer_pool::{BufferPoolStats, PixelBufferPool, PooledBuffer};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{RenderError, RenderResult};
use crate::foundation::math::mul_div255_u16;

/// How long `push_frame` waits for a pooled buffer before declaring the encoder stalled.
const BUFFER_WAIT: Duration = Duration::from_secs(30);

/// Options for [`FfmpegSink`] MP4 output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub out_path: PathBuf,
    /// Overwrite the output file if it already exists.
    pub overwrite: bool,
    /// Background used to flatten alpha (straight RGBA8).
    pub bg_rgba: [u8; 4],
    /// Pixel buffers in flight between the exporter and ffmpeg's stdin.
    pub buffer_count: usize,
}

impl FfmpegSinkOpts {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            bg_rgba: [0, 0, 0, 255],
            buffer_count: 4,
        }
    }

    pub fn with_buffer_count(mut self, buffer_count: usize) -> Self {
        self.buffer_count = buffer_count;
        self
    }
}

/// Spawns the system `ffmpeg` and streams raw RGBA frames into it (H.264, yuv420p, faststart).
///
/// Frames are flattened into pooled buffers and written to ffmpeg's stdin by a dedicated thread,
/// so a slow encoder shows up as an empty pool (`ready_for_more() == false`) rather than a blocked
/// exporter.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    frames_tx: Option<SyncSender<PooledBuffer>>,
    writer: Option<JoinHandle<std::io::Result<()>>>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,

    pool: Option<PixelBufferPool>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            frames_tx: None,
            writer: None,
            stderr_drain: None,
            pool: None,
            cfg: None,
            last_idx: None,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }

    /// Stop the writer thread and report why it exited, if it failed.
    fn join_writer(&mut self) -> Option<String> {
        drop(self.frames_tx.take());
        let handle = self.writer.take()?;
        match handle.join() {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(format!("failed to write frames to ffmpeg stdin: {e}")),
            Err(_) => Some("ffmpeg writer thread panicked".to_string()),
        }
    }

    fn join_stderr(&mut self) -> String {
        let Some(handle) = self.stderr_drain.take() else {
            return String::new();
        };
        match handle.join() {
            Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Ok(Err(e)) => format!("(stderr read failed: {e})"),
            Err(_) => "(stderr drain thread panicked)".to_string(),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> RenderResult<()> {
        if cfg.fps.num == 0 || cfg.fps.den == 0 {
            return Err(RenderError::validation("fps must be non-zero"));
        }
        if cfg.width == 0 || cfg.height == 0 {
            return Err(RenderError::validation(
                "ffmpeg sink width/height must be non-zero",
            ));
        }
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(RenderError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }

        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(RenderError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(RenderError::export_pipeline(
                "ffmpeg is required for MP4 encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" });

        // Input: opaque RGBA8; premultiplied frames are flattened in `push_frame`.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);
        cmd.args([
            "-an",
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
        ]);
        cmd.arg(&self.opts.out_path);

        let mut child = cmd.spawn().map_err(|e| {
            RenderError::export_pipeline(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| RenderError::export_pipeline("failed to open ffmpeg stdin"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| RenderError::export_pipeline("failed to open ffmpeg stderr"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        let buffer_count = self.opts.buffer_count.max(1);
        let (tx, rx) = mpsc::sync_channel::<PooledBuffer>(buffer_count);
        let writer = std::thread::Builder::new()
            .name("photoreel-ffmpeg-writer".to_string())
            .spawn(move || {
                for buf in rx {
                    stdin.write_all(&buf)?;
                }
                stdin.flush()
            })
            .map_err(|e| RenderError::export_pipeline(format!("spawn writer thread: {e}")))?;

        let frame_bytes = cfg.width as usize * cfg.height as usize * 4;
        self.pool = Some(PixelBufferPool::new(frame_bytes, buffer_count));
        self.child = Some(child);
        self.frames_tx = Some(tx);
        self.writer = Some(writer);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        tracing::debug!(
            out = %self.opts.out_path.display(),
            width = cfg.width,
            height = cfg.height,
            buffer_count,
            "ffmpeg sink started"
        );
        Ok(())
    }

    fn ready_for_more(&self) -> bool {
        self.pool.as_ref().is_none_or(|p| p.available() > 0)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> RenderResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| RenderError::export_pipeline("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(RenderError::export_pipeline(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.width() != cfg.width || frame.height() != cfg.height {
            return Err(RenderError::export_pipeline(format!(
                "frame size mismatch: got {}x{}, expected {}x{}",
                frame.width(),
                frame.height(),
                cfg.width,
                cfg.height
            )));
        }
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| RenderError::export_pipeline("ffmpeg sink not started"))?;

        let mut buf = match pool.try_acquire() {
            Some(buf) => buf,
            None => pool.acquire_timeout(BUFFER_WAIT).ok_or_else(|| {
                RenderError::export_pipeline("ffmpeg stopped consuming frames (buffer pool drained)")
            })?,
        };
        flatten_premul_over_bg_to_opaque_rgba8(&mut buf, frame.data(), self.opts.bg_rgba)?;

        let Some(tx) = self.frames_tx.as_ref() else {
            return Err(RenderError::export_pipeline(
                "ffmpeg sink is already finalized",
            ));
        };
        if tx.send(buf).is_err() {
            let why = self
                .join_writer()
                .unwrap_or_else(|| "ffmpeg writer stopped".to_string());
            let stderr = self.join_stderr();
            return Err(RenderError::export_pipeline(format!("{why}: {stderr}")));
        }
        self.last_idx = Some(idx);
        Ok(())
    }

    fn end(&mut self) -> RenderResult<()> {
        let writer_err = self.join_writer();
        let mut child = self
            .child
            .take()
            .ok_or_else(|| RenderError::export_pipeline("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            RenderError::export_pipeline(format!("failed to wait for ffmpeg to finish: {e}"))
        })?;
        let stderr = self.join_stderr();
        self.cfg = None;

        if !status.success() {
            return Err(RenderError::export_pipeline(format!(
                "ffmpeg exited with status {status}: {stderr}"
            )));
        }
        if let Some(why) = writer_err {
            return Err(RenderError::export_pipeline(why));
        }
        Ok(())
    }

    fn abort(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = self.join_writer();
        let _ = self.join_stderr();
        self.cfg = None;
    }

    fn pool_stats(&self) -> Option<BufferPoolStats> {
        self.pool.as_ref().map(PixelBufferPool::stats)
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // `-r` before `-i` sets the rawvideo input rate; rational rates pass through as `num/den`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> RenderResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(RenderError::export_pipeline(
            "flatten expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = u16::from(bg_rgba[0]);
    let bg_g = u16::from(bg_rgba[1]);
    let bg_b = u16::from(bg_rgba[2]);

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = u16::from(s[3]);
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (u16::from(s[0]) + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (u16::from(s[1]) + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (u16::from(s[2]) + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> RenderResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    tool_on_path("ffmpeg")
}

/// `true` when `ffprobe` can be invoked from `PATH`.
pub fn is_ffprobe_on_path() -> bool {
    tool_on_path("ffprobe")
}

fn tool_on_path(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
