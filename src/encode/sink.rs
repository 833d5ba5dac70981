use crate::compose::surface::Frame;
use crate::encode::buffer_pool::BufferPoolStats;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{RenderError, RenderResult};

/// Configuration handed to a [`FrameSink`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    pub width: u32,
    pub height: u32,
    pub fps: Fps,
}

/// Consumer of composited frames.
///
/// Ordering contract: `push_frame` is called with strictly increasing `FrameIndex`; frame `i` is
/// presented at `i / fps` seconds.
pub trait FrameSink: Send {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> RenderResult<()>;

    /// `false` while the encoder is saturated; the exporter waits before composing the next frame.
    fn ready_for_more(&self) -> bool {
        true
    }

    /// Push one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> RenderResult<()>;

    /// Flush and close the output after the last frame.
    fn end(&mut self) -> RenderResult<()>;

    /// Stop without finalizing. Output written so far is left for the caller to delete.
    fn abort(&mut self) {}

    fn pool_stats(&self) -> Option<BufferPoolStats> {
        None
    }
}

/// Keeps frames in memory. For tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(FrameIndex, Frame)>,
    frames_seen: u64,
    last_idx: Option<FrameIndex>,
    retain_limit: Option<usize>,
    ended: bool,
    aborted: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep the first `limit` frames; later ones are counted and dropped.
    pub fn retaining(limit: usize) -> Self {
        Self {
            retain_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    pub fn frames(&self) -> &[(FrameIndex, Frame)] {
        &self.frames
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> RenderResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.frames_seen = 0;
        self.last_idx = None;
        self.ended = false;
        self.aborted = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &Frame) -> RenderResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| RenderError::export_pipeline("in-memory sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(RenderError::export_pipeline(format!(
                "out-of-order frame {} after {}",
                idx.0, last.0
            )));
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
        self.last_idx = Some(idx);
        self.frames_seen += 1;
        if self.retain_limit.is_none_or(|limit| self.frames.len() < limit) {
            self.frames.push((idx, frame.clone()));
        }
        Ok(())
    }

    fn end(&mut self) -> RenderResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}
