use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::foundation::cancel::CancelToken;

/// Where an export is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportPhase {
    Preparing,
    Rendering,
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

impl ExportPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Rendering => "rendering",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl std::fmt::Display for ExportPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative wall time spent in each stage of the frame loop.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StageTimings {
    /// Waiting on clips (and through them, asset decodes).
    pub resolve: Duration,
    pub compose: Duration,
    /// Handing frames to the sink.
    pub encode: Duration,
    /// Polling for encoder readiness.
    pub backpressure: Duration,
}

impl StageTimings {
    pub fn total(&self) -> Duration {
        self.resolve + self.compose + self.encode + self.backpressure
    }
}

/// Mutable state of one export. Lives for the duration of a single job.
#[derive(Debug)]
pub struct ExportJob {
    phase: ExportPhase,
    progress: f64,
    total_frames: u64,
    frames_written: u64,
    output: PathBuf,
    cancel: CancelToken,
    started: Instant,
    pub timings: StageTimings,
}

impl ExportJob {
    pub fn new(output: impl Into<PathBuf>, total_frames: u64, cancel: CancelToken) -> Self {
        Self {
            phase: ExportPhase::Preparing,
            progress: 0.0,
            total_frames,
            frames_written: 0,
            output: output.into(),
            cancel,
            started: Instant::now(),
            timings: StageTimings::default(),
        }
    }

    pub fn phase(&self) -> ExportPhase {
        self.phase
    }

    /// Move to `next`. Terminal phases are final.
    pub fn set_phase(&mut self, next: ExportPhase) {
        if self.phase.is_terminal() || self.phase == next {
            return;
        }
        tracing::debug!(from = %self.phase, to = %next, "export phase");
        self.phase = next;
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    /// Raise progress to `p` (clamped to `0..=1`). Returns `true` if it moved.
    ///
    /// Progress never goes backwards.
    pub fn advance(&mut self, p: f64) -> bool {
        let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
        if p > self.progress {
            self.progress = p;
            true
        } else {
            false
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub(crate) fn frame_written(&mut self) {
        self.frames_written += 1;
    }

    /// Path of the (possibly partial) video being written.
    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
