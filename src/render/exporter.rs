//! The frame loop: timeline -> clips -> composite -> sink, with backpressure and cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::compose::composer::FrameComposer;
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{RenderError, RenderResult};
use crate::foundation::fs::TempFileGuard;
use crate::logging::RenderLogger;
use crate::render::clip_cache::ClipCache;
use crate::render::job::{ExportJob, ExportPhase};
use crate::render::metrics::{FrameMetrics, resident_memory_bytes};
use crate::settings::RenderSettings;
use crate::timeline::TimelineEngine;

/// Sleep between encoder readiness checks.
const BACKPRESSURE_POLL: Duration = Duration::from_millis(5);

/// Run a blocking sink call without parking the other tasks of a multi-threaded runtime.
///
/// A current-thread runtime has no worker to hand them to, so `f` runs inline there.
fn run_blocking<R>(f: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Drives one export from the first frame to a finalized video file.
pub struct VideoExporter {
    timeline: TimelineEngine,
    clips: ClipCache,
    composer: Arc<FrameComposer>,
    logger: RenderLogger,
    cancel: CancelToken,
    fps: Fps,
    prefetch_radius: usize,
    progress_interval: u64,
    metrics_interval: u64,
}

impl VideoExporter {
    pub fn new(
        settings: &RenderSettings,
        timeline: TimelineEngine,
        clips: ClipCache,
        composer: Arc<FrameComposer>,
        logger: RenderLogger,
        cancel: CancelToken,
    ) -> Self {
        Self {
            timeline,
            clips,
            composer,
            logger,
            cancel,
            fps: settings.fps,
            prefetch_radius: settings.prefetch_radius,
            progress_interval: settings.progress_interval_frames.max(1),
            metrics_interval: settings.metrics_interval_frames,
        }
    }

    /// `ceil(total_duration * fps)`.
    pub fn total_frames(&self) -> u64 {
        self.fps.frames_to_cover(self.timeline.total_duration())
    }

    pub fn timeline(&self) -> &TimelineEngine {
        &self.timeline
    }

    /// Render every frame into `sink` and finalize it.
    ///
    /// Progress is reported as `fraction * progress_scale`, so a caller with work left after the
    /// video (audio muxing) can reserve the top of the range. On any error the sink is aborted and
    /// the file at `job.output()` is removed before the error is returned.
    #[tracing::instrument(skip_all, fields(frames = job.total_frames(), out = %job.output().display()))]
    pub async fn run(
        &self,
        sink: &mut dyn FrameSink,
        job: &mut ExportJob,
        on_progress: &mut (dyn FnMut(f64) + Send),
        progress_scale: f64,
    ) -> RenderResult<()> {
        let partial = TempFileGuard::new(job.output());
        match self.render_frames(sink, job, on_progress, progress_scale).await {
            Ok(()) => {
                partial.keep();
                self.snapshot_metrics(sink, job).write_to(&self.logger, "metrics_final");
                Ok(())
            }
            Err(e) => {
                run_blocking(|| sink.abort());
                drop(partial);
                let frame = job.frames_written();
                if e.is_cancelled() {
                    job.set_phase(ExportPhase::Cancelled);
                    tracing::info!(frame, "export cancelled");
                    self.logger.event("export_cancelled", &[("frame", &frame)]);
                } else {
                    job.set_phase(ExportPhase::Failed);
                    tracing::warn!(frame, error = %e, "export failed");
                    let index = e
                        .asset_index()
                        .map_or_else(|| "-".to_string(), |i| i.to_string());
                    self.logger.event(
                        "export_failed",
                        &[("frame", &frame), ("index", &index), ("error", &e)],
                    );
                }
                Err(e)
            }
        }
    }

    async fn render_frames(
        &self,
        sink: &mut dyn FrameSink,
        job: &mut ExportJob,
        on_progress: &mut (dyn FnMut(f64) + Send),
        progress_scale: f64,
    ) -> RenderResult<()> {
        let total = job.total_frames();
        let canvas = self.composer.canvas();
        sink.begin(SinkConfig {
            width: canvas.width,
            height: canvas.height,
            fps: self.fps,
        })?;
        job.set_phase(ExportPhase::Rendering);
        self.logger.event(
            "render_start",
            &[
                ("frames", &total),
                ("duration_s", &format_args!("{:.3}", self.timeline.total_duration())),
            ],
        );

        for i in 0..total {
            self.check_cancel()?;
            self.wait_for_sink(sink, job).await?;

            let snapshot = self.timeline.snapshot(self.fps.frame_to_secs(FrameIndex(i)));
            if self.prefetch_radius > 0
                && let Some(leading) = snapshot.leading_index()
            {
                self.clips.provider().prefetch(leading, self.prefetch_radius);
            }

            let t0 = Instant::now();
            let layers = self.clips.resolve(&snapshot.layers).await?;
            job.timings.resolve += t0.elapsed();

            let t0 = Instant::now();
            let composer = Arc::clone(&self.composer);
            let frame = tokio::task::spawn_blocking(move || composer.compose_frame(&layers))
                .await
                .map_err(|e| {
                    RenderError::export_pipeline(format!("compose worker failed at frame {i}: {e}"))
                })?;
            job.timings.compose += t0.elapsed();

            let t0 = Instant::now();
            run_blocking(|| sink.push_frame(FrameIndex(i), &frame))
                .map_err(|e| with_frame_context(e, i))?;
            job.timings.encode += t0.elapsed();
            job.frame_written();

            let done = i + 1;
            if (done % self.progress_interval == 0 || done == total)
                && job.advance(done as f64 / total as f64 * progress_scale)
            {
                on_progress(job.progress());
            }
            if self.metrics_interval > 0 && done % self.metrics_interval == 0 {
                self.snapshot_metrics(sink, job).write_to(&self.logger, "metrics");
            }
        }

        job.set_phase(ExportPhase::Finalizing);
        self.check_cancel()?;
        run_blocking(|| sink.end()).map_err(|e| match e {
            RenderError::ExportPipelineFailed(msg) => {
                RenderError::export_pipeline(format!("finalize: {msg}"))
            }
            RenderError::Cancelled => RenderError::Cancelled,
            other => RenderError::export_pipeline(format!("finalize: {other}")),
        })?;
        tracing::debug!(frames = job.frames_written(), "video finalized");
        Ok(())
    }

    async fn wait_for_sink(
        &self,
        sink: &mut dyn FrameSink,
        job: &mut ExportJob,
    ) -> RenderResult<()> {
        if sink.ready_for_more() {
            return Ok(());
        }
        let t0 = Instant::now();
        while !sink.ready_for_more() {
            self.check_cancel()?;
            tokio::time::sleep(BACKPRESSURE_POLL).await;
        }
        job.timings.backpressure += t0.elapsed();
        Ok(())
    }

    fn check_cancel(&self) -> RenderResult<()> {
        if self.cancel.is_cancelled() {
            Err(RenderError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn snapshot_metrics(&self, sink: &dyn FrameSink, job: &ExportJob) -> FrameMetrics {
        FrameMetrics {
            frame: job.frames_written(),
            total_frames: job.total_frames(),
            timings: job.timings,
            assets: self.clips.provider().stats(),
            clips: self.clips.stats(),
            pool: sink.pool_stats(),
            rss_bytes: resident_memory_bytes(),
        }
    }
}

fn with_frame_context(e: RenderError, frame: u64) -> RenderError {
    match e {
        RenderError::Cancelled => RenderError::Cancelled,
        RenderError::ExportPipelineFailed(msg) => {
            RenderError::export_pipeline(format!("append frame {frame}: {msg}"))
        }
        other => RenderError::export_pipeline(format!("append frame {frame}: {other}")),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/exporter.rs"]
mod tests;
