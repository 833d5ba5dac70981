//! Public entry point: one export or preview at a time per engine.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use crate::assets::{AssetDecoder, AssetProvider, ImageFileDecoder};
use crate::audio::{AudioMuxReport, AudioMuxer};
use crate::compose::composer::FrameComposer;
use crate::compose::surface::Frame;
use crate::compose::text::system_fontdb;
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path};
use crate::encode::sink::FrameSink;
use crate::foundation::cancel::CancelToken;
use crate::foundation::core::{FrameIndex, Rgba8Premul};
use crate::foundation::error::{RenderError, RenderResult};
use crate::foundation::fs::{TempFileGuard, sibling_temp_path};
use crate::logging::{RenderLogger, default_log_dir};
use crate::render::clip_cache::ClipCache;
use crate::render::exporter::VideoExporter;
use crate::render::job::{ExportJob, ExportPhase, StageTimings};
use crate::settings::RenderSettings;
use crate::timeline::TimelineEngine;

/// Share of the progress range given to frame rendering when an audio pass follows.
const VIDEO_PROGRESS_SHARE: f64 = 0.9;

/// Summary of a completed export.
#[derive(Clone, Debug)]
pub struct ExportReport {
    pub output: PathBuf,
    pub frames_written: u64,
    /// Video length in seconds.
    pub duration: f64,
    pub timings: StageTimings,
    pub elapsed: Duration,
    pub run_id: String,
    pub log_path: Option<PathBuf>,
    pub audio: Option<AudioMuxReport>,
}

/// Renders slideshows from an ordered list of image paths.
///
/// Settings are fixed at construction. Caches and the per-run log are created for each call and
/// dropped when it returns. Concurrent calls on one engine queue behind each other.
pub struct RenderEngine {
    settings: RenderSettings,
    decoder: Arc<dyn AssetDecoder>,
    log_dir: PathBuf,
    cancel: CancelToken,
    /// Exports requested and not yet returned, queued ones included.
    pending_exports: AtomicUsize,
    job_lock: tokio::sync::Mutex<()>,
    fontdb: OnceLock<Arc<usvg::fontdb::Database>>,
}

impl RenderEngine {
    pub fn new(settings: RenderSettings) -> RenderResult<Self> {
        settings.validate()?;
        let log_dir = settings.log_dir.clone().unwrap_or_else(default_log_dir);
        Ok(Self {
            settings,
            decoder: Arc::new(ImageFileDecoder),
            log_dir,
            cancel: CancelToken::new(),
            pending_exports: AtomicUsize::new(0),
            job_lock: tokio::sync::Mutex::new(()),
            fontdb: OnceLock::new(),
        })
    }

    /// Replace the image decoder.
    pub fn with_decoder(mut self, decoder: Arc<dyn AssetDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Use `fontdb` for captions instead of loading the system fonts.
    pub fn with_fontdb(mut self, fontdb: Arc<usvg::fontdb::Database>) -> Self {
        self.fontdb = OnceLock::from(fontdb);
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Request cooperative cancellation of the running export.
    ///
    /// Honored at the next checkpoint. A request made while an export is queued behind another
    /// job still applies to it. A request made while no export is pending is ignored.
    pub fn cancel(&self) {
        if self.pending_exports.load(Ordering::SeqCst) > 0 {
            self.cancel.cancel();
        } else {
            tracing::debug!("cancel ignored: no export pending");
        }
    }

    /// The raw flag behind [`RenderEngine::cancel`].
    ///
    /// Unlike [`RenderEngine::cancel`], setting it while idle cancels the next export. The flag is
    /// cleared when each export returns.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Encode `sources` into an H.264 MP4 at `dest`.
    ///
    /// `on_progress` receives non-decreasing values in `0..=1`. On any error `dest` does not exist
    /// afterwards.
    pub async fn export(
        &self,
        sources: &[PathBuf],
        dest: &Path,
        on_progress: impl FnMut(f64) + Send,
    ) -> RenderResult<ExportReport> {
        let buffer_count = self.settings.encoder_buffer_count;
        let bg = Rgba8Premul::gray(self.settings.canvas.background).to_array();
        self.export_with_sink(
            sources,
            dest,
            |video_path| {
                if !is_ffmpeg_on_path() {
                    return Err(RenderError::export_pipeline("ffmpeg not found on PATH"));
                }
                let mut opts = FfmpegSinkOpts::new(video_path).with_buffer_count(buffer_count);
                opts.bg_rgba = bg;
                Ok(FfmpegSink::new(opts))
            },
            on_progress,
        )
        .await
    }

    /// [`RenderEngine::export`] with a caller-built sink.
    ///
    /// `make_sink` receives the path the video must be written to: `dest` itself, or a hidden
    /// sibling when an audio track will be muxed in afterwards.
    pub async fn export_with_sink<S, F>(
        &self,
        sources: &[PathBuf],
        dest: &Path,
        make_sink: F,
        mut on_progress: impl FnMut(f64) + Send,
    ) -> RenderResult<ExportReport>
    where
        S: FrameSink,
        F: FnOnce(&Path) -> RenderResult<S> + Send,
    {
        if sources.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let _pending = PendingExport::enter(&self.pending_exports);
        let _job = self.job_lock.lock().await;
        let _clear_cancel = ClearOnDrop(&self.cancel);
        let started = Instant::now();
        let settings = &self.settings;
        let logger = self.open_logger();

        let timeline = TimelineEngine::new(
            sources.len(),
            settings.image_duration,
            settings.effective_transition(),
        );
        let duration = timeline.total_duration();
        let total_frames = settings.fps.frames_to_cover(duration);
        tracing::info!(
            items = sources.len(),
            frames = total_frames,
            dest = %dest.display(),
            "export started"
        );
        logger.event(
            "run_start",
            &[
                ("items", &sources.len()),
                ("frames", &total_frames),
                ("duration_s", &format_args!("{duration:.3}")),
                ("dest", &dest.display()),
            ],
        );
        match serde_json::to_string(settings) {
            Ok(json) => logger.event("settings", &[("json", &json)]),
            Err(e) => tracing::warn!(error = %e, "settings not serializable"),
        }

        ensure_parent_dir(dest)?;
        // Whatever sits at `dest` after a failed job is stale.
        let dest_guard = TempFileGuard::new(dest);
        let (video_path, video_guard, video_share) = match &settings.audio {
            Some(_) => {
                let path = sibling_temp_path(dest, "video", "mp4");
                let guard = TempFileGuard::new(&path);
                (path, Some(guard), VIDEO_PROGRESS_SHARE)
            }
            None => (dest.to_path_buf(), None, 1.0),
        };

        let provider = AssetProvider::new(
            sources.to_vec(),
            Arc::clone(&self.decoder),
            settings.asset_cache_capacity,
            settings.prefetch_max_concurrent,
            logger.clone(),
        );
        let composer = Arc::new(FrameComposer::with_fontdb(settings, self.fontdb()));
        let clips = ClipCache::new(
            provider.clone(),
            Arc::clone(&composer),
            settings.clip_cache_capacity,
        );
        let exporter = VideoExporter::new(
            settings,
            timeline,
            clips,
            composer,
            logger.clone(),
            self.cancel.clone(),
        );
        let mut job = ExportJob::new(&video_path, total_frames, self.cancel.clone());

        let mut sink = match make_sink(&video_path) {
            Ok(sink) => sink,
            Err(e) => {
                logger.event("export_failed", &[("frame", &0), ("error", &e)]);
                return Err(e);
            }
        };
        let rendered = exporter
            .run(&mut sink, &mut job, &mut on_progress, video_share)
            .await;
        drop(sink);
        provider.shutdown();
        rendered?;

        let audio = match &settings.audio {
            None => None,
            Some(track) => {
                let muxer = AudioMuxer::new(track.clone(), logger.clone());
                match muxer.mux(&video_path, dest, &self.cancel).await {
                    Ok(report) => Some(report),
                    Err(e) => {
                        let phase = if e.is_cancelled() {
                            ExportPhase::Cancelled
                        } else {
                            ExportPhase::Failed
                        };
                        job.set_phase(phase);
                        tracing::warn!(error = %e, "audio pass did not complete");
                        logger.event(
                            if e.is_cancelled() { "export_cancelled" } else { "export_failed" },
                            &[("stage", &"audio"), ("error", &e)],
                        );
                        return Err(e);
                    }
                }
            }
        };
        drop(video_guard);
        dest_guard.keep();

        if job.advance(1.0) {
            on_progress(job.progress());
        }
        job.set_phase(ExportPhase::Completed);
        let elapsed = started.elapsed();
        tracing::info!(frames = job.frames_written(), elapsed_ms = elapsed.as_millis() as u64, "export completed");
        logger.event(
            "run_done",
            &[
                ("frames", &job.frames_written()),
                ("elapsed_ms", &elapsed.as_millis()),
                ("out", &dest.display()),
            ],
        );

        Ok(ExportReport {
            output: dest.to_path_buf(),
            frames_written: job.frames_written(),
            duration,
            timings: job.timings,
            elapsed,
            run_id: logger.run_id().to_string(),
            log_path: logger.path().map(Path::to_path_buf),
            audio,
        })
    }

    /// Render the single frame shown at `at_second`.
    ///
    /// Times outside the slideshow are clamped to its first or last frame. Uses the same
    /// timeline, decode, and composition path as [`RenderEngine::export`].
    pub async fn preview_frame(&self, sources: &[PathBuf], at_second: f64) -> RenderResult<Frame> {
        if sources.is_empty() {
            return Err(RenderError::EmptyInput);
        }
        let _job = self.job_lock.lock().await;
        let settings = &self.settings;

        let timeline = TimelineEngine::new(
            sources.len(),
            settings.image_duration,
            settings.effective_transition(),
        );
        let last_frame = settings
            .fps
            .frames_to_cover(timeline.total_duration())
            .saturating_sub(1);
        let latest = settings.fps.frame_to_secs(FrameIndex(last_frame));
        let t = if at_second.is_finite() {
            at_second.clamp(0.0, latest)
        } else {
            0.0
        };
        let snapshot = timeline.snapshot(t);

        let capacity = snapshot.layers.len().max(1);
        let provider = AssetProvider::new(
            sources.to_vec(),
            Arc::clone(&self.decoder),
            capacity,
            settings.prefetch_max_concurrent,
            RenderLogger::disabled(),
        );
        let composer = Arc::new(FrameComposer::with_fontdb(settings, self.fontdb()));
        let clips = ClipCache::new(provider, Arc::clone(&composer), capacity);

        let layers = clips
            .resolve(&snapshot.layers)
            .await
            .map_err(RenderError::into_preview)?;
        tokio::task::spawn_blocking(move || composer.compose_frame(&layers))
            .await
            .map_err(|e| RenderError::preview_pipeline(format!("compose worker failed: {e}")))
    }

    fn fontdb(&self) -> Arc<usvg::fontdb::Database> {
        Arc::clone(self.fontdb.get_or_init(system_fontdb))
    }

    fn open_logger(&self) -> RenderLogger {
        match RenderLogger::create_in(&self.log_dir) {
            Ok(logger) => logger,
            Err(e) => {
                tracing::warn!(dir = %self.log_dir.display(), error = %e, "render log disabled");
                RenderLogger::disabled()
            }
        }
    }
}

/// Counts one export from the call until it returns.
struct PendingExport<'a>(&'a AtomicUsize);

impl<'a> PendingExport<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for PendingExport<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Clears the cancel flag when a job ends, before the job lock is released.
struct ClearOnDrop<'a>(&'a CancelToken);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}
