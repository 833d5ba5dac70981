#![forbid(unsafe_code)]
//! Still-image slideshow rendering: timed crossfades, Ken Burns motion, framed photos with EXIF
//! captions, streamed into ffmpeg and optionally muxed with a background audio track.

pub mod assets;
pub mod audio;
pub mod compose;
pub mod encode;
pub mod foundation;
pub mod logging;
pub mod render;
pub mod settings;
pub mod timeline;

pub use assets::{AssetDecoder, AssetProvider, ExifSummary, ImageFileDecoder, RenderAsset};
pub use audio::{AudioMuxReport, AudioMuxer, AudioSegment, plan_audio_segments};
pub use compose::composer::{ComposedClip, FrameComposer};
pub use compose::layout::{FrameLayout, LayoutEngine, PixelRect};
pub use compose::surface::{Frame, Surface};
pub use encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, is_ffmpeg_on_path, is_ffprobe_on_path};
pub use encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use foundation::cancel::CancelToken;
pub use foundation::core::{Canvas, Fps, FrameIndex, Rgba8Premul};
pub use foundation::error::{AssetLoadError, RenderError, RenderResult};
pub use logging::RenderLogger;
pub use render::{ClipCache, ExportJob, ExportPhase, ExportReport, RenderEngine, StageTimings};
pub use settings::{
    AudioTrackSettings, CanvasColors, LayoutSettings, OrientationStrategy, PlatePlacement,
    PlateSettings, RenderSettings,
};
pub use timeline::{TimelineClip, TimelineEngine, TimelineLayer, TimelineSnapshot};
