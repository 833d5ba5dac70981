//! Export and preview orchestration: clip cache, frame loop, job state, and the public engine.

pub mod clip_cache;
pub mod engine;
pub mod exporter;
pub mod job;
pub mod metrics;

pub use clip_cache::{ClipCache, ClipCacheStats};
pub use engine::{ExportReport, RenderEngine};
pub use exporter::VideoExporter;
pub use job::{ExportJob, ExportPhase, StageTimings};
