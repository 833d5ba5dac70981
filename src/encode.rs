//! Encoding sinks.
//!
//! Sinks consume composited frames in timeline order; the exporter drives them.

/// Fixed-size pool of encoder pixel buffers.
pub mod buffer_pool;
/// `ffmpeg`-based MP4 sink.
pub mod ffmpeg;
/// Frame sink trait and the in-memory sink.
pub mod sink;
