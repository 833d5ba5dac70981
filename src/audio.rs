//! Background audio: segment planning, PCM mixing, and the ffmpeg mux pass.

pub mod media;
pub(crate) mod mix;
pub mod muxer;
pub mod plan;

pub use muxer::{AudioMuxReport, AudioMuxer};
pub use plan::{AudioSegment, plan_audio_segments};

/// Sample rate audio is decoded and mixed at.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Mixed audio is always interleaved stereo.
pub const MIX_CHANNELS: u16 = 2;
