//! Render settings: the sole configuration surface of the engine.
//!
//! Settings are plain serde values. A settings file may be partial; every missing field falls
//! back to its default. Values are validated, never clamped.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{RenderError, RenderResult};

/// How source images are oriented before layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrientationStrategy {
    /// Keep the (EXIF-corrected) orientation of each image.
    #[default]
    FollowAsset,
    /// Rotate portrait images a quarter turn so every photo is landscape.
    ForceLandscape,
    /// Rotate landscape images a quarter turn so every photo is portrait.
    ForcePortrait,
}

/// Where the metadata plate is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatePlacement {
    /// Inside the paper mat, in a band below the photo.
    #[default]
    InFrame,
    /// In the canvas margin directly below the paper mat.
    BelowCanvas,
}

/// Canvas margins and mat padding, in output pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub margin_horizontal: f64,
    pub margin_vertical: f64,
    /// Width of the paper mat around the photo.
    pub padding: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            margin_horizontal: 96.0,
            margin_vertical: 64.0,
            padding: 24.0,
        }
    }
}

/// Metadata caption ("plate") settings.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateSettings {
    pub enabled: bool,
    /// Height of the caption band.
    pub height: f64,
    /// Distance from the bottom of the band up to the text baseline.
    pub baseline_offset: f64,
    pub font_size: f64,
    pub placement: PlatePlacement,
}

impl Default for PlateSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            height: 56.0,
            baseline_offset: 20.0,
            font_size: 22.0,
            placement: PlatePlacement::InFrame,
        }
    }
}

/// Gray levels (`0.0` black .. `1.0` white) for the flat canvas elements.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasColors {
    pub background: f64,
    pub paper: f64,
    pub stroke: f64,
    pub text: f64,
}

impl Default for CanvasColors {
    fn default() -> Self {
        Self {
            background: 0.08,
            paper: 0.96,
            stroke: 0.2,
            text: 0.25,
        }
    }
}

/// Optional background audio track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AudioTrackSettings {
    /// Audio file to mux under the video.
    pub source: PathBuf,
    /// Linear gain applied to the whole track, `0..=1`.
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// Repeat the track back-to-back until the video ends.
    #[serde(default)]
    pub looping: bool,
}

fn default_volume() -> f32 {
    1.0
}

/// Immutable settings for one export or preview call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub output_width: u32,
    pub output_height: u32,
    pub fps: Fps,
    /// Seconds each image is on screen, including its fades.
    pub image_duration: f64,
    /// Crossfade length in seconds. Must be strictly less than `image_duration`.
    pub transition_duration: f64,
    pub transitions_enabled: bool,
    pub orientation: OrientationStrategy,
    pub ken_burns: bool,
    /// How many images ahead/behind the current frame are decoded eagerly.
    pub prefetch_radius: usize,
    /// Upper bound on concurrent prefetch decodes.
    pub prefetch_max_concurrent: usize,
    pub layout: LayoutSettings,
    pub plate: PlateSettings,
    pub canvas: CanvasColors,
    pub audio: Option<AudioTrackSettings>,
    pub asset_cache_capacity: usize,
    pub clip_cache_capacity: usize,
    /// Pixel buffers in the encoder pool; also the encoder queue depth.
    pub encoder_buffer_count: usize,
    pub progress_interval_frames: u64,
    pub metrics_interval_frames: u64,
    /// Directory for per-export log files. `None` uses `<tmp>/photoreel-logs`.
    pub log_dir: Option<PathBuf>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            output_width: 1920,
            output_height: 1080,
            fps: Fps::default(),
            image_duration: 4.0,
            transition_duration: 1.0,
            transitions_enabled: true,
            orientation: OrientationStrategy::FollowAsset,
            ken_burns: true,
            prefetch_radius: 2,
            prefetch_max_concurrent: 2,
            layout: LayoutSettings::default(),
            plate: PlateSettings::default(),
            canvas: CanvasColors::default(),
            audio: None,
            asset_cache_capacity: 8,
            clip_cache_capacity: 3,
            encoder_buffer_count: 4,
            progress_interval_frames: 10,
            metrics_interval_frames: 60,
            log_dir: None,
        }
    }
}

impl RenderSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        let settings: Self = serde_json::from_str(json)
            .map_err(|e| RenderError::validation(format!("invalid settings json: {e}")))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate a settings JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("read settings '{}'", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn canvas(&self) -> Canvas {
        Canvas {
            width: self.output_width,
            height: self.output_height,
        }
    }

    /// Crossfade length actually used by the timeline.
    pub fn effective_transition(&self) -> f64 {
        if self.transitions_enabled {
            self.transition_duration
        } else {
            0.0
        }
    }

    /// Reject settings the pipeline cannot honor.
    pub fn validate(&self) -> RenderResult<()> {
        if self.output_width == 0 || self.output_height == 0 {
            return Err(RenderError::validation("output size must be non-zero"));
        }
        if !self.output_width.is_multiple_of(2) || !self.output_height.is_multiple_of(2) {
            return Err(RenderError::validation(
                "output width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        Fps::new(self.fps.num, self.fps.den)?;
        if !self.image_duration.is_finite() || self.image_duration <= 0.0 {
            return Err(RenderError::validation("image_duration must be > 0"));
        }
        let transition = self.effective_transition();
        if !transition.is_finite() || transition < 0.0 {
            return Err(RenderError::validation("transition_duration must be >= 0"));
        }
        if transition >= self.image_duration {
            return Err(RenderError::validation(
                "transition_duration must be < image_duration",
            ));
        }
        if self.prefetch_max_concurrent == 0 {
            return Err(RenderError::validation(
                "prefetch_max_concurrent must be >= 1",
            ));
        }
        if self.encoder_buffer_count == 0 {
            return Err(RenderError::validation("encoder_buffer_count must be >= 1"));
        }
        let l = &self.layout;
        for (name, v) in [
            ("margin_horizontal", l.margin_horizontal),
            ("margin_vertical", l.margin_vertical),
            ("padding", l.padding),
            ("plate.height", self.plate.height),
            ("plate.baseline_offset", self.plate.baseline_offset),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(RenderError::validation(format!("{name} must be >= 0")));
            }
        }
        if self.plate.enabled && (!self.plate.font_size.is_finite() || self.plate.font_size <= 0.0)
        {
            return Err(RenderError::validation("plate.font_size must be > 0"));
        }
        if let Some(audio) = &self.audio
            && !(0.0..=1.0).contains(&audio.volume)
        {
            return Err(RenderError::validation("audio volume must be within 0..=1"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/settings.rs"]
mod tests;
