//! Timeline math: per-image windows and per-instant blend weights.
//!
//! Clips are laid out back to back with a stride of `image_duration - transition_duration`, so
//! consecutive clips overlap by exactly one transition. A snapshot at time `t` lists the clips
//! whose window contains `t`, each with a linear fade-in/fade-out opacity.

use smallvec::SmallVec;

/// One source image's window on the output timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineClip {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

/// A clip's contribution to one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimelineLayer {
    pub clip_index: usize,
    /// Blend weight in `0..=1`.
    pub opacity: f32,
    /// Position within the clip's own window, `0..=1`.
    pub progress: f32,
}

/// Layers active at one instant, ascending by `clip_index` (earlier clip painted first).
///
/// Holds one layer normally and two during a crossfade.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineSnapshot {
    pub time: f64,
    pub layers: SmallVec<[TimelineLayer; 2]>,
}

impl TimelineSnapshot {
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Highest active clip index: the image most recently faded in.
    pub fn leading_index(&self) -> Option<usize> {
        self.layers.last().map(|l| l.clip_index)
    }
}

/// Pure function of item count and durations.
#[derive(Clone, Debug)]
pub struct TimelineEngine {
    image_duration: f64,
    transition_duration: f64,
    clips: Vec<TimelineClip>,
}

impl TimelineEngine {
    /// Build the clip table.
    ///
    /// # Panics
    ///
    /// Panics unless `item_count >= 1`, `image_duration > 0` and
    /// `0 <= transition_duration < image_duration`. Callers validate settings first; reaching
    /// this with bad values is a programming error.
    pub fn new(item_count: usize, image_duration: f64, transition_duration: f64) -> Self {
        assert!(item_count >= 1, "timeline needs at least one item");
        assert!(
            image_duration.is_finite() && image_duration > 0.0,
            "image_duration must be > 0 (got {image_duration})"
        );
        assert!(
            transition_duration.is_finite()
                && transition_duration >= 0.0
                && transition_duration < image_duration,
            "transition_duration must satisfy 0 <= t < image_duration (got {transition_duration})"
        );

        let stride = image_duration - transition_duration;
        let clips = (0..item_count)
            .map(|index| {
                let start = index as f64 * stride;
                TimelineClip {
                    index,
                    start,
                    end: start + image_duration,
                    duration: image_duration,
                }
            })
            .collect();

        Self {
            image_duration,
            transition_duration,
            clips,
        }
    }

    pub fn stride(&self) -> f64 {
        self.image_duration - self.transition_duration
    }

    pub fn clips(&self) -> &[TimelineClip] {
        &self.clips
    }

    pub fn item_count(&self) -> usize {
        self.clips.len()
    }

    /// End of the last clip.
    pub fn total_duration(&self) -> f64 {
        self.clips.last().map(|c| c.end).unwrap_or(0.0)
    }

    /// Active layers and blend weights at `t` seconds.
    pub fn snapshot(&self, t: f64) -> TimelineSnapshot {
        let mut layers = SmallVec::new();
        let last = self.clips.len() - 1;
        let fade = self.transition_duration;

        // Only clips near `t / stride` can contain `t`; one slot of slack on each side absorbs
        // float rounding at window boundaries.
        let slot = (t / self.stride()).floor().max(0.0) as usize;
        let hi = slot.saturating_add(1).min(last);
        let lo = slot.saturating_sub(self.window_overlap() + 1).min(hi);

        for clip in &self.clips[lo..=hi] {
            if !(clip.start <= t && t < clip.end) {
                continue;
            }

            let mut opacity = 1.0f64;
            if fade > 0.0 {
                if clip.index > 0 && t < clip.start + fade {
                    opacity = opacity.min((t - clip.start) / fade);
                }
                if clip.index < last && t > clip.end - fade {
                    opacity = opacity.min((clip.end - t) / fade);
                }
            }
            if opacity <= 0.0 {
                continue;
            }

            let progress = ((t - clip.start) / clip.duration).clamp(0.0, 1.0);
            layers.push(TimelineLayer {
                clip_index: clip.index,
                opacity: opacity as f32,
                progress: progress as f32,
            });
        }

        TimelineSnapshot { time: t, layers }
    }

    /// How many earlier clips can still be on screen when a clip starts.
    fn window_overlap(&self) -> usize {
        (self.image_duration / self.stride()).ceil() as usize
    }
}

#[cfg(test)]
#[path = "../tests/unit/timeline.rs"]
mod tests;
