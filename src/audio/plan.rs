/// Tolerance for float drift when walking the loop cursor.
const EPS: f64 = 1e-9;

/// One placement of the audio track on the video timeline, in seconds.
///
/// Every segment plays the source from its beginning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AudioSegment {
    pub start: f64,
    pub end: f64,
}

impl AudioSegment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Lay the audio track under a video.
///
/// Without looping the track plays once, cut at `min(video, audio)`. With looping, back-to-back
/// copies of length `min(audio, remaining)` start at 0 until the video is covered; the last copy
/// may be short. Segments never overlap and leave no gaps.
pub fn plan_audio_segments(
    audio_duration: f64,
    video_duration: f64,
    looping: bool,
) -> Vec<AudioSegment> {
    if !(audio_duration > EPS && video_duration > EPS) {
        return Vec::new();
    }
    if !looping {
        return vec![AudioSegment {
            start: 0.0,
            end: audio_duration.min(video_duration),
        }];
    }

    let mut segments = Vec::with_capacity((video_duration / audio_duration).ceil() as usize);
    let mut cursor = 0.0f64;
    while video_duration - cursor > EPS {
        let len = audio_duration.min(video_duration - cursor);
        segments.push(AudioSegment {
            start: cursor,
            end: cursor + len,
        });
        cursor += len;
    }
    segments
}

#[cfg(test)]
#[path = "../../tests/unit/audio/plan.rs"]
mod tests;
