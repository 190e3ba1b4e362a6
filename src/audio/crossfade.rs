use std::path::{Path, PathBuf};

use crate::audio::{MIX_CHANNELS, MIX_SAMPLE_RATE, write_pcm_f32le};
use crate::foundation::error::{CutError, CutResult};
use crate::source::AudioPcm;

/// One clip's contribution to the concatenated track.
#[derive(Clone, Debug)]
pub struct ClipAudio {
    /// Trimmed duration in seconds; decides this clip's slot length even when
    /// the decoded PCM is shorter or missing.
    pub trimmed_duration: f64,
    /// Extracted PCM; empty when the clip has no audio stream.
    pub pcm: AudioPcm,
}

/// Overlap at one boundary: the configured transition duration, clamped so it
/// never consumes more than half of either adjacent clip.
pub fn overlap_duration(transition_duration: f64, from_trimmed: f64, to_trimmed: f64) -> f64 {
    transition_duration
        .max(0.0)
        .min(from_trimmed / 2.0)
        .min(to_trimmed / 2.0)
}

/// Concatenate clip audio with linear crossfades at every boundary.
///
/// The output length in sample frames is exactly
/// `sum(trimmed frames) - sum(overlap frames)`. Clips with no audio
/// contribute silence of their trimmed duration.
pub fn crossfade_tracks(clips: &[ClipAudio], transition_duration: f64) -> Vec<f32> {
    let ch = usize::from(MIX_CHANNELS);
    let rate = f64::from(MIX_SAMPLE_RATE);

    let slot_frames: Vec<usize> = clips
        .iter()
        .map(|c| (c.trimmed_duration.max(0.0) * rate).round() as usize)
        .collect();
    // Clamp again in sample space: rounding the half-durations independently
    // must never let an overlap exceed half of either adjacent slot.
    let overlap_frames: Vec<usize> = clips
        .windows(2)
        .zip(slot_frames.windows(2))
        .map(|(pair, slots)| {
            let overlap = overlap_duration(
                transition_duration,
                pair[0].trimmed_duration,
                pair[1].trimmed_duration,
            );
            ((overlap * rate).round() as usize)
                .min(slots[0] / 2)
                .min(slots[1] / 2)
        })
        .collect();

    let total_frames = slot_frames.iter().sum::<usize>() - overlap_frames.iter().sum::<usize>();
    let mut out = vec![0.0f32; total_frames * ch];

    let mut write_frame = 0usize;
    for (i, clip) in clips.iter().enumerate() {
        let frames = slot_frames[i];
        let fade_in = if i > 0 { overlap_frames[i - 1] } else { 0 };
        let fade_out = if i < overlap_frames.len() {
            overlap_frames[i]
        } else {
            0
        };

        let src = &clip.pcm.interleaved_f32;
        let src_frames = clip.pcm.frame_count();

        for j in 0..frames {
            let mut gain = 1.0f32;
            if fade_in > 0 && j < fade_in {
                gain *= (j + 1) as f32 / fade_in as f32;
            }
            if fade_out > 0 && j >= frames - fade_out {
                gain *= (frames - j) as f32 / fade_out as f32;
            }

            let dst = (write_frame + j) * ch;
            if j < src_frames {
                let s = j * ch;
                for c in 0..ch {
                    out[dst + c] += src[s + c] * gain;
                }
            }
            // Slots past the decoded PCM stay silent: the decode came up
            // short or the clip had no audio track.
        }

        write_frame += frames - fade_out;
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

/// Concatenates clip audio into one `.f32le` working file.
///
/// The file is a working artifact of the export run; [`AudioCrossfader::cleanup`]
/// removes it on completion or failure.
pub struct AudioCrossfader {
    out_path: PathBuf,
    transition_duration: f64,
}

impl AudioCrossfader {
    /// Create a crossfader writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>, transition_duration: f64) -> Self {
        Self {
            out_path: out_path.into(),
            transition_duration,
        }
    }

    /// The working file this crossfader writes.
    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Crossfade `clips`, write the working file and return the samples for
    /// downstream mixing.
    pub fn export(&self, clips: &[ClipAudio]) -> CutResult<Vec<f32>> {
        if clips.is_empty() {
            return Err(CutError::audio("crossfader requires at least one clip"));
        }
        let mixed = crossfade_tracks(clips, self.transition_duration);
        write_pcm_f32le(&mixed, &self.out_path)?;
        Ok(mixed)
    }

    /// Remove the working file. Safe to call whether or not `export` ran.
    pub fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.out_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(duration_sec: f64, value: f32) -> ClipAudio {
        let frames = (duration_sec * f64::from(MIX_SAMPLE_RATE)).round() as usize;
        ClipAudio {
            trimmed_duration: duration_sec,
            pcm: AudioPcm {
                sample_rate: MIX_SAMPLE_RATE,
                channels: MIX_CHANNELS,
                interleaved_f32: vec![value; frames * usize::from(MIX_CHANNELS)],
            },
        }
    }

    fn silent(duration_sec: f64) -> ClipAudio {
        ClipAudio {
            trimmed_duration: duration_sec,
            pcm: AudioPcm::default(),
        }
    }

    #[test]
    fn overlap_clamps_to_half_of_either_neighbor() {
        assert_eq!(overlap_duration(2.0, 10.0, 8.0), 2.0);
        assert_eq!(overlap_duration(6.0, 10.0, 8.0), 4.0);
        assert_eq!(overlap_duration(6.0, 4.0, 20.0), 2.0);
        assert_eq!(overlap_duration(-1.0, 4.0, 4.0), 0.0);
    }

    #[test]
    fn output_length_is_total_minus_overlaps() {
        let clips = vec![tone(10.0, 0.1), tone(8.0, 0.1), tone(12.0, 0.1)];
        let out = crossfade_tracks(&clips, 2.0);
        // 10 + 8 + 12 - 2*2 = 26s.
        let expected_frames = (26.0 * f64::from(MIX_SAMPLE_RATE)).round() as usize;
        assert_eq!(out.len(), expected_frames * usize::from(MIX_CHANNELS));
    }

    #[test]
    fn silent_clips_contribute_their_trimmed_duration() {
        let clips = vec![silent(4.0), silent(6.0)];
        let out = crossfade_tracks(&clips, 1.0);
        let expected_frames = (9.0 * f64::from(MIX_SAMPLE_RATE)).round() as usize;
        assert_eq!(out.len(), expected_frames * usize::from(MIX_CHANNELS));
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn crossfade_sums_to_roughly_constant_level_mid_overlap() {
        let clips = vec![tone(4.0, 0.5), tone(4.0, 0.5)];
        let out = crossfade_tracks(&clips, 2.0);
        let ch = usize::from(MIX_CHANNELS);
        // Middle of the overlap: fade-out gain + fade-in gain ~ 1.
        let overlap_frames = (2.0 * f64::from(MIX_SAMPLE_RATE)) as usize;
        let overlap_start = (4.0 * f64::from(MIX_SAMPLE_RATE)) as usize - overlap_frames;
        let mid = overlap_start + overlap_frames / 2;
        assert!((out[mid * ch] - 0.5).abs() < 0.01);
    }

    #[test]
    fn single_clip_passes_through_without_fades() {
        let clips = vec![tone(2.0, 0.25)];
        let out = crossfade_tracks(&clips, 5.0);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }
}
