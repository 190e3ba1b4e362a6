use std::path::Path;

use crate::audio::{MIX_CHANNELS, MIX_SAMPLE_RATE};
use crate::foundation::error::{CutError, CutResult};

/// Interleaved f32 PCM at the mix sample rate.
#[derive(Clone, Debug, Default)]
pub struct AudioPcm {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved samples; empty when the source has no audio stream.
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Silence of `duration_sec` at the mix format.
    pub fn silence(duration_sec: f64) -> Self {
        let frames = (duration_sec.max(0.0) * f64::from(MIX_SAMPLE_RATE)).round() as usize;
        Self {
            sample_rate: MIX_SAMPLE_RATE,
            channels: MIX_CHANNELS,
            interleaved_f32: vec![0.0; frames * usize::from(MIX_CHANNELS)],
        }
    }

    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.interleaved_f32.len() / usize::from(self.channels)
        }
    }
}

/// Extract the trimmed audio of one clip as stereo f32 PCM at 48 kHz.
///
/// A clip without an audio stream decodes to empty PCM rather than an error;
/// the crossfader substitutes silence of the trimmed duration.
pub fn extract_clip_audio(
    path: &Path,
    start_trim: f64,
    trimmed_duration: f64,
) -> CutResult<AudioPcm> {
    decode_audio(path, Some((start_trim, trimmed_duration)))
}

/// Decode a whole audio file (background music) at the mix format.
pub fn decode_audio_file(path: &Path) -> CutResult<AudioPcm> {
    decode_audio(path, None)
}

fn decode_audio(path: &Path, trim: Option<(f64, f64)>) -> CutResult<AudioPcm> {
    if !path.exists() {
        return Err(CutError::ClipUnavailable(path.to_path_buf()));
    }

    let mut cmd = std::process::Command::new("ffmpeg");
    cmd.args(["-v", "error"]);
    if let Some((start_trim, _)) = trim {
        cmd.args(["-ss", &format!("{start_trim:.6}")]);
    }
    cmd.arg("-i").arg(path);
    if let Some((_, trimmed_duration)) = trim {
        cmd.args(["-t", &format!("{trimmed_duration:.6}")]);
    }
    let out = cmd
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            &MIX_CHANNELS.to_string(),
            "-ar",
            &MIX_SAMPLE_RATE.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| CutError::audio(format!("failed to run ffmpeg for audio extract: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a video-only input as a stream-matching error; treat
        // it as empty PCM so the clip contributes silence instead of failing.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate: MIX_SAMPLE_RATE,
                channels: MIX_CHANNELS,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(CutError::audio(format!(
            "audio extract failed for '{}': {}",
            path.display(),
            msg.trim()
        )));
    }

    if !out.stdout.len().is_multiple_of(4) {
        return Err(CutError::audio(
            "extracted audio byte length is not aligned to f32 samples",
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    Ok(AudioPcm {
        sample_rate: MIX_SAMPLE_RATE,
        channels: MIX_CHANNELS,
        interleaved_f32: pcm,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_expected_sample_count() {
        let pcm = AudioPcm::silence(2.0);
        assert_eq!(pcm.frame_count(), 96_000);
        assert_eq!(pcm.interleaved_f32.len(), 192_000);
        assert!(pcm.interleaved_f32.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn silence_of_negative_duration_is_empty() {
        assert_eq!(AudioPcm::silence(-1.0).frame_count(), 0);
    }

    #[test]
    fn missing_file_is_recoverable() {
        let err = extract_clip_audio(Path::new("/no/such/clip.mp4"), 0.0, 1.0).unwrap_err();
        assert!(err.is_clip_recoverable());
        let err = decode_audio_file(Path::new("/no/such/music.mp3")).unwrap_err();
        assert!(err.is_clip_recoverable());
    }
}
