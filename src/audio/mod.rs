//! Audio pipeline: per-boundary crossfade concatenation and music mixing.
//!
//! All audio runs in-process on interleaved f32 PCM at a fixed mix format;
//! the only files touched are the stage outputs (`*-concat.f32le`,
//! `*-mix.f32le`) handed to the frame writer.

mod crossfade;
mod mix;

pub use crossfade::{AudioCrossfader, ClipAudio, crossfade_tracks, overlap_duration};
pub use mix::{AudioMixer, MixTrack, mix_tracks, music_volume_gain};

use std::path::Path;

use crate::foundation::error::{CutError, CutResult};

/// Sample rate all audio is mixed at.
pub const MIX_SAMPLE_RATE: u32 = 48_000;
/// Channel count all audio is mixed at.
pub const MIX_CHANNELS: u16 = 2;

/// Write interleaved f32 PCM samples to a raw little-endian `.f32le` file.
pub(crate) fn write_pcm_f32le(samples_interleaved: &[f32], out_path: &Path) -> CutResult<()> {
    crate::media::ensure_parent_dir(out_path)?;

    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        CutError::audio(format!(
            "failed to write audio file '{}': {e}",
            out_path.display()
        ))
    })
}
