use std::path::{Path, PathBuf};

use crate::audio::write_pcm_f32le;
use crate::foundation::error::{CutError, CutResult};

/// One input to the mixer.
#[derive(Clone, Debug)]
pub struct MixTrack {
    /// Interleaved PCM at the mix format.
    pub samples: Vec<f32>,
    /// Linear gain multiplier.
    pub volume: f32,
    /// Tile this track to the primary track's length instead of truncating
    /// into silence.
    pub looped: bool,
}

/// Map a 0-100 music volume to a linear gain.
///
/// The curve is `10^(-1 + volume/100)`: near-silent (0.1) at 0 and unity at
/// 100, which tracks perceived loudness better than a linear ramp.
pub fn music_volume_gain(volume: f64) -> f64 {
    10f64.powf(-1.0 + volume.clamp(0.0, 100.0) / 100.0)
}

/// Mix `tracks` into one buffer the length of the first (primary) track.
///
/// Looping tracks are tiled across the primary length and truncated at the
/// end; non-looping tracks shorter than the primary leave silence behind.
pub fn mix_tracks(tracks: &[MixTrack]) -> CutResult<Vec<f32>> {
    let primary = tracks
        .first()
        .ok_or_else(|| CutError::audio("mixer requires a primary track"))?;

    let len = primary.samples.len();
    let mut out = vec![0.0f32; len];

    for track in tracks {
        if track.samples.is_empty() {
            continue;
        }
        for (i, sample) in out.iter_mut().enumerate() {
            let src = if track.looped {
                track.samples[i % track.samples.len()]
            } else if i < track.samples.len() {
                track.samples[i]
            } else {
                break;
            };
            *sample += src * track.volume;
        }
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    Ok(out)
}

/// Overlays secondary tracks (background music) onto the crossfaded track
/// and writes one `.f32le` working file.
///
/// When no music is configured the orchestrator skips this stage entirely and
/// routes the crossfader's file straight to the writer.
pub struct AudioMixer {
    out_path: PathBuf,
}

impl AudioMixer {
    /// Create a mixer writing to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
        }
    }

    /// The working file this mixer writes.
    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    /// Mix `tracks` and write the result.
    pub fn export(&self, tracks: &[MixTrack]) -> CutResult<()> {
        let mixed = mix_tracks(tracks)?;
        write_pcm_f32le(&mixed, &self.out_path)
    }

    /// Remove the working file. Safe to call whether or not `export` ran.
    pub fn cleanup(&self) {
        let _ = std::fs::remove_file(&self.out_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_curve_matches_documented_formula() {
        assert!((music_volume_gain(0.0) - 0.1).abs() < 1e-12);
        assert!((music_volume_gain(100.0) - 1.0).abs() < 1e-12);
        assert!((music_volume_gain(50.0) - 10f64.powf(-0.5)).abs() < 1e-12);
        // Out-of-range values clamp instead of extrapolating.
        assert_eq!(music_volume_gain(-10.0), music_volume_gain(0.0));
        assert_eq!(music_volume_gain(250.0), music_volume_gain(100.0));
    }

    #[test]
    fn output_length_equals_primary_length() {
        let tracks = vec![
            MixTrack {
                samples: vec![0.0; 1000],
                volume: 1.0,
                looped: false,
            },
            MixTrack {
                samples: vec![0.5; 4000],
                volume: 1.0,
                looped: false,
            },
        ];
        let out = mix_tracks(&tracks).unwrap();
        assert_eq!(out.len(), 1000);
    }

    #[test]
    fn short_looped_track_tiles_to_primary_length() {
        let tracks = vec![
            MixTrack {
                samples: vec![0.0; 10],
                volume: 1.0,
                looped: false,
            },
            MixTrack {
                samples: vec![0.1, 0.2, 0.3],
                volume: 1.0,
                looped: true,
            },
        ];
        let out = mix_tracks(&tracks).unwrap();
        assert_eq!(out.len(), 10);
        assert!((out[3] - 0.1).abs() < 1e-6);
        assert!((out[4] - 0.2).abs() < 1e-6);
        assert!((out[9] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn short_unlooped_track_leaves_silence() {
        let tracks = vec![
            MixTrack {
                samples: vec![0.0; 6],
                volume: 1.0,
                looped: false,
            },
            MixTrack {
                samples: vec![0.5; 2],
                volume: 1.0,
                looped: false,
            },
        ];
        let out = mix_tracks(&tracks).unwrap();
        assert_eq!(&out[..2], &[0.5, 0.5]);
        assert!(out[2..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn mix_applies_volume_and_clamps() {
        let tracks = vec![
            MixTrack {
                samples: vec![0.9; 4],
                volume: 1.0,
                looped: false,
            },
            MixTrack {
                samples: vec![0.9; 4],
                volume: 1.0,
                looped: true,
            },
        ];
        let out = mix_tracks(&tracks).unwrap();
        assert!(out.iter().all(|&s| s == 1.0));

        let quiet = mix_tracks(&[MixTrack {
            samples: vec![0.8; 4],
            volume: 0.5,
            looped: false,
        }])
        .unwrap();
        assert!(quiet.iter().all(|&s| (s - 0.4).abs() < 1e-6));
    }

    #[test]
    fn empty_track_list_is_an_error() {
        assert!(mix_tracks(&[]).is_err());
    }
}
