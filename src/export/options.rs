use std::path::PathBuf;

use crate::audio::music_volume_gain;
use crate::foundation::core::{Preset, Resolution, validate_fps};
use crate::foundation::error::{CutError, CutResult};
use crate::transition::{TransitionParams, TransitionType};

/// Resolved per-run output geometry and encoder settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportOptions {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: u32,
    /// Encoder preset.
    pub preset: Preset,
}

impl ExportOptions {
    /// Options for a full-quality export.
    pub fn full(resolution: Resolution, fps: u32, preset: Preset) -> CutResult<Self> {
        Ok(Self {
            width: resolution.width(),
            height: resolution.height(),
            fps: validate_fps(fps)?,
            preset,
        })
    }

    /// Fixed reduced profile used for preview renders.
    pub fn preview() -> Self {
        Self {
            width: 1280 / 4,
            height: 720 / 4,
            fps: 30,
            preset: Preset::Ultrafast,
        }
    }
}

/// Transition selection shared by every boundary of a run.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransitionSettings {
    /// Selected kind, including the `None` and `Random` selectors.
    pub kind: TransitionType,
    /// Configured duration in seconds.
    pub duration_sec: f64,
    /// Type-specific parameters.
    pub params: TransitionParams,
}

impl TransitionSettings {
    /// Create settings, validating the duration.
    pub fn new(kind: TransitionType, duration_sec: f64) -> CutResult<Self> {
        if !duration_sec.is_finite() || duration_sec < 0.0 {
            return Err(CutError::validation(
                "transition duration must be finite and >= 0",
            ));
        }
        Ok(Self {
            kind,
            duration_sec,
            params: TransitionParams::default(),
        })
    }

    /// The duration boundaries actually use: zero when transitions are off.
    pub fn effective_duration(&self) -> f64 {
        if self.kind == TransitionType::None {
            0.0
        } else {
            self.duration_sec
        }
    }
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            kind: TransitionType::Fade,
            duration_sec: 1.0,
            params: TransitionParams::default(),
        }
    }
}

/// Background-music configuration.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioSettings {
    /// Whether background music is mixed in at all.
    pub music_enabled: bool,
    /// Music file path.
    pub music_path: Option<PathBuf>,
    /// Music volume, 0-100.
    pub music_volume: f64,
}

impl AudioSettings {
    /// Music participates only when enabled and a path is configured.
    pub fn music_active(&self) -> bool {
        self.music_enabled && self.music_path.is_some()
    }

    /// Linear gain for the configured volume.
    pub fn music_gain(&self) -> f64 {
        music_volume_gain(self.music_volume)
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            music_enabled: false,
            music_path: None,
            music_volume: 50.0,
        }
    }
}

/// Everything one exporter instance needs to run exports.
#[derive(Clone, Debug)]
pub struct ExportConfig {
    /// Full-export output file.
    pub output_path: PathBuf,
    /// Fixed preview output file.
    pub preview_path: PathBuf,
    /// Full-export resolution.
    pub resolution: Resolution,
    /// Full-export frame rate (30 or 60).
    pub fps: u32,
    /// Full-export encoder preset.
    pub preset: Preset,
    /// Boundary transition selection.
    pub transition: TransitionSettings,
    /// Background music.
    pub audio: AudioSettings,
    /// Fixed seed for per-boundary `Random` transition picks; a fresh seed is
    /// drawn per run when unset.
    pub transition_seed: Option<u64>,
}

impl ExportConfig {
    /// Config with defaults matching a first-run studio setup.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            preview_path: std::env::temp_dir().join("reelcut-preview.mp4"),
            resolution: Resolution::Hd720,
            fps: 30,
            preset: Preset::Ultrafast,
            transition: TransitionSettings::default(),
            audio: AudioSettings::default(),
            transition_seed: None,
        }
    }

    /// Resolve per-run options.
    pub fn options(&self, preview: bool) -> CutResult<ExportOptions> {
        if preview {
            Ok(ExportOptions::preview())
        } else {
            ExportOptions::full(self.resolution, self.fps, self.preset)
        }
    }

    /// The file a run writes to.
    pub fn run_output_path(&self, preview: bool) -> &PathBuf {
        if preview {
            &self.preview_path
        } else {
            &self.output_path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_profile_is_fixed_and_small() {
        let opts = ExportOptions::preview();
        assert_eq!((opts.width, opts.height, opts.fps), (320, 180, 30));
        assert_eq!(opts.preset, Preset::Ultrafast);
    }

    #[test]
    fn none_transition_has_zero_effective_duration() {
        let off = TransitionSettings::new(TransitionType::None, 2.0).unwrap();
        assert_eq!(off.effective_duration(), 0.0);
        let fade = TransitionSettings::new(TransitionType::Fade, 2.0).unwrap();
        assert_eq!(fade.effective_duration(), 2.0);
    }

    #[test]
    fn transition_duration_must_be_sane() {
        assert!(TransitionSettings::new(TransitionType::Fade, -1.0).is_err());
        assert!(TransitionSettings::new(TransitionType::Fade, f64::NAN).is_err());
    }

    #[test]
    fn music_requires_both_flag_and_path() {
        let mut audio = AudioSettings::default();
        assert!(!audio.music_active());
        audio.music_enabled = true;
        assert!(!audio.music_active());
        audio.music_path = Some(PathBuf::from("music.mp3"));
        assert!(audio.music_active());
    }

    #[test]
    fn full_options_validate_fps() {
        assert!(ExportOptions::full(Resolution::Fhd1080, 60, Preset::Slow).is_ok());
        assert!(ExportOptions::full(Resolution::Fhd1080, 25, Preset::Slow).is_err());
    }
}
