use crate::foundation::error::{CutError, CutResult};

/// Output resolution profile for a full export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Resolution {
    /// 1280x720.
    #[serde(rename = "720")]
    Hd720,
    /// 1920x1080.
    #[serde(rename = "1080")]
    Fhd1080,
}

impl Resolution {
    /// Output width in pixels.
    pub fn width(self) -> u32 {
        match self {
            Self::Hd720 => 1280,
            Self::Fhd1080 => 1920,
        }
    }

    /// Output height in pixels.
    pub fn height(self) -> u32 {
        match self {
            Self::Hd720 => 720,
            Self::Fhd1080 => 1080,
        }
    }
}

/// x264 encoder speed/quality preset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Fastest encode, largest output.
    Ultrafast,
    /// Balanced.
    Fast,
    /// Slowest encode, best compression.
    Slow,
}

impl Preset {
    /// The `-preset` argument value ffmpeg expects.
    pub fn as_ffmpeg_arg(self) -> &'static str {
        match self {
            Self::Ultrafast => "ultrafast",
            Self::Fast => "fast",
            Self::Slow => "slow",
        }
    }
}

/// Validate an output frame rate. Only 30 and 60 are supported.
pub fn validate_fps(fps: u32) -> CutResult<u32> {
    match fps {
        30 | 60 => Ok(fps),
        other => Err(CutError::validation(format!(
            "unsupported fps {other} (expected 30 or 60)"
        ))),
    }
}

/// Convert a duration in seconds to a frame count at `fps`, rounding to the
/// nearest frame.
pub fn secs_to_frames(secs: f64, fps: u32) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * f64::from(fps)).round() as u64
}

/// Convert a frame count at `fps` to seconds.
pub fn frames_to_secs(frames: u64, fps: u32) -> f64 {
    (frames as f64) / f64::from(fps)
}
