use std::path::{Path, PathBuf};

use crate::foundation::error::{CutError, CutResult};

/// Probed stream/format facts about one source clip.
#[derive(Clone, Debug)]
pub struct SourceInfo {
    /// Absolute path the probe ran against.
    pub path: PathBuf,
    /// Video width in pixels.
    pub width: u32,
    /// Video height in pixels.
    pub height: u32,
    /// Native frame rate as a rational `num/den`.
    pub fps_num: u32,
    /// Native frame rate denominator, non-zero.
    pub fps_den: u32,
    /// Container duration in seconds.
    pub duration_sec: f64,
    /// Whether the container carries an audio stream.
    pub has_audio: bool,
}

impl SourceInfo {
    /// Native frame rate as a float.
    pub fn fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Probe a source clip with `ffprobe`.
///
/// A missing or unreadable file maps to [`CutError::ClipUnavailable`] so the
/// caller can drop the clip instead of failing the run.
pub fn probe_source(path: &Path) -> CutResult<SourceInfo> {
    #[derive(serde::Deserialize)]
    struct ProbeStream {
        codec_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        r_frame_rate: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeFormat {
        duration: Option<String>,
    }
    #[derive(serde::Deserialize)]
    struct ProbeOut {
        streams: Vec<ProbeStream>,
        format: Option<ProbeFormat>,
    }

    if !path.exists() {
        return Err(CutError::ClipUnavailable(path.to_path_buf()));
    }

    let out = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(path)
        .output()
        .map_err(|e| CutError::media(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        // ffprobe rejects files it cannot open or parse with a non-zero exit;
        // either way the clip cannot participate in this run.
        tracing::warn!(
            path = %path.display(),
            stderr = %String::from_utf8_lossy(&out.stderr).trim(),
            "ffprobe failed, treating clip as unavailable"
        );
        return Err(CutError::ClipUnavailable(path.to_path_buf()));
    }

    let parsed: ProbeOut = serde_json::from_slice(&out.stdout)
        .map_err(|e| CutError::media(format!("ffprobe json parse failed: {e}")))?;
    let video_stream = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| {
            CutError::media(format!("no video stream found in '{}'", path.display()))
        })?;
    let width = video_stream
        .width
        .ok_or_else(|| CutError::media("missing video width from ffprobe"))?;
    let height = video_stream
        .height
        .ok_or_else(|| CutError::media("missing video height from ffprobe"))?;

    let (fps_num, fps_den) = parse_ff_ratio(video_stream.r_frame_rate.as_deref().unwrap_or("0/1"))
        .ok_or_else(|| CutError::media("invalid video r_frame_rate"))?;
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);
    let has_audio = parsed
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    Ok(SourceInfo {
        path: path.to_path_buf(),
        width,
        height,
        fps_num,
        fps_den,
        duration_sec,
        has_audio,
    })
}

fn parse_ff_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let a = parts.next()?.parse::<u32>().ok()?;
    let b = parts.next()?.parse::<u32>().ok()?;
    if b == 0 {
        return None;
    }
    Some((a, b))
}
