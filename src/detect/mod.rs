//! Highlight detection boundary.
//!
//! Detection itself is an external collaborator (a model server or worker
//! process); the core only defines the capability contract, widens raw
//! moments into usable clip windows, and cuts the detected windows out of a
//! recording with `ffmpeg`.

use std::path::{Path, PathBuf};

use crate::clip::AiClipInfo;
use crate::foundation::error::{CutError, CutResult};

/// Seconds of pre-roll added before a detected moment.
const MOMENT_PRE_ROLL_SEC: f64 = 9.0;
/// Seconds of post-roll added after a detected moment.
const MOMENT_POST_ROLL_SEC: f64 = 4.0;

/// One detected highlight moment in a recording.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HighlightMoment {
    /// Moment tag (e.g. "kill", "round_win").
    pub kind: String,
    /// Moment start in seconds from the recording start.
    pub start_sec: f64,
    /// Moment end in seconds; open-ended moments take the post-roll only.
    pub end_sec: Option<f64>,
    /// Detector confidence.
    pub score: f64,
}

/// A cut window derived from a moment, padded with pre/post-roll.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipWindow {
    /// Window start in seconds, clamped to the recording start.
    pub start_sec: f64,
    /// Window end in seconds.
    pub end_sec: f64,
}

impl HighlightMoment {
    /// The padded cut window for this moment.
    ///
    /// Detectors report the instant of the action; viewers want the lead-up
    /// and the aftermath, hence the asymmetric padding.
    pub fn window(&self) -> ClipWindow {
        let start = (self.start_sec - MOMENT_PRE_ROLL_SEC).max(0.0);
        let end = match self.end_sec {
            Some(end) => end + MOMENT_POST_ROLL_SEC,
            None => self.start_sec + MOMENT_POST_ROLL_SEC,
        };
        ClipWindow {
            start_sec: start,
            end_sec: end.max(start),
        }
    }
}

/// Capability contract for an external highlight detector.
pub trait HighlightDetector {
    /// Analyze a recording and return its highlight moments.
    ///
    /// Network/timeout policy lives behind this boundary, not in the core.
    fn detect(&mut self, recording: &Path) -> CutResult<Vec<HighlightMoment>>;
}

/// Cut each moment's padded window out of `recording` as its own clip file.
///
/// Output files land next to the recording, named after their window. A
/// window that fails to cut is skipped with a warning; detection results are
/// best-effort by nature. Returns clip paths with their AI metadata, ready
/// for [`crate::clip::ClipRegistry::add_ai_clips`].
pub fn cut_highlight_clips(
    recording: &Path,
    moments: &[HighlightMoment],
) -> CutResult<Vec<(PathBuf, AiClipInfo)>> {
    if !recording.exists() {
        return Err(CutError::ClipUnavailable(recording.to_path_buf()));
    }

    let mut cut = Vec::new();
    for moment in moments {
        let window = moment.window();
        let out_path = window_output_path(recording, window);

        if out_path.exists() {
            // Re-detection over the same recording reuses window names;
            // replace the stale cut.
            let _ = std::fs::remove_file(&out_path);
        }

        let status = std::process::Command::new("ffmpeg")
            .args(["-v", "error", "-y", "-i"])
            .arg(recording)
            .args([
                "-ss",
                &format!("{:.3}", window.start_sec),
                "-to",
                &format!("{:.3}", window.end_sec),
                "-c:v",
                "libx264",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
            ])
            .arg(&out_path)
            .status()
            .map_err(|e| CutError::media(format!("failed to run ffmpeg for highlight cut: {e}")))?;

        if !status.success() {
            tracing::warn!(
                out = %out_path.display(),
                start = window.start_sec,
                end = window.end_sec,
                "highlight cut failed, skipping moment"
            );
            continue;
        }

        cut.push((
            out_path,
            AiClipInfo {
                score: moment.score,
                moments: vec![moment.kind.clone()],
            },
        ));
    }
    Ok(cut)
}

fn window_output_path(recording: &Path, window: ClipWindow) -> PathBuf {
    let stem = recording
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording");
    recording.with_file_name(format!(
        "{stem}-{:.0}-{:.0}.mp4",
        window.start_sec, window.end_sec
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moment(start: f64, end: Option<f64>) -> HighlightMoment {
        HighlightMoment {
            kind: "kill".to_string(),
            start_sec: start,
            end_sec: end,
            score: 0.9,
        }
    }

    #[test]
    fn window_pads_with_pre_and_post_roll() {
        let w = moment(30.0, Some(35.0)).window();
        assert_eq!(w.start_sec, 21.0);
        assert_eq!(w.end_sec, 39.0);
    }

    #[test]
    fn window_clamps_to_recording_start() {
        let w = moment(4.0, Some(6.0)).window();
        assert_eq!(w.start_sec, 0.0);
        assert_eq!(w.end_sec, 10.0);
    }

    #[test]
    fn open_ended_moment_takes_post_roll_from_its_start() {
        let w = moment(100.0, None).window();
        assert_eq!(w.start_sec, 91.0);
        assert_eq!(w.end_sec, 104.0);
    }

    #[test]
    fn window_never_inverts() {
        let w = moment(0.0, Some(-20.0)).window();
        assert!(w.end_sec >= w.start_sec);
    }

    #[test]
    fn output_paths_encode_the_window() {
        let path = window_output_path(
            Path::new("/rec/stream.mp4"),
            ClipWindow {
                start_sec: 21.0,
                end_sec: 39.0,
            },
        );
        assert_eq!(path, PathBuf::from("/rec/stream-21-39.mp4"));
    }

    #[test]
    fn missing_recording_is_recoverable() {
        let err = cut_highlight_clips(Path::new("/no/such/rec.mp4"), &[]).unwrap_err();
        assert!(err.is_clip_recoverable());
    }
}
