use std::io::Read as _;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::foundation::core::secs_to_frames;
use crate::foundation::error::{CutError, CutResult};
use crate::source::{Frame, FrameSource};

/// [`FrameSource`] backed by one streaming `ffmpeg` decode process.
///
/// The child decodes the trimmed range, scaled to the output resolution and
/// resampled to the output fps, and writes raw RGBA frames to its stdout;
/// frames are pulled with exact-size reads so the pipe itself provides
/// backpressure.
#[derive(Debug)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    n_frames: u64,
    current_frame: u64,
    trimmed_duration: f64,
    frame: Frame,
    scratch: Vec<u8>,
    read_any: bool,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegFrameSource {
    /// Spawn a decoder for the trimmed range of `path`.
    ///
    /// `trimmed_duration` is the clip duration minus both trims; the source
    /// will produce `round(trimmed_duration * fps)` frames.
    pub fn open(
        path: &Path,
        start_trim: f64,
        trimmed_duration: f64,
        width: u32,
        height: u32,
        fps: u32,
    ) -> CutResult<Self> {
        if width == 0 || height == 0 || fps == 0 {
            return Err(CutError::validation(
                "frame source width/height/fps must be non-zero",
            ));
        }
        if !trimmed_duration.is_finite() || trimmed_duration <= 0.0 {
            return Err(CutError::validation(
                "frame source trimmed duration must be > 0",
            ));
        }
        if !path.exists() {
            return Err(CutError::ClipUnavailable(path.to_path_buf()));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        cmd.args(["-v", "error", "-ss", &format!("{start_trim:.6}")])
            .arg("-i")
            .arg(path)
            .args([
                "-t",
                &format!("{trimmed_duration:.6}"),
                "-vf",
                &format!("scale={width}:{height}"),
                "-r",
                &fps.to_string(),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "-an",
                "pipe:1",
            ]);

        let mut child = cmd
            .spawn()
            .map_err(|e| CutError::media(format!("failed to spawn ffmpeg decoder: {e}")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CutError::media("failed to open ffmpeg decoder stdout (unexpected)"))?;

        let frame_len = (width * height * 4) as usize;
        Ok(Self {
            path: path.to_path_buf(),
            n_frames: secs_to_frames(trimmed_duration, fps),
            current_frame: 0,
            trimmed_duration,
            frame: Frame::black(width, height),
            scratch: vec![0u8; frame_len],
            read_any: false,
            child: Some(child),
            stdout: Some(stdout),
        })
    }
}

impl FrameSource for FfmpegFrameSource {
    fn frame_count(&self) -> u64 {
        self.n_frames
    }

    fn current_frame(&self) -> u64 {
        self.current_frame
    }

    fn trimmed_duration(&self) -> f64 {
        self.trimmed_duration
    }

    fn read_next_frame(&mut self) -> CutResult<bool> {
        if self.current_frame >= self.n_frames {
            return Ok(false);
        }
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };

        match stdout.read_exact(&mut self.scratch) {
            Ok(()) => {
                std::mem::swap(&mut self.scratch, &mut self.frame.data);
                self.read_any = true;
                self.current_frame += 1;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                if !self.read_any {
                    // The decoder produced nothing at all: the file went away
                    // or cannot be decoded. Recoverable by dropping the clip.
                    self.end();
                    return Err(CutError::ClipUnavailable(self.path.clone()));
                }
                // Sometimes the decoder delivers one frame fewer than the
                // duration math promised. The previous frame is still in the
                // buffer, so repeat it and keep counting.
                tracing::debug!(
                    path = %self.path.display(),
                    frame = self.current_frame,
                    "padding with repeated frame"
                );
                self.current_frame += 1;
                Ok(true)
            }
            Err(e) => {
                self.end();
                Err(CutError::media(format!(
                    "frame read failed for '{}': {e}",
                    self.path.display()
                )))
            }
        }
    }

    fn frame(&self) -> &Frame {
        &self.frame
    }

    fn end(&mut self) {
        drop(self.stdout.take());
        if let Some(mut child) = self.child.take() {
            // The child may still be mid-stream on cancellation or early clip
            // switch; reap it either way.
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.end();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_bad_geometry_and_missing_files() {
        let missing = Path::new("/no/such/clip.mp4");
        assert!(FfmpegFrameSource::open(missing, 0.0, 1.0, 0, 720, 30).is_err());
        assert!(FfmpegFrameSource::open(missing, 0.0, 0.0, 1280, 720, 30).is_err());

        let err = FfmpegFrameSource::open(missing, 0.0, 1.0, 1280, 720, 30).unwrap_err();
        assert!(err.is_clip_recoverable());
    }
}
