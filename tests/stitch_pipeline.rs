//! End-to-end export runs against real `ffmpeg`/`ffprobe`.
//!
//! Media is synthesized with lavfi test sources; every test self-skips when
//! the tools are not on PATH.

use std::path::{Path, PathBuf};
use std::process::Command;

use reelcut::{
    CancelToken, ClipRegistry, ExportConfig, ExportState, Exporter, Frame, FrameSink, LoadOptions,
    SinkConfig, TransitionSettings, TransitionType, load_clips,
};

fn ffmpeg_tools_available() -> bool {
    reelcut::media::is_ffmpeg_on_path() && reelcut::media::is_ffprobe_on_path()
}

fn synth_clip(path: &Path, seconds: u32, with_audio: bool) -> anyhow::Result<()> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args([
        "-v",
        "error",
        "-y",
        "-f",
        "lavfi",
        "-i",
        "testsrc=size=64x64:rate=30",
    ]);
    if with_audio {
        cmd.args(["-f", "lavfi", "-i", "sine=frequency=440:sample_rate=48000"]);
    }
    cmd.args([
        "-t",
        &seconds.to_string(),
        "-pix_fmt",
        "yuv420p",
        "-c:v",
        "libx264",
    ]);
    if with_audio {
        cmd.args(["-c:a", "aac"]);
    } else {
        cmd.arg("-an");
    }
    cmd.arg(path);
    let status = cmd.status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating {}", path.display());
    Ok(())
}

fn test_root(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("reelcut-e2e-{tag}-{}", std::process::id()))
}

fn loaded_registry(root: &Path, clips: &[(&str, u32, bool)]) -> anyhow::Result<ClipRegistry> {
    std::fs::create_dir_all(root)?;
    let mut registry = ClipRegistry::new();
    for &(name, seconds, with_audio) in clips {
        let path = root.join(name);
        synth_clip(&path, seconds, with_audio)?;
        registry.add_clips([path]);
    }
    let opts = LoadOptions::new(root.join("sprites")).without_sprites();
    load_clips(&mut registry, &opts, None)?;
    Ok(registry)
}

fn preview_config(root: &Path) -> ExportConfig {
    let mut config = ExportConfig::new(root.join("Output.mp4"));
    config.preview_path = root.join("preview.mp4");
    config.transition = TransitionSettings::new(TransitionType::Fade, 0.5).unwrap();
    config.transition_seed = Some(1);
    config
}

/// Sink wrapper that records the begin() configuration and can flip the
/// cancel flag after a fixed number of frames.
struct ObservingSink<S> {
    inner: S,
    seen_cfg: Option<SinkConfig>,
    cancel_after: Option<(u64, CancelToken)>,
}

impl<S: FrameSink> ObservingSink<S> {
    fn new(inner: S) -> Self {
        Self {
            inner,
            seen_cfg: None,
            cancel_after: None,
        }
    }

    fn cancel_after(mut self, frames: u64, token: CancelToken) -> Self {
        self.cancel_after = Some((frames, token));
        self
    }
}

impl<S: FrameSink> FrameSink for ObservingSink<S> {
    fn begin(&mut self, cfg: SinkConfig) -> reelcut::CutResult<()> {
        self.seen_cfg = Some(cfg.clone());
        self.inner.begin(cfg)
    }

    fn push_frame(&mut self, frame: &Frame) -> reelcut::CutResult<()> {
        self.inner.push_frame(frame)?;
        if let Some((frames, token)) = &self.cancel_after
            && self.inner.frames_written() >= *frames
        {
            token.cancel();
        }
        Ok(())
    }

    fn end(&mut self) -> reelcut::CutResult<()> {
        self.inner.end()
    }

    fn frames_written(&self) -> u64 {
        self.inner.frames_written()
    }
}

#[test]
fn three_clip_export_writes_every_expected_frame() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return Ok(());
    }

    let root = test_root("full");
    // The middle clip has no audio track: it must contribute silence, not
    // fail the run.
    let mut registry = loaded_registry(
        &root,
        &[("a.mp4", 2, true), ("b.mp4", 2, false), ("c.mp4", 2, true)],
    )?;

    let mut exporter = Exporter::new(preview_config(&root));
    let mut sink = ObservingSink::new(reelcut::FfmpegSink::new(
        reelcut::encode::FfmpegSinkOpts::new(root.join("preview.mp4")),
    ));
    let summary = exporter.export_with_sink(
        &mut registry,
        true,
        &mut reelcut::export::NullProgress,
        &mut sink,
    )?;

    assert_eq!(summary.state, ExportState::Completed);
    assert_eq!(summary.written_frames, summary.expected_frames);
    assert!(summary.written_frames > 0);

    // Music is disabled, so the writer must have been handed the
    // crossfader's file directly: the mix stage is skipped entirely.
    let audio = sink.seen_cfg.as_ref().and_then(|c| c.audio.as_ref()).unwrap();
    let audio_name = audio.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(audio_name.contains("-concat"), "got {audio_name}");

    let out = root.join("preview.mp4");
    assert!(out.exists());
    assert!(std::fs::metadata(&out)?.len() > 0);

    // Working audio files are cleaned up on completion.
    assert!(!audio.path.exists());

    // A second identical run produces the same frame count.
    let summary2 = exporter.export(&mut registry, true, &mut reelcut::export::NullProgress)?;
    assert_eq!(summary2.state, ExportState::Completed);
    assert_eq!(summary2.written_frames, summary.written_frames);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn cancellation_keeps_a_playable_truncated_file() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return Ok(());
    }

    let root = test_root("cancel");
    let mut registry = loaded_registry(&root, &[("a.mp4", 2, true), ("b.mp4", 2, true)])?;

    let mut exporter = Exporter::new(preview_config(&root));
    let sink = ObservingSink::new(reelcut::FfmpegSink::new(
        reelcut::encode::FfmpegSinkOpts::new(root.join("preview.mp4")),
    ));
    let mut sink = sink.cancel_after(20, exporter.cancel_token());

    let summary = exporter.export_with_sink(
        &mut registry,
        true,
        &mut reelcut::export::NullProgress,
        &mut sink,
    )?;

    // The flag flips inside push_frame 20; the loop notices at the next
    // iteration, so exactly 20 frames land in the file.
    assert_eq!(summary.state, ExportState::Cancelled);
    assert_eq!(summary.written_frames, 20);
    assert_eq!(exporter.state(), ExportState::Idle);

    // The partial file is intentionally kept and finalized.
    let out = root.join("preview.mp4");
    assert!(out.exists());
    assert!(std::fs::metadata(&out)?.len() > 0);

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}

#[test]
fn background_music_routes_through_the_mixer() -> anyhow::Result<()> {
    if !ffmpeg_tools_available() {
        eprintln!("skipping: ffmpeg/ffprobe not available");
        return Ok(());
    }

    let root = test_root("music");
    let mut registry = loaded_registry(&root, &[("a.mp4", 2, true), ("b.mp4", 2, true)])?;

    // Short music file; it must loop across the whole timeline.
    let music_path = root.join("music.wav");
    let status = Command::new("ffmpeg")
        .args([
            "-v",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            "sine=frequency=220:sample_rate=48000",
            "-t",
            "1",
            "-c:a",
            "pcm_s16le",
        ])
        .arg(&music_path)
        .status()?;
    anyhow::ensure!(status.success(), "ffmpeg failed creating music.wav");

    let mut config = preview_config(&root);
    config.audio.music_enabled = true;
    config.audio.music_path = Some(music_path);
    config.audio.music_volume = 30.0;

    let mut exporter = Exporter::new(config);
    let mut sink = ObservingSink::new(reelcut::FfmpegSink::new(
        reelcut::encode::FfmpegSinkOpts::new(root.join("preview.mp4")),
    ));
    let summary = exporter.export_with_sink(
        &mut registry,
        true,
        &mut reelcut::export::NullProgress,
        &mut sink,
    )?;

    assert_eq!(summary.state, ExportState::Completed);
    let audio = sink.seen_cfg.as_ref().and_then(|c| c.audio.as_ref()).unwrap();
    let audio_name = audio.path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(audio_name.contains("-mix"), "got {audio_name}");

    let _ = std::fs::remove_dir_all(&root);
    Ok(())
}
