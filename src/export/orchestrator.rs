use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::audio::{
    AudioCrossfader, AudioMixer, ClipAudio, MIX_CHANNELS, MIX_SAMPLE_RATE, MixTrack,
};
use crate::clip::ClipRegistry;
use crate::encode::{AudioInputConfig, FfmpegSink, FfmpegSinkOpts, FrameSink, SinkConfig};
use crate::export::options::ExportConfig;
use crate::export::progress::{
    CancelToken, ExportPhase, ExportProgress, ProgressSink, ThrottledProgress,
};
use crate::export::timeline::{ClipPlan, StepOutcome, TimelineRenderer, expected_frames};
use crate::foundation::core::{Preset, Resolution, validate_fps};
use crate::foundation::error::{CutError, CutResult};
use crate::media::probe_source;
use crate::source::{
    AudioPcm, FfmpegFrameSource, FrameSource, decode_audio_file, extract_clip_audio,
};

/// Exporter state, enumerable for observers and tests.
///
/// `Completed`, `Cancelled` and `Failed` are terminal per run; the exporter
/// itself returns to `Idle` once a run's summary is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportState {
    /// No run in flight.
    Idle,
    /// Re-probing clips and mixing audio.
    Preparing,
    /// Decoding, blending and encoding frames.
    Rendering,
    /// The run wrote every expected frame.
    Completed,
    /// The run was cancelled; the partial output file is kept.
    Cancelled,
    /// The run hit a terminal error; working files were cleaned up.
    Failed,
}

/// Terminal report of one export run.
#[derive(Clone, Debug)]
pub struct ExportSummary {
    /// Terminal state: `Completed`, `Cancelled` or `Failed`.
    pub state: ExportState,
    /// Frames the run expected to write.
    pub expected_frames: u64,
    /// Frames actually written (exact, un-throttled).
    pub written_frames: u64,
    /// The file this run wrote (possibly truncated on cancellation).
    pub output_path: PathBuf,
    /// User-facing message when `state` is `Failed`.
    pub error: Option<String>,
}

struct RunOutcome {
    cancelled: bool,
    expected: u64,
    written: u64,
}

/// Removes the audio working files on every exit path of a run.
struct WorkingAudioFiles {
    fader: AudioCrossfader,
    mixer: Option<AudioMixer>,
}

impl Drop for WorkingAudioFiles {
    fn drop(&mut self) {
        self.fader.cleanup();
        if let Some(mixer) = &self.mixer {
            mixer.cleanup();
        }
    }
}

/// Owns the export state machine and sequences the pipeline stages.
///
/// One exporter runs one export at a time; `export` rejects synchronously
/// while a run is active or while clips are still loading. All other
/// failures run to a terminal [`ExportSummary`] instead of erroring out, so
/// callers observe exactly one state trajectory per run:
/// `Idle -> Preparing -> Rendering -> {Completed|Cancelled|Failed} -> Idle`.
pub struct Exporter {
    config: ExportConfig,
    state: ExportState,
    cancel: CancelToken,
    exported_revision: Option<u64>,
    last_error: Option<String>,
}

impl Exporter {
    /// Create an idle exporter.
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            state: ExportState::Idle,
            cancel: CancelToken::new(),
            exported_revision: None,
            last_error: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> ExportState {
        self.state
    }

    /// Whether a run is in flight.
    pub fn is_active(&self) -> bool {
        matches!(self.state, ExportState::Preparing | ExportState::Rendering)
    }

    /// Current configuration.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// The user-facing message of the last failed run, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Clear the surfaced error.
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// A token that cancels the in-flight (or next) run when triggered.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Request cooperative cancellation of the in-flight run.
    pub fn request_cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the last successful full export still matches the registry.
    ///
    /// Any registry mutation since that run (clip edits, trims, reordering)
    /// bumps the revision and invalidates the flag; so does changing any
    /// exporter setting.
    pub fn is_exported(&self, registry: &ClipRegistry) -> bool {
        self.exported_revision == Some(registry.revision())
    }

    /// Replace the transition settings.
    pub fn set_transition(&mut self, transition: crate::export::options::TransitionSettings) {
        self.config.transition = transition;
        self.exported_revision = None;
    }

    /// Replace the background-music settings.
    pub fn set_audio(&mut self, audio: crate::export::options::AudioSettings) {
        self.config.audio = audio;
        self.exported_revision = None;
    }

    /// Set the full-export output file.
    pub fn set_output_path(&mut self, path: impl Into<PathBuf>) {
        self.config.output_path = path.into();
        self.exported_revision = None;
    }

    /// Set the full-export frame rate (30 or 60).
    pub fn set_fps(&mut self, fps: u32) -> CutResult<()> {
        self.config.fps = validate_fps(fps)?;
        self.exported_revision = None;
        Ok(())
    }

    /// Set the full-export resolution.
    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.config.resolution = resolution;
        self.exported_revision = None;
    }

    /// Set the full-export encoder preset.
    pub fn set_preset(&mut self, preset: Preset) {
        self.config.preset = preset;
        self.exported_revision = None;
    }

    /// Run a full or preview export against the system `ffmpeg` encoder.
    pub fn export(
        &mut self,
        registry: &mut ClipRegistry,
        preview: bool,
        progress: &mut dyn ProgressSink,
    ) -> CutResult<ExportSummary> {
        let out_path = self.config.run_output_path(preview).clone();
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(out_path));
        self.export_with_sink(registry, preview, progress, &mut sink)
    }

    /// Run an export into a caller-provided sink.
    ///
    /// Rejects synchronously (without touching exporter state) when another
    /// run is active or when enabled clips are not fully loaded; everything
    /// past that point resolves into the returned summary.
    pub fn export_with_sink(
        &mut self,
        registry: &mut ClipRegistry,
        preview: bool,
        progress: &mut dyn ProgressSink,
        sink: &mut dyn FrameSink,
    ) -> CutResult<ExportSummary> {
        if self.is_active() {
            return Err(CutError::validation(
                "cannot export until the current export operation is finished",
            ));
        }
        if !registry.all_enabled_loaded() {
            return Err(CutError::validation(
                "cannot export while clips are still loading",
            ));
        }

        self.cancel.reset();
        self.last_error = None;
        self.state = ExportState::Preparing;

        let out_path = self.config.run_output_path(preview).clone();
        let result = self.run(registry, preview, &out_path, progress, sink);

        let summary = match result {
            Ok(outcome) => {
                let state = if outcome.cancelled {
                    ExportState::Cancelled
                } else {
                    ExportState::Completed
                };
                if state == ExportState::Completed && !preview {
                    self.exported_revision = Some(registry.revision());
                }
                ExportSummary {
                    state,
                    expected_frames: outcome.expected,
                    written_frames: outcome.written,
                    output_path: out_path,
                    error: None,
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                let message = e.user_message();
                self.last_error = Some(message.clone());
                ExportSummary {
                    state: ExportState::Failed,
                    expected_frames: 0,
                    written_frames: 0,
                    output_path: out_path,
                    error: Some(message),
                }
            }
        };

        self.state = ExportState::Idle;
        Ok(summary)
    }

    #[tracing::instrument(skip_all, fields(preview = preview))]
    fn run(
        &mut self,
        registry: &mut ClipRegistry,
        preview: bool,
        out_path: &Path,
        progress: &mut dyn ProgressSink,
        sink: &mut dyn FrameSink,
    ) -> CutResult<RunOutcome> {
        let opts = self.config.options(preview)?;
        let mut progress = ThrottledProgress::new(progress);

        // Re-probe every participating clip: files may have changed or
        // vanished since load. Independent per clip, so fan out.
        let snapshot: Vec<(PathBuf, f64, f64)> = registry
            .exportable()
            .map(|c| (c.path.clone(), c.start_trim, c.end_trim))
            .collect();
        let probed: Vec<_> = snapshot
            .into_par_iter()
            .map(|(path, start_trim, end_trim)| {
                let result = probe_source(&path);
                (path, start_trim, end_trim, result)
            })
            .collect();

        let mut plans = Vec::new();
        for (path, start_trim, end_trim, result) in probed {
            match result {
                Ok(info) => {
                    let trimmed = info.duration_sec - start_trim - end_trim;
                    if trimmed <= 0.0 {
                        tracing::warn!(
                            path = %path.display(),
                            "trims consume the re-probed clip, dropping it"
                        );
                        registry.mark_deleted(&path);
                        continue;
                    }
                    plans.push(ClipPlan {
                        path,
                        start_trim,
                        trimmed_duration: trimmed,
                    });
                }
                Err(e) if e.is_clip_recoverable() => {
                    tracing::warn!(path = %path.display(), "clip deleted since load, dropping it");
                    registry.mark_deleted(&path);
                }
                Err(e) => return Err(e),
            }
        }
        if plans.is_empty() {
            return Err(CutError::EmptyTimeline);
        }

        let expected = expected_frames(&plans, &self.config.transition, opts.fps);
        progress.report_now(ExportProgress {
            phase: ExportPhase::AudioMix,
            current_frame: 0,
            total_frames: expected,
        });

        // Per-clip audio extraction fans out like probing; results stay in
        // timeline order.
        let extracted: Vec<CutResult<AudioPcm>> = plans
            .par_iter()
            .map(|plan| extract_clip_audio(&plan.path, plan.start_trim, plan.trimmed_duration))
            .collect();

        let mut kept_plans = Vec::with_capacity(plans.len());
        let mut clip_audio = Vec::with_capacity(plans.len());
        for (plan, result) in plans.into_iter().zip(extracted) {
            match result {
                Ok(pcm) => {
                    clip_audio.push(ClipAudio {
                        trimmed_duration: plan.trimmed_duration,
                        pcm,
                    });
                    kept_plans.push(plan);
                }
                Err(e) if e.is_clip_recoverable() => {
                    tracing::warn!(
                        path = %plan.path.display(),
                        "clip vanished during audio extraction, dropping it"
                    );
                    registry.mark_deleted(&plan.path);
                }
                Err(e) => return Err(e),
            }
        }
        if kept_plans.is_empty() {
            return Err(CutError::EmptyTimeline);
        }

        let stem = out_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("export");
        let concat_path = out_path.with_file_name(format!("{stem}-concat.f32le"));
        let mut working = WorkingAudioFiles {
            fader: AudioCrossfader::new(
                concat_path.clone(),
                self.config.transition.effective_duration(),
            ),
            mixer: None,
        };
        let concat_samples = working.fader.export(&clip_audio)?;
        drop(clip_audio);

        let final_audio_path = if self.config.audio.music_active()
            && let Some(music_path) = self.config.audio.music_path.clone()
        {
            let music = decode_audio_file(&music_path)
                .map_err(|e| CutError::audio(format!("background music: {e}")))?;
            let mix_path = out_path.with_file_name(format!("{stem}-mix.f32le"));
            let mixer = AudioMixer::new(mix_path.clone());
            mixer.export(&[
                MixTrack {
                    samples: concat_samples,
                    volume: 1.0,
                    looped: false,
                },
                MixTrack {
                    samples: music.interleaved_f32,
                    volume: self.config.audio.music_gain() as f32,
                    looped: true,
                },
            ])?;
            working.mixer = Some(mixer);
            mix_path
        } else {
            // No music: skip the mix stage entirely and hand the
            // crossfader's file straight to the writer.
            concat_path
        };

        self.state = ExportState::Rendering;
        progress.report_now(ExportProgress {
            phase: ExportPhase::FrameRender,
            current_frame: 0,
            total_frames: expected,
        });

        sink.begin(SinkConfig {
            width: opts.width,
            height: opts.height,
            fps: opts.fps,
            preset: opts.preset,
            audio: Some(AudioInputConfig {
                path: final_audio_path,
                sample_rate: MIX_SAMPLE_RATE,
                channels: MIX_CHANNELS,
            }),
        })?;

        let seed = self.config.transition_seed.unwrap_or_else(run_seed);
        let mut renderer = TimelineRenderer::new(
            kept_plans,
            self.config.transition,
            seed,
            &opts,
            move |plan: &ClipPlan| {
                let source = FfmpegFrameSource::open(
                    &plan.path,
                    plan.start_trim,
                    plan.trimmed_duration,
                    opts.width,
                    opts.height,
                    opts.fps,
                )?;
                Ok(Box::new(source) as Box<dyn FrameSource>)
            },
        );

        let mut written = 0u64;
        let outcome = loop {
            // Cooperative cancellation, once per frame; in-flight reads and
            // writes always complete before teardown.
            if self.cancel.is_cancelled() {
                renderer.close();
                sink.end()?;
                tracing::debug!(written, expected, "export cancelled, partial file kept");
                break RunOutcome {
                    cancelled: true,
                    expected,
                    written,
                };
            }

            match renderer.step(sink) {
                Ok(StepOutcome::Wrote) => {
                    written += 1;
                    progress.report(ExportProgress {
                        phase: ExportPhase::FrameRender,
                        current_frame: written,
                        total_frames: expected,
                    });
                }
                Ok(StepOutcome::Finished) => {
                    sink.end()?;
                    tracing::debug!(expected, actual = written, "export complete");
                    break RunOutcome {
                        cancelled: false,
                        expected,
                        written,
                    };
                }
                Err(e) => {
                    renderer.close();
                    // Finalize whatever was written; the partial file stays
                    // on disk even on failure.
                    let _ = sink.end();
                    return Err(e);
                }
            }
        };

        // Terminal progress is exact and bypasses the throttle.
        progress.report_now(ExportProgress {
            phase: ExportPhase::FrameRender,
            current_frame: outcome.written,
            total_frames: expected,
        });
        Ok(outcome)
    }
}

fn run_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::progress::NullProgress;

    fn exporter() -> Exporter {
        Exporter::new(ExportConfig::new("/tmp/reelcut-test/Output.mp4"))
    }

    #[test]
    fn starts_idle_and_not_exported() {
        let exporter = exporter();
        let registry = ClipRegistry::new();
        assert_eq!(exporter.state(), ExportState::Idle);
        assert!(!exporter.is_active());
        assert!(!exporter.is_exported(&registry));
    }

    #[test]
    fn export_rejects_while_clips_are_loading() {
        let mut exporter = exporter();
        let mut registry = ClipRegistry::new();
        registry.add_clips([PathBuf::from("a.mp4")]);

        let err = exporter
            .export(&mut registry, false, &mut NullProgress)
            .unwrap_err();
        assert!(err.to_string().contains("still loading"));
        // Synchronous rejection leaves the state machine untouched.
        assert_eq!(exporter.state(), ExportState::Idle);
    }

    #[test]
    fn empty_registry_fails_the_run_cleanly() {
        let mut exporter = exporter();
        let mut registry = ClipRegistry::new();

        let summary = exporter
            .export(&mut registry, false, &mut NullProgress)
            .unwrap();
        assert_eq!(summary.state, ExportState::Failed);
        assert!(summary.error.is_some());
        assert_eq!(exporter.state(), ExportState::Idle);
        assert_eq!(exporter.last_error(), summary.error.as_deref());
    }

    #[test]
    fn deleted_clips_fail_the_run_with_a_user_message() {
        let mut exporter = exporter();
        let mut registry = ClipRegistry::new();
        registry.add_clips([PathBuf::from("/no/such/a.mp4"), PathBuf::from("/no/such/b.mp4")]);
        registry.mark_loaded(Path::new("/no/such/a.mp4"), 10.0, None);
        registry.mark_loaded(Path::new("/no/such/b.mp4"), 10.0, None);

        let summary = exporter
            .export(&mut registry, false, &mut NullProgress)
            .unwrap();
        // Both clips vanished between load and export: dropped, then the
        // empty working list fails the run.
        assert_eq!(summary.state, ExportState::Failed);
        assert!(registry.clips().iter().all(|c| c.deleted));
        assert_eq!(exporter.state(), ExportState::Idle);
    }

    #[test]
    fn settings_changes_invalidate_exported() {
        let mut exporter = exporter();
        let registry = ClipRegistry::new();
        // Simulate a completed export.
        exporter.exported_revision = Some(registry.revision());
        assert!(exporter.is_exported(&registry));

        exporter.set_preset(Preset::Slow);
        assert!(!exporter.is_exported(&registry));
    }

    #[test]
    fn registry_edits_invalidate_exported() {
        let mut exporter = exporter();
        let mut registry = ClipRegistry::new();
        exporter.exported_revision = Some(registry.revision());
        assert!(exporter.is_exported(&registry));

        registry.add_clips([PathBuf::from("late.mp4")]);
        assert!(!exporter.is_exported(&registry));
    }

    #[test]
    fn set_fps_validates() {
        let mut exporter = exporter();
        assert!(exporter.set_fps(60).is_ok());
        assert!(exporter.set_fps(24).is_err());
        assert_eq!(exporter.config().fps, 60);
    }
}
