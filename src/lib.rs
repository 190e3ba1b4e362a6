//! Reelcut is a highlight clip stitching and export engine.
//!
//! It takes an ordered registry of trimmed source clips and renders them into
//! one output video: per-clip audio is extracted, crossfaded at every
//! boundary and optionally mixed with background music, then frames are
//! decoded clip by clip, blended across boundaries with a selectable
//! transition, and encoded into the output container. Decoding and encoding
//! go through the system `ffmpeg`/`ffprobe` binaries, so the crate has no
//! native FFmpeg linkage.
//!
//! The public API is exporter-oriented:
//!
//! - Register and load clips in a [`ClipRegistry`]
//! - Configure an [`Exporter`] with output, transition and audio settings
//! - Run [`Exporter::export`] to a terminal [`ExportSummary`], observing
//!   progress and cancelling cooperatively via [`CancelToken`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod audio;
pub mod clip;
pub mod detect;
pub mod encode;
mod foundation;
pub mod export;
pub mod media;
pub mod source;
pub mod transition;

pub use crate::foundation::core::{Preset, Resolution, frames_to_secs, secs_to_frames};
pub use crate::foundation::error::{CutError, CutResult};

pub use crate::clip::{AiClipInfo, Clip, ClipRegistry, ClipSource, LoadOptions, load_clips};
pub use crate::encode::{FfmpegSink, FrameSink, InMemorySink, SinkConfig};
pub use crate::export::{
    AudioSettings, CancelToken, ExportConfig, ExportPhase, ExportProgress, ExportState,
    ExportSummary, Exporter, ProgressSink, TransitionSettings,
};
pub use crate::source::{FfmpegFrameSource, Frame, FrameSource};
pub use crate::transition::{TransitionParams, TransitionType, Transitioner};
