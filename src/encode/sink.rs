use std::path::PathBuf;

use crate::foundation::core::Preset;
use crate::foundation::error::CutResult;
use crate::source::Frame;

/// Configuration provided to a [`FrameSink`] when an export run starts.
#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output frames-per-second.
    pub fps: u32,
    /// Encoder speed/quality preset.
    pub preset: Preset,
    /// Final mixed audio to mux against, if any.
    pub audio: Option<AudioInputConfig>,
}

/// Raw PCM audio input muxed into the output container.
#[derive(Debug, Clone)]
pub struct AudioInputConfig {
    /// Path to interleaved `f32le` PCM data.
    pub path: PathBuf,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
}

/// Sink contract for consuming rendered frames in timeline order.
///
/// `push_frame` is called strictly sequentially; one call completes before
/// the next frame is read upstream. `end` must be safe to call before all
/// expected frames arrived: a cancelled run finalizes with whatever was
/// written and the result must still be a valid, playable file.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> CutResult<()>;
    /// Append the next frame.
    fn push_frame(&mut self, frame: &Frame) -> CutResult<()>;
    /// Flush and finalize the output. Idempotent per run.
    fn end(&mut self) -> CutResult<()>;
    /// Frames accepted so far in this run.
    fn frames_written(&self) -> u64;
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    /// Frames in timeline order.
    pub(crate) frames: Vec<Frame>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Whether `end` has been called.
    pub fn ended(&self) -> bool {
        self.ended
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> CutResult<()> {
        self.cfg = Some(cfg);
        self.ended = false;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, frame: &Frame) -> CutResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn end(&mut self) -> CutResult<()> {
        self.ended = true;
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames.len() as u64
    }
}
