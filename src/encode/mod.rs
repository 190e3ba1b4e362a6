//! Output encoding: the frame sink contract and the `ffmpeg` muxing writer.

mod ffmpeg;
mod sink;

pub use ffmpeg::{FfmpegSink, FfmpegSinkOpts};
pub use sink::{AudioInputConfig, FrameSink, InMemorySink, SinkConfig};
