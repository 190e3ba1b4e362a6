//! Export orchestration: run options, progress/cancellation, the render-loop
//! state machine, and the exporter that sequences the pipeline.

mod options;
mod orchestrator;
mod progress;
mod timeline;

pub use options::{AudioSettings, ExportConfig, ExportOptions, TransitionSettings};
pub use orchestrator::{ExportState, ExportSummary, Exporter};
pub use progress::{CancelToken, ExportPhase, ExportProgress, FnProgress, NullProgress, ProgressSink};
pub use timeline::{ClipPlan, StepOutcome, TimelineRenderer, expected_frames};
