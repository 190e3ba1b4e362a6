use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Pipeline phase a run is currently in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExportPhase {
    /// Extracting, crossfading and mixing audio.
    AudioMix,
    /// Decoding, blending and encoding frames.
    FrameRender,
}

/// One progress update delivered to observers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExportProgress {
    /// Current phase.
    pub phase: ExportPhase,
    /// Frames written so far.
    pub current_frame: u64,
    /// Expected total frames for the run.
    pub total_frames: u64,
}

/// Observer for progress updates.
///
/// Per-frame updates are rate-limited upstream; the final update at a
/// terminal state is always delivered exactly.
pub trait ProgressSink {
    /// Receive one update.
    fn progress(&mut self, update: ExportProgress);
}

/// Sink that drops every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn progress(&mut self, _update: ExportProgress) {}
}

/// Adapter turning a closure into a [`ProgressSink`].
pub struct FnProgress<F>(F);

impl<F: FnMut(ExportProgress)> FnProgress<F> {
    /// Wrap `f`.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: FnMut(ExportProgress)> ProgressSink for FnProgress<F> {
    fn progress(&mut self, update: ExportProgress) {
        (self.0)(update)
    }
}

/// Cooperative cancellation flag, polled once per render-loop iteration.
///
/// Clones share one flag, so a token handed to a UI thread cancels the run
/// holding the other clone.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear the flag at the start of a new run.
    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Rate-limits per-frame updates; previews render far faster than observers
/// care to repaint.
pub(crate) struct ThrottledProgress<'a> {
    sink: &'a mut dyn ProgressSink,
    min_interval: Duration,
    last_emit: Option<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub(crate) fn new(sink: &'a mut dyn ProgressSink) -> Self {
        Self {
            sink,
            min_interval: Duration::from_millis(100),
            last_emit: None,
        }
    }

    /// Deliver `update` unless one was delivered within the throttle window.
    pub(crate) fn report(&mut self, update: ExportProgress) {
        let now = Instant::now();
        if let Some(last) = self.last_emit
            && now.duration_since(last) < self.min_interval
        {
            return;
        }
        self.last_emit = Some(now);
        self.sink.progress(update);
    }

    /// Deliver `update` unconditionally (phase changes, terminal values).
    pub(crate) fn report_now(&mut self, update: ExportProgress) {
        self.last_emit = Some(Instant::now());
        self.sink.progress(update);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
        token.reset();
        assert!(!clone.is_cancelled());
    }

    #[test]
    fn throttle_coalesces_but_report_now_always_delivers() {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen_in = std::rc::Rc::clone(&seen);
        let mut sink = FnProgress::new(move |p: ExportProgress| {
            seen_in.borrow_mut().push(p.current_frame);
        });
        let mut throttled = ThrottledProgress::new(&mut sink);

        let update = |frame| ExportProgress {
            phase: ExportPhase::FrameRender,
            current_frame: frame,
            total_frames: 100,
        };

        throttled.report(update(1));
        // Immediately following reports fall inside the window.
        throttled.report(update(2));
        throttled.report(update(3));
        throttled.report_now(update(4));

        assert_eq!(*seen.borrow(), vec![1, 4]);
    }
}
