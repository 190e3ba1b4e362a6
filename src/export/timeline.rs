use std::collections::VecDeque;
use std::path::PathBuf;

use crate::encode::FrameSink;
use crate::export::options::{ExportOptions, TransitionSettings};
use crate::foundation::core::secs_to_frames;
use crate::foundation::error::CutResult;
use crate::source::FrameSource;
use crate::transition::{Transitioner, TransitionType};

/// One working-list entry: everything needed to open a clip's frame source.
#[derive(Clone, Debug)]
pub struct ClipPlan {
    /// Clip file path.
    pub path: PathBuf,
    /// Seconds to skip at the start.
    pub start_trim: f64,
    /// Duration after both trims.
    pub trimmed_duration: f64,
}

/// What one [`TimelineRenderer::step`] call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// One frame was written to the sink.
    Wrote,
    /// Every clip is exhausted; nothing was written.
    Finished,
}

/// Expected frame count for a working list: per-clip trimmed frames minus one
/// transition window per boundary. Computed before any clip is opened, so the
/// actual count can drift by the documented padding/drop accommodations.
pub fn expected_frames(plans: &[ClipPlan], transition: &TransitionSettings, fps: u32) -> u64 {
    let clip_frames: u64 = plans
        .iter()
        .map(|p| secs_to_frames(p.trimmed_duration, fps))
        .sum();
    let boundaries = plans.len().saturating_sub(1) as u64;
    let transition_frames = secs_to_frames(transition.effective_duration(), fps);
    clip_frames.saturating_sub(boundaries * transition_frames)
}

/// The render loop as an explicit state machine.
///
/// Holds exactly one open "from" source and, once available, one open "next"
/// source. Each `step` writes exactly one frame (blending across the boundary
/// while inside the clamped transition window) or reports completion.
/// Cancellation is the caller's concern: it decides between calling `step`
/// again or `close`.
pub struct TimelineRenderer<F> {
    open: F,
    pending: VecDeque<ClipPlan>,
    from: Option<Box<dyn FrameSource>>,
    next: Option<Box<dyn FrameSource>>,

    transition: TransitionSettings,
    transitioner: Option<Transitioner>,
    seed: u64,
    boundary_index: usize,

    width: u32,
    height: u32,
    fps: u32,
}

impl<F> TimelineRenderer<F>
where
    F: FnMut(&ClipPlan) -> CutResult<Box<dyn FrameSource>>,
{
    /// Create a renderer over `plans` in timeline order.
    ///
    /// `open` is called lazily as clips come up; a recoverable open failure
    /// drops that clip and the timeline continues with the rest.
    pub fn new(
        plans: Vec<ClipPlan>,
        transition: TransitionSettings,
        seed: u64,
        opts: &ExportOptions,
        open: F,
    ) -> Self {
        Self {
            open,
            pending: plans.into(),
            from: None,
            next: None,
            transition,
            transitioner: None,
            seed,
            boundary_index: 0,
            width: opts.width,
            height: opts.height,
            fps: opts.fps,
        }
    }

    /// Write the next frame, or report that the timeline is exhausted.
    pub fn step(&mut self, sink: &mut dyn FrameSink) -> CutResult<StepOutcome> {
        loop {
            self.ensure_sources()?;
            if self.from.is_none() {
                return Ok(StepOutcome::Finished);
            }

            // Pull the next outgoing frame. Exhaustion here (rather than at
            // the post-write check) happens when the source padded its way to
            // the end and has nothing left.
            let read = self
                .from
                .as_mut()
                .expect("from source present")
                .read_next_frame();
            match read {
                Ok(true) => {}
                Ok(false) => {
                    self.advance();
                    continue;
                }
                Err(e) if e.is_clip_recoverable() => {
                    tracing::warn!(error = %e, "dropping unreadable clip mid-render");
                    self.advance();
                    continue;
                }
                Err(e) => return Err(e),
            }

            let actual_transition_frames = self.actual_transition_frames();
            let in_transition = {
                let from = self.from.as_ref().expect("from source present");
                actual_transition_frames > 0
                    && self.next.is_some()
                    && from.current_frame() > from.frame_count() - actual_transition_frames
            };

            if in_transition {
                // Pull the incoming frame alongside; a recoverable failure
                // here degrades the boundary to a hard cut.
                let next_ok = match self
                    .next
                    .as_mut()
                    .expect("next source present")
                    .read_next_frame()
                {
                    Ok(read) => read,
                    Err(e) if e.is_clip_recoverable() => {
                        tracing::warn!(error = %e, "dropping unreadable next clip at boundary");
                        if let Some(mut next) = self.next.take() {
                            next.end();
                        }
                        false
                    }
                    Err(e) => return Err(e),
                };

                if next_ok && self.next.is_some() {
                    if self.transitioner.is_none() {
                        let kind = self
                            .transition
                            .kind
                            .resolve(self.seed, self.boundary_index);
                        self.transitioner = Some(Transitioner::new(
                            kind,
                            self.transition.params,
                            self.width,
                            self.height,
                        )?);
                    }

                    let from = self.from.as_ref().expect("from source present");
                    let next = self.next.as_ref().expect("next source present");
                    // The counter names the next frame to read; subtract one
                    // to get the frame just read.
                    let progress = (next.current_frame().saturating_sub(1)) as f32
                        / actual_transition_frames as f32;
                    let transitioner = self.transitioner.as_mut().expect("transitioner present");
                    let blended = transitioner.render(from.frame(), next.frame(), progress)?;
                    sink.push_frame(blended)?;
                } else {
                    let from = self.from.as_ref().expect("from source present");
                    sink.push_frame(from.frame())?;
                }
            } else {
                let from = self.from.as_ref().expect("from source present");
                sink.push_frame(from.frame())?;
            }

            let exhausted = {
                let from = self.from.as_ref().expect("from source present");
                from.current_frame() >= from.frame_count()
            };
            if exhausted {
                self.advance();
            }

            return Ok(StepOutcome::Wrote);
        }
    }

    /// Close every open source. Idempotent; called on cancellation and error
    /// paths so no decoder child outlives the run.
    pub fn close(&mut self) {
        if let Some(mut from) = self.from.take() {
            from.end();
        }
        if let Some(mut next) = self.next.take() {
            next.end();
        }
        self.transitioner = None;
    }

    fn ensure_sources(&mut self) -> CutResult<()> {
        if self.from.is_none() {
            self.from = self.open_next_pending()?;
        }
        if self.from.is_some() && self.next.is_none() {
            self.next = self.open_next_pending()?;
        }
        Ok(())
    }

    fn open_next_pending(&mut self) -> CutResult<Option<Box<dyn FrameSource>>> {
        while let Some(plan) = self.pending.pop_front() {
            match (self.open)(&plan) {
                Ok(source) => return Ok(Some(source)),
                Err(e) if e.is_clip_recoverable() => {
                    tracing::warn!(
                        path = %plan.path.display(),
                        "dropping clip whose source failed to open"
                    );
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Transition window for the current boundary, clamped so it never
    /// consumes more than half of either adjacent clip.
    fn actual_transition_frames(&self) -> u64 {
        let Some(from) = self.from.as_ref() else {
            return 0;
        };
        let configured = secs_to_frames(self.transition.effective_duration(), self.fps);
        let from_half =
            ((from.trimmed_duration() / 2.0) * f64::from(self.fps)).floor() as u64;
        let next_half = match self.next.as_ref() {
            Some(next) => ((next.trimmed_duration() / 2.0) * f64::from(self.fps)).floor() as u64,
            None => u64::MAX,
        };
        configured.min(from_half).min(next_half)
    }

    fn advance(&mut self) {
        if let Some(mut from) = self.from.take() {
            from.end();
        }
        self.from = self.next.take();
        self.boundary_index += 1;
        // Under Random the next boundary re-resolves to a fresh kind; other
        // kinds keep reusing the same transitioner and its frame buffer.
        if self.transition.kind == TransitionType::Random {
            self.transitioner = None;
        }
    }
}
