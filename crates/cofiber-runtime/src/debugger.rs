//! In-process debugger (spec §4.7): breakpoints, step modes, trace
//! mode, and variable inspection against a heap snapshot.

use std::rc::Rc;

use cofiber_abi::{DebuggerOutbound, OutboundMessage, VariableEntry, VariablesReference};
use cofiber_heap::HeapSnapshot;
use hashbrown::HashSet;

use crate::frame::FrameRef;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepMode {
    Over,
    Into,
    Out,
}

/// Walk `frame`'s `parent` chain up to its sentinel (spec §3 "frame
/// chain"). Every frame in one fiber shares the same sentinel, and a
/// fiber spawned via `runFiberAsync` gets its own, so comparing
/// sentinels is how `isBreakFrame` tells two frames at the same numeric
/// depth apart when they belong to unrelated fibers.
fn fiber_sentinel(frame: &FrameRef) -> FrameRef {
    let mut current = frame.clone();
    loop {
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}

pub struct Debugger {
    breakpoints: HashSet<u32>,
    break_always: bool,
    /// Pending step request: the mode, the frame depth it was issued
    /// from, and the sentinel of the fiber it was issued in (spec §4.7
    /// `breakFrame`) — `isBreakFrame(s)` requires `s` to lie on
    /// `breakFrame`'s ancestor chain, i.e. the same fiber, not merely a
    /// frame that happens to sit at the same depth.
    step: Option<(StepMode, u32, FrameRef)>,
    /// Trace pacing, in ms (spec §4.7, §8 scenario 6 "each pair separated
    /// by ≈10 ms of real time"): every main-file traced position posts a
    /// `Trace` message and parks for this long before auto-continuing,
    /// independent of any host `resume` command.
    trace_interval: Option<u32>,
}

impl Debugger {
    pub fn new() -> Self {
        Self { breakpoints: HashSet::new(), break_always: false, step: None, trace_interval: None }
    }

    pub fn set_breakpoints(&mut self, ids: Vec<u32>) {
        self.breakpoints = ids.into_iter().collect();
    }

    pub fn pause(&mut self) {
        self.break_always = true;
    }

    pub fn resume(&mut self) {
        self.break_always = false;
        self.step = None;
    }

    /// Entering any step mode supersedes a standing `pause` — otherwise
    /// `break_always` would immediately re-break at the very next
    /// eligible position regardless of the step mode just requested.
    /// `frame` is the frame the step was requested from (spec §4.7
    /// `breakFrame`); its fiber sentinel scopes every later
    /// `is_break_frame` check to this same fiber.
    pub fn step_over(&mut self, depth: u32, frame: &FrameRef) {
        self.break_always = false;
        self.step = Some((StepMode::Over, depth, fiber_sentinel(frame)));
    }

    pub fn step_into(&mut self, depth: u32, frame: &FrameRef) {
        self.break_always = false;
        self.step = Some((StepMode::Into, depth, fiber_sentinel(frame)));
    }

    pub fn step_out(&mut self, depth: u32, frame: &FrameRef) {
        self.break_always = false;
        self.step = Some((StepMode::Out, depth, fiber_sentinel(frame)));
    }

    pub fn set_trace(&mut self, interval: Option<u32>) {
        self.trace_interval = interval;
    }

    pub fn is_tracing(&self) -> bool {
        self.trace_interval.is_some()
    }

    pub fn trace_interval_ms(&self) -> Option<u32> {
        self.trace_interval
    }

    /// `isBreakFrame` predicate (spec §4.7): whether stopping at `frame`
    /// (sitting at `depth`) satisfies the pending step request. `s` must
    /// lie on `breakFrame`'s ancestor chain — same fiber — or this is
    /// never a match, regardless of how the depths compare; an
    /// unrelated fiber spawned by `runFiberAsync` can cross the same
    /// numeric depth without ever satisfying someone else's step.
    /// Within the same fiber: step-into fires at the very next
    /// breakpoint-carrying position regardless of depth; step-over
    /// fires once we're back at the same depth or shallower; step-out
    /// fires once we're strictly shallower.
    pub fn is_break_frame(&self, frame: &FrameRef, depth: u32) -> bool {
        match &self.step {
            Some((mode, at, break_sentinel)) => {
                if !Rc::ptr_eq(&fiber_sentinel(frame), break_sentinel) {
                    return false;
                }
                match mode {
                    StepMode::Into => true,
                    StepMode::Over => depth <= *at,
                    StepMode::Out => depth < *at,
                }
            }
            None => false,
        }
    }

    /// Whether execution should stop at this position: `breakAlways`,
    /// a satisfied step request, or an explicit breakpoint id match.
    pub fn should_break(&self, breakpoint_id: Option<u32>, frame: &FrameRef, depth: u32) -> bool {
        if self.break_always {
            return true;
        }
        if self.step.is_some() && self.is_break_frame(frame, depth) {
            return true;
        }
        if let Some(id) = breakpoint_id {
            if self.breakpoints.contains(&id) {
                return true;
            }
        }
        false
    }

}

impl Default for Debugger {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the response to a `variables` request (spec §4.7, §6) by
/// resolving `reference` against the current heap snapshot.
pub fn variables_response(
    snapshot: &HeapSnapshot,
    reference: VariablesReference,
    seq: u32,
) -> OutboundMessage {
    let variables: Vec<VariableEntry> =
        snapshot.resolve(reference).map(|v| v.to_vec()).unwrap_or_default();
    OutboundMessage::Debugger(DebuggerOutbound::Variables { req_seq: seq, variables })
}
