//! Look-ahead trapezoidal motion planner.
//!
//! Segments are pushed one at a time as G-code moves are parsed. Each push
//! re-runs a backward pass (limiting every segment's entry speed so it can
//! still decelerate to whatever follows it) and a forward pass (limiting
//! every segment's entry speed so the segments before it could actually
//! have accelerated up to it), over the pending window only. Once more than
//! `LOOKAHEAD_COMMIT_COUNT` segments are pending, the oldest is popped off
//! as "committed" and handed to the caller for step generation — its
//! `v_entry`/`v_exit` are now final and won't be revised by future moves.
//!
//! A segment can also be force-committed if it has sat uncommitted for
//! longer than `FORCE_TIMEOUT_TICKS` (spec §4.1 `ForceTimeout`), so a single
//! move followed by a long pause doesn't stall indefinitely waiting for
//! enough look-ahead to accumulate.

use heapless::Deque;

use crate::channel::{ChannelCommand, ChannelQueue};
use crate::errors::PlannerError;

/// Maximum number of axes a single segment can move.
pub const MAX_AXES: usize = 5;

/// Number of segments the look-ahead window holds.
pub const LOOKAHEAD_BUFFER_SIZE: usize = 28;

/// How many pending segments must accumulate before the oldest commits.
///
/// Not named explicitly in the distilled spec beyond "LookaheadCommitCount";
/// 4 is chosen as a value that gives the backward pass room to smooth a
/// handful of short corners (as the original firmware's default lookahead
/// window depth does) without holding back commitment for long stretches of
/// travel. Recorded as an Open Question decision in DESIGN.md.
pub const LOOKAHEAD_COMMIT_COUNT: usize = 4;

const TICKS_PER_MS: u32 = 1000; // 1 MHz tick clock, matching `stepper`'s tick basis.

/// A committed segment is force-flushed after sitting uncommitted this long,
/// so a single move isn't stuck waiting for the window to fill up.
pub const FORCE_TIMEOUT_TICKS: u32 = 100 * TICKS_PER_MS;

/// One constant-jerk-free move, already expressed in stepper-space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Signed step delta per participating axis for this move.
    pub axis_steps: [i32; MAX_AXES],
    /// Euclidean length of `axis_steps`, in steps. Always `> 0`.
    pub distance: f64,
    /// `axis_steps` normalized by `distance`; used for the cornering
    /// cosine between consecutive segments.
    pub unit_dir: [f64; MAX_AXES],
    /// Requested cruise speed, in steps/s, already capped against every
    /// participating axis's configured `max_speed`.
    pub nominal_speed: f64,
    /// Acceleration cap for this move, in steps/s^2: the minimum over every
    /// participating axis's configured `max_accel`.
    pub max_accel: f64,
    /// The smallest configured `cornering_distance` among participating
    /// axes; bounds how much speed a corner may sustain.
    pub cornering_distance: f64,
    /// Resolved entry speed, in steps/s. `0.0` until the planner settles it.
    pub v_entry: f64,
    /// Resolved exit speed, in steps/s. `0.0` until the planner settles it.
    pub v_exit: f64,
    /// Clock tick this segment was pushed at, for `ForceTimeout` tracking.
    pub pushed_at: u32,
    /// A non-motion event that rode in at this segment's write position
    /// (spec §3.2 "optional channel payload", §3.4): fires the instant the
    /// stepper executes this segment's boundary, not when it was submitted.
    pub channel: Option<ChannelCommand>,
}

impl Segment {
    /// Builds a segment from axis deltas and per-move speed/accel caps,
    /// computing `distance`/`unit_dir` and seeding `nominal_speed` to the
    /// requested feed rate clamped to `max_speed`.
    pub fn new(
        axis_steps: [i32; MAX_AXES],
        requested_speed: f64,
        max_speed: f64,
        max_accel: f64,
        cornering_distance: f64,
        pushed_at: u32,
    ) -> Result<Self, PlannerError> {
        let mut dist_sq = 0.0;
        for s in axis_steps {
            dist_sq += (s as f64) * (s as f64);
        }
        let distance = dist_sq.sqrt();
        if distance <= 0.0 {
            return Err(PlannerError::InvalidMove);
        }
        let mut unit_dir = [0.0; MAX_AXES];
        for i in 0..MAX_AXES {
            unit_dir[i] = axis_steps[i] as f64 / distance;
        }
        Ok(Self {
            axis_steps,
            distance,
            unit_dir,
            nominal_speed: requested_speed.min(max_speed).max(0.0),
            max_accel,
            cornering_distance,
            v_entry: 0.0,
            v_exit: 0.0,
            pushed_at,
            channel: None,
        })
    }

    /// The maximum entry speed a straight line at rest could reach by the
    /// end of this segment: `v_lim = sqrt(2 * max_accel * distance)`.
    fn v_lim_from_rest(&self) -> f64 {
        (2.0 * self.max_accel * self.distance).sqrt()
    }

    fn max_reachable_from(&self, v_start: f64) -> f64 {
        (v_start * v_start + 2.0 * self.max_accel * self.distance).sqrt()
    }

    fn max_approach_to(&self, v_end: f64) -> f64 {
        (v_end * v_end + 2.0 * self.max_accel * self.distance).sqrt()
    }
}

/// The cornering speed a transition from `prev` to `next` can sustain
/// without instantaneous jerk, per spec §4.1: the minimum over axes of
/// `sqrt(2 * axis_max_accel * cornering_distance)`, scaled down toward zero
/// as the direction change approaches a reversal.
fn junction_speed(prev: &Segment, next: &Segment) -> f64 {
    let mut cos_theta = 0.0;
    for i in 0..MAX_AXES {
        cos_theta += prev.unit_dir[i] * next.unit_dir[i];
    }
    let cos_theta = cos_theta.clamp(-1.0, 1.0);

    if cos_theta > 1.0 - 1e-9 {
        // Collinear, same direction: no cornering limit at all.
        return f64::MAX;
    }

    let cornering_distance = prev.cornering_distance.min(next.cornering_distance);
    let accel = prev.max_accel.min(next.max_accel);
    let base = (2.0 * accel * cornering_distance).sqrt();

    // direction_factor is 0 for a straight line, 1 for a full reversal.
    let direction_factor = (1.0 - cos_theta) / 2.0;
    base * (1.0 - direction_factor).max(0.0)
}

/// A committed segment handed back to the caller by [`MotionPlanner::push`]/[`MotionPlanner::finalize`].
pub type CommittedSegment = Segment;

pub struct MotionPlanner {
    window: Deque<Segment, LOOKAHEAD_BUFFER_SIZE>,
    /// Channel commands submitted with no segment yet available to attach
    /// to (window empty, or its back already carries one); picked up by
    /// the next `push` in submission order.
    pending_channel: ChannelQueue,
}

impl Default for MotionPlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl MotionPlanner {
    pub const fn new() -> Self {
        Self { window: Deque::new(), pending_channel: ChannelQueue::new() }
    }

    pub fn pending_len(&self) -> usize {
        self.window.len()
    }

    /// Enqueues a `ChannelCommand` at the current write position (spec
    /// §4.1 public contract): attaches to the segment most recently
    /// pushed, if it hasn't already been given one, so it fires at that
    /// segment's boundary (spec §3.4). If no such segment exists yet, it
    /// is held and attached to the next segment `push`ed instead.
    pub fn submit_channel_command(&mut self, command: ChannelCommand) -> Result<(), PlannerError> {
        if let Some(back) = self.window.back_mut() {
            if back.channel.is_none() {
                back.channel = Some(command);
                return Ok(());
            }
        }
        self.pending_channel.push_back(command).map_err(|_| PlannerError::BufferFull)
    }

    /// Pushes a new segment, runs the backward/forward recalculation over
    /// the pending window, and returns any segment that becomes committed
    /// as a result (the window exceeding `LOOKAHEAD_COMMIT_COUNT`).
    pub fn push(&mut self, mut segment: Segment) -> Result<Option<CommittedSegment>, PlannerError> {
        if segment.channel.is_none() {
            segment.channel = self.pending_channel.pop_front();
        }
        self.window.push_back(segment).map_err(|_| PlannerError::BufferFull)?;
        self.recalculate();
        Ok(self.try_commit_oldest())
    }

    /// Stops accepting look-ahead from the pending window and discards it
    /// (spec §4.1 `abort`; §5 Cancellation; §7 Endstop-triggered). The
    /// segment(s) already committed and handed off to an `AxisDriver`'s
    /// command buffer are left for the caller to drain to a clean stop —
    /// this only prevents anything further from being turned into
    /// Commands behind them.
    pub fn abort(&mut self) {
        self.window.clear();
        self.pending_channel.clear();
    }

    /// Forces every pending segment to settle and drains the window. Called
    /// at the end of a print, or when an unplanned command needs the motion
    /// stream fully flushed first.
    pub fn finalize(&mut self) -> heapless::Vec<CommittedSegment, LOOKAHEAD_BUFFER_SIZE> {
        if let Some(last) = self.window.back_mut() {
            last.v_exit = 0.0;
        }
        self.recalculate();
        let mut out = heapless::Vec::new();
        while let Some(seg) = self.window.pop_front() {
            let _ = out.push(seg);
        }
        out
    }

    /// Force-commits the oldest pending segment if it has aged past
    /// `FORCE_TIMEOUT_TICKS`, even though the window hasn't filled to
    /// `LOOKAHEAD_COMMIT_COUNT` yet.
    pub fn poll_force_timeout(&mut self, now: u32) -> Option<CommittedSegment> {
        let stale = self
            .window
            .front()
            .map(|s| now.wrapping_sub(s.pushed_at) >= FORCE_TIMEOUT_TICKS)
            .unwrap_or(false);
        if stale {
            self.window.pop_front()
        } else {
            None
        }
    }

    fn try_commit_oldest(&mut self) -> Option<CommittedSegment> {
        if self.window.len() > LOOKAHEAD_COMMIT_COUNT {
            self.window.pop_front()
        } else {
            None
        }
    }

    /// Backward pass (limit each entry speed so the segment can still
    /// decelerate to what follows), then forward pass (limit each entry
    /// speed so what precedes it could actually reach it).
    fn recalculate(&mut self) {
        let len = self.window.len();
        if len == 0 {
            return;
        }

        // v_lim: the speed cap ignoring neighbors (nominal feed rate vs.
        // what a standing start/stop over this segment's own length allows).
        let mut v_lim = heapless::Vec::<f64, LOOKAHEAD_BUFFER_SIZE>::new();
        for seg in self.window.iter() {
            let cap = seg.nominal_speed.min(seg.v_lim_from_rest());
            let _ = v_lim.push(cap);
        }

        // Junction speeds between consecutive pairs.
        let mut v_junc = heapless::Vec::<f64, LOOKAHEAD_BUFFER_SIZE>::new();
        for i in 0..len.saturating_sub(1) {
            let prev = self.window.iter().nth(i).unwrap();
            let next = self.window.iter().nth(i + 1).unwrap();
            let _ = v_junc.push(junction_speed(prev, next));
        }

        // Seed entry speeds: segment 0 starts from rest; every other
        // segment is capped by the junction speed into it.
        let mut entry = heapless::Vec::<f64, LOOKAHEAD_BUFFER_SIZE>::new();
        for i in 0..len {
            let cap = if i == 0 { v_lim[0] } else { v_lim[i].min(v_junc[i - 1]) };
            let _ = entry.push(cap);
        }
        let mut exit = heapless::Vec::<f64, LOOKAHEAD_BUFFER_SIZE>::new();
        for i in 0..len {
            exit.push(if i + 1 < len { entry[i + 1] } else { 0.0 }).ok();
        }

        // Backward pass: walk from the segment before last down to the
        // first, shrinking entry[i] so segment i can decelerate to entry[i+1].
        for i in (0..len.saturating_sub(1)).rev() {
            let seg = self.window.iter().nth(i).unwrap();
            let reachable = seg.max_approach_to(exit[i]);
            if entry[i] > reachable {
                entry[i] = reachable;
            }
        }

        // Forward pass: walk from the first segment forward, shrinking
        // entry[i+1] so segment i could actually accelerate up to it.
        for i in 0..len.saturating_sub(1) {
            let seg = self.window.iter().nth(i).unwrap();
            let reachable = seg.max_reachable_from(entry[i]);
            if entry[i + 1] > reachable {
                entry[i + 1] = reachable;
            }
        }
        for i in 0..len {
            exit[i] = if i + 1 < len { entry[i + 1] } else { 0.0 };
        }

        for (i, seg) in self.window.iter_mut().enumerate() {
            seg.v_entry = entry[i];
            seg.v_exit = exit[i];
        }
    }
}
