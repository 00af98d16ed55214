//! The planner-client abstraction (spec §4.4): homing, probing, and normal
//! G0/G1 moves all implement the same small interface so `PrinterCore` can
//! drive whichever one currently holds the planner without knowing its
//! concrete type. Clients never touch a `motion::MotionPlanner` directly —
//! they go through [`MotionSink`], which `PrinterCore` implements, keeping
//! `homing` and `motion` decoupled from each other.

use crate::errors::CoreError;

/// What a `PlannerClient` needs in order to move an axis and read back the
/// result, without knowing how moves are actually turned into planner
/// segments or how axes map to kinematics.
pub trait MotionSink {
    /// Submits a relative move across one or more axes simultaneously
    /// (e.g. a prober's XY travel move) as a single planner segment.
    ///
    /// `drain_immediately` forces the move to commit and flush out of the
    /// look-ahead window right away, rather than waiting for the window to
    /// fill or for `FORCE_TIMEOUT_TICKS`. Homing/probing moves always set
    /// this: they run one at a time and must execute deterministically, not
    /// get blended with look-ahead smoothing the way ordinary G0/G1 moves
    /// do.
    fn push_move(
        &mut self,
        axis_deltas: &[(usize, f64)],
        speed: f64,
        watch_endstop: bool,
        drain_immediately: bool,
        now: u32,
    ) -> Result<(), CoreError>;

    /// Whether `axis`'s endstop/probe input was observed triggered during
    /// the move that just finished.
    fn endstop_triggered(&self, axis: usize) -> bool;

    /// The machine's current absolute logical position on `axis`.
    fn axis_position(&self, axis: usize) -> f64;

    /// Assigns a new logical position on `axis` without moving (used by
    /// `G92` and by `Homer`/`Prober` once they finish).
    fn set_axis_position(&mut self, axis: usize, position: f64);
}

/// Outcome of a single `pull_handler` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOutcome {
    /// A move was submitted; stay active until `finished_handler` runs.
    Continue,
    /// Nothing left to do.
    Done,
}

/// Spec's per-MCU command-pump "planner client" contract.
pub trait PlannerClient<S: MotionSink> {
    /// Produces the next sub-move, or declares the client finished.
    fn pull_handler(&mut self, sink: &mut S, now: u32) -> Result<ClientOutcome, CoreError>;

    /// Post-motion callback: called once the move `pull_handler` requested
    /// has run to completion (or was aborted).
    fn finished_handler(&mut self, sink: &mut S, aborted: bool);

    /// `Some` once the client has concluded in failure.
    fn error(&self) -> Option<CoreError>;
}

/// Drives a single axis through [`homing::Homer`]'s five-phase sequence.
pub struct HomingClient {
    axis: usize,
    homer: homing::Homer,
}

impl HomingClient {
    pub fn new(axis: usize, config: homing::HomerConfig) -> Self {
        Self { axis, homer: homing::Homer::new(config) }
    }
}

impl<S: MotionSink> PlannerClient<S> for HomingClient {
    fn pull_handler(&mut self, sink: &mut S, now: u32) -> Result<ClientOutcome, CoreError> {
        if self.homer.is_done() {
            if let Some(pos) = self.homer.final_position() {
                sink.set_axis_position(self.axis, pos);
            }
            return Ok(ClientOutcome::Done);
        }
        let req = self.homer.next_request().expect("homer not done implies a pending request");
        sink.push_move(&[(self.axis, req.distance)], req.speed, req.watch_endstop, true, now)?;
        Ok(ClientOutcome::Continue)
    }

    fn finished_handler(&mut self, sink: &mut S, _aborted: bool) {
        let triggered = sink.endstop_triggered(self.axis);
        self.homer.on_move_finished(triggered);
    }

    fn error(&self) -> Option<CoreError> {
        self.homer.error().map(CoreError::from)
    }
}

/// Drives a full probing pass via [`homing::Prober`], applying the fitted
/// bed correction only when `apply` is set (the G30/G32 `D` flag).
pub struct ProbingClient {
    x_axis: usize,
    y_axis: usize,
    z_axis: usize,
    prober: homing::Prober,
    apply: bool,
    fit: Option<homing::BedCorrection>,
}

impl ProbingClient {
    pub fn new(
        x_axis: usize,
        y_axis: usize,
        z_axis: usize,
        config: homing::ProberConfig,
        points: &[(f64, f64)],
        quadratic: bool,
        apply: bool,
    ) -> Result<Self, CoreError> {
        let prober = homing::Prober::new(config, points, quadratic)?;
        Ok(Self { x_axis, y_axis, z_axis, prober, apply, fit: None })
    }

    /// The fitted bed correction, available once the pass finished
    /// successfully. `None` if probing isn't done yet, failed, or `apply`
    /// was `false` (dry-run).
    pub fn fit(&self) -> Option<homing::BedCorrection> {
        self.fit
    }
}

impl<S: MotionSink> PlannerClient<S> for ProbingClient {
    fn pull_handler(&mut self, sink: &mut S, now: u32) -> Result<ClientOutcome, CoreError> {
        if self.prober.is_done() {
            if self.prober.error().is_none() && self.apply {
                self.fit = Some(self.prober.fit()?);
            }
            return Ok(ClientOutcome::Done);
        }
        match self.prober.next_request().expect("prober not done implies a pending request") {
            homing::ProbeRequest::MoveToPoint { x, y } => {
                let dx = x - sink.axis_position(self.x_axis);
                let dy = y - sink.axis_position(self.y_axis);
                sink.push_move(&[(self.x_axis, dx), (self.y_axis, dy)], 0.0, false, true, now)?;
            }
            homing::ProbeRequest::Vertical { distance, speed, watch_endstop } => {
                sink.push_move(&[(self.z_axis, distance)], speed, watch_endstop, true, now)?;
            }
        }
        Ok(ClientOutcome::Continue)
    }

    fn finished_handler(&mut self, sink: &mut S, _aborted: bool) {
        let triggered = sink.endstop_triggered(self.z_axis);
        let z = sink.axis_position(self.z_axis);
        self.prober.on_move_finished(triggered, z);
    }

    fn error(&self) -> Option<CoreError> {
        self.prober.error().map(CoreError::from)
    }
}

/// A plain G0/G1 move: a queue of already-transformed planner segments
/// (produced by the kinematic transform layer upstream, one per
/// `segment_move` sub-segment) submitted one at a time.
pub struct NormalMoveClient {
    axis_deltas: heapless::Vec<(usize, f64), { motion::planner::MAX_AXES }>,
    speed: f64,
    submitted: bool,
}

impl NormalMoveClient {
    pub fn new(axis_deltas: &[(usize, f64)], speed: f64) -> Self {
        let mut stored = heapless::Vec::new();
        for &d in axis_deltas {
            let _ = stored.push(d);
        }
        Self { axis_deltas: stored, speed, submitted: false }
    }
}

impl<S: MotionSink> PlannerClient<S> for NormalMoveClient {
    fn pull_handler(&mut self, sink: &mut S, now: u32) -> Result<ClientOutcome, CoreError> {
        if self.submitted {
            return Ok(ClientOutcome::Done);
        }
        // A single G0/G1 never forces the look-ahead window to drain: it's
        // left pending so later moves can still smooth the junction into
        // and out of it (spec §4.1).
        sink.push_move(&self.axis_deltas, self.speed, false, false, now)?;
        self.submitted = true;
        Ok(ClientOutcome::Continue)
    }

    fn finished_handler(&mut self, _sink: &mut S, _aborted: bool) {}

    fn error(&self) -> Option<CoreError> {
        None
    }
}

/// Tagged-variant enum over every concrete planner client, so `PrinterCore`
/// can hold "whichever client is active" without a `no_std`-hostile trait
/// object.
pub enum ActiveClient {
    Homing(HomingClient),
    Probing(ProbingClient),
    NormalMove(NormalMoveClient),
}

impl<S: MotionSink> PlannerClient<S> for ActiveClient {
    fn pull_handler(&mut self, sink: &mut S, now: u32) -> Result<ClientOutcome, CoreError> {
        match self {
            ActiveClient::Homing(c) => c.pull_handler(sink, now),
            ActiveClient::Probing(c) => c.pull_handler(sink, now),
            ActiveClient::NormalMove(c) => c.pull_handler(sink, now),
        }
    }

    fn finished_handler(&mut self, sink: &mut S, aborted: bool) {
        match self {
            ActiveClient::Homing(c) => c.finished_handler(sink, aborted),
            ActiveClient::Probing(c) => c.finished_handler(sink, aborted),
            ActiveClient::NormalMove(c) => c.finished_handler(sink, aborted),
        }
    }

    fn error(&self) -> Option<CoreError> {
        match self {
            ActiveClient::Homing(c) => c.error(),
            ActiveClient::Probing(c) => c.error(),
            ActiveClient::NormalMove(c) => c.error(),
        }
    }
}
