//! The command pump itself (spec §4.4): owns the motion planner, arbitrates
//! planned (G0/G1) against unplanned (homing/probing) commands via the
//! `locked_command` slot, and disables steppers after `InactiveTime` of
//! inactivity.

use heapless::Deque;
use motion::planner::{MAX_AXES, LOOKAHEAD_BUFFER_SIZE};
use motion::{ChannelCommand, CommittedSegment, MotionPlanner, Segment};

use crate::client::{ActiveClient, ClientOutcome, MotionSink, PlannerClient};
use crate::errors::CoreError;

/// Stepper motors power down after this many ticks with no active command
/// (spec §4.4 `InactiveTime`, default 8 minutes at the 1 MHz tick clock
/// `motion::codegen::TICK_HZ` runs on).
pub const DEFAULT_INACTIVE_TIME_TICKS: u32 = 8 * 60 * 1_000_000;

/// Per-axis tuning the core needs to turn a client's requested relative
/// move into a `motion::Segment`. Distances are in user units (mm); the
/// planner itself only ever sees steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct AxisConfig {
    pub steps_per_unit: f64,
    pub max_speed: f64,
    pub max_accel: f64,
    pub cornering_distance: f64,
    /// Soft-limit lower bound on logical position, in user units (spec
    /// §3.1 invariant `min_pos <= logical_position <= max_pos`).
    pub min_pos: f64,
    /// Soft-limit upper bound on logical position, in user units.
    pub max_pos: f64,
}

/// The per-MCU command pump.
pub struct PrinterCore {
    planner: MotionPlanner,
    axes: [AxisConfig; MAX_AXES],
    logical_position: [f64; MAX_AXES],
    endstops: [bool; MAX_AXES],
    committed: Deque<CommittedSegment, { LOOKAHEAD_BUFFER_SIZE + 1 }>,
    /// Channel-command payloads peeled off segments as they commit (spec
    /// §3.4), staged here until the caller drains them with
    /// [`PrinterCore::take_channel_commands`].
    channel_out: Deque<ChannelCommand, { LOOKAHEAD_BUFFER_SIZE + 1 }>,

    /// The client currently reserving the planner, if any.
    locked_command: Option<ActiveClient>,
    /// Non-zero while any command (planned or unplanned) is considered to
    /// own the printer; blocks the inactivity timer.
    now_active: u32,
    inactive_time_ticks: u32,
    last_activity_at: u32,
    steppers_enabled: bool,
}

impl PrinterCore {
    pub fn new(axes: [AxisConfig; MAX_AXES], now: u32) -> Self {
        Self {
            planner: MotionPlanner::new(),
            axes,
            logical_position: [0.0; MAX_AXES],
            endstops: [false; MAX_AXES],
            committed: Deque::new(),
            channel_out: Deque::new(),
            locked_command: None,
            now_active: 0,
            inactive_time_ticks: DEFAULT_INACTIVE_TIME_TICKS,
            last_activity_at: now,
            steppers_enabled: true,
        }
    }

    pub fn set_inactive_time_ticks(&mut self, ticks: u32) {
        self.inactive_time_ticks = ticks;
    }

    pub fn steppers_enabled(&self) -> bool {
        self.steppers_enabled
    }

    /// Reports the current trigger state of `axis`'s endstop (or probe, for
    /// the Z axis during a probing pass). Sampled by the caller from the
    /// actual GPIO before each call to [`PrinterCore::poll`]/`on_move_finished`.
    pub fn set_endstop(&mut self, axis: usize, triggered: bool) {
        self.endstops[axis] = triggered;
    }

    pub fn logical_position(&self, axis: usize) -> f64 {
        self.logical_position[axis]
    }

    /// `G92`: assign a logical position without motion.
    pub fn set_logical_position(&mut self, axis: usize, position: f64) {
        self.logical_position[axis] = position;
    }

    /// Whether the planner is fully drained (no pending segments, no
    /// committed segments still waiting to be consumed). The
    /// drain-before-unplanned invariant requires this before
    /// `try_unplanned_command`/`try_locked_command` may proceed.
    pub fn is_drained(&self) -> bool {
        self.planner.pending_len() == 0 && self.committed.is_empty()
    }

    /// `try_planned_command`: accepted any time; goes straight to the
    /// look-ahead planner as a `NormalMove` client.
    pub fn try_planned_command(
        &mut self,
        axis_deltas: &[(usize, f64)],
        speed: f64,
        now: u32,
    ) -> Result<(), CoreError> {
        if self.locked_command.is_some() {
            return Err(CoreError::PlannerBusy);
        }
        self.start_client(
            ActiveClient::NormalMove(crate::client::NormalMoveClient::new(axis_deltas, speed)),
            now,
        )
    }

    /// `try_unplanned_command`/`try_locked_command`: only accepted once the
    /// planner has fully drained (spec §4.4 drain-before-unplanned).
    pub fn try_unplanned_command(&mut self, client: ActiveClient, now: u32) -> Result<(), CoreError> {
        if self.locked_command.is_some() {
            return Err(CoreError::PlannerBusy);
        }
        if !self.is_drained() {
            return Err(CoreError::NotDrained);
        }
        self.start_client(client, now)
    }

    fn start_client(&mut self, mut client: ActiveClient, now: u32) -> Result<(), CoreError> {
        self.now_active += 1;
        self.last_activity_at = now;
        self.steppers_enabled = true;
        let outcome = client.pull_handler(self, now)?;
        match outcome {
            ClientOutcome::Continue => {
                self.locked_command = Some(client);
            }
            ClientOutcome::Done => {
                self.now_active = self.now_active.saturating_sub(1);
            }
        }
        Ok(())
    }

    /// Called once the in-flight move finishes (the `AxisDriver`(s) it
    /// drove have run their command stream to completion, or the move was
    /// aborted). Runs the client's `finished_handler`, then immediately
    /// re-polls it for its next sub-move; clears `locked_command` once the
    /// client reports done.
    pub fn on_move_finished(&mut self, aborted: bool, now: u32) -> Result<Option<CoreError>, CoreError> {
        let Some(mut client) = self.locked_command.take() else {
            return Ok(None);
        };
        client.finished_handler(self, aborted);
        if let Some(err) = client.error() {
            self.now_active = self.now_active.saturating_sub(1);
            return Ok(Some(err));
        }
        match client.pull_handler(self, now)? {
            ClientOutcome::Continue => {
                self.locked_command = Some(client);
            }
            ClientOutcome::Done => {
                self.now_active = self.now_active.saturating_sub(1);
            }
        }
        Ok(None)
    }

    /// Main-loop tick: force-commits any segment that has aged past
    /// `FORCE_TIMEOUT_TICKS`, and disables steppers once `InactiveTime` has
    /// elapsed with `now_active == 0`.
    pub fn poll(&mut self, now: u32) {
        if let Some(committed) = self.planner.poll_force_timeout(now) {
            self.record_committed(committed);
        }
        if self.now_active == 0
            && self.steppers_enabled
            && hal_traits_time_after(now, self.last_activity_at.wrapping_add(self.inactive_time_ticks))
        {
            self.steppers_enabled = false;
        }
    }

    /// Drains every segment that has committed (settled entry/exit speeds,
    /// ready for `motion::segment_to_commands`) since the last call.
    pub fn take_committed(&mut self) -> heapless::Vec<CommittedSegment, LOOKAHEAD_BUFFER_SIZE> {
        let mut out = heapless::Vec::new();
        while let Some(seg) = self.committed.pop_front() {
            let _ = out.push(seg);
        }
        out
    }

    /// Moves a just-committed segment into `committed`, and if it carried a
    /// channel payload, stages that payload too: both become available to
    /// the caller (via `take_committed`/`take_channel_commands`) at the
    /// same instant, so a heater/fan change dispatched alongside a move
    /// fires at that move's boundary rather than at submission time (spec
    /// §3.4).
    fn record_committed(&mut self, segment: CommittedSegment) {
        if let Some(command) = segment.channel {
            let _ = self.channel_out.push_back(command);
        }
        let _ = self.committed.push_back(segment);
    }

    /// Enqueues a channel command at the current write position (spec
    /// §4.1 `submit_channel_command`), riding the segment most recently
    /// pushed to the planner so it fires at that segment's boundary.
    pub fn submit_channel_command(&mut self, command: ChannelCommand) -> Result<(), CoreError> {
        self.planner.submit_channel_command(command)?;
        Ok(())
    }

    /// Drains every channel-command payload whose segment has committed
    /// since the last call.
    pub fn take_channel_commands(&mut self) -> heapless::Vec<ChannelCommand, LOOKAHEAD_BUFFER_SIZE> {
        let mut out = heapless::Vec::new();
        while let Some(command) = self.channel_out.pop_front() {
            let _ = out.push(command);
        }
        out
    }

    /// Emergency/endstop abort (spec §4.1 `abort`; §5 Cancellation; §7
    /// Endstop-triggered): stops accepting anything further from the
    /// look-ahead window and discards both it and whatever committed
    /// segments hadn't yet been drained for step generation. The client
    /// occupying `locked_command`, if any, is dropped without running its
    /// `finished_handler` — the caller is expected to have already told
    /// the stepper(s) to stop.
    pub fn abort(&mut self) {
        self.planner.abort();
        self.committed.clear();
        self.channel_out.clear();
        self.locked_command = None;
        self.now_active = 0;
    }
}

/// Local copy of `hal_traits::time_after`'s wraparound-safe tick comparison,
/// so this crate doesn't need to depend on `hal-traits` just for one
/// function used only by the inactivity timer.
fn hal_traits_time_after(a: u32, b: u32) -> bool {
    a.wrapping_sub(b) < (1u32 << 31)
}

impl MotionSink for PrinterCore {
    fn push_move(
        &mut self,
        axis_deltas: &[(usize, f64)],
        speed: f64,
        _watch_endstop: bool,
        drain_immediately: bool,
        now: u32,
    ) -> Result<(), CoreError> {
        if axis_deltas.is_empty() {
            return Err(CoreError::Planner(motion::PlannerError::InvalidMove));
        }
        let mut axis_steps = [0i32; MAX_AXES];
        let mut max_speed = f64::MAX;
        let mut max_accel = f64::MAX;
        let mut cornering = f64::MAX;
        for &(axis, delta) in axis_deltas {
            if axis >= MAX_AXES {
                return Err(CoreError::InvalidAxis);
            }
            let cfg = self.axes[axis];
            let requested = self.logical_position[axis] + delta;
            if requested < cfg.min_pos || requested > cfg.max_pos {
                return Err(CoreError::Planner(motion::PlannerError::OutOfBounds {
                    axis,
                    requested,
                    min: cfg.min_pos,
                    max: cfg.max_pos,
                }));
            }
            axis_steps[axis] = (delta * cfg.steps_per_unit).round() as i32;
            max_speed = max_speed.min(cfg.max_speed * cfg.steps_per_unit);
            max_accel = max_accel.min(cfg.max_accel * cfg.steps_per_unit);
            cornering = cornering.min(cfg.cornering_distance * cfg.steps_per_unit);
        }
        let scale = self.axes[axis_deltas[0].0].steps_per_unit;
        let requested_speed = if speed > 0.0 { speed * scale } else { max_speed };

        let segment = Segment::new(axis_steps, requested_speed, max_speed, max_accel, cornering, now)?;
        if let Some(committed) = self.planner.push(segment)? {
            self.record_committed(committed);
        }
        // Homing/probing moves (and anything else that needs deterministic,
        // one-at-a-time execution) force the whole pending window to settle
        // and flush immediately. An ordinary G0/G1 leaves its segment
        // pending so the look-ahead window can still smooth the junction
        // with whatever move comes next (spec §4.1); it only ever commits
        // via `MotionPlanner::push`'s own window-depth/force-timeout rules.
        if drain_immediately {
            for axis_committed in self.planner.finalize() {
                self.record_committed(axis_committed);
            }
        }
        for &(axis, delta) in axis_deltas {
            self.logical_position[axis] += delta;
        }
        Ok(())
    }

    fn endstop_triggered(&self, axis: usize) -> bool {
        self.endstops[axis]
    }

    fn axis_position(&self, axis: usize) -> f64 {
        self.logical_position[axis]
    }

    fn set_axis_position(&mut self, axis: usize, position: f64) {
        self.logical_position[axis] = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::HomingClient;

    fn axes() -> [AxisConfig; MAX_AXES] {
        [AxisConfig {
            steps_per_unit: 80.0,
            max_speed: 300.0,
            max_accel: 1500.0,
            cornering_distance: 0.5,
            min_pos: -1000.0,
            max_pos: 1000.0,
        }; MAX_AXES]
    }

    #[test]
    fn single_planned_move_updates_position_but_stays_pending_for_lookahead() {
        let mut core = PrinterCore::new(axes(), 0);
        core.try_planned_command(&[(0, 10.0)], 100.0, 0).unwrap();
        assert_eq!(core.logical_position(0), 10.0);
        assert!(
            core.take_committed().is_empty(),
            "a lone segment should wait in the look-ahead window rather than commit right away"
        );
    }

    #[test]
    fn planned_moves_commit_once_the_lookahead_window_fills() {
        let mut core = PrinterCore::new(axes(), 0);
        for i in 0..=motion::planner::LOOKAHEAD_COMMIT_COUNT as u32 {
            core.try_planned_command(&[(0, 10.0)], 100.0, i).unwrap();
            core.on_move_finished(false, i).unwrap();
        }
        assert!(
            !core.take_committed().is_empty(),
            "the oldest segment should have committed once the window exceeded LOOKAHEAD_COMMIT_COUNT"
        );
    }

    #[test]
    fn unplanned_command_is_rejected_until_planner_drains() {
        let mut core = PrinterCore::new(axes(), 0);
        assert!(core.is_drained());
        let homing_config = homing::HomerConfig {
            home_dir: homing::Direction::Negative,
            home_fast_speed: 50.0,
            home_fast_max_dist: 220.0,
            home_retract_dist: 5.0,
            home_retract_speed: 10.0,
            home_slow_speed: 5.0,
            home_slow_max_dist: 10.0,
            home_position: 0.0,
        };
        let client = ActiveClient::Homing(HomingClient::new(0, homing_config));
        core.try_unplanned_command(client, 0).unwrap();
        assert_eq!(core.logical_position(0), -220.0);
    }

    #[test]
    fn busy_planner_rejects_a_second_locked_command() {
        let mut core = PrinterCore::new(axes(), 0);
        let homing_config = homing::HomerConfig {
            home_dir: homing::Direction::Negative,
            home_fast_speed: 50.0,
            home_fast_max_dist: 220.0,
            home_retract_dist: 5.0,
            home_retract_speed: 10.0,
            home_slow_speed: 5.0,
            home_slow_max_dist: 10.0,
            home_position: 0.0,
        };
        // Homing completes its first sub-move and finishes immediately in
        // this test's simplified flow because start_client already pulls
        // once; a real homing pass needs on_move_finished calls between
        // sub-moves, exercised by the homing crate's own unit tests.
        let client = ActiveClient::Homing(HomingClient::new(0, homing_config));
        core.try_unplanned_command(client, 0).unwrap();
        let second = ActiveClient::Homing(HomingClient::new(
            1,
            homing::HomerConfig {
                home_dir: homing::Direction::Negative,
                home_fast_speed: 50.0,
                home_fast_max_dist: 220.0,
                home_retract_dist: 5.0,
                home_retract_speed: 10.0,
                home_slow_speed: 5.0,
                home_slow_max_dist: 10.0,
                home_position: 0.0,
            },
        ));
        assert_eq!(core.try_unplanned_command(second, 0), Err(CoreError::PlannerBusy));
    }

    #[test]
    fn move_past_the_soft_limit_is_rejected_and_leaves_the_planner_untouched() {
        let mut axes = axes();
        axes[0].min_pos = -10.0;
        axes[0].max_pos = 10.0;
        let mut core = PrinterCore::new(axes, 0);
        let err = core.try_planned_command(&[(0, 20.0)], 100.0, 0);
        assert_eq!(
            err,
            Err(CoreError::Planner(motion::PlannerError::OutOfBounds {
                axis: 0,
                requested: 20.0,
                min: -10.0,
                max: 10.0,
            }))
        );
        assert_eq!(core.logical_position(0), 0.0);
        assert!(core.is_drained());
        assert!(core.take_committed().is_empty());
    }

    #[test]
    fn abort_drops_the_pending_window_and_unlocks_the_planner() {
        let mut core = PrinterCore::new(axes(), 0);
        core.try_planned_command(&[(0, 10.0)], 100.0, 0).unwrap();
        core.submit_channel_command(ChannelCommand::SetDigitalOutput { pin: 2, state: true }).unwrap();
        core.abort();
        assert!(core.is_drained());
        assert!(core.take_committed().is_empty());
        assert!(core.take_channel_commands().is_empty());
        // a locked command can be started again right away since abort cleared it.
        let homing_config = homing::HomerConfig {
            home_dir: homing::Direction::Negative,
            home_fast_speed: 50.0,
            home_fast_max_dist: 5.0,
            home_retract_dist: 1.0,
            home_retract_speed: 10.0,
            home_slow_speed: 5.0,
            home_slow_max_dist: 2.0,
            home_position: 0.0,
        };
        let client = ActiveClient::Homing(HomingClient::new(0, homing_config));
        core.try_unplanned_command(client, 0).unwrap();
    }
}
