#![deny(clippy::all)]
#![deny(warnings)]
#![no_std]

//! # Quadratic Step-Time Integrator
//!
//! `AxisDriver` is the hard real-time core of a single stepper axis. It
//! consumes a stream of [`Command`]s, each describing one constant-jerk-free
//! segment (accelerating, cruising, or decelerating), and produces individual
//! step pulses whose timing is derived by integrating the segment's
//! acceleration in *step space* rather than in *time space*: every tick we
//! know how many steps we've taken, and we solve directly for how long until
//! the next one, instead of accumulating floating-point time.
//!
//! ## Pipelined Architecture for Lower Latency
//!
//! To keep interrupt latency low and deterministic, the controller still
//! uses the two-stage pipeline: the timer interrupt executes a pulse that
//! was prepared on the *previous* interrupt, then spends any remaining time
//! preparing the *next* one. Direction pins are written ahead of the step
//! pulse that needs them, never on the same interrupt as that pulse.
//!
//! ## Safety
//!
//! - **Lock-Free:** Communication with the planner remains lock-free via
//!   `heapless::spsc::Queue`.
//! - **No Heap Allocations:** Fully `#[no_std]`.
//! - **Atomic GPIO:** Step/direction pins go through [`hal_traits::AtomicGpioPort`]
//!   so a board crate can map them to a single BSRR-style write.

use hal_traits::{AtomicGpioPort, InputPin, Timer};
use heapless::spsc::{Consumer, Producer, Queue};

/// Number of in-flight segments the per-axis command queue can hold.
///
/// `heapless::spsc::Queue<T, N>` has usable capacity `N - 1`, so the backing
/// queue is declared one larger than this.
pub const STEPPER_SEGMENT_BUFFER_SIZE: usize = 32;
const QUEUE_CAPACITY: usize = STEPPER_SEGMENT_BUFFER_SIZE + 1;

/// A single constant-acceleration segment for one axis.
///
/// `accel` and `v0` are expressed in a fixed-point "step-rate squared" basis
/// (`Q1`, i.e. one fractional bit — the precision the original firmware's
/// AVR target used) so that `discriminant = (v0)^2 ± a*steps` stays an exact
/// integer throughout the segment. A segment with `accel == 0` is a
/// constant-speed cruise.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Command {
    /// Direction of travel for every step in this segment.
    pub direction: bool,
    /// Number of steps in this segment. Zero is a no-op and is skipped.
    pub step_count: u32,
    /// Step-rate at the start of the segment, in `Q1` ticks^-1 units.
    pub v0: u32,
    /// Signed acceleration term, in `Q1` units per step. Positive speeds the
    /// segment up, negative slows it down, zero holds `v0` constant.
    pub accel: i32,
    /// Timer-tick scale factor: `interval = time_mul / q`.
    pub time_mul: u32,
}

impl Command {
    pub const fn new(direction: bool, step_count: u32, v0: u32, accel: i32, time_mul: u32) -> Self {
        Self { direction, step_count, v0, accel, time_mul }
    }
}

pub type CommandProducer = Producer<'static, Command, QUEUE_CAPACITY>;
pub type CommandConsumer = Consumer<'static, Command, QUEUE_CAPACITY>;
pub type CommandQueue = Queue<Command, QUEUE_CAPACITY>;

/// Outcome of a single `on_timer_interrupt` call, reported for diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// A step was issued and another is scheduled.
    Stepped,
    /// A step was issued; the queue is now empty and the timer was stopped.
    SegmentStreamEmpty,
    /// The prestep callback reported the endstop triggered; the segment
    /// stream was aborted and the timer stopped without stepping.
    EndstopTriggered,
    /// The interrupt fired more than one millisecond after it was
    /// scheduled. The step still happened, but the caller should treat this
    /// as a soft real-time violation (see spec §4.2 overload detection).
    Overload,
}

struct ActiveSegment {
    command: Command,
    pos: u32,
    discriminant: u64,
}

impl ActiveSegment {
    fn load(command: Command) -> Self {
        let v0 = command.v0 as i64;
        let a = command.accel as i64;
        let base = v0 - a;
        Self { command, pos: 1, discriminant: (base * base).max(0) as u64 }
    }

    /// Computes the tick interval until the upcoming step and advances the
    /// integrator state for the step after that.
    fn next_interval_ticks(&mut self) -> u32 {
        let v0 = self.command.v0 as u64;
        let q = ((v0 + isqrt_u64(self.discriminant)) / 2).max(1);
        let interval = (self.command.time_mul as u64 / q).max(1);
        let a_mul = 2 * self.command.accel as i64;
        self.discriminant = (self.discriminant as i64 + a_mul).max(0) as u64;
        self.pos += 1;
        interval.min(u32::MAX as u64) as u32
    }

    fn exhausted(&self) -> bool {
        self.pos > self.command.step_count
    }
}

/// Integer square root (floor) via Newton's method, for `u64`.
fn isqrt_u64(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Hard real-time single-axis stepper driver.
///
/// One instance per physical axis; the motion core's `OVERLOAD_THRESHOLD_TICKS`
/// worth of lateness on the *scheduling* clock is reported as [`StepOutcome::Overload`],
/// matching the original firmware's ">1ms late" heuristic.
pub struct AxisDriver {
    commands: CommandConsumer,
    position: i32,
    direction: bool,
    pending: Option<Command>,
    active: Option<ActiveSegment>,
    overload_threshold_ticks: u32,
    last_scheduled_at: u32,
}

impl AxisDriver {
    pub fn new(commands: CommandConsumer, overload_threshold_ticks: u32) -> Self {
        Self {
            commands,
            position: 0,
            direction: true,
            pending: None,
            active: None,
            overload_threshold_ticks,
            last_scheduled_at: 0,
        }
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Primes the pipeline with the first segment and arms the timer.
    pub fn start<DIR: AtomicGpioPort, TIM: Timer>(&mut self, dir_port: &mut DIR, timer: &mut TIM, now: u32) {
        self.prepare_next(dir_port);
        if let Some(cmd) = self.pending {
            self.active = Some(ActiveSegment::load(cmd));
            self.pending = None;
            let interval = self
                .active
                .as_mut()
                .map(|a| a.next_interval_ticks())
                .unwrap_or(1);
            self.last_scheduled_at = now.wrapping_add(interval);
            timer.schedule_next(interval);
        }
    }

    /// The ISR body. `prestep` is polled immediately before the pulse is
    /// issued and should check the endstop/probe pin; returning `true`
    /// aborts the remaining stream (used for homing and probe moves).
    pub fn on_timer_interrupt<STEP, DIR, TIM, END>(
        &mut self,
        step_port: &mut STEP,
        dir_port: &mut DIR,
        timer: &mut TIM,
        endstop: &END,
        now: u32,
    ) -> StepOutcome
    where
        STEP: AtomicGpioPort,
        DIR: AtomicGpioPort,
        TIM: Timer,
        END: InputPin,
    {
        let overloaded = hal_traits::time_after(now, self.last_scheduled_at.wrapping_add(self.overload_threshold_ticks));

        let Some(mut active) = self.active.take() else {
            timer.stop();
            return StepOutcome::SegmentStreamEmpty;
        };

        if endstop.is_triggered() {
            timer.stop();
            return StepOutcome::EndstopTriggered;
        }

        self.direction = active.command.direction;
        step_port.set_and_clear_atomic(0x01, 0x01);
        self.position += if self.direction { 1 } else { -1 };

        if active.exhausted() {
            self.active = match self.commands.dequeue() {
                Some(next) => {
                    self.apply_direction(dir_port, next.direction);
                    Some(ActiveSegment::load(next))
                }
                None => None,
            };
        } else {
            self.active = Some(active);
        }

        match self.active.as_mut() {
            Some(seg) => {
                let interval = seg.next_interval_ticks();
                self.last_scheduled_at = now.wrapping_add(interval);
                timer.schedule_next(interval);
                self.prepare_next(dir_port);
                if overloaded {
                    StepOutcome::Overload
                } else {
                    StepOutcome::Stepped
                }
            }
            None => {
                timer.stop();
                StepOutcome::SegmentStreamEmpty
            }
        }
    }

    fn apply_direction<DIR: AtomicGpioPort>(&mut self, dir_port: &mut DIR, direction: bool) {
        if direction != self.direction {
            dir_port.write(if direction { 0x01 } else { 0x00 });
        }
    }

    fn prepare_next<DIR: AtomicGpioPort>(&mut self, dir_port: &mut DIR) {
        if self.pending.is_none() {
            if let Some(cmd) = self.commands.dequeue() {
                self.apply_direction(dir_port, cmd.direction);
                self.pending = Some(cmd);
            }
        }
    }
}
