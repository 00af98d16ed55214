//! Converts a committed planner segment into the per-axis fixed-point
//! command stream that drives `stepper::AxisDriver` (spec §4.1 "Command
//! generation").
//!
//! A segment's trapezoidal (or triangular, if it never reaches nominal
//! speed) profile is a property of its combined travel vector, not of any
//! one axis. [`phases`] computes that profile once, in the segment's own
//! distance/velocity domain; [`segment_to_commands`] then maps the phase
//! boundaries onto each participating axis by its share of the total
//! distance (`axis_steps[i] / distance`, the same ratio the planner calls
//! `unit_dir`).
//!
//! `stepper::Command`'s `v0`/`accel` are one-fractional-bit fixed point
//! (`Q1`): a stored value of `2 * v` represents a rate of `v` steps/tick.
//! `time_mul` stays fixed at `TICK_HZ * 2` across every generated command,
//! matching `stepper`'s own test fixtures. Because the stepper ISR's
//! quadratic integrator only ever sees the *average* of a segment's start
//! and end rate (`q = (v0 + sqrt(discriminant)) / 2`), `accel` is chosen so
//! the discriminant recurrence lands exactly on the phase's target end rate
//! after `steps` steps; the path it takes in between is an approximation of
//! the true constant-acceleration curve, not an exact reproduction of it
//! (see DESIGN.md).

use crate::planner::{Segment, MAX_AXES};

/// Tick rate the stepper ISR's timer runs at (spec §4.2).
pub const TICK_HZ: u32 = 1_000_000;

/// `Q1`: one fractional bit.
const SCALE: f64 = 2.0;

/// Held constant across every generated command.
pub const TIME_MUL: u32 = TICK_HZ * SCALE as u32;

fn to_fixed_rate(steps_per_sec: f64) -> u32 {
    (steps_per_sec * SCALE).round().max(0.0) as u32
}

/// One leg of a segment's speed profile, in steps along its combined
/// travel vector.
#[derive(Debug, Clone, Copy)]
struct Phase {
    steps: u32,
    v_start: f64,
    v_end: f64,
}

/// Splits a committed segment into its accelerate/cruise/decelerate legs.
///
/// Falls back to a triangular profile (no cruise leg) when the segment is
/// too short to reach `nominal_speed` given `v_entry`/`v_exit` and
/// `max_accel`; this mirrors the standard trapezoidal-planner fallback
/// (spec §4.1).
fn phases(segment: &Segment) -> heapless::Vec<Phase, 3> {
    let mut out = heapless::Vec::new();
    let distance = segment.distance;
    let accel = segment.max_accel;
    if distance <= 0.0 || accel <= 0.0 {
        return out;
    }

    let v_entry = segment.v_entry;
    let v_exit = segment.v_exit;
    let v_nom = segment.nominal_speed;

    let accel_dist = (v_nom * v_nom - v_entry * v_entry) / (2.0 * accel);
    let decel_dist = (v_nom * v_nom - v_exit * v_exit) / (2.0 * accel);

    let (accel_dist, decel_dist, v_peak) = if accel_dist < 0.0 || decel_dist < 0.0 || accel_dist + decel_dist > distance {
        let v_peak_sq = (2.0 * accel * distance + v_entry * v_entry + v_exit * v_exit) / 2.0;
        let v_peak = v_peak_sq.max(v_entry * v_entry).max(v_exit * v_exit).sqrt();
        let a_dist = ((v_peak * v_peak - v_entry * v_entry) / (2.0 * accel)).clamp(0.0, distance);
        (a_dist, distance - a_dist, v_peak)
    } else {
        (accel_dist, decel_dist, v_nom)
    };
    let cruise_dist = (distance - accel_dist - decel_dist).max(0.0);

    let total_steps = distance.round().max(1.0) as u32;
    let mut remaining = total_steps;

    let accel_steps = (accel_dist.round() as u32).min(remaining);
    if accel_steps > 0 {
        let _ = out.push(Phase { steps: accel_steps, v_start: v_entry, v_end: v_peak });
    }
    remaining -= accel_steps;

    let cruise_steps = (cruise_dist.round() as u32).min(remaining);
    if cruise_steps > 0 {
        let _ = out.push(Phase { steps: cruise_steps, v_start: v_peak, v_end: v_peak });
    }
    remaining -= cruise_steps;

    if remaining > 0 {
        let _ = out.push(Phase { steps: remaining, v_start: v_peak, v_end: v_exit });
    }
    out
}

/// Per-axis fixed-point command sequence for one committed segment. An axis
/// that doesn't move in this segment gets an empty slice.
pub type AxisCommands = [heapless::Vec<stepper::Command, 3>; MAX_AXES];

/// Expands a committed segment into the per-axis `stepper::Command`s its
/// `AxisDriver`s should be fed, in order.
pub fn segment_to_commands(segment: &Segment) -> AxisCommands {
    let mut out: AxisCommands = core::array::from_fn(|_| heapless::Vec::new());
    let phase_list = phases(segment);
    if phase_list.is_empty() {
        return out;
    }

    for axis in 0..MAX_AXES {
        let axis_total_steps = segment.axis_steps[axis].unsigned_abs();
        if axis_total_steps == 0 {
            continue;
        }
        let direction = segment.axis_steps[axis] > 0;
        let ratio = axis_total_steps as f64 / segment.distance;

        let mut assigned = 0u32;
        let last = phase_list.len() - 1;
        for (i, phase) in phase_list.iter().enumerate() {
            let steps = if i == last {
                axis_total_steps - assigned
            } else {
                ((phase.steps as f64 * ratio).round() as u32).min(axis_total_steps - assigned)
            };
            if steps == 0 {
                continue;
            }
            assigned += steps;

            let v0_fixed = to_fixed_rate(phase.v_start * ratio).max(1);
            let v_end_fixed = to_fixed_rate(phase.v_end * ratio).max(1);
            let accel_fixed =
                ((v0_fixed as i64 * (v_end_fixed as i64 - v0_fixed as i64)) / steps as i64) as i32;

            let _ = out[axis].push(stepper::Command::new(direction, steps, v0_fixed, accel_fixed, TIME_MUL));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::MotionPlanner;

    fn straight_x(steps: i32, speed: f64, accel: f64) -> Segment {
        Segment::new([steps, 0, 0, 0, 0], speed, speed, accel, 0.5, 0).unwrap()
    }

    #[test]
    fn single_axis_move_yields_accel_and_decel_legs_summing_to_total_steps() {
        let mut planner = MotionPlanner::new();
        planner.push(straight_x(8000, 300.0, 1500.0)).unwrap();
        let committed = planner.finalize();
        let commands = segment_to_commands(&committed[0]);

        let total: u32 = commands[0].iter().map(|c| c.step_count).sum();
        assert_eq!(total, 8000);
        assert!(commands[1].is_empty(), "y axis did not move");
        assert!(commands[0].len() >= 1);
    }

    #[test]
    fn stationary_axis_gets_no_commands() {
        let seg = Segment::new([1000, 0, 0, 0, 0], 100.0, 100.0, 500.0, 0.5, 0).unwrap();
        let commands = segment_to_commands(&seg);
        for axis in 1..MAX_AXES {
            assert!(commands[axis].is_empty());
        }
    }

    #[test]
    fn diagonal_move_splits_steps_proportionally_between_axes() {
        let seg = Segment::new([1000, 1000, 0, 0, 0], 100.0, 100.0, 500.0, 0.5, 0).unwrap();
        let mut seg = seg;
        seg.v_entry = 0.0;
        seg.v_exit = 0.0;
        let commands = segment_to_commands(&seg);
        let x_total: u32 = commands[0].iter().map(|c| c.step_count).sum();
        let y_total: u32 = commands[1].iter().map(|c| c.step_count).sum();
        assert_eq!(x_total, 1000);
        assert_eq!(y_total, 1000);
    }
}
