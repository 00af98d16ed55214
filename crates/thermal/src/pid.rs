//! A PID (Proportional-Integral-Derivative) controller for heater closed-loop
//! control, matching the fixed-period control-loop model used by the aux
//! control module: a clamped integrator, an exponentially-smoothed
//! derivative term (`d_history`), and a NaN setpoint convention for "heater
//! off" that always yields a zero output without disturbing the integrator
//! until the heater is next enabled.

use num_traits::{Float, Signed};

/// A PID controller for regulating a single heater.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pid<F: Float + Signed> {
    /// Proportional gain.
    pub kp: F,
    /// Integral gain.
    pub ki: F,
    /// Derivative gain.
    pub kd: F,

    /// Lower clamp for the integrator term.
    pub i_min: F,
    /// Upper clamp for the integrator term.
    pub i_max: F,
    /// EMA factor applied to the raw derivative (`d_history_factor`); closer
    /// to 1.0 means more smoothing.
    pub d_history_factor: F,

    /// Lower bound of the controller's output.
    pub output_min: F,
    /// Upper bound of the controller's output.
    pub output_max: F,

    target: F,
    integrator: F,
    last_measurement: Option<F>,
    last_output: F,
    d_history: F,
    /// Set whenever the target transitions to NaN; cleared (and the
    /// integrator reset) the next time a non-NaN target is observed.
    pending_reset: bool,
}

impl<F: Float + Signed> Pid<F> {
    /// Creates a new, disabled (target = NaN) PID controller.
    pub fn new(
        kp: F,
        ki: F,
        kd: F,
        i_min: F,
        i_max: F,
        d_history_factor: F,
        output_min: F,
        output_max: F,
    ) -> Self {
        Self {
            kp,
            ki,
            kd,
            i_min,
            i_max,
            d_history_factor,
            output_min,
            output_max,
            target: F::nan(),
            integrator: F::zero(),
            last_measurement: None,
            last_output: F::zero(),
            d_history: F::zero(),
            pending_reset: false,
        }
    }

    /// Sets the target temperature. Pass `F::nan()` to turn the heater off;
    /// the next `update()` call then returns zero output and the integrator
    /// is cleared the following time a real target is set (`unset` per the
    /// PidState invariant).
    pub fn set_target(&mut self, target: F) {
        if target.is_nan() {
            self.pending_reset = true;
        }
        self.target = target;
    }

    /// Whether the controller currently has an active (non-NaN) target.
    pub fn is_enabled(&self) -> bool {
        !self.target.is_nan()
    }

    /// Updates the PID controller with a new measurement taken `dt` seconds
    /// after the previous one, returning the new output in `[output_min,
    /// output_max]`.
    pub fn update(&mut self, measurement: F, dt: F) -> F {
        if self.target.is_nan() {
            self.last_output = F::zero();
            self.last_measurement = Some(measurement);
            return F::zero();
        }

        if self.pending_reset {
            self.integrator = F::zero();
            self.d_history = F::zero();
            self.pending_reset = false;
        }

        let error = self.target - measurement;

        self.integrator = (self.integrator + self.ki * error * dt)
            .max(self.i_min)
            .min(self.i_max);

        let d_raw = match self.last_measurement {
            Some(prev) if dt > F::zero() => (measurement - prev) / dt,
            _ => F::zero(),
        };
        self.d_history = self.d_history_factor * self.d_history + (F::one() - self.d_history_factor) * d_raw;

        let output = (self.kp * error + self.integrator - self.kd * self.d_history)
            .max(self.output_min)
            .min(self.output_max);

        self.last_measurement = Some(measurement);
        self.last_output = output;
        output
    }

    /// The output computed by the most recent `update()` call.
    pub fn last_output(&self) -> F {
        self.last_output
    }

    /// Clears all transient state (integrator, derivative history, last
    /// measurement) without touching the configured target.
    pub fn reset(&mut self) {
        self.integrator = F::zero();
        self.d_history = F::zero();
        self.last_measurement = None;
        self.last_output = F::zero();
        self.pending_reset = false;
    }
}
