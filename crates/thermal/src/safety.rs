//! Logic for ensuring heater safety.

use num_traits::{Float, Zero};

/// The operational state of a thermal system.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ThermalState {
    /// The system is operating normally.
    Ok,
    /// A potential issue has been detected, but it's not yet critical.
    /// This might be a slow heating or a temperature excursion.
    Warning,
    /// A critical failure has been detected, such as thermal runaway.
    /// Immediate action (e.g., hard shutdown) is required.
    Shutdown,
}

/// Defines the temperature and time limits for safety checks.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SafetyLimits<F: Float> {
    /// The maximum temperature the system should ever reach.
    pub max_temp: F,
    /// The minimum plausible temperature reading. Below this the sensor is
    /// assumed disconnected or shorted rather than genuinely this cold.
    pub min_safe: F,
    /// A minimum temperature gain that must be achieved within a certain time
    /// when the heater is on, to ensure it's working.
    /// (e.g., 2 degrees in 30 seconds).
    pub min_heat_gain_temp: F,
    pub min_heat_gain_time_s: F,
    /// The maximum temperature deviation from the setpoint allowed during
    /// stable operation.
    pub max_deviation: F,
}

/// Manages the safety logic for a heater.
#[derive(Debug, Clone, Copy)]
pub struct HeaterSafety<F: Float> {
    limits: SafetyLimits<F>,
    start_time: F,
    start_temp: F,
    heater_was_on: bool,
}

impl<F: Float> HeaterSafety<F> {
    /// Creates a new `HeaterSafety` monitor.
    pub fn new(limits: SafetyLimits<F>) -> Self {
        Self {
            limits,
            start_time: F::zero(),
            start_temp: F::zero(),
            heater_was_on: false,
        }
    }

    /// Updates the safety monitor with the current state.
    ///
    /// # Arguments
    /// * `current_time_s` - The current time in seconds.
    /// * `current_temp` - The current temperature.
    /// * `setpoint` - The current target temperature.
    /// * `heater_on` - Whether the heater is currently powered.
    ///
    /// # Returns
    /// The `ThermalState` indicating the system's safety status.
    pub fn update(&mut self, current_time_s: F, current_temp: F, setpoint: F, heater_on: bool) -> ThermalState {
        // Absolute max temperature check
        if current_temp > self.limits.max_temp {
            return ThermalState::Shutdown;
        }

        // A shorted or disconnected sensor commonly reads far below any
        // achievable temperature; reject it the same as an overtemp.
        if current_temp < self.limits.min_safe {
            return ThermalState::Shutdown;
        }

        // Check if the heater just turned on
        if heater_on && !self.heater_was_on {
            self.start_time = current_time_s;
            self.start_temp = current_temp;
        }
        self.heater_was_on = heater_on;

        if heater_on {
            // Thermal runaway check: Is it heating up as expected?
            let elapsed_time = current_time_s - self.start_time;
            if elapsed_time > self.limits.min_heat_gain_time_s {
                let temp_gain = current_temp - self.start_temp;
                if temp_gain < self.limits.min_heat_gain_temp {
                    return ThermalState::Shutdown; // Not heating up, possible thermistor failure or broken heater
                }
            }
        } else {
            // Reset the heating check timer when the heater is off
            self.start_time = current_time_s;
            self.start_temp = current_temp;
        }

        // Check for temperature deviation from setpoint if we are close to it
        if !setpoint.is_zero() && (current_temp - setpoint).abs() > self.limits.max_deviation {
            // Only trigger if we should be at temperature
            if (self.start_temp - setpoint).abs() < self.limits.max_deviation {
                return ThermalState::Warning;
            }
        }

        ThermalState::Ok
    }
}

/// Result of an observation tick on a [`StableObserver`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum WaitOutcome {
    /// Still waiting; temperature isn't within tolerance continuously yet.
    Waiting,
    /// The heater has held `|temp - target| < tolerance` for at least
    /// `min_time_s`.
    Reached,
    /// `wait_timeout_s` elapsed without ever reaching a stable window.
    TimedOut,
}

/// Implements the "wait until temperature stable near target" sub-state
/// machine: samples are expected every `observer_interval_s`; once the
/// measurement stays within `tolerance` of the target continuously for
/// `min_time_s`, the wait is reported as reached. A global `wait_timeout_s`
/// bounds the whole observation regardless of how the samples behave.
#[derive(Debug, Clone, Copy)]
pub struct StableObserver<F: Float> {
    target: F,
    tolerance: F,
    min_time_s: F,
    wait_timeout_s: F,
    observer_interval_s: F,
    elapsed_s: F,
    /// How long the measurement has continuously been within tolerance.
    stable_for_s: F,
    last_sample_at_s: Option<F>,
}

impl<F: Float> StableObserver<F> {
    pub fn new(target: F, tolerance: F, min_time_s: F, wait_timeout_s: F, observer_interval_s: F) -> Self {
        Self {
            target,
            tolerance,
            min_time_s,
            wait_timeout_s,
            observer_interval_s,
            elapsed_s: F::zero(),
            stable_for_s: F::zero(),
            last_sample_at_s: None,
        }
    }

    /// The configured sampling period; callers should schedule their next
    /// tick this far in the future.
    pub fn observer_interval_s(&self) -> F {
        self.observer_interval_s
    }

    /// Feeds one sample, `dt_s` seconds after the previous one, and returns
    /// the updated wait outcome.
    pub fn tick(&mut self, measurement: F, dt_s: F) -> WaitOutcome {
        self.elapsed_s = self.elapsed_s + dt_s;
        self.last_sample_at_s = Some(self.elapsed_s);

        if (measurement - self.target).abs() < self.tolerance {
            self.stable_for_s = self.stable_for_s + dt_s;
        } else {
            self.stable_for_s = F::zero();
        }

        if self.stable_for_s >= self.min_time_s {
            WaitOutcome::Reached
        } else if self.elapsed_s >= self.wait_timeout_s {
            WaitOutcome::TimedOut
        } else {
            WaitOutcome::Waiting
        }
    }
}

#[cfg(test)]
mod stable_observer_tests {
    use super::*;

    #[test]
    fn reaches_after_continuous_stability() {
        let mut obs = StableObserver::new(200.0_f64, 1.0, 3.0, 30.0, 0.5);
        // Oscillates outside tolerance at first, then settles.
        assert_eq!(obs.tick(195.0, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(199.5, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(200.2, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(200.1, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(199.8, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(200.0, 0.5), WaitOutcome::Reached);
    }

    #[test]
    fn instability_resets_the_stable_timer() {
        let mut obs = StableObserver::new(200.0_f64, 1.0, 2.0, 10.0, 0.5);
        assert_eq!(obs.tick(200.0, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(200.0, 0.5), WaitOutcome::Waiting);
        // Spike outside tolerance resets the accumulated stable time.
        assert_eq!(obs.tick(150.0, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(200.0, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(200.0, 0.5), WaitOutcome::Waiting);
        assert_eq!(obs.tick(200.0, 0.5), WaitOutcome::Reached);
    }

    #[test]
    fn times_out_without_reaching_target() {
        let mut obs = StableObserver::new(200.0_f64, 1.0, 5.0, 2.0, 0.5);
        assert_eq!(obs.tick(25.0, 1.0), WaitOutcome::Waiting);
        assert_eq!(obs.tick(25.0, 1.0), WaitOutcome::TimedOut);
    }
}
