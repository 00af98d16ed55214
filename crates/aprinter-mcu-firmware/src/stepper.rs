//! # Stepper Motor Control
//!
//! This module is responsible for controlling the 3D printer's stepper motors. It uses
//! [`stepper::AxisDriver`], the same quadratic step-time integrator the host-side
//! simulator and motion planner drive, so the segment math matches regardless of which
//! side of the link produced it.
//!
//! ## Stepper Queue
//!
//! Each axis owns a lock-free `heapless::spsc` queue of [`stepper::Command`]s. The
//! protocol bridge task is the producer, pushing segments decoded off the wire; this
//! module's task is the sole consumer, draining them through the integrator.
//!
//! ## Timing
//!
//! `AxisDriver` is written against the [`hal_traits::Timer`] one-shot-timer contract so
//! it can be driven from a hardware interrupt. This firmware drives it from an async
//! task instead: each iteration asks the driver for the next interval, in
//! microsecond ticks, and sleeps that long before calling `on_timer_interrupt` again.
//! That trades a true hardware ISR's latency guarantees for portability across the
//! `embassy-rt` executor; the integrator itself has no notion of which one is in use.

use embassy_stm32::gpio::{Input, Output};
use hal_traits::{AtomicGpioPort, InputPin, Timer};
use stepper::{AxisDriver, CommandConsumer, StepOutcome};

/// A single GPIO pin driven as a one-bit [`AtomicGpioPort`].
///
/// `AxisDriver` issues a step pulse as `set_and_clear_atomic(0x01, 0x01)`: set
/// then clear the same bit, meaning "pulse this pin" rather than "leave it
/// high". A direction write only ever sets or clears, never both at once.
pub struct GpioPort {
    pin: Output<'static>,
}

impl GpioPort {
    pub fn new(pin: Output<'static>) -> Self {
        Self { pin }
    }
}

impl AtomicGpioPort for GpioPort {
    fn set_and_clear_atomic(&mut self, set_mask: u8, clear_mask: u8) {
        if set_mask & 0x01 != 0 {
            self.pin.set_high();
        }
        if clear_mask & 0x01 != 0 {
            self.pin.set_low();
        }
    }

    fn write(&mut self, mask: u8) {
        if mask & 0x01 != 0 {
            self.pin.set_high();
        } else {
            self.pin.set_low();
        }
    }
}

/// A digital endstop input, triggered when the pin reads high.
pub struct GpioEndstop {
    pin: Input<'static>,
}

impl GpioEndstop {
    pub fn new(pin: Input<'static>) -> Self {
        Self { pin }
    }
}

impl InputPin for GpioEndstop {
    fn is_triggered(&self) -> bool {
        self.pin.is_high()
    }
}

/// Records the interval (in microsecond ticks) the driver last requested,
/// and whether it asked to stop. `stepper_task` reads this after each call
/// to `on_timer_interrupt` to know how long to sleep before the next one.
pub struct SoftTimer {
    next_interval: Option<u32>,
}

impl SoftTimer {
    pub fn new() -> Self {
        Self { next_interval: None }
    }

    /// Takes the last-scheduled interval, if any was requested this round.
    pub fn take_interval(&mut self) -> Option<u32> {
        self.next_interval.take()
    }
}

impl Timer for SoftTimer {
    fn schedule_next(&mut self, ticks: u32) {
        self.next_interval = Some(ticks);
    }

    fn trigger_now(&mut self) {
        self.next_interval = Some(0);
    }

    fn stop(&mut self) {
        self.next_interval = None;
    }
}

/// One axis's step-generation task.
///
/// Drains `commands` through an [`AxisDriver`], toggling `step_pin` and
/// `dir_pin` and checking `endstop_pin` before every pulse, until the queue
/// runs dry -- at which point it waits to be woken again by the next enqueue.
#[embassy_executor::task(pool_size = 4)]
pub async fn stepper_task(
    axis_name: &'static str,
    commands: CommandConsumer,
    step_pin: Output<'static>,
    dir_pin: Output<'static>,
    endstop_pin: Input<'static>,
    overload_threshold_ticks: u32,
) {
    defmt::info!("Stepper task '{}' started", axis_name);

    let mut driver = AxisDriver::new(commands, overload_threshold_ticks);
    let mut step_port = GpioPort::new(step_pin);
    let mut dir_port = GpioPort::new(dir_pin);
    let endstop = GpioEndstop::new(endstop_pin);
    let mut timer = SoftTimer::new();
    let mut now: u32 = 0;

    loop {
        driver.start(&mut dir_port, &mut timer, now);
        let Some(mut interval) = timer.take_interval() else {
            // Nothing queued yet; back off and try to (re)start the pipeline.
            embassy_time::Timer::after(embassy_time::Duration::from_millis(5)).await;
            continue;
        };

        loop {
            embassy_time::Timer::after(embassy_time::Duration::from_micros(interval as u64)).await;
            now = now.wrapping_add(interval);

            match driver.on_timer_interrupt(&mut step_port, &mut dir_port, &mut timer, &endstop, now) {
                StepOutcome::Stepped => {}
                StepOutcome::Overload => {
                    defmt::warn!("stepper '{}': ISR ran late, step still issued", axis_name);
                }
                StepOutcome::SegmentStreamEmpty => break,
                StepOutcome::EndstopTriggered => {
                    defmt::warn!("stepper '{}': endstop triggered, segment stream aborted", axis_name);
                    break;
                }
            }

            match timer.take_interval() {
                Some(next) => interval = next,
                None => break,
            }
        }
    }
}
