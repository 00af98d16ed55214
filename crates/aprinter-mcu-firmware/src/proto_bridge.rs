//! # Protocol Bridge
//!
//! This module is responsible for handling the communication between the host and the
//! MCU. It reads bytes off a UART, resynchronizes on [`crate::wire`]'s frame format, and
//! dispatches decoded commands to the stepper and heater tasks.
//!
//! ## Command Dispatch
//!
//! A `Step` frame is pushed onto the named axis's `stepper::Command` queue for
//! [`crate::stepper::stepper_task`] to drain. A `SetHeaterTarget` frame updates the
//! corresponding [`crate::heater::HeaterSharedState`] directly.

use crate::heater::HeaterSharedState;
use crate::wire::{self, HostCommand, MAX_AXES};
use embassy_stm32::usart::UartRx;
use stepper::CommandProducer;

/// Bytes buffered between UART reads while waiting for a full frame.
const RX_BUF_LEN: usize = 64;

/// The protocol bridge task.
///
/// `axis_producers` maps a wire axis index to the `stepper::Command` queue
/// producer for that axis; an index with no corresponding physical axis on
/// this board is `None` and frames addressing it are dropped with a warning.
#[embassy_executor::task]
pub async fn proto_task(
    mut uart_rx: UartRx<'static, embassy_stm32::mode::Async>,
    mut axis_producers: [Option<CommandProducer>; MAX_AXES],
    extruder_state: &'static HeaterSharedState,
    bed_state: &'static HeaterSharedState,
) {
    defmt::info!("Protocol bridge task started");

    let mut buf = [0u8; RX_BUF_LEN];
    let mut filled: usize = 0;

    loop {
        if filled == buf.len() {
            // No valid frame found in a full buffer; drop the oldest byte and
            // keep resynchronizing rather than deadlocking on garbage input.
            buf.copy_within(1.., 0);
            filled -= 1;
        }

        match uart_rx.read(&mut buf[filled..filled + 1]).await {
            Ok(()) => filled += 1,
            Err(_) => {
                defmt::warn!("UART read error, resetting frame buffer");
                filled = 0;
                continue;
            }
        }

        loop {
            match wire::decode_frame(&buf[..filled]) {
                Some((command, consumed)) => {
                    dispatch(command, &mut axis_producers, extruder_state, bed_state).await;
                    buf.copy_within(consumed..filled, 0);
                    filled -= consumed;
                }
                None if filled > 0 && buf[0] != 0xAA => {
                    // Not a start-of-frame byte; drop it and keep scanning.
                    buf.copy_within(1..filled, 0);
                    filled -= 1;
                    continue;
                }
                None => break,
            }
        }
    }
}

async fn dispatch(
    command: HostCommand,
    axis_producers: &mut [Option<CommandProducer>; MAX_AXES],
    extruder_state: &'static HeaterSharedState,
    bed_state: &'static HeaterSharedState,
) {
    match command {
        HostCommand::Step { axis, command } => {
            match axis_producers.get_mut(axis as usize) {
                Some(Some(producer)) => {
                    if producer.enqueue(command).is_err() {
                        defmt::warn!("axis {} command queue full, dropping segment", axis);
                    }
                }
                _ => defmt::warn!("no stepper axis mapped to wire index {}", axis),
            }
        }
        HostCommand::SetHeaterTarget { heater, target } => {
            let state = match heater {
                0 => Some(extruder_state),
                1 => Some(bed_state),
                _ => None,
            };
            match state {
                Some(state) => *state.target_temp.lock().await = target,
                None => defmt::warn!("no heater mapped to wire index {}", heater),
            }
        }
    }
}
