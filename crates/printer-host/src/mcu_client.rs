//! Command Execution Engine
//!
//! Drives the printer's simulated motion and thermal state in-process. This
//! is a single firmware image, not a host/MCU wire-protocol split: there is
//! no serial link to a remote controller to encode commands for, so the
//! "MCU client" role shrinks to applying each `McuCommand` against shared
//! `PrinterState` on a timing model consistent with the step counts and
//! heater dynamics the rest of the workspace's `motion`/`thermal` crates
//! compute, and reporting the result back to the dispatcher/API layer.

use crate::gcode::McuCommand;
use crate::state::{PrinterState, PrinterStatus};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Receiver;
use tokio::time::sleep;
use tracing::info;

/// Roughly how long one simulated step pulse takes to execute; used only to
/// give `Move`/`Home` commands a duration proportional to their step count
/// so status queries observe a printer that's believably "in motion".
const STEP_PERIOD: Duration = Duration::from_micros(50);

/// Runs the command engine, applying every `McuCommand` received on
/// `mcu_rx` against `state` until the channel is closed.
pub async fn run_engine(mut mcu_rx: Receiver<McuCommand>, state: Arc<Mutex<PrinterState>>) {
    info!("Command engine started.");
    {
        let mut locked = state.lock();
        locked.status = PrinterStatus::Ready;
        locked.status_message = "Printer is ready".to_string();
    }

    let temp_state = state.clone();
    tokio::spawn(async move { run_thermal_loop(temp_state).await });

    while let Some(command) = mcu_rx.recv().await {
        handle_command(command, &state).await;
    }
    info!("Command channel closed, engine exiting.");
}

async fn handle_command(command: McuCommand, state: &Arc<Mutex<PrinterState>>) {
    match command {
        McuCommand::Move(steps) => {
            let max_steps = steps.iter().map(|s| s.steps.unsigned_abs()).max().unwrap_or(0);
            state.lock().status = PrinterStatus::Printing;
            sleep(STEP_PERIOD * max_steps).await;
            state.lock().status = PrinterStatus::Ready;
        }
        McuCommand::Home => {
            state.lock().status = PrinterStatus::Printing;
            sleep(STEP_PERIOD * 1000).await;
            state.lock().status = PrinterStatus::Ready;
        }
        McuCommand::EmergencyStop => {
            let mut locked = state.lock();
            locked.status = PrinterStatus::Error;
            locked.status_message = "Emergency Stop".to_string();
            for temp in locked.temperatures.values_mut() {
                temp.target = 0.0;
            }
        }
        McuCommand::GetTemp => {
            // Temperatures are kept current by `run_thermal_loop`; nothing
            // to do here besides letting the caller read `state` directly.
        }
    }
}

/// Nudges each heater's `actual` temperature toward its `target` once per
/// tick, the same first-order approach the PID loop in `thermal` assumes
/// when it was tuned, so simulated heat-up/cool-down curves look plausible
/// without pulling in the full fixed-point firmware PID for a host-side
/// simulation.
async fn run_thermal_loop(state: Arc<Mutex<PrinterState>>) {
    let tick = Duration::from_millis(250);
    loop {
        sleep(tick).await;
        if state.lock().status == PrinterStatus::Error {
            continue;
        }
        let mut locked = state.lock();
        for temp in locked.temperatures.values_mut() {
            let delta = temp.target - temp.actual;
            // Converge ~10% of the remaining gap per tick, clamped to a
            // maximum slew rate so it never jumps instantaneously.
            let step = (delta * 0.1).clamp(-2.0, 2.0);
            temp.actual += step;
        }
    }
}
