//! Command Engine Walkthrough
//!
//! Drives the in-process command engine directly, the same way `main.rs`
//! wires it up, without starting the API server or virtual printer socket.
//! Useful for poking at `PrinterState` transitions from a REPL-like script.

use anyhow::Result;
use parking_lot::Mutex;
use printer_host::gcode::McuCommand;
use printer_host::kinematics::Step;
use printer_host::mcu_client::run_engine;
use printer_host::state::PrinterState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    info!("Starting command engine walkthrough...");

    let state = Arc::new(Mutex::new(PrinterState::new()));
    let (mcu_tx, mcu_rx) = mpsc::channel(16);
    let engine_state = state.clone();
    let engine_handle = tokio::spawn(run_engine(mcu_rx, engine_state));

    for i in 0..5 {
        let steps = vec![Step { motor: "stepper_x".to_string(), steps: (i + 1) * 100 }];
        info!("Sending move: {:?}", steps);
        mcu_tx.send(McuCommand::Move(steps)).await?;
        sleep(Duration::from_millis(50)).await;
        info!("Printer status: {:?}", state.lock().status);
    }

    drop(mcu_tx);
    let _ = engine_handle.await;
    info!("Finished.");
    Ok(())
}
