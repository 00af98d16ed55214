#![no_std]
#![deny(clippy::all)]

//! Board- and task-level firmware modules shared between the `embassy-rt`
//! binary entry point and the crate's integration tests.
//!
//! The firmware binary (`src/main.rs`) only selects a runtime and wires
//! these modules together; the modules themselves live here so that
//! `tests/` can exercise them without linking a full executor.

pub mod boards;
pub mod fixed_point;
pub mod heater;
pub mod safety;
pub mod adc;
pub mod stepper;
pub mod proto_bridge;
pub mod wire;
