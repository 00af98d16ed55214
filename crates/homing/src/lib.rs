//! Homing and bed-probing state machines (spec §4.5).
//!
//! This crate describes *what move comes next* and *how to interpret the
//! result*; it never touches a planner or a GPIO pin itself. A
//! `printer-core` planner client drives one of these machines, turns its
//! [`homer::MoveRequest`]/[`prober::ProbeRequest`] into an actual planner
//! segment, and feeds the endstop/probe outcome back in.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod errors;
pub mod homer;
pub mod leveling;
pub mod prober;

pub use errors::{HomingError, ProbeError};
pub use homer::{Direction, HomerConfig, MoveRequest};
pub use leveling::{BedCorrection, LevelingState, ProbePoint, MAX_PROBE_POINTS};
pub use prober::{ProberConfig, ProbeRequest};

pub use homer::Homer;
pub use prober::Prober;
