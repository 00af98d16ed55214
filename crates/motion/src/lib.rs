//! # Motion Control Crate
//!
//! The real-time core of the motion pipeline: the look-ahead trapezoidal
//! planner, the kinematic transform layer (Cartesian/CoreXY/Delta,
//! segmentation, bed-leveling correction), the non-motion channel-command
//! stream, and the plain-struct event loop that ties them together. Usable
//! on both host and MCU (`no_std`-friendly).

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod channel;
pub mod codegen;
pub mod errors;
pub mod event_loop;
pub mod kinematics;
pub mod planner;

pub use channel::ChannelCommand;
pub use codegen::{segment_to_commands, AxisCommands, TICK_HZ, TIME_MUL};
pub use errors::PlannerError;
pub use event_loop::EventLoop;
pub use kinematics::{
    BedCorrection, CartesianKinematics, CoreXYKinematics, DeltaKinematics, Kinematics, StepperAxis,
};
pub use planner::{CommittedSegment, MotionPlanner, Segment, LOOKAHEAD_BUFFER_SIZE, LOOKAHEAD_COMMIT_COUNT};

/// A point in 3D cartesian space, in millimeters.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct CartesianPoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}
