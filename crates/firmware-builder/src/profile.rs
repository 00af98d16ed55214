//! The declarative machine profile a board/print-surface is described in.
//!
//! Intentionally narrow: only the fields the firmware's codegen actually
//! needs to bake into constants (kinematics variant, steps/mm, accel/velocity
//! caps, heater PID gains and safety limits) are carried. Fields a board file
//! would also want (pin assignments) stay hand-written in `boards/*/pins.rs`.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct MachineProfile {
    pub name: String,
    pub kinematics: KinematicsProfile,
    #[serde(default)]
    pub heaters: Vec<HeaterProfile>,
    #[serde(default)]
    pub axes: Vec<AxisProfile>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum KinematicsProfile {
    Cartesian {
        steps_per_mm_x: f64,
        steps_per_mm_y: f64,
        steps_per_mm_z: f64,
    },
    CoreXy {
        steps_per_mm_a: f64,
        steps_per_mm_b: f64,
        steps_per_mm_z: f64,
    },
    Delta {
        diagonal_rod: f64,
        radius: f64,
        steps_per_mm: f64,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeaterProfile {
    pub name: String,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub i_min: f64,
    pub i_max: f64,
    pub d_history_factor: f64,
    pub max_temp: f64,
    /// Lower temperature bound below which the heater's safety monitor
    /// force-shuts-down (guards against a shorted/disconnected sensor
    /// reading implausibly low rather than just a runaway reading high).
    pub min_safe: f64,
    pub min_heat_gain_temp: f64,
    pub min_heat_gain_time_s: f64,
    pub max_deviation: f64,
}

/// Per-axis soft-limit and motion-tuning profile, mirroring
/// `printer_core::core::AxisConfig`.
#[derive(Debug, Clone, Deserialize)]
pub struct AxisProfile {
    pub name: String,
    pub steps_per_unit: f64,
    pub max_speed: f64,
    pub max_accel: f64,
    pub cornering_distance: f64,
    pub min_pos: f64,
    pub max_pos: f64,
}

impl MachineProfile {
    pub fn from_toml_str(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }
}
