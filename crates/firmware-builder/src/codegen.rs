//! Renders a [`MachineProfile`] into a standalone Rust source file of `pub
//! const` declarations, in the same shape `motion::kinematics` and
//! `thermal::safety` structs expect at construction time. The generated
//! module is meant to be dropped into a board crate next to its
//! hand-written `pins.rs` and used to build the kinematics/heater objects
//! at startup, the same way `boards::stm32f407` hand-assembles `BoardPins`
//! from `embassy_stm32::Peripherals`.

use crate::profile::{AxisProfile, HeaterProfile, KinematicsProfile, MachineProfile};
use std::fmt::Write as _;

pub fn render(profile: &MachineProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "// Generated from machine profile \"{}\". Do not edit by hand;", profile.name);
    let _ = writeln!(out, "// regenerate with `firmware-builder generate`.");
    let _ = writeln!(out);

    render_kinematics(&mut out, &profile.kinematics);
    let _ = writeln!(out);
    for axis in &profile.axes {
        render_axis(&mut out, axis);
        let _ = writeln!(out);
    }
    for heater in &profile.heaters {
        render_heater(&mut out, heater);
        let _ = writeln!(out);
    }

    out
}

fn render_axis(out: &mut String, axis: &AxisProfile) {
    let _ = writeln!(out, "pub mod {} {{", axis.name.to_ascii_lowercase());
    let _ = writeln!(out, "    pub const STEPS_PER_UNIT: f64 = {:?};", axis.steps_per_unit);
    let _ = writeln!(out, "    pub const MAX_SPEED: f64 = {:?};", axis.max_speed);
    let _ = writeln!(out, "    pub const MAX_ACCEL: f64 = {:?};", axis.max_accel);
    let _ = writeln!(out, "    pub const CORNERING_DISTANCE: f64 = {:?};", axis.cornering_distance);
    let _ = writeln!(out, "    pub const MIN_POS: f64 = {:?};", axis.min_pos);
    let _ = writeln!(out, "    pub const MAX_POS: f64 = {:?};", axis.max_pos);
    let _ = writeln!(out);
    let _ = writeln!(out, "    pub fn build_axis_config() -> printer_core::core::AxisConfig {{");
    let _ = writeln!(out, "        printer_core::core::AxisConfig {{");
    let _ = writeln!(out, "            steps_per_unit: STEPS_PER_UNIT,");
    let _ = writeln!(out, "            max_speed: MAX_SPEED,");
    let _ = writeln!(out, "            max_accel: MAX_ACCEL,");
    let _ = writeln!(out, "            cornering_distance: CORNERING_DISTANCE,");
    let _ = writeln!(out, "            min_pos: MIN_POS,");
    let _ = writeln!(out, "            max_pos: MAX_POS,");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
}

fn render_kinematics(out: &mut String, kinematics: &KinematicsProfile) {
    match kinematics {
        KinematicsProfile::Cartesian { steps_per_mm_x, steps_per_mm_y, steps_per_mm_z } => {
            let _ = writeln!(out, "pub const KINEMATICS_VARIANT: &str = \"cartesian\";");
            let _ = writeln!(out, "pub const STEPS_PER_MM_X: f64 = {steps_per_mm_x:?};");
            let _ = writeln!(out, "pub const STEPS_PER_MM_Y: f64 = {steps_per_mm_y:?};");
            let _ = writeln!(out, "pub const STEPS_PER_MM_Z: f64 = {steps_per_mm_z:?};");
            let _ = writeln!(out, "pub fn build_kinematics() -> motion::kinematics::CartesianKinematics {{");
            let _ = writeln!(out, "    motion::kinematics::CartesianKinematics {{");
            let _ = writeln!(out, "        steps_per_mm_x: STEPS_PER_MM_X,");
            let _ = writeln!(out, "        steps_per_mm_y: STEPS_PER_MM_Y,");
            let _ = writeln!(out, "        steps_per_mm_z: STEPS_PER_MM_Z,");
            let _ = writeln!(out, "    }}");
            let _ = writeln!(out, "}}");
        }
        KinematicsProfile::CoreXy { steps_per_mm_a, steps_per_mm_b, steps_per_mm_z } => {
            let _ = writeln!(out, "pub const KINEMATICS_VARIANT: &str = \"corexy\";");
            let _ = writeln!(out, "pub const STEPS_PER_MM_A: f64 = {steps_per_mm_a:?};");
            let _ = writeln!(out, "pub const STEPS_PER_MM_B: f64 = {steps_per_mm_b:?};");
            let _ = writeln!(out, "pub const STEPS_PER_MM_Z: f64 = {steps_per_mm_z:?};");
            let _ = writeln!(out, "pub fn build_kinematics() -> motion::kinematics::CoreXYKinematics {{");
            let _ = writeln!(out, "    motion::kinematics::CoreXYKinematics {{");
            let _ = writeln!(out, "        steps_per_mm_a: STEPS_PER_MM_A,");
            let _ = writeln!(out, "        steps_per_mm_b: STEPS_PER_MM_B,");
            let _ = writeln!(out, "        steps_per_mm_z: STEPS_PER_MM_Z,");
            let _ = writeln!(out, "    }}");
            let _ = writeln!(out, "}}");
        }
        KinematicsProfile::Delta { diagonal_rod, radius, steps_per_mm } => {
            let _ = writeln!(out, "pub const KINEMATICS_VARIANT: &str = \"delta\";");
            let _ = writeln!(out, "pub const DIAGONAL_ROD: f64 = {diagonal_rod:?};");
            let _ = writeln!(out, "pub const RADIUS: f64 = {radius:?};");
            let _ = writeln!(out, "pub const STEPS_PER_MM: f64 = {steps_per_mm:?};");
            let _ = writeln!(out, "pub fn build_kinematics() -> motion::kinematics::DeltaKinematics {{");
            let _ = writeln!(out, "    motion::kinematics::DeltaKinematics {{");
            let _ = writeln!(out, "        diagonal_rod: DIAGONAL_ROD,");
            let _ = writeln!(out, "        radius: RADIUS,");
            let _ = writeln!(out, "        steps_per_mm: STEPS_PER_MM,");
            let _ = writeln!(out, "        tower_angle_trim: [0.0; 3],");
            let _ = writeln!(out, "    }}");
            let _ = writeln!(out, "}}");
        }
    }
}

fn render_heater(out: &mut String, heater: &HeaterProfile) {
    let upper = heater.name.to_ascii_uppercase();
    let _ = writeln!(out, "pub mod {} {{", heater.name.to_ascii_lowercase());
    let _ = writeln!(out, "    pub const KP: f64 = {:?};", heater.kp);
    let _ = writeln!(out, "    pub const KI: f64 = {:?};", heater.ki);
    let _ = writeln!(out, "    pub const KD: f64 = {:?};", heater.kd);
    let _ = writeln!(out, "    pub const I_MIN: f64 = {:?};", heater.i_min);
    let _ = writeln!(out, "    pub const I_MAX: f64 = {:?};", heater.i_max);
    let _ = writeln!(out, "    pub const D_HISTORY_FACTOR: f64 = {:?};", heater.d_history_factor);
    let _ = writeln!(out, "    pub const MAX_TEMP: f64 = {:?};", heater.max_temp);
    let _ = writeln!(out, "    pub const MIN_SAFE: f64 = {:?};", heater.min_safe);
    let _ = writeln!(out, "    pub const MIN_HEAT_GAIN_TEMP: f64 = {:?};", heater.min_heat_gain_temp);
    let _ = writeln!(out, "    pub const MIN_HEAT_GAIN_TIME_S: f64 = {:?};", heater.min_heat_gain_time_s);
    let _ = writeln!(out, "    pub const MAX_DEVIATION: f64 = {:?};", heater.max_deviation);
    let _ = writeln!(out);
    let _ = writeln!(out, "    pub fn build_pid() -> thermal::pid::Pid<f64> {{");
    let _ = writeln!(out, "        thermal::pid::Pid::new(KP, KI, KD, I_MIN, I_MAX, D_HISTORY_FACTOR, 0.0, 1.0)");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    pub fn build_safety_limits() -> thermal::safety::SafetyLimits<f64> {{");
    let _ = writeln!(out, "        thermal::safety::SafetyLimits {{");
    let _ = writeln!(out, "            max_temp: MAX_TEMP,");
    let _ = writeln!(out, "            min_safe: MIN_SAFE,");
    let _ = writeln!(out, "            min_heat_gain_temp: MIN_HEAT_GAIN_TEMP,");
    let _ = writeln!(out, "            min_heat_gain_time_s: MIN_HEAT_GAIN_TIME_S,");
    let _ = writeln!(out, "            max_deviation: MAX_DEVIATION,");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    let _ = upper; // reserved for a future per-heater enum discriminant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::MachineProfile;

    fn cartesian_profile_with_one_heater() -> MachineProfile {
        let input = r#"
            name = "bench_test"

            [kinematics]
            variant = "cartesian"
            steps_per_mm_x = 80.0
            steps_per_mm_y = 80.0
            steps_per_mm_z = 400.0

            [[heaters]]
            name = "extruder"
            kp = 22.2
            ki = 1.08
            kd = 114.0
            i_min = -50.0
            i_max = 50.0
            d_history_factor = 0.7
            max_temp = 280.0
            min_safe = 5.0
            min_heat_gain_temp = 2.0
            min_heat_gain_time_s = 20.0
            max_deviation = 10.0

            [[axes]]
            name = "x"
            steps_per_unit = 80.0
            max_speed = 300.0
            max_accel = 1500.0
            cornering_distance = 0.5
            min_pos = 0.0
            max_pos = 220.0
        "#;
        MachineProfile::from_toml_str(input).unwrap()
    }

    #[test]
    fn renders_a_build_kinematics_function_for_cartesian() {
        let profile = cartesian_profile_with_one_heater();
        let rendered = render(&profile);
        assert!(rendered.contains("pub const KINEMATICS_VARIANT: &str = \"cartesian\";"));
        assert!(rendered.contains("fn build_kinematics() -> motion::kinematics::CartesianKinematics"));
    }

    #[test]
    fn renders_one_heater_module_per_declared_heater() {
        let profile = cartesian_profile_with_one_heater();
        let rendered = render(&profile);
        assert!(rendered.contains("pub mod extruder {"));
        assert!(rendered.contains("fn build_pid() -> thermal::pid::Pid<f64>"));
        assert!(rendered.contains("fn build_safety_limits() -> thermal::safety::SafetyLimits<f64>"));
        assert!(rendered.contains("pub const MIN_SAFE: f64 = 5.0;"));
        assert!(rendered.contains("min_safe: MIN_SAFE,"));
    }

    #[test]
    fn renders_one_axis_module_per_declared_axis() {
        let profile = cartesian_profile_with_one_heater();
        let rendered = render(&profile);
        assert!(rendered.contains("pub mod x {"));
        assert!(rendered.contains("pub const MAX_POS: f64 = 220.0;"));
        assert!(rendered.contains("fn build_axis_config() -> printer_core::core::AxisConfig"));
    }

    #[test]
    fn delta_profile_renders_tower_angle_trim_as_zeroed() {
        let input = r#"
            name = "delta_rig"
            [kinematics]
            variant = "delta"
            diagonal_rod = 250.0
            radius = 150.0
            steps_per_mm = 80.0
        "#;
        let profile = MachineProfile::from_toml_str(input).unwrap();
        let rendered = render(&profile);
        assert!(rendered.contains("tower_angle_trim: [0.0; 3],"));
    }
}
