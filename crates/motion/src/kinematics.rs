//! Kinematic transform layer: Cartesian <-> stepper-space mappings, move
//! segmentation, and bed-leveling correction.

#[cfg(not(feature = "std"))]
use libm::sqrt;

use crate::CartesianPoint;

#[cfg(not(feature = "std"))]
fn fsqrt(x: f64) -> f64 {
    sqrt(x)
}
#[cfg(feature = "std")]
fn fsqrt(x: f64) -> f64 {
    x.sqrt()
}

/// Identifiers for the physical stepper axes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum StepperAxis {
    X,
    Y,
    Z,
    A, // CoreXY A stepper
    B, // CoreXY B stepper
    T1, // Delta tower 1
    T2, // Delta tower 2
    T3, // Delta tower 3
}

/// A trait for kinematic models that translate cartesian moves to stepper positions.
pub trait Kinematics {
    /// The number of axes in this kinematic model.
    const AXES: usize;

    /// Calculate the stepper motor positions for a given Cartesian coordinate.
    ///
    /// The order of axes is implementation-defined.
    fn cartesian_to_stepper_positions(&self, point: CartesianPoint) -> [f64; Self::AXES];

    /// The inverse of [`Kinematics::cartesian_to_stepper_positions`]: recover
    /// the Cartesian point a set of stepper positions corresponds to.
    fn stepper_positions_to_cartesian(&self, positions: [f64; Self::AXES]) -> CartesianPoint;

    /// Calculate the total distance a move will travel in stepper space.
    ///
    /// Used by the planner to calculate the number of steps.
    fn stepper_move_distance(&self, from: CartesianPoint, to: CartesianPoint) -> f64 {
        let start_pos = self.cartesian_to_stepper_positions(from);
        let end_pos = self.cartesian_to_stepper_positions(to);

        let mut dist_sq = 0.0;
        for i in 0..Self::AXES {
            let delta = end_pos[i] - start_pos[i];
            dist_sq += delta * delta;
        }
        fsqrt(dist_sq)
    }
}

// --- Cartesian Kinematics ---

/// Standard Cartesian kinematics (X, Y, Z steppers map directly to X, Y, Z axes).
#[derive(Debug, Default)]
pub struct CartesianKinematics {
    pub steps_per_mm_x: f64,
    pub steps_per_mm_y: f64,
    pub steps_per_mm_z: f64,
}

impl Kinematics for CartesianKinematics {
    const AXES: usize = 3;

    fn cartesian_to_stepper_positions(&self, point: CartesianPoint) -> [f64; Self::AXES] {
        [
            point.x * self.steps_per_mm_x,
            point.y * self.steps_per_mm_y,
            point.z * self.steps_per_mm_z,
        ]
    }

    fn stepper_positions_to_cartesian(&self, positions: [f64; Self::AXES]) -> CartesianPoint {
        CartesianPoint {
            x: (positions[0] / self.steps_per_mm_x) as f32,
            y: (positions[1] / self.steps_per_mm_y) as f32,
            z: (positions[2] / self.steps_per_mm_z) as f32,
        }
    }
}

// --- CoreXY Kinematics ---

/// CoreXY kinematics model.
/// See: <https://corexy.com/theory.html>
#[derive(Debug, Default)]
pub struct CoreXYKinematics {
    pub steps_per_mm_a: f64, // Typically steps_per_mm for both X and Y
    pub steps_per_mm_b: f64,
    pub steps_per_mm_z: f64,
}

impl Kinematics for CoreXYKinematics {
    const AXES: usize = 3;

    fn cartesian_to_stepper_positions(&self, point: CartesianPoint) -> [f64; Self::AXES] {
        let z_pos = point.z * self.steps_per_mm_z;
        let a_pos = (point.x + point.y) * self.steps_per_mm_a;
        let b_pos = (point.x - point.y) * self.steps_per_mm_b;
        [a_pos, b_pos, z_pos]
    }

    fn stepper_positions_to_cartesian(&self, positions: [f64; Self::AXES]) -> CartesianPoint {
        let a = positions[0] / self.steps_per_mm_a;
        let b = positions[1] / self.steps_per_mm_b;
        CartesianPoint {
            x: ((a + b) / 2.0) as f32,
            y: ((a - b) / 2.0) as f32,
            z: (positions[2] / self.steps_per_mm_z) as f32,
        }
    }
}

// --- Delta Kinematics ---

/// Linear-delta kinematics: three vertical towers arranged at 120 degrees,
/// each carrying a carriage connected to the effector by a fixed-length arm.
///
/// Inverse kinematics (Cartesian -> tower heights) is a closed form; forward
/// kinematics (tower heights -> Cartesian) is solved via trilateration of
/// the three carriage positions, following the standard linear-delta
/// formulation used by RepRap-derived firmwares.
#[derive(Debug, Clone, Copy)]
pub struct DeltaKinematics {
    pub diagonal_rod: f64,
    pub radius: f64,
    pub steps_per_mm: f64,
    /// Per-tower angular offset from the nominal 0/120/240 degree layout,
    /// in radians; lets a calibration step correct for mechanical tolerance.
    pub tower_angle_trim: [f64; 3],
}

impl Default for DeltaKinematics {
    fn default() -> Self {
        Self {
            diagonal_rod: 250.0,
            radius: 150.0,
            steps_per_mm: 80.0,
            tower_angle_trim: [0.0; 3],
        }
    }
}

impl DeltaKinematics {
    fn tower_positions(&self) -> [(f64, f64); 3] {
        const BASE_ANGLES: [f64; 3] = [
            core::f64::consts::FRAC_PI_2,
            core::f64::consts::FRAC_PI_2 + 2.0 * core::f64::consts::FRAC_PI_3,
            core::f64::consts::FRAC_PI_2 + 4.0 * core::f64::consts::FRAC_PI_3,
        ];
        let mut towers = [(0.0, 0.0); 3];
        for i in 0..3 {
            let angle = BASE_ANGLES[i] + self.tower_angle_trim[i];
            towers[i] = (self.radius * cos(angle), self.radius * sin(angle));
        }
        towers
    }
}

#[cfg(not(feature = "std"))]
fn cos(x: f64) -> f64 {
    libm::cos(x)
}
#[cfg(feature = "std")]
fn cos(x: f64) -> f64 {
    x.cos()
}
#[cfg(not(feature = "std"))]
fn sin(x: f64) -> f64 {
    libm::sin(x)
}
#[cfg(feature = "std")]
fn sin(x: f64) -> f64 {
    x.sin()
}

impl Kinematics for DeltaKinematics {
    const AXES: usize = 3;

    fn cartesian_to_stepper_positions(&self, point: CartesianPoint) -> [f64; Self::AXES] {
        let (x, y, z) = (point.x as f64, point.y as f64, point.z as f64);
        let towers = self.tower_positions();
        let mut heights = [0.0; 3];
        for i in 0..3 {
            let (tx, ty) = towers[i];
            let dx = x - tx;
            let dy = y - ty;
            let horiz_sq = dx * dx + dy * dy;
            heights[i] = z + fsqrt(self.diagonal_rod * self.diagonal_rod - horiz_sq);
        }
        [
            heights[0] * self.steps_per_mm,
            heights[1] * self.steps_per_mm,
            heights[2] * self.steps_per_mm,
        ]
    }

    fn stepper_positions_to_cartesian(&self, positions: [f64; Self::AXES]) -> CartesianPoint {
        let towers = self.tower_positions();
        let heights = [
            positions[0] / self.steps_per_mm,
            positions[1] / self.steps_per_mm,
            positions[2] / self.steps_per_mm,
        ];

        // Trilaterate: each carriage sits at (tower.x, tower.y, height_i)
        // and is `diagonal_rod` from the effector. Solve the resulting
        // linear system (after subtracting the third sphere's equation
        // from the first two) for x, y, then back out z.
        let (x1, y1) = towers[0];
        let (x2, y2) = towers[1];
        let (x3, y3) = towers[2];
        let z1 = heights[0];
        let z2 = heights[1];
        let z3 = heights[2];
        let r2 = self.diagonal_rod * self.diagonal_rod;

        let a1 = 2.0 * (x2 - x1);
        let b1 = 2.0 * (y2 - y1);
        let c1 = 2.0 * (z2 - z1);
        let d1 = (x1 * x1 - x2 * x2) + (y1 * y1 - y2 * y2) + (z1 * z1 - z2 * z2);

        let a2 = 2.0 * (x3 - x1);
        let b2 = 2.0 * (y3 - y1);
        let c2 = 2.0 * (z3 - z1);
        let d2 = (x1 * x1 - x3 * x3) + (y1 * y1 - y3 * y3) + (z1 * z1 - z3 * z3);

        // Solve for x,y in terms of z using the two linear equations, then
        // substitute into the first sphere equation and solve the resulting
        // quadratic in z. We take the root nearer the average tower height,
        // which is always the physically valid one for a delta printer.
        let denom = a1 * b2 - a2 * b1;
        let (ex, fx) = ((b2 * c1 - b1 * c2) / denom, (b1 * d2 - b2 * d1) / denom);
        let (ey, fy) = ((a1 * c2 - a2 * c1) / denom, (a2 * d1 - a1 * d2) / denom);

        let qa = ex * ex + ey * ey + 1.0;
        let qb = 2.0 * (ex * (fx - x1) + ey * (fy - y1) - z1);
        let qc = (fx - x1) * (fx - x1) + (fy - y1) * (fy - y1) + z1 * z1 - r2;
        let disc = (qb * qb - 4.0 * qa * qc).max(0.0);
        let z = (-qb + fsqrt(disc)) / (2.0 * qa);
        let x = ex * z + fx;
        let y = ey * z + fy;

        CartesianPoint { x: x as f32, y: y as f32, z: z as f32 }
    }
}

/// Quadratic bed-leveling correction fitted by least squares (see
/// `homing::leveling`): `z_corrected = z + c0 + cx*x + cy*y + cxx*x^2 +
/// cxy*x*y + cyy*y^2`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct BedCorrection {
    pub c0: f64,
    pub cx: f64,
    pub cy: f64,
    pub cxx: f64,
    pub cxy: f64,
    pub cyy: f64,
}

impl BedCorrection {
    pub const IDENTITY: Self = Self { c0: 0.0, cx: 0.0, cy: 0.0, cxx: 0.0, cxy: 0.0, cyy: 0.0 };

    pub fn apply(&self, point: CartesianPoint) -> CartesianPoint {
        let (x, y) = (point.x as f64, point.y as f64);
        let dz = self.c0 + self.cx * x + self.cy * y + self.cxx * x * x + self.cxy * x * y + self.cyy * y * y;
        CartesianPoint { x: point.x, y: point.y, z: point.z + dz as f32 }
    }
}

/// Splits a move into sub-segments no longer than `max_split_length`, so a
/// long straight-line move on a non-linear kinematics (Delta, bed-corrected
/// Cartesian) stays close to the true curved path.
///
/// Returns the endpoints of each sub-segment, including the final `to`
/// point; the caller is responsible for feeding each consecutive pair to the
/// planner as its own segment.
pub fn segment_move(from: CartesianPoint, to: CartesianPoint, max_split_length: f32) -> heapless::Vec<CartesianPoint, 64> {
    let mut out = heapless::Vec::new();
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let dz = to.z - from.z;
    let len = libm_or_std_sqrtf(dx * dx + dy * dy + dz * dz);
    if max_split_length <= 0.0 || len <= max_split_length {
        out.push(to).ok();
        return out;
    }
    let n = (len / max_split_length).ceil() as u32;
    for i in 1..=n {
        let t = i as f32 / n as f32;
        let _ = out.push(CartesianPoint {
            x: from.x + dx * t,
            y: from.y + dy * t,
            z: from.z + dz * t,
        });
    }
    out
}

#[cfg(not(feature = "std"))]
fn libm_or_std_sqrtf(x: f32) -> f32 {
    libm::sqrtf(x)
}
#[cfg(feature = "std")]
fn libm_or_std_sqrtf(x: f32) -> f32 {
    x.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corexy_round_trips_exactly() {
        let k = CoreXYKinematics { steps_per_mm_a: 80.0, steps_per_mm_b: 80.0, steps_per_mm_z: 400.0 };
        let p = CartesianPoint { x: 12.5, y: -7.25, z: 3.0 };
        let steps = k.cartesian_to_stepper_positions(p);
        let back = k.stepper_positions_to_cartesian(steps);
        assert!((back.x - p.x).abs() < 1e-9);
        assert!((back.y - p.y).abs() < 1e-9);
        assert!((back.z - p.z).abs() < 1e-9);
    }

    #[test]
    fn delta_round_trips_within_tolerance() {
        let k = DeltaKinematics::default();
        let p = CartesianPoint { x: 10.0, y: -15.0, z: 100.0 };
        let steps = k.cartesian_to_stepper_positions(p);
        let back = k.stepper_positions_to_cartesian(steps);
        assert!((back.x - p.x).abs() < 1e-4, "x mismatch: {} vs {}", back.x, p.x);
        assert!((back.y - p.y).abs() < 1e-4, "y mismatch: {} vs {}", back.y, p.y);
        assert!((back.z - p.z).abs() < 1e-4, "z mismatch: {} vs {}", back.z, p.z);
    }

    #[test]
    fn segment_move_respects_max_length() {
        let from = CartesianPoint { x: 0.0, y: 0.0, z: 0.0 };
        let to = CartesianPoint { x: 100.0, y: 0.0, z: 0.0 };
        let pieces = segment_move(from, to, 10.0);
        assert_eq!(pieces.len(), 10);
        assert!((pieces.last().unwrap().x - 100.0).abs() < 1e-4);
    }

    #[test]
    fn segment_move_is_noop_under_threshold() {
        let from = CartesianPoint { x: 0.0, y: 0.0, z: 0.0 };
        let to = CartesianPoint { x: 1.0, y: 0.0, z: 0.0 };
        let pieces = segment_move(from, to, 10.0);
        assert_eq!(pieces.len(), 1);
    }
}
