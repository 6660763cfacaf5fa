//! Driven wheel axle and road loads.

use crate::common::{clamp, or_default};
use crate::traits::RotatingBody;
use pt_core::constants::{G0_MPS2, RHO_AIR_SEA_LEVEL};
use pt_core::units::mps_to_mph;
use serde::{Deserialize, Serialize};

/// Wheel speed (rad/s) over which rolling resistance ramps in from zero.
const ROLLING_RAMP_OMEGA: f64 = 0.5;

/// Flat wheel axle configuration record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelAxleConfig {
    pub radius_m: f64,
    /// Fixed reduction between transmission output and axle
    pub final_drive: f64,
    pub wheel_mass_kg: f64,
    pub wheel_count: usize,
    pub vehicle_mass_kg: f64,
    pub rolling_coeff: f64,
    pub drag_coeff: f64,
    pub frontal_area_m2: f64,
    pub air_density: f64,
}

impl Default for WheelAxleConfig {
    fn default() -> Self {
        Self {
            radius_m: 0.33,
            final_drive: 3.15,
            wheel_mass_kg: 27.0,
            wheel_count: 4,
            vehicle_mass_kg: 1100.0,
            rolling_coeff: 0.01,
            drag_coeff: 0.3,
            frontal_area_m2: 2.0,
            air_density: RHO_AIR_SEA_LEVEL,
        }
    }
}

impl WheelAxleConfig {
    /// Copy with every invalid field replaced by its default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let positive = |v: f64| v > 0.0;
        let non_negative = |v: f64| v >= 0.0;
        Self {
            radius_m: or_default(self.radius_m, positive(self.radius_m), d.radius_m, "radius_m"),
            final_drive: or_default(
                self.final_drive,
                positive(self.final_drive),
                d.final_drive,
                "final_drive",
            ),
            wheel_mass_kg: or_default(
                self.wheel_mass_kg,
                non_negative(self.wheel_mass_kg),
                d.wheel_mass_kg,
                "wheel_mass_kg",
            ),
            wheel_count: if self.wheel_count > 0 {
                self.wheel_count
            } else {
                d.wheel_count
            },
            vehicle_mass_kg: or_default(
                self.vehicle_mass_kg,
                positive(self.vehicle_mass_kg),
                d.vehicle_mass_kg,
                "vehicle_mass_kg",
            ),
            rolling_coeff: or_default(
                self.rolling_coeff,
                non_negative(self.rolling_coeff),
                d.rolling_coeff,
                "rolling_coeff",
            ),
            drag_coeff: or_default(
                self.drag_coeff,
                non_negative(self.drag_coeff),
                d.drag_coeff,
                "drag_coeff",
            ),
            frontal_area_m2: or_default(
                self.frontal_area_m2,
                non_negative(self.frontal_area_m2),
                d.frontal_area_m2,
                "frontal_area_m2",
            ),
            air_density: or_default(
                self.air_density,
                non_negative(self.air_density),
                d.air_density,
                "air_density",
            ),
        }
    }
}

/// Drive wheels and axle. No tyre slip: `v = ω·r`.
///
/// The moment includes the vehicle's translational inertia reflected to the
/// axle, `I = ½·m_w·n·r² + m_vehicle·r²`, so that accelerating the axle
/// accelerates the car.
#[derive(Clone, Debug)]
pub struct WheelAxle {
    radius: f64,
    final_drive: f64,
    moment: f64,
    rolling_torque_max: f64,
    drag_factor: f64,
    omega: f64,
    linear_speed: f64,
    drag_force: f64,
}

impl WheelAxle {
    pub fn new(config: &WheelAxleConfig) -> Self {
        let c = config.sanitized();
        let r2 = c.radius_m * c.radius_m;
        Self {
            radius: c.radius_m,
            final_drive: c.final_drive,
            moment: 0.5 * c.wheel_mass_kg * c.wheel_count as f64 * r2 + c.vehicle_mass_kg * r2,
            rolling_torque_max: c.rolling_coeff * c.vehicle_mass_kg * G0_MPS2 * c.radius_m,
            drag_factor: 0.5 * c.air_density * c.drag_coeff * c.frontal_area_m2,
            omega: 0.0,
            linear_speed: 0.0,
            drag_force: 0.0,
        }
    }

    /// Recompute linear speed and aerodynamic drag from the axle speed.
    ///
    /// ```text
    /// v = ω·r
    /// F_drag = ½·ρ·v·|v|·c_d·A
    /// ```
    pub fn update(&mut self) {
        self.linear_speed = self.omega * self.radius;
        self.drag_force = self.drag_factor * self.linear_speed * self.linear_speed.abs();
    }

    /// Rolling resistance torque at the axle (N·m).
    ///
    /// Ramped in linearly below 0.5 rad/s so a stationary car is not driven
    /// backwards by its own rolling resistance.
    pub fn rolling_torque(&self) -> f64 {
        self.rolling_torque_max * clamp(self.omega / ROLLING_RAMP_OMEGA, -1.0, 1.0)
    }

    /// Total resistive torque at the axle (N·m), rolling plus drag.
    pub fn road_torque(&self) -> f64 {
        self.rolling_torque() + self.drag_force * self.radius
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    pub fn set_omega(&mut self, omega: f64) {
        self.omega = omega;
    }

    /// Road speed (m/s).
    pub fn linear_speed(&self) -> f64 {
        self.linear_speed
    }

    pub fn speed_mph(&self) -> f64 {
        mps_to_mph(self.linear_speed)
    }

    pub fn drag_force(&self) -> f64 {
        self.drag_force
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn final_drive(&self) -> f64 {
        self.final_drive
    }

    pub fn moment(&self) -> f64 {
        self.moment
    }
}

impl RotatingBody for WheelAxle {
    fn name(&self) -> &str {
        "wheel_axle"
    }

    fn omega(&self) -> f64 {
        self.omega
    }

    fn moment(&self) -> f64 {
        self.moment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moment_includes_vehicle_mass() {
        let axle = WheelAxle::new(&WheelAxleConfig::default());
        let r2 = 0.33 * 0.33;
        let expected = 0.5 * 27.0 * 4.0 * r2 + 1100.0 * r2;
        assert!((axle.moment() - expected).abs() < 1e-9);
    }

    #[test]
    fn linear_speed_and_drag() {
        let mut axle = WheelAxle::new(&WheelAxleConfig::default());
        axle.set_omega(100.0);
        axle.update();
        assert!((axle.linear_speed() - 33.0).abs() < 1e-12);
        let expected = 0.5 * 1.225 * 33.0 * 33.0 * 0.3 * 2.0;
        assert!((axle.drag_force() - expected).abs() < 1e-9);
        assert!((axle.speed_mph() - 33.0 * 3600.0 / 1609.344).abs() < 1e-9);
    }

    #[test]
    fn drag_grows_with_square_of_speed() {
        let mut axle = WheelAxle::new(&WheelAxleConfig::default());
        axle.set_omega(20.0);
        axle.update();
        let slow = axle.drag_force();
        axle.set_omega(40.0);
        axle.update();
        assert!((axle.drag_force() / slow - 4.0).abs() < 1e-9);
    }

    #[test]
    fn rolling_resistance_ramps_in() {
        let mut axle = WheelAxle::new(&WheelAxleConfig::default());
        assert_eq!(axle.rolling_torque(), 0.0);
        axle.set_omega(0.25);
        let half = axle.rolling_torque();
        axle.set_omega(10.0);
        let full = axle.rolling_torque();
        assert!((half * 2.0 - full).abs() < 1e-9);
        assert!((full - 0.01 * 1100.0 * G0_MPS2 * 0.33).abs() < 1e-9);
    }

    #[test]
    fn invalid_fields_fall_back() {
        let axle = WheelAxle::new(&WheelAxleConfig {
            radius_m: -1.0,
            wheel_count: 0,
            ..WheelAxleConfig::default()
        });
        assert_eq!(axle.radius(), 0.33);
        assert!(axle.moment() > 0.0);
    }
}
