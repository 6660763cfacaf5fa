//! Crankshaft: owns the cylinders and integrates their torque.

use crate::common::or_default;
use crate::cylinder::{CombustionModel, Cylinder, CylinderGeometry, Stroke, StrokeInput};
use crate::error::{ComponentError, ComponentResult};
use crate::intake::IntakeCurve;
use crate::traits::RotatingBody;
use pt_core::units::{m, omega_to_rpm, watts_to_hp};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::warn;

/// One full four-stroke cycle of crank angle (rad).
const CYCLE: f64 = 4.0 * PI;

/// Cylinder arrangement and firing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineLayout {
    #[default]
    Inline4,
    Inline6,
}

impl EngineLayout {
    pub fn cylinder_count(self) -> usize {
        match self {
            EngineLayout::Inline4 => 4,
            EngineLayout::Inline6 => 6,
        }
    }

    /// Fixed crank-angle offset of each cylinder (rad), in cylinder order.
    ///
    /// A cylinder at offset 0 starts its power stroke at crank angle 0.
    pub fn phase_offsets(self) -> Vec<f64> {
        match self {
            EngineLayout::Inline4 => vec![0.0, -3.0 * PI, -PI, -2.0 * PI],
            EngineLayout::Inline6 => [0.0_f64, -480.0, -240.0, -600.0, -120.0, -360.0]
                .iter()
                .map(|deg| deg.to_radians())
                .collect(),
        }
    }
}

/// Flat engine configuration record.
///
/// Missing fields take the defaults below. Tunable coefficients that are out
/// of range fall back to their defaults (see [`EngineConfig::sanitized`]);
/// bore, stroke, compression ratio and an explicit moment override are never
/// defaulted and fail construction instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: EngineLayout,
    pub bore_m: f64,
    pub stroke_m: f64,
    pub compression_ratio: f64,
    /// Crank radius over connecting-rod length
    pub rod_ratio: f64,
    pub volumetric_efficiency: f64,
    pub combustion_efficiency: f64,
    pub ignition_damping: f64,
    pub idle_throttle: f64,
    pub rev_limit_rpm: f64,
    pub intake: IntakeCurve,
    pub piston_mass_kg: f64,
    pub crank_mass_kg: f64,
    pub crank_thickness_m: f64,
    pub flywheel_mass_kg: f64,
    pub flywheel_radius_m: f64,
    /// Viscous engine friction (N·m·s/rad)
    pub friction_coeff: f64,
    /// Starter speed the engine is spun up to at time zero (rad/s)
    pub starter_omega_rad_s: f64,
    /// Replaces the lumped moment of inertia estimate (kg·m²)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moment_override: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let combustion = CombustionModel::default();
        Self {
            layout: EngineLayout::Inline4,
            bore_m: 0.0875,
            stroke_m: 0.0995,
            compression_ratio: 9.3,
            rod_ratio: 0.3,
            volumetric_efficiency: combustion.volumetric_efficiency,
            combustion_efficiency: combustion.combustion_efficiency,
            ignition_damping: combustion.ignition_damping,
            idle_throttle: combustion.idle_throttle,
            rev_limit_rpm: combustion.rev_limit_rpm,
            intake: combustion.intake,
            piston_mass_kg: 1.0,
            crank_mass_kg: 23.0,
            crank_thickness_m: 0.05,
            flywheel_mass_kg: 13.6,
            flywheel_radius_m: 0.2,
            friction_coeff: 0.05,
            starter_omega_rad_s: 50.0,
            moment_override: None,
        }
    }
}

impl EngineConfig {
    /// Copy with every invalid tunable field replaced by its default.
    pub fn sanitized(&self) -> Self {
        let d = Self::default();
        let unit = |v: f64| (0.0..=1.0).contains(&v);
        let positive = |v: f64| v > 0.0;
        let non_negative = |v: f64| v >= 0.0;

        let intake = if self.intake.is_valid() {
            self.intake.clone()
        } else {
            warn!(curve = ?self.intake, "invalid intake curve, using default");
            d.intake.clone()
        };

        Self {
            layout: self.layout,
            bore_m: self.bore_m,
            stroke_m: self.stroke_m,
            compression_ratio: self.compression_ratio,
            rod_ratio: or_default(
                self.rod_ratio,
                self.rod_ratio > 0.0 && self.rod_ratio < 1.0,
                d.rod_ratio,
                "rod_ratio",
            ),
            volumetric_efficiency: or_default(
                self.volumetric_efficiency,
                self.volumetric_efficiency > 0.0 && self.volumetric_efficiency <= 1.5,
                d.volumetric_efficiency,
                "volumetric_efficiency",
            ),
            combustion_efficiency: or_default(
                self.combustion_efficiency,
                unit(self.combustion_efficiency),
                d.combustion_efficiency,
                "combustion_efficiency",
            ),
            ignition_damping: or_default(
                self.ignition_damping,
                unit(self.ignition_damping),
                d.ignition_damping,
                "ignition_damping",
            ),
            idle_throttle: or_default(
                self.idle_throttle,
                unit(self.idle_throttle),
                d.idle_throttle,
                "idle_throttle",
            ),
            rev_limit_rpm: or_default(
                self.rev_limit_rpm,
                positive(self.rev_limit_rpm),
                d.rev_limit_rpm,
                "rev_limit_rpm",
            ),
            intake,
            piston_mass_kg: or_default(
                self.piston_mass_kg,
                non_negative(self.piston_mass_kg),
                d.piston_mass_kg,
                "piston_mass_kg",
            ),
            crank_mass_kg: or_default(
                self.crank_mass_kg,
                non_negative(self.crank_mass_kg),
                d.crank_mass_kg,
                "crank_mass_kg",
            ),
            crank_thickness_m: or_default(
                self.crank_thickness_m,
                non_negative(self.crank_thickness_m),
                d.crank_thickness_m,
                "crank_thickness_m",
            ),
            flywheel_mass_kg: or_default(
                self.flywheel_mass_kg,
                non_negative(self.flywheel_mass_kg),
                d.flywheel_mass_kg,
                "flywheel_mass_kg",
            ),
            flywheel_radius_m: or_default(
                self.flywheel_radius_m,
                non_negative(self.flywheel_radius_m),
                d.flywheel_radius_m,
                "flywheel_radius_m",
            ),
            friction_coeff: or_default(
                self.friction_coeff,
                non_negative(self.friction_coeff),
                d.friction_coeff,
                "friction_coeff",
            ),
            starter_omega_rad_s: or_default(
                self.starter_omega_rad_s,
                non_negative(self.starter_omega_rad_s),
                d.starter_omega_rad_s,
                "starter_omega_rad_s",
            ),
            moment_override: self.moment_override,
        }
    }

    /// Combustion parameters handed to every cylinder.
    pub fn combustion_model(&self) -> CombustionModel {
        CombustionModel {
            volumetric_efficiency: self.volumetric_efficiency,
            combustion_efficiency: self.combustion_efficiency,
            ignition_damping: self.ignition_damping,
            idle_throttle: self.idle_throttle,
            rev_limit_rpm: self.rev_limit_rpm,
            intake: self.intake.clone(),
        }
    }

    /// Lumped rotating moment of inertia (kg·m²).
    ///
    /// ```text
    /// I = m_piston·r²·N + ½·m_crank·(t/2)² + ½·m_flywheel·R_fw²
    /// ```
    pub fn lumped_moment(&self) -> f64 {
        if let Some(moment) = self.moment_override {
            return moment;
        }
        let r = self.stroke_m / 2.0;
        let half_thickness = self.crank_thickness_m / 2.0;
        self.piston_mass_kg * r * r * self.layout.cylinder_count() as f64
            + 0.5 * self.crank_mass_kg * half_thickness * half_thickness
            + 0.5 * self.flywheel_mass_kg * self.flywheel_radius_m * self.flywheel_radius_m
    }
}

/// Multi-cylinder crankshaft.
///
/// Each step:
///
/// ```text
/// for each cylinder j (angle θ_j = θ + offset_j):
///     while θ_j >= threshold_j: transition(); threshold_j += π
///     advance(θ_j)
/// τ_ind   = Σ r·F_j·sin θ_j
/// τ_brake = τ_ind - c_f·ω
/// τ_net   = τ_brake - τ_load
/// ω       = max(0, ω + τ_net/I·Δt)
/// θ      += ω·Δt
/// ```
///
/// Thresholds rise by exactly π per crossing, so every cylinder changes
/// stroke once per half revolution however large the step. The angle and
/// all thresholds are shifted back together by one full cycle (4π) whenever
/// the angle passes 4π, which keeps `sin θ` accurate over long runs.
#[derive(Clone, Debug)]
pub struct Crankshaft {
    cylinders: Vec<Cylinder>,
    phase_offsets: Vec<f64>,
    thresholds: Vec<f64>,
    transitions: Vec<u64>,
    angle: f64,
    omega: f64,
    alpha: f64,
    moment: f64,
    crank_radius: f64,
    friction_coeff: f64,
    indicated_torque: f64,
    brake_torque: f64,
    net_torque: f64,
}

impl Crankshaft {
    /// Build an engine from its configuration, turning at the starter speed.
    ///
    /// # Errors
    /// Returns `InvalidArg` for non-positive bore, stroke, compression ratio
    /// or moment of inertia.
    pub fn new(config: &EngineConfig) -> ComponentResult<Self> {
        let config = config.sanitized();
        let geometry = CylinderGeometry::new(
            m(config.bore_m),
            m(config.stroke_m),
            config.compression_ratio,
            config.rod_ratio,
        )?;
        let moment = config.lumped_moment();
        if !(moment.is_finite() && moment > 0.0) {
            return Err(ComponentError::InvalidArg {
                what: "crankshaft moment of inertia must be positive",
            });
        }

        let model = config.combustion_model();
        let phase_offsets = config.layout.phase_offsets();
        let crank_radius = geometry.crank_radius_m();

        let mut cylinders: Vec<Cylinder> = phase_offsets
            .iter()
            .map(|&offset| {
                Cylinder::new(
                    geometry.clone(),
                    model.clone(),
                    Stroke::from_cycle_angle(offset),
                )
            })
            .collect();
        let thresholds = phase_offsets
            .iter()
            .map(|&offset| ((offset / PI).floor() + 1.0) * PI)
            .collect();
        for (cylinder, &offset) in cylinders.iter_mut().zip(&phase_offsets) {
            cylinder.advance(offset, false);
        }

        Ok(Self {
            transitions: vec![0; cylinders.len()],
            cylinders,
            phase_offsets,
            thresholds,
            angle: 0.0,
            omega: config.starter_omega_rad_s,
            alpha: 0.0,
            moment,
            crank_radius,
            friction_coeff: config.friction_coeff,
            indicated_torque: 0.0,
            brake_torque: 0.0,
            net_torque: 0.0,
        })
    }

    /// Advance the engine by one time step.
    ///
    /// # Arguments
    /// * `throttle` - Throttle position in [0, 1]
    /// * `load` - External torque opposing the crank (N·m)
    /// * `dt` - Time step (s)
    pub fn step(&mut self, throttle: f64, load: f64, dt: f64) {
        let input = StrokeInput {
            throttle,
            rpm: self.rpm(),
        };

        if self.angle >= CYCLE {
            self.angle -= CYCLE;
            for threshold in &mut self.thresholds {
                *threshold -= CYCLE;
            }
        }

        let mut indicated = 0.0;
        for (((cylinder, threshold), count), &offset) in self
            .cylinders
            .iter_mut()
            .zip(self.thresholds.iter_mut())
            .zip(self.transitions.iter_mut())
            .zip(&self.phase_offsets)
        {
            let theta = self.angle + offset;
            let mut sparked = false;
            while theta.is_finite() && theta >= *threshold {
                sparked |= cylinder.transition(input);
                *threshold += PI;
                *count += 1;
            }
            cylinder.advance(theta, sparked);
            indicated += self.crank_radius * cylinder.force_n() * theta.sin();
        }

        self.indicated_torque = indicated;
        self.brake_torque = indicated - self.friction_coeff * self.omega;
        self.net_torque = self.brake_torque - load;
        self.alpha = self.net_torque / self.moment;
        self.omega = (self.omega + self.alpha * dt).max(0.0);
        self.angle += self.omega * dt;
    }

    pub fn rpm(&self) -> f64 {
        omega_to_rpm(self.omega)
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Set the crank speed directly (starter, shift reconciliation).
    pub fn set_omega(&mut self, omega: f64) {
        self.omega = omega.max(0.0);
    }

    /// Crank angle within the current cycle (rad), in [0, 4π) plus at most
    /// one step of rotation.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Angular acceleration from the last step (rad/s²).
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn moment(&self) -> f64 {
        self.moment
    }

    /// Add a rigidly coupled inertia (e.g. the converter impeller).
    pub fn add_moment(&mut self, extra: f64) {
        self.moment += extra;
    }

    /// Scale the effective moment of inertia by a positive factor.
    pub fn scale_moment(&mut self, factor: f64) {
        if factor.is_finite() && factor > 0.0 {
            self.moment *= factor;
        }
    }

    /// Sum of gas torques before friction and load (N·m).
    pub fn indicated_torque(&self) -> f64 {
        self.indicated_torque
    }

    /// Indicated torque less engine friction (N·m).
    pub fn brake_torque(&self) -> f64 {
        self.brake_torque
    }

    /// Brake torque less the external load (N·m).
    pub fn net_torque(&self) -> f64 {
        self.net_torque
    }

    /// Brake power in mechanical horsepower.
    pub fn horsepower(&self) -> f64 {
        watts_to_hp(self.brake_torque * self.omega)
    }

    pub fn cylinders(&self) -> &[Cylinder] {
        &self.cylinders
    }

    pub fn phase_offsets(&self) -> &[f64] {
        &self.phase_offsets
    }

    /// Next stroke-transition angle of each cylinder (rad).
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Stroke transitions fired by each cylinder since construction.
    pub fn transition_counts(&self) -> &[u64] {
        &self.transitions
    }
}

impl RotatingBody for Crankshaft {
    fn name(&self) -> &str {
        "crankshaft"
    }

    fn omega(&self) -> f64 {
        self.omega
    }

    fn moment(&self) -> f64 {
        self.moment
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn stroke_order_independent_of_step_size(
            dt in 5e-5f64..1e-3,
            throttle in 0.0f64..1.0,
            steps in 50usize..1500,
        ) {
            let mut engine = Crankshaft::new(&EngineConfig::default()).unwrap();
            engine.set_omega(200.0);
            let initial: Vec<Stroke> = engine.cylinders().iter().map(|c| c.stroke()).collect();

            for _ in 0..steps {
                engine.step(throttle, 0.0, dt);
            }

            for (j, cylinder) in engine.cylinders().iter().enumerate() {
                let crossings = engine.transition_counts()[j];
                let mut expected = initial[j];
                for _ in 0..crossings {
                    expected = expected.next();
                }
                prop_assert_eq!(cylinder.stroke(), expected);
                prop_assert!(cylinder.volume_m3() > 0.0);
                prop_assert!(cylinder.pressure().value >= 0.0);
            }
        }
    }
}
